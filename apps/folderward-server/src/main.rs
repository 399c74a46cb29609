//! Folderward Server - folder-scoped storage gateway.
//!
//! This binary serves the Folderward JSON API over in-memory identity, blob
//! and policy collaborators. On startup it seeds identities into an empty
//! store and, with policy enforcement enabled, ensures the custom roles and
//! the administrator binding.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:8080 ENABLE_IAM=enable folderward-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `PROJECT_ID` | `folderward-local` | Project owning the custom roles |
//! | `BUCKET_NAME` | `folderward-bucket` | Shared bucket |
//! | `ADMIN_EMAIL` | `admin@example.com` | Cross-folder administrator |
//! | `ENABLE_IAM` | *(unset)* | `enable` turns on policy enforcement |
//! | `MAX_UPLOAD_SIZE` | `5242880` | Upload limit in bytes |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use folderward_core::{Folderward, FolderwardConfig};
use folderward_http::FolderwardApiHandler;
use folderward_http::dispatch::FolderwardHandler;
use folderward_http::service::{FolderwardHttpConfig, FolderwardHttpService};
use folderward_memory::{InMemoryBlobStore, InMemoryIdentityStore, InMemoryPolicyService};

/// Server version logged at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the [`FolderwardHttpConfig`] from the service configuration.
fn build_http_config(config: &FolderwardConfig) -> FolderwardHttpConfig {
    FolderwardHttpConfig {
        max_body_size: config.max_upload_size,
    }
}

/// Seed identities and set up roles, logging rather than failing on error.
async fn initialize(service: &Folderward) {
    match service.initialize().await {
        Ok(report) => info!(
            seeded = report.seeded.len(),
            roles_created = report.roles.as_ref().map_or(0, |r| r.created.len()),
            admin_bound = report.admin_binding.as_ref().is_some_and(|b| b.written),
            "initialization complete",
        ),
        Err(e) => error!(error = %e, "initialization failed, serving anyway"),
    }
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<H: FolderwardHandler>(
    listener: TcpListener,
    service: FolderwardHttpService<H>,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the gateway and requesting `/health`.
///
/// Exits with code 0 if healthy, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"ok\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let config = FolderwardConfig::from_env();
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = FolderwardConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        project_id = %config.project_id,
        bucket = %config.bucket_name,
        policy_enforcement = config.policy_enforcement,
        version = VERSION,
        "starting Folderward server",
    );

    let http_config = build_http_config(&config);
    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let folderward = Folderward::new(
        config,
        Arc::new(InMemoryIdentityStore::new()),
        Arc::new(InMemoryBlobStore::new()),
        Arc::new(InMemoryPolicyService::new()),
    );
    initialize(&folderward).await;

    let handler = Arc::new(FolderwardApiHandler::new(folderward));
    let service = FolderwardHttpService::new(handler, http_config);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
