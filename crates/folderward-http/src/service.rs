//! Folderward HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use tracing::{debug, error, warn};

use crate::body::FolderwardResponseBody;
use crate::dispatch::{ApiRequest, FolderwardHandler, dispatch_request};
use crate::error::ApiError;
use crate::response::{CONTENT_TYPE, error_to_response};
use crate::router::resolve_route;

/// Configuration for the Folderward HTTP service.
#[derive(Debug, Clone)]
pub struct FolderwardHttpConfig {
    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,
}

impl Default for FolderwardHttpConfig {
    fn default() -> Self {
        Self {
            max_body_size: 5 * 1024 * 1024,
        }
    }
}

/// Hyper `Service` implementation for the Folderward API.
///
/// Wraps a [`FolderwardHandler`] implementation and routes incoming HTTP
/// requests to it.
#[derive(Debug)]
pub struct FolderwardHttpService<H: FolderwardHandler> {
    handler: Arc<H>,
    config: Arc<FolderwardHttpConfig>,
}

impl<H: FolderwardHandler> FolderwardHttpService<H> {
    /// Create a new `FolderwardHttpService`.
    pub fn new(handler: Arc<H>, config: FolderwardHttpConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
        }
    }

    /// Serve one request with any body type.
    pub async fn handle_request<B>(&self, req: http::Request<B>) -> http::Response<FolderwardResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        let head = req.method() == http::Method::HEAD;
        let mut response =
            process_request(req, self.handler.as_ref(), &self.config, &request_id).await;
        if head {
            response = response.map(|_| FolderwardResponseBody::empty());
        }
        add_common_headers(response, &request_id)
    }
}

impl<H: FolderwardHandler> Clone for FolderwardHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: FolderwardHandler> hyper::service::Service<http::Request<Incoming>>
    for FolderwardHttpService<H>
{
    type Response = http::Response<FolderwardResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle_request(req).await) })
    }
}

/// Process a single request through routing, body collection and dispatch.
async fn process_request<B, H>(
    req: http::Request<B>,
    handler: &H,
    config: &FolderwardHttpConfig,
    request_id: &str,
) -> http::Response<FolderwardResponseBody>
where
    B: http_body::Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H: FolderwardHandler,
{
    let (parts, incoming) = req.into_parts();
    let path = parts.uri.path();

    // 1. Route.
    let route = match resolve_route(&parts.method, path) {
        Ok(route) => route,
        Err(err) => return error_to_response(&err, request_id),
    };

    // 2. Reject oversized bodies up front when the length is declared.
    if let Some(length) = content_length(&parts.headers) {
        if length > config.max_body_size {
            let err = ApiError::payload_too_large(config.max_body_size);
            return error_to_response(&err, request_id);
        }
    }

    // 3. Collect body.
    let body = match collect_body(incoming, config.max_body_size).await {
        Ok(body) => body,
        Err(err) => return error_to_response(&err, request_id),
    };

    let request = ApiRequest {
        route,
        query: parts.uri.query().map(str::to_owned),
        content_type: parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body,
        request_id: request_id.to_owned(),
    };

    // 4. Dispatch to handler.
    match dispatch_request(handler, request).await {
        Ok(response) => response,
        Err(err) => {
            if err.status.is_server_error() {
                error!(code = err.code, message = %err.message, %request_id, "request failed");
            } else {
                debug!(code = err.code, message = %err.message, %request_id, "request rejected");
            }
            error_to_response(&err, request_id)
        }
    }
}

fn content_length(headers: &http::HeaderMap) -> Option<usize> {
    headers
        .get(http::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Collect the body into a single `Bytes` buffer, enforcing `limit`.
async fn collect_body<B>(incoming: B, limit: usize) -> Result<Bytes, ApiError>
where
    B: http_body::Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Limited::new(incoming, limit)
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                ApiError::payload_too_large(limit)
            } else {
                warn!(error = %e, "failed to read request body");
                ApiError::bad_request(format!("failed to read request body: {e}"))
            }
        })
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<FolderwardResponseBody>,
    request_id: &str,
) -> http::Response<FolderwardResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry("x-request-id").or_insert(hv);
    }

    headers
        .entry(http::header::CONTENT_TYPE)
        .or_insert(http::HeaderValue::from_static(CONTENT_TYPE));

    headers.insert("server", http::HeaderValue::from_static("Folderward"));

    headers.insert(
        "access-control-allow-origin",
        http::HeaderValue::from_static("*"),
    );

    response
}
