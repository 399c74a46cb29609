//! Folderward configuration.
//!
//! Provides [`FolderwardConfig`], the single explicit configuration value
//! handed to the role registry, folder provisioner, policy binder and scoped
//! file operations at construction. Nothing in the core reads process state
//! on its own; [`FolderwardConfig::from_env`] is the only place environment
//! variables are consulted.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::identity::Email;

/// Policy document version that supports conditional bindings.
pub const CONDITIONS_POLICY_VERSION: u32 = 3;

/// An identity created at startup when the identity store is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedIdentity {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Email address (normalized on use).
    pub email: String,
    /// Folder assigned to the identity up front.
    pub storage_folder: String,
}

/// Folderward service configuration.
///
/// # Examples
///
/// ```
/// use folderward_core::config::FolderwardConfig;
///
/// let config = FolderwardConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8080");
/// assert!(!config.policy_enforcement);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct FolderwardConfig {
    /// Bind address for the HTTP gateway.
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Project that owns the custom roles.
    #[builder(default = String::from("folderward-local"))]
    pub project_id: String,

    /// The shared bucket all folders live in.
    #[builder(default = String::from("folderward-bucket"))]
    pub bucket_name: String,

    /// Identity allowed to delete across folder boundaries.
    #[builder(default = String::from("admin@example.com"))]
    pub admin_email: String,

    /// Whether folder policies are bound in the policy service.
    #[builder(default = false)]
    pub policy_enforcement: bool,

    /// Base URL public objects are served from.
    #[builder(default = String::from("https://storage.googleapis.com"))]
    pub public_base_url: String,

    /// Largest accepted upload, in bytes.
    #[builder(default = 5 * 1024 * 1024)]
    pub max_upload_size: usize,

    /// Read-transform-write cycles attempted when the policy document
    /// changes underneath a binder.
    #[builder(default = 3)]
    pub policy_write_attempts: u32,

    /// Identities seeded into an empty identity store at startup.
    #[builder(default)]
    #[serde(default)]
    pub seed_identities: Vec<SeedIdentity>,
}

impl Default for FolderwardConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:8080"),
            log_level: String::from("info"),
            project_id: String::from("folderward-local"),
            bucket_name: String::from("folderward-bucket"),
            admin_email: String::from("admin@example.com"),
            policy_enforcement: false,
            public_base_url: String::from("https://storage.googleapis.com"),
            max_upload_size: 5 * 1024 * 1024,
            policy_write_attempts: 3,
            seed_identities: Vec::new(),
        }
    }
}

impl FolderwardConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8080` |
    /// | `LOG_LEVEL` | `info` |
    /// | `PROJECT_ID` | `folderward-local` |
    /// | `BUCKET_NAME` | `folderward-bucket` |
    /// | `ADMIN_EMAIL` | `admin@example.com` |
    /// | `ENABLE_IAM` | disabled (`enable`, `1` or `true` turn it on) |
    /// | `PUBLIC_BASE_URL` | `https://storage.googleapis.com` |
    /// | `MAX_UPLOAD_SIZE` | `5242880` |
    /// | `POLICY_WRITE_ATTEMPTS` | `3` |
    /// | `SEED_IDENTITIES` | empty (JSON array of seed identities) |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("PROJECT_ID") {
            config.project_id = v;
        }
        if let Ok(v) = std::env::var("BUCKET_NAME") {
            config.bucket_name = v;
        }
        if let Ok(v) = std::env::var("ADMIN_EMAIL") {
            config.admin_email = v;
        }
        if let Ok(v) = std::env::var("ENABLE_IAM") {
            config.policy_enforcement = parse_toggle(&v);
        }
        if let Ok(v) = std::env::var("PUBLIC_BASE_URL") {
            config.public_base_url = v;
        }
        if let Ok(v) = std::env::var("MAX_UPLOAD_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                config.max_upload_size = n;
            }
        }
        if let Ok(v) = std::env::var("POLICY_WRITE_ATTEMPTS") {
            if let Ok(n) = v.parse::<u32>() {
                config.policy_write_attempts = n.max(1);
            }
        }
        if let Ok(v) = std::env::var("SEED_IDENTITIES") {
            match serde_json::from_str::<Vec<SeedIdentity>>(&v) {
                Ok(seeds) => config.seed_identities = seeds,
                Err(e) => tracing::warn!(error = %e, "ignoring malformed SEED_IDENTITIES"),
            }
        }

        config
    }

    /// Whether `email` is the configured administrator.
    #[must_use]
    pub fn is_admin(&self, email: &Email) -> bool {
        self.admin_email.trim().eq_ignore_ascii_case(email.as_str())
    }

    /// Fully qualified name of a custom role in this project.
    #[must_use]
    pub fn role_name(&self, role_id: &str) -> String {
        format!("projects/{}/roles/{role_id}", self.project_id)
    }

    /// Resource-name prefix covering every object inside `folder`.
    #[must_use]
    pub fn folder_resource_prefix(&self, folder: &str) -> String {
        format!("projects/_/buckets/{}/objects/{folder}/", self.bucket_name)
    }

    /// Public URL of an object in the bucket.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{path}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket_name
        )
    }
}

/// Parse the policy-enforcement toggle, accepting `"enable"`, `"1"` and
/// `"true"` (case-insensitive).
fn parse_toggle(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("enable") || value.eq_ignore_ascii_case("true")
}
