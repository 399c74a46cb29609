//! Collaborator traits.
//!
//! The core never talks to a database, an object store or a policy service
//! directly. It holds `Arc<dyn _>` handles to the three traits below, which
//! the server wires to concrete implementations. Every method is an I/O
//! boundary and may suspend.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FolderwardResult;
use crate::identity::{Email, Identity, IdentityUpdate};
use crate::policy::PolicyDocument;
use crate::roles::{Role, RoleDefinition};

/// Metadata attached to an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    /// MIME type of the body.
    pub content_type: String,
    /// Display label of the uploader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    /// Email of the uploader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by_email: Option<String>,
    /// When the upload happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateTime<Utc>>,
}

impl ObjectMetadata {
    /// Metadata for the empty folder marker.
    #[must_use]
    pub fn marker() -> Self {
        Self {
            content_type: "application/octet-stream".to_owned(),
            uploaded_by: None,
            uploaded_by_email: None,
            upload_date: None,
        }
    }
}

/// One object as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    /// Full path inside the bucket (`folder/filename`).
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub content_type: String,
}

impl ObjectSummary {
    /// Final path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Persists one record per registered identity.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up an identity by email.
    async fn find_by_email(&self, email: &Email) -> FolderwardResult<Option<Identity>>;

    /// Insert a new identity.
    ///
    /// Fails with `IdentityAlreadyExists` if the email is taken.
    async fn create(&self, identity: Identity) -> FolderwardResult<Identity>;

    /// Apply a partial update and return the new record.
    ///
    /// Fails with `IdentityNotFound` for unknown emails and with `FolderTaken`
    /// if the folder is already assigned to a different identity.
    async fn update_fields(&self, email: &Email, update: IdentityUpdate)
    -> FolderwardResult<Identity>;

    /// Number of registered identities.
    async fn count_all(&self) -> FolderwardResult<usize>;

    /// Every registered identity.
    async fn list_all(&self) -> FolderwardResult<Vec<Identity>>;
}

/// Object storage for the shared bucket.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create or overwrite an object.
    async fn write_object(
        &self,
        path: &str,
        data: Bytes,
        metadata: ObjectMetadata,
    ) -> FolderwardResult<()>;

    /// Whether an object exists at `path`.
    async fn object_exists(&self, path: &str) -> FolderwardResult<bool>;

    /// Remove an object. Fails with `ObjectNotFound` if absent.
    async fn delete_object(&self, path: &str) -> FolderwardResult<()>;

    /// List objects, optionally restricted to a prefix, sorted by path.
    async fn list_objects(&self, prefix: Option<&str>) -> FolderwardResult<Vec<ObjectSummary>>;

    /// Make an object publicly readable.
    async fn make_public(&self, path: &str) -> FolderwardResult<()>;
}

/// Holds the role catalog and the bucket's policy document.
#[async_trait]
pub trait PolicyService: Send + Sync {
    /// Fetch a role by fully qualified name. Fails with `RoleNotFound`.
    async fn get_role(&self, name: &str) -> FolderwardResult<Role>;

    /// Create a role under `name`.
    async fn create_role(&self, name: &str, definition: &RoleDefinition) -> FolderwardResult<Role>;

    /// Read the bucket policy, asking for `requested_version` semantics.
    async fn get_policy(&self, requested_version: u32) -> FolderwardResult<PolicyDocument>;

    /// Replace the bucket policy.
    ///
    /// Fails with `PolicyConflict` when `document.etag` is stale.
    async fn set_policy(&self, document: PolicyDocument) -> FolderwardResult<PolicyDocument>;
}
