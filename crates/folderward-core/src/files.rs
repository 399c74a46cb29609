//! Folder-scoped file operations.
//!
//! Uploads always land inside the uploader's folder, listings never show
//! folder markers, and deletes are checked against the acting identity's
//! folder before the blob store is touched. The configured administrator is
//! the only identity exempt from that check.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{BlobStore, IdentityStore, ObjectMetadata, ObjectSummary};
use crate::config::FolderwardConfig;
use crate::error::{FolderwardError, FolderwardResult};
use crate::identity::{Email, FolderName, MARKER_NAME};
use crate::provisioner::FolderProvisioner;

/// Content type used when the uploader supplies none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file to upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Original file name; becomes the last path segment.
    pub filename: String,
    /// MIME type of the body.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    /// Folder the file was written to.
    pub folder: String,
    /// Full object path.
    pub path: String,
    /// Uploader display label.
    pub uploaded_by: String,
    /// Public URL, present only when the object could be made public.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Whether the object stayed private.
    pub private: bool,
}

/// Result of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReceipt {
    /// Path that was removed.
    pub deleted_path: String,
}

/// Whether `path` names a folder marker.
#[must_use]
pub fn is_marker(path: &str) -> bool {
    path.rsplit('/').next() == Some(MARKER_NAME) && path.contains('/')
}

/// First segment of an object path, i.e. the folder it lives in.
#[must_use]
pub fn folder_of(path: &str) -> &str {
    path.split('/').next().unwrap_or_default()
}

/// Reject file names that would escape or clobber folder structure.
fn validate_filename(filename: &str) -> FolderwardResult<()> {
    if filename.trim().is_empty() {
        return Err(FolderwardError::invalid("file name must not be empty"));
    }
    if filename.contains('/') {
        return Err(FolderwardError::invalid(format!(
            "file name must not contain '/': {filename}"
        )));
    }
    if filename == MARKER_NAME {
        return Err(FolderwardError::invalid(format!(
            "file name {MARKER_NAME} is reserved"
        )));
    }
    Ok(())
}

/// Upload, delete and list files within identity folders.
pub struct ScopedFiles {
    identities: Arc<dyn IdentityStore>,
    blobs: Arc<dyn BlobStore>,
    provisioner: Arc<FolderProvisioner>,
    config: Arc<FolderwardConfig>,
}

impl std::fmt::Debug for ScopedFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedFiles")
            .field("bucket", &self.config.bucket_name)
            .finish_non_exhaustive()
    }
}

impl ScopedFiles {
    /// Create the file operations facade.
    #[must_use]
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        blobs: Arc<dyn BlobStore>,
        provisioner: Arc<FolderProvisioner>,
        config: Arc<FolderwardConfig>,
    ) -> Self {
        Self {
            identities,
            blobs,
            provisioner,
            config,
        }
    }

    /// The folder currently recorded for `email`, if the identity exists and
    /// has one.
    async fn assigned_folder(&self, email: &Email) -> FolderwardResult<Option<FolderName>> {
        Ok(self
            .identities
            .find_by_email(email)
            .await?
            .and_then(|identity| identity.storage_folder))
    }

    /// Upload a file into the folder of `email`, provisioning the folder on
    /// first use. Once the folder is created, uploads go straight to it; a
    /// policy binding still pending is completed by `provision_folder`.
    ///
    /// Public visibility is best effort: if it cannot be set the upload still
    /// succeeds and the receipt is marked private.
    ///
    /// # Errors
    ///
    /// - `IdentityNotFound` if `email` is not registered.
    /// - `InvalidArgument` for empty, nested or reserved file names, and for
    ///   bodies over the configured size limit.
    /// - Provisioning and blob-store failures.
    pub async fn upload(&self, request: UploadRequest, email: &Email) -> FolderwardResult<UploadReceipt> {
        validate_filename(&request.filename)?;
        if request.data.len() > self.config.max_upload_size {
            return Err(FolderwardError::invalid(format!(
                "file is {} bytes, limit is {}",
                request.data.len(),
                self.config.max_upload_size
            )));
        }

        let identity = self
            .identities
            .find_by_email(email)
            .await?
            .ok_or_else(|| FolderwardError::IdentityNotFound {
                email: email.to_string(),
            })?;

        let folder = match &identity.storage_folder {
            Some(folder) if identity.folder_created => folder.clone(),
            _ => self.provisioner.provision_folder(email).await?,
        };

        let path = folder.object_path(&request.filename);
        let uploaded_by = identity.full_name();
        let metadata = ObjectMetadata {
            content_type: request
                .content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned()),
            uploaded_by: Some(uploaded_by.clone()),
            uploaded_by_email: Some(email.to_string()),
            upload_date: Some(Utc::now()),
        };
        let size = request.data.len();

        self.blobs.write_object(&path, request.data, metadata).await?;

        let url = match self.blobs.make_public(&path).await {
            Ok(()) => Some(self.config.public_url(&path)),
            Err(e) => {
                warn!(path = %path, error = %e, "could not make object public, keeping it private");
                None
            }
        };

        info!(email = %email, path = %path, size, private = url.is_none(), "uploaded file");
        Ok(UploadReceipt {
            folder: folder.to_string(),
            path,
            uploaded_by,
            private: url.is_none(),
            url,
        })
    }

    /// Delete `path` on behalf of `acting`.
    ///
    /// Non-administrators that own a folder may only delete inside it.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` when the path's folder is not the acting
    ///   identity's folder; the blob store is not touched.
    /// - `ObjectNotFound` if nothing exists at `path`.
    pub async fn delete(&self, path: &str, acting: &Email) -> FolderwardResult<DeleteReceipt> {
        if self.config.is_admin(acting) {
            debug!(email = %acting, path, "administrator delete, skipping folder check");
        } else if let Some(folder) = self.assigned_folder(acting).await? {
            if folder_of(path) != folder.as_str() {
                warn!(email = %acting, path, folder = %folder, "rejected cross-folder delete");
                return Err(FolderwardError::PermissionDenied {
                    email: acting.to_string(),
                    path: path.to_owned(),
                    folder: folder.to_string(),
                });
            }
        }

        if !self.blobs.object_exists(path).await? {
            return Err(FolderwardError::ObjectNotFound {
                path: path.to_owned(),
            });
        }
        self.blobs.delete_object(path).await?;

        info!(email = %acting, path, "deleted file");
        Ok(DeleteReceipt {
            deleted_path: path.to_owned(),
        })
    }

    /// Files in the folder of `email`. Identities without a folder own
    /// nothing and get an empty list.
    ///
    /// # Errors
    ///
    /// Identity-store and blob-store failures.
    pub async fn list_for_identity(&self, email: &Email) -> FolderwardResult<Vec<ObjectSummary>> {
        let Some(folder) = self.assigned_folder(email).await? else {
            debug!(email = %email, "no folder assigned, nothing to list");
            return Ok(Vec::new());
        };
        self.list_prefix(Some(&folder.prefix())).await
    }

    /// Every file in the bucket.
    ///
    /// # Errors
    ///
    /// Blob-store failures.
    pub async fn list_all(&self) -> FolderwardResult<Vec<ObjectSummary>> {
        self.list_prefix(None).await
    }

    /// Files in the folder of `email` whose name is exactly `filename`.
    ///
    /// # Errors
    ///
    /// Identity-store and blob-store failures.
    pub async fn get_named(&self, filename: &str, email: &Email) -> FolderwardResult<Vec<ObjectSummary>> {
        let files = self.list_for_identity(email).await?;
        Ok(files
            .into_iter()
            .filter(|file| file.file_name() == filename)
            .collect())
    }

    async fn list_prefix(&self, prefix: Option<&str>) -> FolderwardResult<Vec<ObjectSummary>> {
        let objects = self.blobs.list_objects(prefix).await?;
        Ok(objects
            .into_iter()
            .filter(|object| !is_marker(&object.path))
            .collect())
    }
}
