//! Folder policy binding.
//!
//! [`PolicyBinder`] grants an identity full access scoped to its folder plus
//! bucket-wide read access, by reading the bucket's policy document,
//! applying the pure upserts from [`crate::policy`], and writing the whole
//! document back.
//!
//! # Concurrency
//!
//! Read, transform and write are separate calls to the policy service, so two
//! binders working for different identities can read the same document and
//! the later write would silently drop the earlier writer's binding. The
//! policy service guards against that with the document etag: a write
//! carrying a stale etag fails with `PolicyConflict`, and the binder re-reads
//! and re-applies its grants up to `policy_write_attempts` times. Once the
//! attempts are spent the conflict is returned to the caller. Grants for the
//! same folder are idempotent, so replays never duplicate bindings.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::PolicyService;
use crate::config::{CONDITIONS_POLICY_VERSION, FolderwardConfig};
use crate::error::{FolderwardError, FolderwardResult};
use crate::identity::{Email, FolderName};
use crate::policy::{Condition, PolicyDocument, folder_condition_title};
use crate::roles::{STORAGE_ADMIN, STORAGE_FOLDER_OWNER, STORAGE_FOLDER_VIEWER};

/// A grant the binder may add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Folder-owner role scoped to one folder.
    FolderOwner,
    /// Unconditional viewer role.
    Viewer,
    /// Unconditional administrator role.
    Admin,
}

/// Result of a binding pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindOutcome {
    /// Grants appended to the document.
    pub added: Vec<Grant>,
    /// Whether the document was written back.
    pub written: bool,
    /// Read-transform-write cycles performed.
    pub attempts: u32,
}

/// Applies folder grants to the bucket policy.
pub struct PolicyBinder {
    policy: Arc<dyn PolicyService>,
    config: Arc<FolderwardConfig>,
}

impl std::fmt::Debug for PolicyBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyBinder")
            .field("bucket", &self.config.bucket_name)
            .finish_non_exhaustive()
    }
}

impl PolicyBinder {
    /// Create a binder over `policy`.
    #[must_use]
    pub fn new(policy: Arc<dyn PolicyService>, config: Arc<FolderwardConfig>) -> Self {
        Self { policy, config }
    }

    /// Grant `email` the folder-owner role on `folder` and the viewer role
    /// bucket-wide. Nothing is written when both grants already exist.
    ///
    /// # Errors
    ///
    /// Returns policy-service failures, and `PolicyConflict` if every
    /// attempt lost a concurrent write.
    pub async fn bind_folder_policy(
        &self,
        email: &Email,
        folder: &FolderName,
    ) -> FolderwardResult<BindOutcome> {
        let member = email.member();
        let owner_role = self.config.role_name(STORAGE_FOLDER_OWNER.id);
        let viewer_role = self.config.role_name(STORAGE_FOLDER_VIEWER.id);
        let condition = Condition::resource_prefix(
            folder_condition_title(folder.as_str()),
            format!("Full access to {folder}/ only"),
            &self.config.folder_resource_prefix(folder.as_str()),
        );

        let outcome = self
            .read_modify_write(|document| {
                let mut added = Vec::new();
                if document.upsert_conditional(&owner_role, &member, condition.clone()) {
                    added.push(Grant::FolderOwner);
                }
                if document.upsert_unconditional(&viewer_role, &member) {
                    added.push(Grant::Viewer);
                }
                added
            })
            .await?;

        if outcome.written {
            info!(email = %email, folder = %folder, added = ?outcome.added, "bound folder policy");
        } else {
            debug!(email = %email, folder = %folder, "folder policy already bound");
        }
        Ok(outcome)
    }

    /// Grant the configured administrator the admin role bucket-wide.
    ///
    /// # Errors
    ///
    /// Same as [`PolicyBinder::bind_folder_policy`].
    pub async fn ensure_admin_binding(&self) -> FolderwardResult<BindOutcome> {
        let admin = Email::parse(&self.config.admin_email)?;
        let member = admin.member();
        let admin_role = self.config.role_name(STORAGE_ADMIN.id);

        let outcome = self
            .read_modify_write(|document| {
                if document.upsert_unconditional(&admin_role, &member) {
                    vec![Grant::Admin]
                } else {
                    Vec::new()
                }
            })
            .await?;

        if outcome.written {
            info!(admin = %admin, "bound administrator policy");
        }
        Ok(outcome)
    }

    /// Run `transform` against the current document and write it back if it
    /// added anything, retrying on etag conflicts.
    async fn read_modify_write<F>(&self, mut transform: F) -> FolderwardResult<BindOutcome>
    where
        F: FnMut(&mut PolicyDocument) -> Vec<Grant> + Send,
    {
        let max_attempts = self.config.policy_write_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let mut document = self.policy.get_policy(CONDITIONS_POLICY_VERSION).await?;
            document.version = CONDITIONS_POLICY_VERSION;

            let added = transform(&mut document);
            if added.is_empty() {
                return Ok(BindOutcome {
                    added,
                    written: false,
                    attempts,
                });
            }

            match self.policy.set_policy(document).await {
                Ok(_) => {
                    return Ok(BindOutcome {
                        added,
                        written: true,
                        attempts,
                    });
                }
                Err(FolderwardError::PolicyConflict { etag }) if attempts < max_attempts => {
                    warn!(%etag, attempts, "policy changed during update, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
