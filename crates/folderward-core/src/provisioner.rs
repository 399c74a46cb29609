//! Folder provisioning.
//!
//! [`FolderProvisioner::provision_folder`] moves an identity through
//! `Registered -> FolderCreated -> PolicyApplied`. Each step is checked
//! before it is executed, so a call interrupted anywhere can simply be
//! repeated: the marker object is the resumption point, and a fully
//! provisioned identity costs one lookup and one existence check.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::backend::{BlobStore, IdentityStore, ObjectMetadata};
use crate::binder::PolicyBinder;
use crate::config::FolderwardConfig;
use crate::error::{FolderwardError, FolderwardResult, ProvisionStep};
use crate::identity::{Email, FolderName, Identity, IdentityUpdate};

/// Creates folders and binds their policies.
pub struct FolderProvisioner {
    identities: Arc<dyn IdentityStore>,
    blobs: Arc<dyn BlobStore>,
    binder: Arc<PolicyBinder>,
    config: Arc<FolderwardConfig>,
}

impl std::fmt::Debug for FolderProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderProvisioner")
            .field("policy_enforcement", &self.config.policy_enforcement)
            .finish_non_exhaustive()
    }
}

impl FolderProvisioner {
    /// Create a provisioner.
    #[must_use]
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        blobs: Arc<dyn BlobStore>,
        binder: Arc<PolicyBinder>,
        config: Arc<FolderwardConfig>,
    ) -> Self {
        Self {
            identities,
            blobs,
            binder,
            config,
        }
    }

    /// The folder `identity` owns or will own: the recorded one if any,
    /// otherwise the one derived from its email.
    #[must_use]
    pub fn folder_for(identity: &Identity) -> FolderName {
        identity
            .storage_folder
            .clone()
            .unwrap_or_else(|| FolderName::for_email(&identity.email))
    }

    /// Provision the folder of `email` and return its name.
    ///
    /// # Errors
    ///
    /// - `PreconditionFailed` if the identity is not registered.
    /// - Any collaborator failure, wrapped with the email and the step it
    ///   occurred in. Completed steps are not rolled back.
    pub async fn provision_folder(&self, email: &Email) -> FolderwardResult<FolderName> {
        let identity = self
            .identities
            .find_by_email(email)
            .await
            .map_err(at(email, ProvisionStep::LookupIdentity))?
            .ok_or_else(|| FolderwardError::PreconditionFailed {
                email: email.to_string(),
            })?;

        let folder = Self::folder_for(&identity);
        let marker = folder.marker_path();

        let marker_exists = self
            .blobs
            .object_exists(&marker)
            .await
            .map_err(at(email, ProvisionStep::CheckMarker))?;

        let folder_recorded =
            identity.folder_created && identity.storage_folder.as_ref() == Some(&folder);
        let policy_pending = self.config.policy_enforcement && !identity.policy_applied;

        if marker_exists && folder_recorded && !policy_pending {
            debug!(email = %email, folder = %folder, "folder already provisioned");
            return Ok(folder);
        }

        if !marker_exists {
            self.blobs
                .write_object(&marker, Bytes::new(), ObjectMetadata::marker())
                .await
                .map_err(at(email, ProvisionStep::WriteMarker))?;
            debug!(email = %email, marker = %marker, "wrote folder marker");
        }

        if !folder_recorded {
            self.identities
                .update_fields(email, IdentityUpdate::folder_created(folder.clone()))
                .await
                .map_err(at(email, ProvisionStep::RecordFolder))?;
        }

        if policy_pending {
            self.binder
                .bind_folder_policy(email, &folder)
                .await
                .map_err(at(email, ProvisionStep::BindPolicy))?;
            self.identities
                .update_fields(email, IdentityUpdate::policy_applied())
                .await
                .map_err(at(email, ProvisionStep::RecordPolicy))?;
        }

        info!(
            email = %email,
            folder = %folder,
            resumed = marker_exists,
            policy_applied = policy_pending,
            "provisioned folder"
        );
        Ok(folder)
    }
}

/// Error mapper attaching `email` and `step` context.
fn at(email: &Email, step: ProvisionStep) -> impl FnOnce(FolderwardError) -> FolderwardError + '_ {
    move |e| e.at_step(email.as_str(), step)
}
