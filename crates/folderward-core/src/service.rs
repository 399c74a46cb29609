//! The Folderward facade.
//!
//! [`Folderward`] wires the role registry, policy binder, folder provisioner
//! and scoped file operations over one set of collaborators, and exposes the
//! operations the HTTP layer calls. All fields are `Arc`-wrapped so the
//! facade clones cheaply into request tasks.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::backend::{BlobStore, IdentityStore, ObjectMetadata, ObjectSummary, PolicyService};
use crate::binder::{BindOutcome, PolicyBinder};
use crate::config::FolderwardConfig;
use crate::error::{FolderwardError, FolderwardResult};
use crate::files::{DeleteReceipt, ScopedFiles, UploadReceipt, UploadRequest};
use crate::identity::{Email, FolderName, Identity, IdentitySummary, IdentityUpdate};
use crate::provisioner::FolderProvisioner;
use crate::roles::{RoleRegistry, RoleReport};

/// What [`Folderward::initialize`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Emails of identities seeded into an empty store.
    pub seeded: Vec<String>,
    /// Role registry outcome, when policy enforcement is enabled.
    pub roles: Option<RoleReport>,
    /// Administrator binding outcome, when policy enforcement is enabled.
    pub admin_binding: Option<BindOutcome>,
}

/// Folder-scoped storage service.
///
/// # Examples
///
/// ```ignore
/// let gate = Folderward::new(config, identities, blobs, policy);
/// gate.initialize().await?;
/// gate.register_identity("Ann", "Lee", "a@x.com").await?;
/// ```
#[derive(Clone)]
pub struct Folderward {
    identities: Arc<dyn IdentityStore>,
    blobs: Arc<dyn BlobStore>,
    roles: Arc<RoleRegistry>,
    binder: Arc<PolicyBinder>,
    provisioner: Arc<FolderProvisioner>,
    files: Arc<ScopedFiles>,
    config: Arc<FolderwardConfig>,
}

impl std::fmt::Debug for Folderward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Folderward")
            .field("bucket", &self.config.bucket_name)
            .field("policy_enforcement", &self.config.policy_enforcement)
            .finish_non_exhaustive()
    }
}

impl Folderward {
    /// Build the service over the given collaborators.
    #[must_use]
    pub fn new(
        config: FolderwardConfig,
        identities: Arc<dyn IdentityStore>,
        blobs: Arc<dyn BlobStore>,
        policy: Arc<dyn PolicyService>,
    ) -> Self {
        let config = Arc::new(config);
        let roles = Arc::new(RoleRegistry::new(Arc::clone(&policy), Arc::clone(&config)));
        let binder = Arc::new(PolicyBinder::new(policy, Arc::clone(&config)));
        let provisioner = Arc::new(FolderProvisioner::new(
            Arc::clone(&identities),
            Arc::clone(&blobs),
            Arc::clone(&binder),
            Arc::clone(&config),
        ));
        let files = Arc::new(ScopedFiles::new(
            Arc::clone(&identities),
            Arc::clone(&blobs),
            Arc::clone(&provisioner),
            Arc::clone(&config),
        ));

        Self {
            identities,
            blobs,
            roles,
            binder,
            provisioner,
            files,
            config,
        }
    }

    /// The service configuration.
    #[must_use]
    pub fn config(&self) -> &FolderwardConfig {
        &self.config
    }

    /// The role registry.
    #[must_use]
    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// The policy binder.
    #[must_use]
    pub fn binder(&self) -> &PolicyBinder {
        &self.binder
    }

    /// The folder provisioner.
    #[must_use]
    pub fn provisioner(&self) -> &FolderProvisioner {
        &self.provisioner
    }

    /// Seed identities into an empty store, then, with policy enforcement
    /// on, ensure the standard roles and the administrator binding.
    ///
    /// # Errors
    ///
    /// Seeding, role and binding failures. Seeds that already exist are
    /// skipped with a warning.
    pub async fn initialize(&self) -> FolderwardResult<InitReport> {
        let mut report = InitReport::default();

        if self.identities.count_all().await? == 0 {
            for seed in &self.config.seed_identities {
                match self.seed_identity(seed).await {
                    Ok(email) => report.seeded.push(email),
                    Err(FolderwardError::IdentityAlreadyExists { email }) => {
                        warn!(%email, "seed identity already exists, skipping");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if !self.config.policy_enforcement {
            info!("policy enforcement disabled, skipping role setup");
            return Ok(report);
        }

        report.roles = Some(self.roles.ensure_roles().await?);
        report.admin_binding = Some(self.binder.ensure_admin_binding().await?);
        Ok(report)
    }

    async fn seed_identity(&self, seed: &crate::config::SeedIdentity) -> FolderwardResult<String> {
        let email = Email::parse(&seed.email)?;
        let folder = FolderName::new(seed.storage_folder.clone())?;

        // Marker first: a failed write leaves the store empty, so the next
        // start seeds again.
        self.blobs
            .write_object(&folder.marker_path(), Bytes::new(), ObjectMetadata::marker())
            .await?;
        self.identities
            .create(Identity::new(email.clone(), &seed.first_name, &seed.last_name))
            .await?;
        self.identities
            .update_fields(&email, IdentityUpdate::folder_created(folder.clone()))
            .await?;

        info!(email = %email, folder = %folder, "seeded identity");
        Ok(email.to_string())
    }

    /// Register a new identity.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for blank names or a malformed email.
    /// - `IdentityAlreadyExists` for a duplicate email.
    pub async fn register_identity(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> FolderwardResult<IdentitySummary> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        if first_name.is_empty() || last_name.is_empty() || email.trim().is_empty() {
            return Err(FolderwardError::invalid(
                "first name, last name, and email are required",
            ));
        }
        let email = Email::parse(email)?;

        if self.identities.find_by_email(&email).await?.is_some() {
            return Err(FolderwardError::IdentityAlreadyExists {
                email: email.to_string(),
            });
        }
        let identity = self
            .identities
            .create(Identity::new(email, first_name, last_name))
            .await?;

        info!(email = %identity.email, "registered identity");
        Ok(IdentitySummary::from(&identity))
    }

    /// Provision the folder of `email`.
    ///
    /// # Errors
    ///
    /// See [`FolderProvisioner::provision_folder`].
    pub async fn provision_folder(&self, email: &str) -> FolderwardResult<FolderName> {
        self.provisioner.provision_folder(&Email::parse(email)?).await
    }

    /// Upload a file on behalf of `email`.
    ///
    /// # Errors
    ///
    /// See [`ScopedFiles::upload`].
    pub async fn upload_file(&self, request: UploadRequest, email: &str) -> FolderwardResult<UploadReceipt> {
        self.files.upload(request, &Email::parse(email)?).await
    }

    /// Delete `path` on behalf of `email`.
    ///
    /// # Errors
    ///
    /// See [`ScopedFiles::delete`].
    pub async fn delete_file(&self, path: &str, email: &str) -> FolderwardResult<DeleteReceipt> {
        if path.trim().is_empty() {
            return Err(FolderwardError::invalid("path is required"));
        }
        self.files.delete(path, &Email::parse(email)?).await
    }

    /// Files owned by `email`.
    ///
    /// # Errors
    ///
    /// See [`ScopedFiles::list_for_identity`].
    pub async fn list_for_identity(&self, email: &str) -> FolderwardResult<Vec<ObjectSummary>> {
        self.files.list_for_identity(&Email::parse(email)?).await
    }

    /// Every file in the bucket.
    ///
    /// # Errors
    ///
    /// See [`ScopedFiles::list_all`].
    pub async fn list_all(&self) -> FolderwardResult<Vec<ObjectSummary>> {
        self.files.list_all().await
    }

    /// Files owned by `email` named `filename`.
    ///
    /// # Errors
    ///
    /// See [`ScopedFiles::get_named`].
    pub async fn get_named(&self, filename: &str, email: &str) -> FolderwardResult<Vec<ObjectSummary>> {
        self.files.get_named(filename, &Email::parse(email)?).await
    }

    /// Every registered identity.
    ///
    /// # Errors
    ///
    /// Identity-store failures.
    pub async fn list_identities(&self) -> FolderwardResult<Vec<IdentitySummary>> {
        let identities = self.identities.list_all().await?;
        Ok(identities.iter().map(IdentitySummary::from).collect())
    }
}
