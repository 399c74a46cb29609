//! Custom role catalog.
//!
//! Folderward relies on three custom roles: a bucket-wide administrator, a
//! folder owner whose grants are scoped by condition, and an unscoped viewer.
//! [`RoleRegistry::ensure_roles`] creates whichever of them is missing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::PolicyService;
use crate::config::FolderwardConfig;
use crate::error::{FolderwardError, FolderwardResult};

/// Launch stage assigned to created roles.
pub const ROLE_STAGE_GA: &str = "GA";

/// A fixed role definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDefinition {
    /// Role id, the last segment of the role name.
    pub id: &'static str,
    /// Display title.
    pub title: &'static str,
    /// Description.
    pub description: &'static str,
    /// Permissions bundled by the role.
    pub permissions: &'static [&'static str],
}

/// Bucket-wide administrator.
pub const STORAGE_ADMIN: RoleDefinition = RoleDefinition {
    id: "storageAdmin",
    title: "Storage Admin",
    description: "Full access to all storage objects",
    permissions: &[
        "storage.objects.create",
        "storage.objects.delete",
        "storage.objects.get",
        "storage.objects.list",
        "storage.objects.update",
        "storage.buckets.get",
    ],
};

/// Full control inside one folder, scoped by a binding condition.
pub const STORAGE_FOLDER_OWNER: RoleDefinition = RoleDefinition {
    id: "storageFolderOwner",
    title: "Storage Folder Owner",
    description: "Full control within assigned folder",
    permissions: &[
        "storage.objects.create",
        "storage.objects.delete",
        "storage.objects.get",
        "storage.objects.list",
        "storage.objects.update",
    ],
};

/// Unscoped read access.
pub const STORAGE_FOLDER_VIEWER: RoleDefinition = RoleDefinition {
    id: "storageFolderViewer",
    title: "Storage Folder Viewer",
    description: "Read-only access to storage",
    permissions: &["storage.objects.get", "storage.objects.list"],
};

/// The roles Folderward maintains, in creation order.
pub const STANDARD_ROLES: [RoleDefinition; 3] =
    [STORAGE_ADMIN, STORAGE_FOLDER_OWNER, STORAGE_FOLDER_VIEWER];

/// A role as stored in the policy service's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Fully qualified name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Included permissions.
    pub included_permissions: Vec<String>,
    /// Launch stage.
    pub stage: String,
}

impl Role {
    /// Materialize `definition` under `name`.
    #[must_use]
    pub fn from_definition(name: impl Into<String>, definition: &RoleDefinition) -> Self {
        Self {
            name: name.into(),
            title: definition.title.to_owned(),
            description: definition.description.to_owned(),
            included_permissions: definition
                .permissions
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
            stage: ROLE_STAGE_GA.to_owned(),
        }
    }
}

/// Outcome of [`RoleRegistry::ensure_roles`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleReport {
    /// Roles created by this run.
    pub created: Vec<String>,
    /// Roles that were already present.
    pub existing: Vec<String>,
}

/// Ensures the standard roles exist.
pub struct RoleRegistry {
    policy: Arc<dyn PolicyService>,
    config: Arc<FolderwardConfig>,
}

impl std::fmt::Debug for RoleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRegistry")
            .field("project_id", &self.config.project_id)
            .finish_non_exhaustive()
    }
}

impl RoleRegistry {
    /// Create a registry over `policy`.
    #[must_use]
    pub fn new(policy: Arc<dyn PolicyService>, config: Arc<FolderwardConfig>) -> Self {
        Self { policy, config }
    }

    /// Create each standard role that the catalog does not have yet.
    ///
    /// Idempotent: with every role present, no create call is issued.
    ///
    /// # Errors
    ///
    /// Any lookup failure other than `RoleNotFound`, and any create failure,
    /// aborts the remaining roles and is returned.
    pub async fn ensure_roles(&self) -> FolderwardResult<RoleReport> {
        let mut report = RoleReport::default();

        for definition in &STANDARD_ROLES {
            let name = self.config.role_name(definition.id);
            match self.policy.get_role(&name).await {
                Ok(_) => {
                    debug!(role = %name, "role already exists");
                    report.existing.push(name);
                }
                Err(FolderwardError::RoleNotFound { .. }) => {
                    self.policy.create_role(&name, definition).await?;
                    info!(role = %name, "created role");
                    report.created.push(name);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }
}
