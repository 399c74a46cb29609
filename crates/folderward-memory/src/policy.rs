//! In-memory policy service.
//!
//! Holds the role catalog and one bucket policy document. Every successful
//! write bumps the document's etag, and a write carrying any other etag is
//! refused with `PolicyConflict`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use tracing::debug;

use folderward_core::backend::PolicyService;
use folderward_core::config::CONDITIONS_POLICY_VERSION;
use folderward_core::error::{FolderwardError, FolderwardResult};
use folderward_core::policy::PolicyDocument;
use folderward_core::roles::{Role, RoleDefinition};

#[derive(Debug)]
struct VersionedPolicy {
    generation: u64,
    document: PolicyDocument,
}

impl Default for VersionedPolicy {
    fn default() -> Self {
        Self {
            generation: 0,
            document: PolicyDocument {
                version: 1,
                etag: "0".to_owned(),
                bindings: Vec::new(),
            },
        }
    }
}

/// Role catalog plus a single etag-guarded policy document.
#[derive(Debug, Default)]
pub struct InMemoryPolicyService {
    roles: DashMap<String, Role>,
    policy: RwLock<VersionedPolicy>,
    create_role_calls: AtomicUsize,
    set_policy_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryPolicyService {
    /// Create a service with no roles and an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_role` calls received.
    #[must_use]
    pub fn create_role_calls(&self) -> usize {
        self.create_role_calls.load(Ordering::SeqCst)
    }

    /// Number of `set_policy` calls received, including rejected ones.
    #[must_use]
    pub fn set_policy_calls(&self) -> usize {
        self.set_policy_calls.load(Ordering::SeqCst)
    }

    /// Make every call fail with an upstream error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// The current policy document.
    #[must_use]
    pub fn snapshot(&self) -> PolicyDocument {
        self.policy.read().document.clone()
    }

    fn check_available(&self) -> FolderwardResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(FolderwardError::upstream("policy service unavailable"));
        }
        Ok(())
    }
}

fn has_conditions(document: &PolicyDocument) -> bool {
    document.bindings.iter().any(|b| b.condition.is_some())
}

#[async_trait]
impl PolicyService for InMemoryPolicyService {
    async fn get_role(&self, name: &str) -> FolderwardResult<Role> {
        self.check_available()?;
        self.roles
            .get(name)
            .map(|r| r.value().clone())
            .ok_or_else(|| FolderwardError::RoleNotFound {
                role: name.to_owned(),
            })
    }

    async fn create_role(&self, name: &str, definition: &RoleDefinition) -> FolderwardResult<Role> {
        self.create_role_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        match self.roles.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(FolderwardError::upstream(format!(
                "role {name} already exists"
            ))),
            Entry::Vacant(e) => {
                let role = Role::from_definition(name, definition);
                e.insert(role.clone());
                Ok(role)
            }
        }
    }

    async fn get_policy(&self, requested_version: u32) -> FolderwardResult<PolicyDocument> {
        self.check_available()?;
        let document = self.policy.read().document.clone();
        if requested_version < CONDITIONS_POLICY_VERSION && has_conditions(&document) {
            return Err(FolderwardError::invalid(format!(
                "policy has conditional bindings, request version {CONDITIONS_POLICY_VERSION}"
            )));
        }
        Ok(document)
    }

    async fn set_policy(&self, mut document: PolicyDocument) -> FolderwardResult<PolicyDocument> {
        self.set_policy_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        if document.version < CONDITIONS_POLICY_VERSION && has_conditions(&document) {
            return Err(FolderwardError::invalid(format!(
                "conditional bindings require policy version {CONDITIONS_POLICY_VERSION}"
            )));
        }

        let mut current = self.policy.write();
        if document.etag != current.document.etag {
            debug!(
                held = %document.etag,
                current = %current.document.etag,
                "rejecting stale policy write"
            );
            return Err(FolderwardError::PolicyConflict {
                etag: document.etag,
            });
        }

        current.generation += 1;
        document.etag = current.generation.to_string();
        current.document = document.clone();
        Ok(document)
    }
}
