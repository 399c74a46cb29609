//! Role setup and policy binding against a shared policy document.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use folderward_core::backend::PolicyService;
    use folderward_core::binder::Grant;
    use folderward_core::error::FolderwardResult;
    use folderward_core::policy::PolicyDocument;
    use folderward_core::roles::{Role, RoleDefinition};
    use folderward_core::{ErrorKind, Folderward};
    use folderward_memory::{InMemoryBlobStore, InMemoryIdentityStore, InMemoryPolicyService};

    use crate::{Harness, test_config};

    const OWNER_ROLE: &str = "projects/acme/roles/storageFolderOwner";
    const VIEWER_ROLE: &str = "projects/acme/roles/storageFolderViewer";
    const ADMIN_ROLE: &str = "projects/acme/roles/storageAdmin";

    /// Policy service that lets another writer slip in between every read
    /// and write, for a limited number of writes.
    #[derive(Debug)]
    struct ForeignWritePolicy {
        inner: Arc<InMemoryPolicyService>,
        remaining: AtomicUsize,
        injected: AtomicUsize,
    }

    impl ForeignWritePolicy {
        fn new(inner: Arc<InMemoryPolicyService>, injections: usize) -> Self {
            Self {
                inner,
                remaining: AtomicUsize::new(injections),
                injected: AtomicUsize::new(0),
            }
        }

        async fn write_foreign_binding(&self) -> FolderwardResult<()> {
            let n = self.injected.fetch_add(1, Ordering::SeqCst);
            let mut document = self.inner.get_policy(3).await?;
            document.version = 3;
            document.upsert_unconditional(VIEWER_ROLE, &format!("user:other{n}@x.com"));
            self.inner.set_policy(document).await?;
            Ok(())
        }
    }

    #[async_trait]
    impl PolicyService for ForeignWritePolicy {
        async fn get_role(&self, name: &str) -> FolderwardResult<Role> {
            self.inner.get_role(name).await
        }

        async fn create_role(&self, name: &str, definition: &RoleDefinition) -> FolderwardResult<Role> {
            self.inner.create_role(name, definition).await
        }

        async fn get_policy(&self, requested_version: u32) -> FolderwardResult<PolicyDocument> {
            self.inner.get_policy(requested_version).await
        }

        async fn set_policy(&self, document: PolicyDocument) -> FolderwardResult<PolicyDocument> {
            let inject = self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if inject {
                self.write_foreign_binding().await?;
            }
            self.inner.set_policy(document).await
        }
    }

    fn service_over(policy: Arc<ForeignWritePolicy>, attempts: u32) -> Folderward {
        let mut config = test_config(true);
        config.policy_write_attempts = attempts;
        Folderward::new(
            config,
            Arc::new(InMemoryIdentityStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            policy,
        )
    }

    #[tokio::test]
    async fn test_should_create_roles_once() {
        let h = Harness::enforcing();

        let first = h
            .service
            .roles()
            .ensure_roles()
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(first.created, [ADMIN_ROLE, OWNER_ROLE, VIEWER_ROLE]);
        assert!(first.existing.is_empty());
        assert_eq!(h.policy.create_role_calls(), 3);

        let second = h
            .service
            .roles()
            .ensure_roles()
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(second.created.is_empty());
        assert_eq!(second.existing.len(), 3);
        assert_eq!(h.policy.create_role_calls(), 3, "no create on second run");

        let viewer = h
            .policy
            .get_role(VIEWER_ROLE)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(viewer.stage, "GA");
    }

    #[tokio::test]
    async fn test_should_initialize_roles_and_admin_binding_once() {
        let h = Harness::enforcing();

        let report = h
            .service
            .initialize()
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let binding = report
            .admin_binding
            .unwrap_or_else(|| panic!("admin binding should run under enforcement"));
        assert!(binding.written);
        assert_eq!(binding.added, [Grant::Admin]);
        assert!(
            h.policy
                .snapshot()
                .grants_unconditionally(ADMIN_ROLE, "user:admin@acme.io")
        );

        let report = h
            .service
            .initialize()
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(report.admin_binding.map(|b| b.written), Some(false));
        assert_eq!(h.policy.set_policy_calls(), 1);
    }

    #[tokio::test]
    async fn test_should_write_owner_condition_scoped_to_folder() {
        let h = Harness::enforcing();
        h.register("a@x.com").await;
        h.service
            .provision_folder("a@x.com")
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        let policy = h.policy.snapshot();
        assert_eq!(policy.version, 3);
        let owner: Vec<_> = policy.bindings_for_role(OWNER_ROLE).collect();
        assert_eq!(owner.len(), 1);
        assert!(owner[0].members.contains("user:a@x.com"));
        let condition = owner[0]
            .condition
            .as_ref()
            .unwrap_or_else(|| panic!("owner grant must be conditional"));
        assert_eq!(condition.title, "FolderOwner_a_at_x_com_folder");
        assert_eq!(
            condition.expression,
            "resource.name.startsWith(\"projects/_/buckets/photos/objects/a_at_x_com_folder/\")"
        );
        assert!(policy.grants_unconditionally(VIEWER_ROLE, "user:a@x.com"));
    }

    #[tokio::test]
    async fn test_should_skip_write_when_grants_exist() {
        let h = Harness::enforcing();
        h.register("a@x.com").await;
        let folder = h
            .service
            .provision_folder("a@x.com")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let email = folderward_core::Email::parse("a@x.com").unwrap_or_else(|e| panic!("{e}"));

        let outcome = h
            .service
            .binder()
            .bind_folder_policy(&email, &folder)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(!outcome.written);
        assert!(outcome.added.is_empty());
        assert_eq!(h.policy.set_policy_calls(), 1);
    }

    #[tokio::test]
    async fn test_should_retry_and_keep_concurrent_binding() {
        let inner = Arc::new(InMemoryPolicyService::new());
        let policy = Arc::new(ForeignWritePolicy::new(inner.clone(), 1));
        let service = service_over(policy, 3);
        service
            .register_identity("Ann", "Lee", "a@x.com")
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        let folder = service
            .provision_folder("a@x.com")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(folder.as_str(), "a_at_x_com_folder");

        let document = inner.snapshot();
        assert!(document.grants_unconditionally(VIEWER_ROLE, "user:other0@x.com"));
        assert!(document.has_condition_title("FolderOwner_a_at_x_com_folder"));
        assert!(document.grants_unconditionally(VIEWER_ROLE, "user:a@x.com"));
    }

    #[tokio::test]
    async fn test_should_report_attempts_after_conflict() {
        let inner = Arc::new(InMemoryPolicyService::new());
        let policy = Arc::new(ForeignWritePolicy::new(inner.clone(), 1));
        let service = service_over(policy, 3);

        let outcome = service
            .binder()
            .ensure_admin_binding()
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(outcome.written);
        assert_eq!(outcome.attempts, 2);
        assert!(
            inner
                .snapshot()
                .grants_unconditionally(ADMIN_ROLE, "user:admin@acme.io")
        );
    }

    #[tokio::test]
    async fn test_should_surface_conflict_after_exhausting_attempts() {
        let inner = Arc::new(InMemoryPolicyService::new());
        let policy = Arc::new(ForeignWritePolicy::new(inner.clone(), usize::MAX));
        let service = service_over(policy, 3);
        service
            .register_identity("Ann", "Lee", "a@x.com")
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        let err = service
            .provision_folder("a@x.com")
            .await
            .err()
            .unwrap_or_else(|| panic!("every write loses, provisioning must fail"));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!inner.snapshot().has_condition_title("FolderOwner_a_at_x_com_folder"));

        // Three attempts, each preceded by one foreign write.
        assert_eq!(inner.set_policy_calls(), 6);
    }
}
