//! End-to-end folder ownership scenarios.

#[cfg(test)]
mod tests {
    use folderward_core::{ErrorKind, FolderwardError, ProvisioningStatus};

    use crate::Harness;

    #[tokio::test]
    async fn test_should_scope_files_to_owner_folder() {
        let h = Harness::new();
        h.register("a@x.com").await;
        h.register("b@x.com").await;

        let receipt = h.upload("a@x.com", "cat.png").await;
        assert_eq!(receipt.folder, "a_at_x_com_folder");
        assert_eq!(receipt.path, "a_at_x_com_folder/cat.png");

        assert_eq!(h.paths_for("a@x.com").await, ["a_at_x_com_folder/cat.png"]);

        // b has no folder yet; provision one so the boundary check applies.
        h.upload("b@x.com", "dog.png").await;
        let err = h
            .service
            .delete_file("a_at_x_com_folder/cat.png", "b@x.com")
            .await
            .err();
        match err {
            Some(FolderwardError::PermissionDenied { folder, .. }) => {
                assert_eq!(folder, "b_at_x_com_folder");
            }
            other => panic!("expected PermissionDenied, got {other:?}"),
        }
        assert!(
            h.blobs.get("a_at_x_com_folder/cat.png").is_some(),
            "denied delete must not touch the object"
        );

        let deleted = h
            .service
            .delete_file("a_at_x_com_folder/cat.png", "a@x.com")
            .await
            .unwrap_or_else(|e| panic!("owner delete failed: {e}"));
        assert_eq!(deleted.deleted_path, "a_at_x_com_folder/cat.png");

        assert!(h.paths_for("a@x.com").await.is_empty());
    }

    #[tokio::test]
    async fn test_should_move_through_lifecycle_states() {
        let h = Harness::enforcing();
        h.register("a@x.com").await;

        let status = |h: &Harness| {
            let h = h.clone();
            async move {
                h.service
                    .list_identities()
                    .await
                    .unwrap_or_else(|e| panic!("{e}"))
                    .into_iter()
                    .find(|i| i.email == "a@x.com")
                    .map(|i| i.status)
            }
        };

        assert_eq!(status(&h).await, Some(ProvisioningStatus::Registered));
        h.upload("a@x.com", "cat.png").await;
        assert_eq!(status(&h).await, Some(ProvisioningStatus::PolicyApplied));
    }

    #[tokio::test]
    async fn test_should_stop_at_folder_created_without_enforcement() {
        let h = Harness::new();
        h.register("a@x.com").await;
        h.upload("a@x.com", "cat.png").await;

        let identities = h
            .service
            .list_identities()
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(identities[0].status, ProvisioningStatus::FolderCreated);
        assert!(!identities[0].policy_applied);
        assert_eq!(h.policy.set_policy_calls(), 0);
    }

    #[tokio::test]
    async fn test_should_register_and_reject_duplicates() {
        let h = Harness::new();
        let summary = h
            .service
            .register_identity(" Ann ", "Lee", " Ann@X.com ")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(summary.email, "ann@x.com");
        assert_eq!(summary.full_name, "Ann Lee");
        assert_eq!(summary.status, ProvisioningStatus::Registered);

        let err = h
            .service
            .register_identity("Other", "Person", "ann@x.com")
            .await
            .err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::AlreadyExists));
    }

    #[tokio::test]
    async fn test_should_validate_registration_input() {
        let h = Harness::new();
        for (first, last, email) in [
            ("", "Lee", "a@x.com"),
            ("Ann", "  ", "a@x.com"),
            ("Ann", "Lee", ""),
            ("Ann", "Lee", "not-an-email"),
            ("Ann", "Lee", "a@@x.com"),
        ] {
            let err = h.service.register_identity(first, last, email).await.err();
            assert_eq!(
                err.map(|e| e.kind()),
                Some(ErrorKind::InvalidArgument),
                "accepted {first:?} {last:?} {email:?}"
            );
        }
        assert_eq!(h.service.list_identities().await.map(|v| v.len()).ok(), Some(0));
    }
}
