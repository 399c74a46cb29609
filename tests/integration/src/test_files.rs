//! Scoped file operations: uploads, listings and deletes.

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use folderward_core::files::UploadRequest;
    use folderward_core::{ErrorKind, FolderwardError};

    use crate::{Harness, test_config};

    fn request(filename: &str, size: usize) -> UploadRequest {
        UploadRequest {
            filename: filename.to_owned(),
            content_type: None,
            data: Bytes::from(vec![7u8; size]),
        }
    }

    #[tokio::test]
    async fn test_should_store_upload_with_metadata_and_public_url() {
        let h = Harness::new();
        h.service
            .register_identity("Ann", "Lee", "a@x.com")
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        let receipt = h
            .service
            .upload_file(request("cat.png", 16), "a@x.com")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(receipt.uploaded_by, "Ann Lee");
        assert!(!receipt.private);
        assert_eq!(
            receipt.url.as_deref(),
            Some("https://storage.googleapis.com/photos/a_at_x_com_folder/cat.png")
        );

        let stored = h
            .blobs
            .get("a_at_x_com_folder/cat.png")
            .unwrap_or_else(|| panic!("object missing"));
        assert_eq!(stored.data.len(), 16);
        assert_eq!(stored.metadata.content_type, "application/octet-stream");
        assert_eq!(stored.metadata.uploaded_by_email.as_deref(), Some("a@x.com"));
        assert!(stored.metadata.upload_date.is_some());
        assert!(h.blobs.is_public("a_at_x_com_folder/cat.png"));
    }

    #[tokio::test]
    async fn test_should_keep_upload_private_when_public_access_blocked() {
        let h = Harness::new();
        h.register("a@x.com").await;
        h.blobs.set_block_public_access(true);

        let receipt = h.upload("a@x.com", "cat.png").await;
        assert!(receipt.private);
        assert_eq!(receipt.url, None);
        assert!(h.blobs.get("a_at_x_com_folder/cat.png").is_some());
        assert!(!h.blobs.is_public("a_at_x_com_folder/cat.png"));
    }

    #[tokio::test]
    async fn test_should_reject_bad_uploads() {
        let mut config = test_config(false);
        config.max_upload_size = 8;
        let h = Harness::with_config(config);
        h.register("a@x.com").await;

        for (filename, size) in [(".keep", 1), ("", 1), ("sub/cat.png", 1), ("big.bin", 9)] {
            let err = h
                .service
                .upload_file(request(filename, size), "a@x.com")
                .await
                .err();
            assert_eq!(
                err.map(|e| e.kind()),
                Some(ErrorKind::InvalidArgument),
                "accepted {filename:?} ({size} bytes)"
            );
        }
        assert_eq!(h.blobs.write_count(), 0, "rejected uploads write nothing");

        h.service
            .upload_file(request("ok.bin", 8), "a@x.com")
            .await
            .unwrap_or_else(|e| panic!("upload at the limit failed: {e}"));
    }

    #[tokio::test]
    async fn test_should_reject_upload_from_unknown_identity() {
        let h = Harness::new();
        let err = h
            .service
            .upload_file(request("cat.png", 1), "ghost@x.com")
            .await
            .err();
        assert!(matches!(err, Some(FolderwardError::IdentityNotFound { .. })));
        assert_eq!(h.blobs.write_count(), 0);
    }

    #[tokio::test]
    async fn test_should_list_nothing_for_identity_without_folder() {
        let h = Harness::new();
        h.register("a@x.com").await;
        h.register("b@x.com").await;
        h.upload("b@x.com", "dog.png").await;

        assert!(h.paths_for("a@x.com").await.is_empty());
        assert!(h.paths_for("ghost@x.com").await.is_empty());
    }

    #[tokio::test]
    async fn test_should_list_all_files_without_markers() {
        let h = Harness::new();
        h.register("a@x.com").await;
        h.register("b@x.com").await;
        h.upload("a@x.com", "cat.png").await;
        h.upload("b@x.com", "dog.png").await;
        h.upload("b@x.com", "fish.png").await;

        let all: Vec<_> = h
            .service
            .list_all()
            .await
            .unwrap_or_else(|e| panic!("{e}"))
            .into_iter()
            .map(|o| o.path)
            .collect();
        assert_eq!(
            all,
            [
                "a_at_x_com_folder/cat.png",
                "b_at_x_com_folder/dog.png",
                "b_at_x_com_folder/fish.png",
            ]
        );
        assert_eq!(
            h.paths_for("b@x.com").await,
            ["b_at_x_com_folder/dog.png", "b_at_x_com_folder/fish.png"]
        );
    }

    #[tokio::test]
    async fn test_should_find_named_file_in_own_folder_only() {
        let h = Harness::new();
        h.register("a@x.com").await;
        h.register("b@x.com").await;
        h.upload("a@x.com", "cat.png").await;
        h.upload("a@x.com", "cat.png.bak").await;
        h.upload("b@x.com", "cat.png").await;

        let named = h
            .service
            .get_named("cat.png", "a@x.com")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].path, "a_at_x_com_folder/cat.png");
        assert_eq!(named[0].content_type, "image/png");

        let missing = h
            .service
            .get_named("dog.png", "a@x.com")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_should_let_admin_delete_across_folders() {
        let h = Harness::new();
        h.register("a@x.com").await;
        h.register("admin@acme.io").await;
        h.upload("a@x.com", "cat.png").await;
        h.upload("admin@acme.io", "memo.txt").await;

        let deleted = h
            .service
            .delete_file("a_at_x_com_folder/cat.png", "Admin@Acme.io")
            .await
            .unwrap_or_else(|e| panic!("admin delete failed: {e}"));
        assert_eq!(deleted.deleted_path, "a_at_x_com_folder/cat.png");
        assert!(h.blobs.get("a_at_x_com_folder/cat.png").is_none());
    }

    #[tokio::test]
    async fn test_should_report_missing_file_in_own_folder() {
        let h = Harness::new();
        h.register("a@x.com").await;
        h.upload("a@x.com", "cat.png").await;

        let err = h
            .service
            .delete_file("a_at_x_com_folder/dog.png", "a@x.com")
            .await
            .err();
        assert!(matches!(err, Some(FolderwardError::ObjectNotFound { .. })));

        let err = h.service.delete_file("  ", "a@x.com").await.err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::InvalidArgument));
    }

    #[tokio::test]
    async fn test_should_not_let_owner_delete_folder_marker_of_others() {
        let h = Harness::new();
        h.register("a@x.com").await;
        h.register("b@x.com").await;
        h.upload("a@x.com", "cat.png").await;
        h.upload("b@x.com", "dog.png").await;

        let err = h
            .service
            .delete_file("a_at_x_com_folder/.keep", "b@x.com")
            .await
            .err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::PermissionDenied));
        assert!(h.blobs.get("a_at_x_com_folder/.keep").is_some());
    }
}
