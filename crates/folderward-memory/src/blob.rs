//! In-memory blob store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use folderward_core::backend::{BlobStore, ObjectMetadata, ObjectSummary};
use folderward_core::error::{FolderwardError, FolderwardResult};

/// A stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object contents.
    pub data: Bytes,
    /// Upload metadata.
    pub metadata: ObjectMetadata,
}

/// A single bucket held in a sorted map.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    public: RwLock<BTreeSet<String>>,
    writes: AtomicUsize,
    block_public_access: AtomicBool,
    unavailable: AtomicBool,
}

impl InMemoryBlobStore {
    /// Create an empty bucket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `write_object` calls that succeeded.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make `make_public` fail, as a bucket with public access prevention
    /// would.
    pub fn set_block_public_access(&self, blocked: bool) {
        self.block_public_access.store(blocked, Ordering::SeqCst);
    }

    /// Make every call fail with an upstream error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// A copy of the object at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.read().get(path).cloned()
    }

    /// Whether `path` has been made public.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public.read().contains(path)
    }

    fn check_available(&self) -> FolderwardResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(FolderwardError::upstream("blob store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn write_object(
        &self,
        path: &str,
        data: Bytes,
        metadata: ObjectMetadata,
    ) -> FolderwardResult<()> {
        self.check_available()?;
        debug!(path, size = data.len(), "writing object");
        self.objects
            .write()
            .insert(path.to_owned(), StoredObject { data, metadata });
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn object_exists(&self, path: &str) -> FolderwardResult<bool> {
        self.check_available()?;
        Ok(self.objects.read().contains_key(path))
    }

    async fn delete_object(&self, path: &str) -> FolderwardResult<()> {
        self.check_available()?;
        if self.objects.write().remove(path).is_none() {
            return Err(FolderwardError::ObjectNotFound {
                path: path.to_owned(),
            });
        }
        self.public.write().remove(path);
        Ok(())
    }

    async fn list_objects(&self, prefix: Option<&str>) -> FolderwardResult<Vec<ObjectSummary>> {
        self.check_available()?;
        let prefix = prefix.unwrap_or_default();
        let objects = self.objects.read();
        Ok(objects
            .range(prefix.to_owned()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, object)| ObjectSummary {
                path: path.clone(),
                size: object.data.len() as u64,
                content_type: object.metadata.content_type.clone(),
            })
            .collect())
    }

    async fn make_public(&self, path: &str) -> FolderwardResult<()> {
        self.check_available()?;
        if self.block_public_access.load(Ordering::SeqCst) {
            return Err(FolderwardError::upstream(format!(
                "public access prevention is enforced on the bucket, cannot publish {path}"
            )));
        }
        if !self.objects.read().contains_key(path) {
            return Err(FolderwardError::ObjectNotFound {
                path: path.to_owned(),
            });
        }
        self.public.write().insert(path.to_owned());
        Ok(())
    }
}
