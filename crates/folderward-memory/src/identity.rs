//! In-memory identity store.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use folderward_core::backend::IdentityStore;
use folderward_core::error::{FolderwardError, FolderwardResult};
use folderward_core::identity::{Email, FolderName, Identity, IdentityUpdate};

/// Identity records keyed by email, with a folder-owner index that keeps
/// folder assignments unique.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    identities: DashMap<Email, Identity>,
    folder_owners: DashMap<FolderName, Email>,
}

impl InMemoryIdentityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `folder` for `email`.
    fn claim_folder(&self, folder: &FolderName, email: &Email) -> FolderwardResult<()> {
        match self.folder_owners.entry(folder.clone()) {
            Entry::Occupied(e) if e.get() != email => Err(FolderwardError::FolderTaken {
                folder: folder.to_string(),
                owner: e.get().to_string(),
            }),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(e) => {
                e.insert(email.clone());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_email(&self, email: &Email) -> FolderwardResult<Option<Identity>> {
        Ok(self.identities.get(email).map(|r| r.value().clone()))
    }

    async fn create(&self, identity: Identity) -> FolderwardResult<Identity> {
        match self.identities.entry(identity.email.clone()) {
            Entry::Occupied(e) => Err(FolderwardError::IdentityAlreadyExists {
                email: e.key().to_string(),
            }),
            Entry::Vacant(e) => {
                if let Some(folder) = &identity.storage_folder {
                    self.claim_folder(folder, &identity.email)?;
                }
                debug!(email = %identity.email, "stored identity");
                e.insert(identity.clone());
                Ok(identity)
            }
        }
    }

    async fn update_fields(
        &self,
        email: &Email,
        update: IdentityUpdate,
    ) -> FolderwardResult<Identity> {
        let mut entry =
            self.identities
                .get_mut(email)
                .ok_or_else(|| FolderwardError::IdentityNotFound {
                    email: email.to_string(),
                })?;

        if let Some(folder) = &update.storage_folder {
            match &entry.storage_folder {
                Some(current) if current != folder => {
                    return Err(FolderwardError::invalid(format!(
                        "{email} is already assigned folder {current}"
                    )));
                }
                Some(_) => {}
                None => self.claim_folder(folder, email)?,
            }
        }

        entry.apply(&update);
        Ok(entry.clone())
    }

    async fn count_all(&self) -> FolderwardResult<usize> {
        Ok(self.identities.len())
    }

    async fn list_all(&self) -> FolderwardResult<Vec<Identity>> {
        let mut identities: Vec<Identity> =
            self.identities.iter().map(|r| r.value().clone()).collect();
        identities.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(identities)
    }
}
