//! Store de documents du kernel : une collection par type de document.

mod collection;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

pub use collection::Collection;

use crate::models::{Device, Profile, Project, Update, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Duplicate(String),
}

/// Document stockable : identifiant stable + nom de collection
pub trait Document: Clone + Serialize + DeserializeOwned + Send + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

pub struct Store {
    pub users: Collection<User>,
    pub projects: Collection<Project>,
    pub devices: Collection<Device>,
    pub updates: Collection<Update>,
    pub profiles: Collection<Profile>,
    update_seq: AtomicU64,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            users: Collection::in_memory(),
            projects: Collection::in_memory(),
            devices: Collection::in_memory(),
            updates: Collection::in_memory(),
            profiles: Collection::in_memory(),
            update_seq: AtomicU64::new(0),
        }
    }

    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let updates = Collection::<Update>::open(dir)?;
        // La séquence reprend après le plus grand seq déjà attribué
        let last_seq = updates.all().iter().map(|u| u.seq).max().unwrap_or(0);
        let store = Self {
            users: Collection::open(dir)?,
            projects: Collection::open(dir)?,
            devices: Collection::open(dir)?,
            updates,
            profiles: Collection::open(dir)?,
            update_seq: AtomicU64::new(last_seq),
        };
        tracing::info!("[store] opened at {:?} (update seq {})", dir, last_seq);
        Ok(store)
    }

    /// Prochain numéro de séquence d'update, strictement croissant
    pub fn next_update_seq(&self) -> u64 {
        self.update_seq.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::MacAddress;
    use tempfile::tempdir;
    use time::OffsetDateTime;

    #[test]
    fn test_update_seq_is_monotonic() {
        let store = Store::in_memory();
        assert_eq!(store.next_update_seq(), 1);
        assert_eq!(store.next_update_seq(), 2);
    }

    #[test]
    fn test_update_seq_restored_on_open() {
        let dir = tempdir().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            for _ in 0..3 {
                let seq = store.next_update_seq();
                store
                    .updates
                    .save(Update {
                        id: format!("u{seq}"),
                        seq,
                        target_mac_address: MacAddress::parse("01-23-45-67-89-ab").unwrap(),
                        data: Default::default(),
                        submitted_by: "a@x.io".into(),
                        timestamp: OffsetDateTime::now_utc(),
                        received: false,
                    })
                    .unwrap();
            }
        }
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.updates.len(), 3);
        assert_eq!(store.next_update_seq(), 4);
    }
}
