//! In-memory object store.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use pkgsync_core::Repository;

use crate::error::StoreError;
use crate::store::{ObjectStore, StoredObject};

#[derive(Debug, Clone)]
struct Entry {
    object: StoredObject,
    content_type: String,
}

/// `RwLock<BTreeMap>`-backed store keyed by `(bucket, prefix + key)`.
///
/// Intended for tests and embedding. Objects are cloned on read/write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<(String, String), Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic mid-insert cannot leave the map itself inconsistent.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<(String, String), Entry>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<(String, String), Entry>> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert an object with an explicit modification time.
    pub fn insert_at(
        &self,
        repo: &Repository,
        key: &str,
        bytes: impl Into<Vec<u8>>,
        last_modified: DateTime<Utc>,
    ) {
        let entry = Entry {
            object: StoredObject {
                bytes: bytes.into(),
                last_modified,
            },
            content_type: String::new(),
        };
        self.write().insert(object_path(repo, key), entry);
    }

    /// Returns `true` if `key` exists under `repo`.
    pub fn contains(&self, repo: &Repository, key: &str) -> bool {
        self.read().contains_key(&object_path(repo, key))
    }

    /// Content type recorded by the last `put` of `key`.
    pub fn content_type(&self, repo: &Repository, key: &str) -> Option<String> {
        self.read()
            .get(&object_path(repo, key))
            .map(|e| e.content_type.clone())
    }
}

fn object_path(repo: &Repository, key: &str) -> (String, String) {
    (repo.bucket.clone(), format!("{}{key}", repo.prefix))
}

impl ObjectStore for MemoryStore {
    fn list(&self, repo: &Repository, suffix: &str) -> Result<Vec<String>, StoreError> {
        let map = self.read();
        let keys = map
            .keys()
            .filter(|(bucket, _)| *bucket == repo.bucket)
            .filter_map(|(_, path)| path.strip_prefix(repo.prefix.as_str()))
            // Objects in nested "directories" belong to other prefixes.
            .filter(|key| !key.contains('/') && key.ends_with(suffix))
            .map(str::to_owned)
            .collect();
        Ok(keys)
    }

    fn get(&self, repo: &Repository, key: &str) -> Result<Option<StoredObject>, StoreError> {
        let map = self.read();
        Ok(map.get(&object_path(repo, key)).map(|e| e.object.clone()))
    }

    fn put(
        &self,
        repo: &Repository,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError> {
        let entry = Entry {
            object: StoredObject {
                bytes: bytes.to_vec(),
                last_modified: Utc::now(),
            },
            content_type: content_type.to_owned(),
        };
        self.write().insert(object_path(repo, key), entry);
        Ok(())
    }

    fn remove(&self, repo: &Repository, key: &str) -> Result<(), StoreError> {
        self.write().remove(&object_path(repo, key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_filters_by_bucket_prefix_and_suffix() {
        let store = MemoryStore::new();
        let stable = Repository::new("pkgs", "stable", "s3");
        let testing = Repository::new("pkgs", "testing", "s3");
        let now = Utc::now();
        store.insert_at(&stable, "b.json", "{}", now);
        store.insert_at(&stable, "a.json", "{}", now);
        store.insert_at(&stable, "a-1.0.tgz", "blob", now);
        store.insert_at(&stable, "nested/c.json", "{}", now);
        store.insert_at(&testing, "d.json", "{}", now);

        let keys = store.list(&stable, ".json").unwrap();
        assert_eq!(keys, vec!["a.json".to_string(), "b.json".to_string()]);
    }

    #[test]
    fn put_records_content_type_and_remove_is_idempotent() {
        let store = MemoryStore::new();
        let repo = Repository::new("pkgs", "", "s3");
        store.put(&repo, "x.json", b"{}", "application/json").unwrap();
        assert_eq!(
            store.content_type(&repo, "x.json").as_deref(),
            Some("application/json")
        );
        store.remove(&repo, "x.json").unwrap();
        store.remove(&repo, "x.json").unwrap();
        assert!(store.get(&repo, "x.json").unwrap().is_none());
    }

    #[test]
    fn copy_to_moves_bytes_between_stores() {
        let src = MemoryStore::new();
        let dst = MemoryStore::new();
        let from = Repository::new("upstream", "stable", "s3");
        let to = Repository::new("mirror", "pkgs", "s3");
        src.insert_at(&from, "a.tgz", "blob", Utc::now());

        src.copy_to(&from, &dst, &to, "a.tgz", "application/octet-stream")
            .unwrap();
        assert_eq!(dst.get(&to, "a.tgz").unwrap().unwrap().bytes, b"blob");

        let err = src
            .copy_to(&from, &dst, &to, "missing.tgz", "application/octet-stream")
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
