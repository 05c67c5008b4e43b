//! Object storage access.
//!
//! Every repository is a bucket + prefix. Backends only move bytes; they never
//! interpret manifests or indexes.

use chrono::{DateTime, Utc};

use pkgsync_core::Repository;

use crate::error::StoreError;

/// Content type written for manifests and the aggregate index.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type written for copied artifacts.
pub const ARTIFACT_CONTENT_TYPE: &str = "application/octet-stream";

/// An object as returned by [`ObjectStore::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub last_modified: DateTime<Utc>,
}

/// Bucket + prefix keyed blob store.
///
/// Keys are relative to the repository prefix. All failures are propagated;
/// a missing object on `get` is `Ok(None)`, not an error.
pub trait ObjectStore: Send + Sync {
    /// Keys under the repository prefix ending in `suffix`, sorted.
    fn list(&self, repo: &Repository, suffix: &str) -> Result<Vec<String>, StoreError>;

    /// Read an object. Returns `Ok(None)` if it does not exist.
    fn get(&self, repo: &Repository, key: &str) -> Result<Option<StoredObject>, StoreError>;

    /// Create or replace an object.
    fn put(
        &self,
        repo: &Repository,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// Delete an object. Deleting a missing object succeeds.
    fn remove(&self, repo: &Repository, key: &str) -> Result<(), StoreError>;

    /// Copy `key` from `self`/`from` into `to` on `dest`, keeping the key.
    ///
    /// Default implementation is a get followed by a put.
    fn copy_to(
        &self,
        from: &Repository,
        dest: &dyn ObjectStore,
        to: &Repository,
        key: &str,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let object = self.get(from, key)?.ok_or_else(|| {
            StoreError::Backend(format!("object {key} not found in {}", from.label()))
        })?;
        dest.put(to, key, &object.bytes, content_type)
    }
}
