//! Filesystem-backed object store.
//!
//! ## Layout
//!
//! ```text
//! <root>/<bucket>/<prefix><key>
//! ```
//!
//! ## `put`: atomic write
//!
//! 1. Ensure the parent directory exists.
//! 2. Write to `<path>.pkgsync.tmp`.
//! 3. Rename to the final path (atomic on POSIX).
//! 4. On rename failure remove the `.tmp` and report the error.
//!
//! Content types are not persisted; the filesystem has nowhere to keep them.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use pkgsync_core::{is_plain_key, Repository};

use crate::error::{io_err, StoreError};
use crate::store::{ObjectStore, StoredObject};

/// Object store rooted at a local directory (a mounted bucket, a test tree).
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<bucket>/<prefix>`: pure, no I/O.
    pub fn repository_dir(&self, repo: &Repository) -> PathBuf {
        let mut dir = self.root.join(&repo.bucket);
        for segment in repo.prefix.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir
    }

    /// `<root>/<bucket>/<prefix><key>`: pure, no I/O.
    ///
    /// Keys with an empty, `.` or `..` segment are refused so no object can
    /// resolve outside the repository directory.
    pub fn object_path(&self, repo: &Repository, key: &str) -> Result<PathBuf, StoreError> {
        if !is_plain_key(key) {
            return Err(StoreError::Backend(format!(
                "refusing object key '{key}' in {}",
                repo.label()
            )));
        }
        let mut path = self.repository_dir(repo);
        path.extend(key.split('/'));
        Ok(path)
    }
}

impl ObjectStore for FsStore {
    fn list(&self, repo: &Repository, suffix: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.repository_dir(repo);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(io_err(dir, err)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(suffix) && !name.ends_with(".pkgsync.tmp") {
                keys.push(name);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn get(&self, repo: &Repository, key: &str) -> Result<Option<StoredObject>, StoreError> {
        let path = self.object_path(repo, key)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(path, err)),
        };
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|e| io_err(&path, e))?;
        Ok(Some(StoredObject {
            bytes,
            last_modified: DateTime::<Utc>::from(modified),
        }))
    }

    fn put(
        &self,
        repo: &Repository,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), StoreError> {
        let path = self.object_path(repo, key)?;
        let tmp = PathBuf::from(format!("{}.pkgsync.tmp", path.display()));
        atomic_write(&path, &tmp, bytes)
    }

    fn remove(&self, repo: &Repository, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(repo, key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(path, err)),
        }
    }
}

fn atomic_write(path: &Path, tmp: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, bytes).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    tracing::debug!("wrote: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};

    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    fn repo() -> Repository {
        Repository::new("pkgs", "stable", "s3")
    }

    #[test]
    fn put_then_get_round_trips_bytes() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        store.put(&repo(), "a.json", b"{}", "application/json").unwrap();

        let object = store.get(&repo(), "a.json").unwrap().expect("object");
        assert_eq!(object.bytes, b"{}");
        assert!(tmp.path().join("pkgs").join("stable").join("a.json").exists());
    }

    #[test]
    fn get_missing_returns_none() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        assert!(store.get(&repo(), "nope.json").unwrap().is_none());
    }

    #[test]
    fn last_modified_comes_from_file_mtime() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        store.put(&repo(), "a.json", b"{}", "application/json").unwrap();

        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let path = store.object_path(&repo(), "a.json").unwrap();
        set_file_mtime(path, FileTime::from_system_time(old)).unwrap();

        let object = store.get(&repo(), "a.json").unwrap().unwrap();
        assert_eq!(object.last_modified.timestamp(), 1_600_000_000);
    }

    #[test]
    fn list_on_missing_repository_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        assert!(store.list(&repo(), ".json").unwrap().is_empty());
    }

    #[test]
    fn list_is_sorted_and_skips_directories_and_tmp_files() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        store.put(&repo(), "b.json", b"{}", "").unwrap();
        store.put(&repo(), "a.json", b"{}", "").unwrap();
        store.put(&repo(), "a-1.0.tgz", b"blob", "").unwrap();
        store.put(&repo(), "nested/c.json", b"{}", "").unwrap();
        let dir = store.repository_dir(&repo());
        fs::write(dir.join("z.json.pkgsync.tmp"), b"partial").unwrap();

        let keys = store.list(&repo(), ".json").unwrap();
        assert_eq!(keys, vec!["a.json".to_string(), "b.json".to_string()]);
    }

    #[test]
    fn tmp_file_removed_after_put() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        store.put(&repo(), "clean.json", b"{}", "").unwrap();
        let path = store.object_path(&repo(), "clean.json").unwrap();
        let tmp_path = PathBuf::from(format!("{}.pkgsync.tmp", path.display()));
        assert!(!tmp_path.exists(), ".pkgsync.tmp must be cleaned up");
    }

    #[test]
    fn keys_escaping_the_repository_are_refused() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path().join("store"));
        let victim = tmp.path().join("victim.txt");
        fs::write(&victim, "keep").unwrap();

        for key in ["../../../victim.txt", "a/../../b", "./a.tgz", "a//b", ""] {
            assert!(
                matches!(store.object_path(&repo(), key), Err(StoreError::Backend(_))),
                "{key:?} should be refused"
            );
        }
        assert!(store.get(&repo(), "../../../victim.txt").is_err());
        assert!(store.put(&repo(), "../../../victim.txt", b"x", "").is_err());
        assert!(store.remove(&repo(), "../../../victim.txt").is_err());
        assert_eq!(fs::read_to_string(&victim).unwrap(), "keep");
    }

    #[test]
    fn unreadable_listing_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        let dir = store.repository_dir(&repo());
        fs::create_dir_all(dir.parent().unwrap()).unwrap();
        fs::write(&dir, "not a directory").unwrap();

        let err = store.list(&repo(), ".json").unwrap_err();
        assert!(matches!(err, StoreError::Io { ref path, .. } if *path == dir));
    }

    #[test]
    fn remove_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        store.put(&repo(), "a.tgz", b"blob", "").unwrap();
        store.remove(&repo(), "a.tgz").unwrap();
        store.remove(&repo(), "a.tgz").unwrap();
        assert!(store.get(&repo(), "a.tgz").unwrap().is_none());
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();
        let path = readonly_dir.join("a.json");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let tmp_dir = TempDir::new().unwrap();
        let tmp_path = tmp_dir.path().join("a.json.pkgsync.tmp");
        let result = atomic_write(&path, &tmp_path, b"new content");

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Running as root bypasses directory permissions; only assert when the
        // rename was actually refused.
        if result.is_err() {
            assert_eq!(fs::read_to_string(&path).unwrap(), "original");
            assert!(!tmp_path.exists(), ".pkgsync.tmp should be cleaned up");
        }
    }
}
