//! Aggregate index build, publish and self-check.
//!
//! The index is a JSON object mapping each package name to its full manifest
//! document. Keys are sorted and the output is pretty-printed with a trailing
//! newline, so the same manifest set always produces the same bytes.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use pkgsync_core::{PackageName, Repository, RepositorySettings};

use crate::error::SyncError;
use crate::manifest::ManifestSet;
use crate::store::{ObjectStore, JSON_CONTENT_TYPE};

/// A rendered aggregate index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    pub bytes: Vec<u8>,
    pub packages: usize,
}

impl IndexDocument {
    /// SHA-256 hex digest of the index bytes.
    pub fn digest(&self) -> String {
        digest(&self.bytes)
    }
}

/// Outcome of comparing a published index to the manifests it should describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consistency {
    Consistent,
    Mismatch {
        expected_digest: String,
        actual_digest: String,
        /// Manifests with no index entry.
        missing_from_index: Vec<PackageName>,
        /// Index entries with no manifest.
        extra_in_index: Vec<PackageName>,
        /// Present in both but with different content.
        differing: Vec<PackageName>,
    },
}

impl Consistency {
    pub fn is_consistent(&self) -> bool {
        matches!(self, Consistency::Consistent)
    }
}

/// Render the index for `manifests`.
pub fn build_index(manifests: &ManifestSet) -> Result<IndexDocument, SyncError> {
    let entries: BTreeMap<&str, &Map<String, Value>> = manifests
        .iter()
        .map(|(name, record)| (name.as_str(), &record.document))
        .collect();
    let mut bytes = serde_json::to_vec_pretty(&entries)?;
    bytes.push(b'\n');
    Ok(IndexDocument {
        bytes,
        packages: entries.len(),
    })
}

/// Write `index` to `<prefix><index_name>` in `repo`.
pub fn publish_index(
    index: &IndexDocument,
    store: &dyn ObjectStore,
    repo: &Repository,
    settings: &RepositorySettings,
) -> Result<(), SyncError> {
    store
        .put(repo, &settings.index_name, &index.bytes, JSON_CONTENT_TYPE)
        .map_err(|e| SyncError::Publish {
            repository: repo.label(),
            key: settings.index_name.clone(),
            source: e,
        })?;
    tracing::info!(
        "published {} ({} packages, sha256 {}) to {}",
        settings.index_name,
        index.packages,
        index.digest(),
        repo.label()
    );
    Ok(())
}

/// Check that `published` is exactly what [`build_index`] renders for
/// `manifests`.
///
/// `label` names the index in parse errors. A mismatch is a value, not an
/// error; an index that is not a JSON object is [`SyncError::Parse`].
pub fn check_consistency(
    label: &str,
    published: &[u8],
    manifests: &ManifestSet,
) -> Result<Consistency, SyncError> {
    let expected = build_index(manifests)?;
    if expected.bytes == published {
        return Ok(Consistency::Consistent);
    }

    let parse_err = |source| SyncError::Parse {
        repository: label.to_owned(),
        key: "aggregate index".to_owned(),
        source,
    };
    let entries: Map<String, Value> = serde_json::from_slice(published).map_err(parse_err)?;

    let mut missing_from_index = Vec::new();
    let mut differing = Vec::new();
    for (name, record) in manifests {
        match entries.get(name.as_str()) {
            None => missing_from_index.push(name.clone()),
            Some(Value::Object(entry)) if *entry == record.document => {}
            Some(_) => differing.push(name.clone()),
        }
    }
    let extra_in_index = entries
        .keys()
        .map(|k| PackageName::from(k.as_str()))
        .filter(|name| !manifests.contains_key(name))
        .collect();

    Ok(Consistency::Mismatch {
        expected_digest: expected.digest(),
        actual_digest: digest(published),
        missing_from_index,
        extra_in_index,
        differing,
    })
}

fn digest(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}
