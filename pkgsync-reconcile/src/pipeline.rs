//! Typed stages of a reconciliation run.
//!
//! ```text
//! Fetched ──consistency()──▶ Consistency      (non-fatal self-check)
//!    │
//!  plan()
//!    ▼
//! Planned ──without_removals()──▶ Planned
//!    │
//!  apply()   manifests written/removed, index published
//!    ▼
//! Published ──finish()──▶ ExecutionReport    (deferred artifact removals)
//! ```
//!
//! Each stage is consumed by the next, so index publication can never run
//! before every manifest write, nor artifact cleanup before the index.

use pkgsync_core::{PackageName, Repository, RepositorySettings};

use crate::error::{StoreError, SyncError};
use crate::execute::{self, ExecuteContext, Published};
use crate::index::{check_consistency, Consistency};
use crate::manifest::{parse_manifest, ManifestSet};
use crate::plan::{plan, SyncPlan};
use crate::store::ObjectStore;

/// One repository as read at the start of a run.
#[derive(Debug, Clone)]
pub struct RepositorySnapshot {
    pub repository: Repository,
    pub manifests: ManifestSet,
    /// Raw aggregate index bytes, if the repository has one.
    pub index: Option<Vec<u8>>,
}

/// Read every manifest (and the index) of `repo`.
///
/// Any listing/read failure is [`SyncError::Fetch`]; any manifest that does
/// not parse aborts the fetch.
pub fn fetch(
    store: &dyn ObjectStore,
    repo: &Repository,
    settings: &RepositorySettings,
) -> Result<RepositorySnapshot, SyncError> {
    let fetch_err = |key: &str, source: StoreError| SyncError::Fetch {
        repository: repo.label(),
        key: key.to_owned(),
        source,
    };

    let keys = store
        .list(repo, &settings.manifest_suffix)
        .map_err(|e| fetch_err("<listing>", e))?;

    let mut manifests = ManifestSet::new();
    for key in keys {
        if key == settings.index_name {
            continue;
        }
        let Some(name) = PackageName::from_manifest_key(&key, &settings.manifest_suffix) else {
            continue;
        };
        let object = store
            .get(repo, &key)
            .map_err(|e| fetch_err(key.as_str(), e))?
            .ok_or_else(|| {
                fetch_err(key.as_str(), StoreError::Backend("listed manifest is missing".into()))
            })?;
        tracing::debug!("fetched {}{key}", repo.label());
        let record = parse_manifest(&repo.label(), &key, name, &object.bytes, object.last_modified)?;
        manifests.insert(record.name.clone(), record);
    }

    let index = store
        .get(repo, &settings.index_name)
        .map_err(|e| fetch_err(settings.index_name.as_str(), e))?
        .map(|o| o.bytes);

    tracing::info!("fetched {} manifests from {}", manifests.len(), repo.label());
    Ok(RepositorySnapshot {
        repository: repo.clone(),
        manifests,
        index,
    })
}

/// Both repositories fetched; nothing planned yet.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub source: RepositorySnapshot,
    pub destination: RepositorySnapshot,
    pub settings: RepositorySettings,
}

impl Fetched {
    pub fn fetch(
        source_store: &dyn ObjectStore,
        source: &Repository,
        dest_store: &dyn ObjectStore,
        destination: &Repository,
        settings: &RepositorySettings,
    ) -> Result<Self, SyncError> {
        Ok(Self {
            source: fetch(source_store, source, settings)?,
            destination: fetch(dest_store, destination, settings)?,
            settings: settings.clone(),
        })
    }

    /// Verify the source index describes exactly the source manifests.
    ///
    /// A source without an index is [`SyncError::MissingIndex`].
    pub fn consistency(&self) -> Result<Consistency, SyncError> {
        let repo = &self.source.repository;
        let Some(index) = self.source.index.as_deref() else {
            return Err(SyncError::MissingIndex {
                repository: repo.label(),
                index_name: self.settings.index_name.clone(),
            });
        };
        let result = check_consistency(&repo.label(), index, &self.source.manifests)?;
        if let Consistency::Mismatch {
            expected_digest,
            actual_digest,
            ..
        } = &result
        {
            tracing::warn!(
                "{} {} does not match its manifests (expected sha256 {expected_digest}, found {actual_digest})",
                repo.label(),
                self.settings.index_name
            );
        }
        Ok(result)
    }

    pub fn plan(self) -> Planned {
        Planned {
            source: self.source.repository,
            destination: self.destination.repository,
            settings: self.settings,
            plan: plan(self.source.manifests, self.destination.manifests),
        }
    }
}

/// A computed plan bound to its two repositories.
#[derive(Debug, Clone)]
pub struct Planned {
    pub source: Repository,
    pub destination: Repository,
    pub settings: RepositorySettings,
    pub plan: SyncPlan,
}

impl Planned {
    /// Exclude every `Remove` from execution.
    pub fn without_removals(mut self) -> Self {
        self.plan = self.plan.without_removals();
        self
    }

    /// Execute manifest transfers and publish the index.
    pub fn apply(
        self,
        source_store: &dyn ObjectStore,
        dest_store: &dyn ObjectStore,
        publish_index: bool,
    ) -> Result<Published, SyncError> {
        let ctx = ExecuteContext {
            source: self.source,
            destination: self.destination,
            settings: self.settings,
            publish_index,
        };
        execute::apply(self.plan, &ctx, source_store, dest_store)
    }
}
