//! Plan execution.
//!
//! ## Order of operations
//!
//! 1. Add/Update: copy the artifact (when its URL lives in the source
//!    repository), rewrite `dist.url`, write the manifest. Any failure aborts.
//! 2. Remove: delete the manifest; queue its artifact for deferred removal
//!    unless the URL is foreign or the key was just (re)published.
//! 3. Rebuild the index from the final manifest set and publish it.
//! 4. Deferred artifact removals: each failure is recorded, the batch goes on.
//!
//! Steps 1–3 are [`apply`]; step 4 is [`Published::finish`].

use std::collections::BTreeSet;

use serde::Serialize;

use pkgsync_core::{extract_key, rewrite_url, PackageName, Repository, RepositorySettings};

use crate::error::SyncError;
use crate::index::{build_index, publish_index, IndexDocument};
use crate::manifest::ManifestRecord;
use crate::plan::SyncPlan;
use crate::store::{ObjectStore, ARTIFACT_CONTENT_TYPE, JSON_CONTENT_TYPE};

/// Everything the executor needs besides the plan and the stores.
#[derive(Debug, Clone)]
pub struct ExecuteContext {
    pub source: Repository,
    pub destination: Repository,
    pub settings: RepositorySettings,
    /// Publish the rebuilt index; when `false` it is only built.
    pub publish_index: bool,
}

/// A deferred artifact removal that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalFailure {
    pub key: String,
    pub message: String,
}

/// Accumulated outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub artifacts_copied: BTreeSet<String>,
    pub manifests_written: Vec<PackageName>,
    pub manifests_removed: Vec<PackageName>,
    pub artifacts_removed: Vec<String>,
    pub removal_failures: Vec<RemovalFailure>,
    /// Recoverable conditions surfaced to the operator.
    pub warnings: Vec<String>,
    pub index_published: bool,
}

impl ExecutionReport {
    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }
}

/// State after manifests are written and the index is published; only the
/// deferred artifact removals remain.
#[derive(Debug)]
pub struct Published {
    pub destination: Repository,
    pub report: ExecutionReport,
    pub pending_removals: BTreeSet<String>,
    pub index: IndexDocument,
}

/// Execute every step of `plan`, deferred removals included.
pub fn execute(
    plan: SyncPlan,
    ctx: &ExecuteContext,
    source_store: &dyn ObjectStore,
    dest_store: &dyn ObjectStore,
) -> Result<ExecutionReport, SyncError> {
    Ok(apply(plan, ctx, source_store, dest_store)?.finish(dest_store))
}

/// Transfer manifests and artifacts, then rebuild and publish the index.
pub fn apply(
    plan: SyncPlan,
    ctx: &ExecuteContext,
    source_store: &dyn ObjectStore,
    dest_store: &dyn ObjectStore,
) -> Result<Published, SyncError> {
    let mut report = ExecutionReport::default();
    let mut manifests = plan.destination.clone();

    for name in plan.adds.iter().chain(&plan.updates) {
        let Some(record) = plan.source.get(name) else {
            report.warn(format!("{name}: planned for transfer but has no source manifest"));
            continue;
        };
        let written = transfer(record, ctx, source_store, dest_store, &mut report)?;
        manifests.insert(name.clone(), written);
        report.manifests_written.push(name.clone());
    }

    let mut pending_removals = BTreeSet::new();
    for name in &plan.removes {
        let Some(record) = plan.destination.get(name) else {
            report.warn(format!("{name}: planned for removal but has no destination manifest"));
            continue;
        };
        match extract_key(&record.dist_url, &ctx.destination, &ctx.settings.storage_domain) {
            None => report.warn(format!(
                "{name}: artifact {} is outside {}; not removed",
                record.dist_url,
                ctx.destination.label()
            )),
            Some(key) if report.artifacts_copied.contains(&key) => {
                tracing::info!("{name}: artifact {key} was just published; keeping it");
                report
                    .warnings
                    .push(format!("{name}: artifact {key} is in use by a published package; kept"));
            }
            Some(key) => {
                pending_removals.insert(key);
            }
        }

        let manifest_key = name.manifest_key(&ctx.settings.manifest_suffix);
        dest_store
            .remove(&ctx.destination, &manifest_key)
            .map_err(|e| SyncError::Transfer {
                package: name.clone(),
                key: manifest_key.clone(),
                source: e,
            })?;
        tracing::info!("removed manifest {manifest_key}");
        manifests.remove(name);
        report.manifests_removed.push(name.clone());
    }

    let index = build_index(&manifests)?;
    if ctx.publish_index {
        publish_index(&index, dest_store, &ctx.destination, &ctx.settings)?;
        report.index_published = true;
    } else {
        tracing::info!(
            "index publication skipped ({} packages, sha256 {})",
            index.packages,
            index.digest()
        );
    }

    Ok(Published {
        destination: ctx.destination.clone(),
        report,
        pending_removals,
        index,
    })
}

impl Published {
    /// Run the deferred artifact removals and return the final report.
    pub fn finish(mut self, dest_store: &dyn ObjectStore) -> ExecutionReport {
        for key in std::mem::take(&mut self.pending_removals) {
            match dest_store.remove(&self.destination, &key) {
                Ok(()) => {
                    tracing::info!("removed artifact {key}");
                    self.report.artifacts_removed.push(key);
                }
                Err(e) => {
                    tracing::error!("failed to remove artifact {key}: {e}");
                    self.report.removal_failures.push(RemovalFailure {
                        key,
                        message: e.to_string(),
                    });
                }
            }
        }
        self.report
    }
}

/// Copy one package into the destination; returns the manifest as written.
fn transfer(
    record: &ManifestRecord,
    ctx: &ExecuteContext,
    source_store: &dyn ObjectStore,
    dest_store: &dyn ObjectStore,
    report: &mut ExecutionReport,
) -> Result<ManifestRecord, SyncError> {
    let name = &record.name;
    let domain = &ctx.settings.storage_domain;

    let written = match extract_key(&record.dist_url, &ctx.source, domain) {
        Some(key) => {
            source_store
                .copy_to(&ctx.source, dest_store, &ctx.destination, &key, ARTIFACT_CONTENT_TYPE)
                .map_err(|e| SyncError::Transfer {
                    package: name.clone(),
                    key: key.clone(),
                    source: e,
                })?;
            tracing::info!("copied artifact {key}");
            let url = rewrite_url(&key, &ctx.destination, domain);
            report.artifacts_copied.insert(key);
            record.with_dist_url(&url)
        }
        None => {
            report.warn(format!(
                "{name}: artifact {} is outside {}; left untouched",
                record.dist_url,
                ctx.source.label()
            ));
            record.clone()
        }
    }
    .with_time_field();

    let manifest_key = name.manifest_key(&ctx.settings.manifest_suffix);
    let bytes = written.to_bytes()?;
    dest_store
        .put(&ctx.destination, &manifest_key, &bytes, JSON_CONTENT_TYPE)
        .map_err(|e| SyncError::Transfer {
            package: name.clone(),
            key: manifest_key.clone(),
            source: e,
        })?;
    tracing::info!("wrote manifest {manifest_key}");
    Ok(written)
}
