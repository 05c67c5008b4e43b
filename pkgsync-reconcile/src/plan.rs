//! Reconciliation planning.
//!
//! Algorithm:
//! 1. Partition package names into source-only, destination-only and common.
//! 2. Source-only → `Add`; destination-only → `Remove`.
//! 3. Common names are classified by [`classify`].
//!
//! `Ignore` actions are reported, never executed. Every list in a
//! [`SyncPlan`] is sorted by package name, so planning the same two sets twice
//! yields the same plan.

use std::fmt;

use pkgsync_core::PackageName;

use crate::compare::{classify, compare, Verdict};
use crate::manifest::{ManifestSet, TimeSource};

/// Why a common package is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    ContentsMatchDestinationNewer,
    ContentsDifferSameTime,
    ContentsDifferDestinationNewer,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::ContentsMatchDestinationNewer => {
                write!(f, "contents match, destination newer")
            }
            IgnoreReason::ContentsDifferSameTime => {
                write!(f, "contents differ, time fields identical")
            }
            IgnoreReason::ContentsDifferDestinationNewer => {
                write!(f, "contents differ, destination newer")
            }
        }
    }
}

/// Planned outcome for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Add(PackageName),
    Remove(PackageName),
    Update(PackageName),
    UpToDate(PackageName),
    Ignore {
        name: PackageName,
        reason: IgnoreReason,
    },
}

impl Action {
    pub fn name(&self) -> &PackageName {
        match self {
            Action::Add(name)
            | Action::Remove(name)
            | Action::Update(name)
            | Action::UpToDate(name)
            | Action::Ignore { name, .. } => name,
        }
    }

    /// Short lowercase label: `add`, `update`, …
    pub fn label(&self) -> &'static str {
        match self {
            Action::Add(_) => "add",
            Action::Remove(_) => "remove",
            Action::Update(_) => "update",
            Action::UpToDate(_) => "up-to-date",
            Action::Ignore { .. } => "ignore",
        }
    }
}

/// The full result of planning. Immutable once computed.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    pub adds: Vec<PackageName>,
    pub updates: Vec<PackageName>,
    pub removes: Vec<PackageName>,
    pub ignores: Vec<(PackageName, IgnoreReason)>,
    pub up_to_date: Vec<PackageName>,
    /// Removals computed but excluded from execution (`--no-remove`).
    pub suppressed_removals: Vec<PackageName>,
    pub source: ManifestSet,
    pub destination: ManifestSet,
}

impl SyncPlan {
    /// `true` when nothing would be executed.
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.updates.is_empty() && self.removes.is_empty()
    }

    /// Move every `Remove` into [`SyncPlan::suppressed_removals`].
    pub fn without_removals(mut self) -> Self {
        let removes = std::mem::take(&mut self.removes);
        self.suppressed_removals.extend(removes);
        self.suppressed_removals.sort();
        self
    }

    /// All actions, grouped add → update → remove → ignore → up-to-date.
    ///
    /// Suppressed removals are not included.
    pub fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        actions.extend(self.adds.iter().cloned().map(Action::Add));
        actions.extend(self.updates.iter().cloned().map(Action::Update));
        actions.extend(self.removes.iter().cloned().map(Action::Remove));
        actions.extend(self.ignores.iter().map(|(name, reason)| Action::Ignore {
            name: name.clone(),
            reason: *reason,
        }));
        actions.extend(self.up_to_date.iter().cloned().map(Action::UpToDate));
        actions
    }

    /// Names (source or destination side) whose time came from storage
    /// modification time instead of the `time` field.
    pub fn time_fallbacks(&self) -> Vec<PackageName> {
        let mut names: Vec<PackageName> = self
            .source
            .values()
            .chain(self.destination.values())
            .filter(|r| r.time_source == TimeSource::StorageModified)
            .map(|r| r.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Compute the plan that brings `destination` in line with `source`.
pub fn plan(source: ManifestSet, destination: ManifestSet) -> SyncPlan {
    let mut result = SyncPlan {
        adds: Vec::new(),
        updates: Vec::new(),
        removes: Vec::new(),
        ignores: Vec::new(),
        up_to_date: Vec::new(),
        suppressed_removals: Vec::new(),
        source: ManifestSet::new(),
        destination: ManifestSet::new(),
    };

    for (name, src) in &source {
        let Some(dst) = destination.get(name) else {
            result.adds.push(name.clone());
            continue;
        };
        match classify(&compare(src, dst)) {
            Verdict::Update => result.updates.push(name.clone()),
            Verdict::UpToDate => result.up_to_date.push(name.clone()),
            Verdict::Ignore(reason) => {
                tracing::warn!("ignoring '{name}': {reason}");
                result.ignores.push((name.clone(), reason));
            }
        }
    }

    result.removes = destination
        .keys()
        .filter(|name| !source.contains_key(*name))
        .cloned()
        .collect();

    result.source = source;
    result.destination = destination;
    result
}
