//! # pkgsync-reconcile
//!
//! Manifest reconciliation between two object-storage repositories.
//!
//! Call [`pipeline::Fetched::fetch`] to read both repositories, then walk the
//! stages: [`pipeline::Fetched::plan`] → [`pipeline::Planned::apply`] →
//! [`execute::Published::finish`]. [`plan::plan`] and [`compare::compare`]
//! are pure and usable on their own.

pub mod compare;
pub mod diff;
pub mod error;
pub mod execute;
pub mod fs_store;
pub mod index;
pub mod manifest;
pub mod memory;
pub mod pipeline;
pub mod plan;
pub mod store;

pub use compare::{classify, compare, Comparison, Newer, Verdict};
pub use error::{StoreError, SyncError};
pub use execute::{execute, ExecuteContext, ExecutionReport, Published, RemovalFailure};
pub use fs_store::FsStore;
pub use index::{build_index, check_consistency, publish_index, Consistency, IndexDocument};
pub use manifest::{ManifestRecord, ManifestSet, TimeSource};
pub use memory::MemoryStore;
pub use pipeline::{Fetched, Planned, RepositorySnapshot};
pub use plan::{plan, Action, IgnoreReason, SyncPlan};
pub use store::{ObjectStore, StoredObject};
