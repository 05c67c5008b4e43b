//! Error types for pkgsync-reconcile.

use std::path::PathBuf;

use thiserror::Error;

use pkgsync_core::PackageName;

/// Failures reported by an [`ObjectStore`](crate::store::ObjectStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend rejected or failed the request.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}

/// All fatal errors that can abort a reconciliation run.
///
/// Recoverable conditions (index mismatch, foreign distribution URLs, failed
/// deferred removals) are never errors; they are reported as values.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A repository listing or object fetch failed.
    #[error("failed to fetch {key} from {repository}: {source}")]
    Fetch {
        repository: String,
        key: String,
        #[source]
        source: StoreError,
    },

    /// The source repository carries no aggregate index.
    #[error("repository {repository} has no aggregate index ({index_name})")]
    MissingIndex {
        repository: String,
        index_name: String,
    },

    /// A manifest or index object is not valid JSON.
    #[error("failed to parse {key} in {repository}: {source}")]
    Parse {
        repository: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A manifest is valid JSON but lacks a required field.
    #[error("invalid manifest {key} in {repository}: {reason}")]
    InvalidManifest {
        repository: String,
        key: String,
        reason: String,
    },

    /// Copying an artifact or writing/removing a manifest failed.
    #[error("transfer failed for package '{package}' ({key}): {source}")]
    Transfer {
        package: PackageName,
        key: String,
        #[source]
        source: StoreError,
    },

    /// Publishing the rebuilt aggregate index failed.
    #[error("failed to publish index {key} to {repository}: {source}")]
    Publish {
        repository: String,
        key: String,
        #[source]
        source: StoreError,
    },

    /// JSON serialization error (index document).
    #[error("index JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
