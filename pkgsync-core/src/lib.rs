//! pkgsync core library: repository types, URL translation, configuration, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes and repository coordinates
//! - [`url`]: distribution URL parsing and rewriting
//! - [`config`]: YAML configuration load / defaults
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;
pub mod url;

pub use config::{RepositorySettings, SourceDefaults, SyncConfig};
pub use error::ConfigError;
pub use types::{PackageName, Repository};
pub use url::{extract_key, is_plain_key, rewrite_url, DEFAULT_REGION_ALIAS};
