//! Domain types shared by the reconciliation engine and the CLI.
//!
//! Package names and repository coordinates are newtypes so a bucket can never
//! be passed where a prefix is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A package name: the manifest object key with its suffix removed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageName(pub String);

impl PackageName {
    /// Derive a package name from a manifest key by stripping `suffix`.
    ///
    /// Returns `None` when the key does not carry the suffix or nothing is left
    /// once it is removed.
    pub fn from_manifest_key(key: &str, suffix: &str) -> Option<Self> {
        let name = key.strip_suffix(suffix)?;
        if name.is_empty() {
            return None;
        }
        Some(Self(name.to_owned()))
    }

    /// The manifest object key for this package.
    pub fn manifest_key(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Repository coordinates
// ---------------------------------------------------------------------------

/// A bucket + prefix pair in object storage, plus the region segment used in
/// its public URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub bucket: String,
    /// Always empty or ending in `/`; never starts with `/`.
    pub prefix: String,
    pub region: String,
}

impl Repository {
    /// Build a repository with a normalized prefix.
    pub fn new(
        bucket: impl Into<String>,
        prefix: impl AsRef<str>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: normalize_prefix(prefix.as_ref()),
            region: region.into(),
        }
    }

    /// `bucket/prefix` label used in log lines and error messages.
    pub fn label(&self) -> String {
        format!("{}/{}", self.bucket, self.prefix)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.bucket, self.prefix, self.region)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
