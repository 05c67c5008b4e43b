//! Manifest records and sets.
//!
//! A manifest is a JSON object with at least `dist.url`. The optional `time`
//! field (`YYYY-MM-DD HH:MM:SS`, UTC) is the authoritative publish time; when
//! it is missing or malformed the object's storage modification time stands
//! in for it and the substitution is logged.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde_json::{Map, Value};

use pkgsync_core::PackageName;

use crate::error::SyncError;

/// Format of the manifest `time` field.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// All manifests of one repository, keyed and sorted by package name.
pub type ManifestSet = BTreeMap<PackageName, ManifestRecord>;

/// Where a record's [`ManifestRecord::time`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Parsed from the manifest's `time` field.
    Field,
    /// Substituted from the object's storage modification time.
    StorageModified,
}

/// One package version's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRecord {
    pub name: PackageName,
    pub dist_url: String,
    pub time: DateTime<Utc>,
    pub time_source: TimeSource,
    /// The full manifest object as read, `dist.url` and `time` included.
    pub document: Map<String, Value>,
}

impl ManifestRecord {
    /// The document with `time` and `dist.url` removed: what equivalence is
    /// decided on.
    pub fn comparable_body(&self) -> Map<String, Value> {
        let mut body = self.document.clone();
        body.remove("time");
        if let Some(Value::Object(dist)) = body.get_mut("dist") {
            dist.remove("url");
        }
        body
    }

    /// Copy of this record with `dist.url` replaced.
    pub fn with_dist_url(&self, url: &str) -> Self {
        let mut record = self.clone();
        if let Some(Value::Object(dist)) = record.document.get_mut("dist") {
            dist.insert("url".to_owned(), Value::String(url.to_owned()));
        }
        record.dist_url = url.to_owned();
        record
    }

    /// Copy of this record whose `time` field carries [`ManifestRecord::time`].
    ///
    /// Records that fell back to storage modification time get the
    /// substituted value written out, so the copy compares equal-in-time to
    /// its origin on the next run.
    pub fn with_time_field(&self) -> Self {
        let mut record = self.clone();
        if record.time_source == TimeSource::StorageModified {
            record.document.insert(
                "time".to_owned(),
                Value::String(record.time.format(TIME_FORMAT).to_string()),
            );
            record.time_source = TimeSource::Field;
        }
        record
    }

    /// Serialized manifest object, pretty-printed with a trailing newline.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SyncError> {
        let mut bytes = serde_json::to_vec_pretty(&self.document)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Parse a manifest object.
///
/// `repository` and `key` only label errors and warnings. `last_modified` is
/// the storage modification time used when `time` is unusable.
pub fn parse_manifest(
    repository: &str,
    key: &str,
    name: PackageName,
    bytes: &[u8],
    last_modified: DateTime<Utc>,
) -> Result<ManifestRecord, SyncError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| SyncError::Parse {
        repository: repository.to_owned(),
        key: key.to_owned(),
        source: e,
    })?;
    let invalid = |reason: &str| SyncError::InvalidManifest {
        repository: repository.to_owned(),
        key: key.to_owned(),
        reason: reason.to_owned(),
    };

    let Value::Object(document) = value else {
        return Err(invalid("manifest is not a JSON object"));
    };
    let dist_url = document
        .get("dist")
        .and_then(|d| d.get("url"))
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing string field dist.url"))?
        .to_owned();

    let parsed = document
        .get("time")
        .and_then(Value::as_str)
        .and_then(parse_time);
    let (time, time_source) = match parsed {
        Some(time) => (time, TimeSource::Field),
        None => {
            // Whole seconds only, matching what the time field can carry.
            let fallback = last_modified.trunc_subsecs(0);
            tracing::warn!(
                "{repository}: manifest {key} has no usable time field; using storage modification time {}",
                fallback.format(TIME_FORMAT)
            );
            (fallback, TimeSource::StorageModified)
        }
    };

    Ok(ManifestRecord {
        name,
        dist_url,
        time,
        time_source,
        document,
    })
}

/// Parse a `YYYY-MM-DD HH:MM:SS` UTC timestamp.
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
