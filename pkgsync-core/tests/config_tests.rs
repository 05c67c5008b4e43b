//! Configuration loading integration tests against a temporary home.

use assert_fs::prelude::*;
use pkgsync_core::{
    config::{self, SourceDefaults, SyncConfig},
    ConfigError, Repository,
};
use predicates::prelude::predicate;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".pkgsync/config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"), "got: {err}");
}

#[test]
fn explicit_missing_file_is_io_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_from(&home.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)), "got: {err}");
}

#[test]
fn nested_index_name_is_rejected() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("pkgsync.yaml");
    file.write_str("index_name: meta/index.json\n").expect("write");

    let err = config::load_from(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
    assert!(err.to_string().contains("meta/index.json"));
}

// ---------------------------------------------------------------------------
// 2. Full document
// ---------------------------------------------------------------------------

#[test]
fn full_config_loads_from_home() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".pkgsync/config.yaml")
        .write_str(
            "storage_domain: storage.example.net\n\
             default_region: s3-eu-west-1\n\
             store_root: /srv/objects\n\
             source:\n  bucket: upstream\n  prefix: stable\n",
        )
        .expect("write");

    let loaded = config::load_at(home.path()).expect("load");
    let expected = SyncConfig {
        storage_domain: "storage.example.net".into(),
        default_region: "s3-eu-west-1".into(),
        store_root: Some(PathBuf::from("/srv/objects")),
        source: Some(SourceDefaults {
            bucket: "upstream".into(),
            prefix: "stable".into(),
            region: None,
        }),
        ..SyncConfig::default()
    };
    assert_eq!(loaded, expected);
    assert_eq!(
        loaded.source_repository(),
        Some(Repository::new("upstream", "stable", "s3-eu-west-1"))
    );
}

#[test]
fn loading_never_creates_the_config_dir() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let config = config::load_at(home.path()).expect("load");
    assert!(config.source_repository().is_none());
    home.child(".pkgsync").assert(predicate::path::missing());
}
