//! Manifest comparison.
//!
//! Two manifests for the same package are compared on content (the body with
//! `time` and `dist.url` removed) and on publish time. [`classify`] turns the
//! result into a [`Verdict`]; a destination that is equal-or-newer than the
//! source never gets `Verdict::Update`.

use std::cmp::Ordering;

use crate::manifest::ManifestRecord;
use crate::plan::IgnoreReason;

/// Which side carries the later publish time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newer {
    Source,
    Destination,
    Equal,
}

/// Result of comparing a source and a destination manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    pub newer: Newer,
    pub content_equal: bool,
}

pub fn compare(src: &ManifestRecord, dst: &ManifestRecord) -> Comparison {
    let newer = match src.time.cmp(&dst.time) {
        Ordering::Greater => Newer::Source,
        Ordering::Less => Newer::Destination,
        Ordering::Equal => Newer::Equal,
    };
    Comparison {
        newer,
        content_equal: src.comparable_body() == dst.comparable_body(),
    }
}

/// What to do with a package present on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Update,
    UpToDate,
    Ignore(IgnoreReason),
}

pub fn classify(cmp: &Comparison) -> Verdict {
    match (cmp.content_equal, cmp.newer) {
        (_, Newer::Source) => Verdict::Update,
        (true, Newer::Equal) => Verdict::UpToDate,
        (true, Newer::Destination) => {
            Verdict::Ignore(IgnoreReason::ContentsMatchDestinationNewer)
        }
        (false, Newer::Equal) => Verdict::Ignore(IgnoreReason::ContentsDifferSameTime),
        (false, Newer::Destination) => {
            Verdict::Ignore(IgnoreReason::ContentsDifferDestinationNewer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest;
    use chrono::Utc;
    use pkgsync_core::PackageName;
    use rstest::rstest;
    use serde_json::json;

    fn record(url: &str, time: &str, version: &str) -> ManifestRecord {
        let bytes = serde_json::to_vec(&json!({
            "name": "pkg",
            "version": version,
            "dist": {"url": url},
            "time": time,
        }))
        .unwrap();
        parse_manifest("r", "pkg.json", PackageName::from("pkg"), &bytes, Utc::now()).unwrap()
    }

    #[test]
    fn dist_url_and_time_do_not_affect_content_equality() {
        let a = record("https://a.s3.amazonaws.com/x.tgz", "2021-01-01 00:00:00", "1.0");
        let b = record("https://b.s3.amazonaws.com/x.tgz", "2022-01-01 00:00:00", "1.0");
        let cmp = compare(&a, &b);
        assert!(cmp.content_equal);
        assert_eq!(cmp.newer, Newer::Destination);
    }

    #[rstest]
    #[case("1.0", "2021-01-01 00:00:00", "1.0", "2021-01-01 00:00:00", Verdict::UpToDate)]
    #[case("1.1", "2021-02-01 00:00:00", "1.0", "2021-01-01 00:00:00", Verdict::Update)]
    #[case("1.0", "2021-02-01 00:00:00", "1.0", "2021-01-01 00:00:00", Verdict::Update)]
    #[case("1.0", "2021-01-01 00:00:00", "1.0", "2021-02-01 00:00:00", Verdict::Ignore(IgnoreReason::ContentsMatchDestinationNewer))]
    #[case("1.1", "2021-01-01 00:00:00", "1.0", "2021-01-01 00:00:00", Verdict::Ignore(IgnoreReason::ContentsDifferSameTime))]
    #[case("1.1", "2021-01-01 00:00:00", "1.0", "2021-02-01 00:00:00", Verdict::Ignore(IgnoreReason::ContentsDifferDestinationNewer))]
    fn classification_matrix(
        #[case] src_version: &str,
        #[case] src_time: &str,
        #[case] dst_version: &str,
        #[case] dst_time: &str,
        #[case] expected: Verdict,
    ) {
        let src = record("https://src.s3.amazonaws.com/x.tgz", src_time, src_version);
        let dst = record("https://dst.s3.amazonaws.com/x.tgz", dst_time, dst_version);
        assert_eq!(classify(&compare(&src, &dst)), expected);
    }
}
