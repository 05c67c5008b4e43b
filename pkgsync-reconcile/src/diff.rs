//! Unified diffs of manifest bodies, for operator review of updates and
//! ignored conflicts.

use serde_json::Value;
use similar::TextDiff;

use pkgsync_core::PackageName;

use crate::plan::SyncPlan;

/// A single manifest diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDiff {
    pub name: PackageName,
    pub unified_diff: String,
}

/// Diff destination → source comparable bodies for every update and ignore.
///
/// `dist.url` and `time` are left out, as they are for equivalence; time
/// ordering is already in the plan. Packages whose bodies are equal produce
/// no entry.
pub fn diff_plan(plan: &SyncPlan) -> Vec<ManifestDiff> {
    let names = plan
        .updates
        .iter()
        .chain(plan.ignores.iter().map(|(name, _)| name));

    let mut diffs = Vec::new();
    for name in names {
        let (Some(src), Some(dst)) = (plan.source.get(name), plan.destination.get(name)) else {
            continue;
        };
        let old = render(&dst.comparable_body());
        let new = render(&src.comparable_body());
        if old == new {
            continue;
        }

        let old_header = format!("destination/{name}");
        let new_header = format!("source/{name}");
        let unified_diff = TextDiff::from_lines(&old, &new)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();
        diffs.push(ManifestDiff {
            name: name.clone(),
            unified_diff,
        });
    }
    diffs
}

fn render(body: &serde_json::Map<String, Value>) -> String {
    let mut text = serde_json::to_string_pretty(body).unwrap_or_default();
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{parse_manifest, ManifestSet};
    use crate::plan::plan;
    use chrono::Utc;
    use serde_json::json;

    fn set(name: &str, value: Value) -> ManifestSet {
        let bytes = serde_json::to_vec(&value).unwrap();
        let record = parse_manifest("r", "k", PackageName::from(name), &bytes, Utc::now()).unwrap();
        ManifestSet::from([(record.name.clone(), record)])
    }

    #[test]
    fn update_with_changed_body_produces_unified_diff() {
        let source = set(
            "a",
            json!({"version": "2", "dist": {"url": "s"}, "time": "2021-02-01 00:00:00"}),
        );
        let destination = set(
            "a",
            json!({"version": "1", "dist": {"url": "d"}, "time": "2021-01-01 00:00:00"}),
        );
        let diffs = diff_plan(&plan(source, destination));
        assert_eq!(diffs.len(), 1);
        let diff = &diffs[0].unified_diff;
        assert!(diff.contains("--- destination/a"));
        assert!(diff.contains("+++ source/a"));
        assert!(diff.contains("-  \"version\": \"1\""));
        assert!(diff.contains("+  \"version\": \"2\""));
    }

    #[test]
    fn time_only_update_has_no_diff() {
        let source = set("a", json!({"dist": {"url": "s"}, "time": "2021-02-01 00:00:00"}));
        let destination = set("a", json!({"dist": {"url": "d"}, "time": "2021-01-01 00:00:00"}));
        let p = plan(source, destination);
        assert_eq!(p.updates.len(), 1);
        assert!(diff_plan(&p).is_empty());
    }
}
