//! Operator-facing output: plan table, JSON payloads, diffs and run summary.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pkgsync_core::PackageName;
use pkgsync_reconcile::{
    diff::ManifestDiff, manifest::TIME_FORMAT, Action, Consistency, ExecutionReport,
    ManifestRecord, Planned, TimeSource,
};

// ---------------------------------------------------------------------------
// JSON payloads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PlanJson {
    source: String,
    destination: String,
    consistency: ConsistencyJson,
    summary: PlanSummaryJson,
    actions: Vec<ActionJson>,
    suppressed_removals: Vec<String>,
    time_fallbacks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diffs: Option<Vec<DiffJson>>,
}

#[derive(Serialize)]
struct ConsistencyJson {
    consistent: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_from_index: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extra_in_index: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    differing: Vec<String>,
}

#[derive(Serialize)]
struct PlanSummaryJson {
    add: usize,
    update: usize,
    remove: usize,
    ignore: usize,
    up_to_date: usize,
}

#[derive(Serialize)]
struct ActionJson {
    package: String,
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Serialize)]
struct DiffJson {
    package: String,
    diff: String,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    destination: String,
    index_sha256: &'a str,
    #[serde(flatten)]
    report: &'a ExecutionReport,
}

fn names(list: &[PackageName]) -> Vec<String> {
    list.iter().map(|n| n.to_string()).collect()
}

pub fn print_plan_json(
    planned: &Planned,
    consistency: &Consistency,
    diffs: Option<&[ManifestDiff]>,
) -> Result<()> {
    let plan = &planned.plan;
    let consistency = match consistency {
        Consistency::Consistent => ConsistencyJson {
            consistent: true,
            missing_from_index: Vec::new(),
            extra_in_index: Vec::new(),
            differing: Vec::new(),
        },
        Consistency::Mismatch {
            missing_from_index,
            extra_in_index,
            differing,
            ..
        } => ConsistencyJson {
            consistent: false,
            missing_from_index: names(missing_from_index),
            extra_in_index: names(extra_in_index),
            differing: names(differing),
        },
    };

    let payload = PlanJson {
        source: planned.source.to_string(),
        destination: planned.destination.to_string(),
        consistency,
        summary: PlanSummaryJson {
            add: plan.adds.len(),
            update: plan.updates.len(),
            remove: plan.removes.len(),
            ignore: plan.ignores.len(),
            up_to_date: plan.up_to_date.len(),
        },
        actions: plan
            .actions()
            .into_iter()
            .filter(|a| !matches!(a, Action::UpToDate(_)))
            .map(|a| ActionJson {
                package: a.name().to_string(),
                action: a.label(),
                reason: match &a {
                    Action::Ignore { reason, .. } => Some(reason.to_string()),
                    _ => None,
                },
            })
            .collect(),
        suppressed_removals: names(&plan.suppressed_removals),
        time_fallbacks: names(&plan.time_fallbacks()),
        diffs: diffs.map(|diffs| {
            diffs
                .iter()
                .map(|d| DiffJson {
                    package: d.name.to_string(),
                    diff: d.unified_diff.clone(),
                })
                .collect()
        }),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
    );
    Ok(())
}

pub fn print_report_json(
    destination: &str,
    index_sha256: &str,
    report: &ExecutionReport,
) -> Result<()> {
    let payload = ReportJson {
        destination: destination.to_string(),
        index_sha256,
        report,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize report JSON")?
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Plan table
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "package")]
    package: String,
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "detail")]
    detail: String,
}

pub fn print_consistency_warning(index_name: &str, consistency: &Consistency) {
    let Consistency::Mismatch {
        expected_digest,
        actual_digest,
        missing_from_index,
        extra_in_index,
        differing,
    } = consistency
    else {
        return;
    };

    println!(
        "{} source {index_name} does not match the source manifests",
        "!".yellow().bold()
    );
    println!("  expected sha256 {expected_digest}");
    println!("  found    sha256 {actual_digest}");
    for (label, list) in [
        ("not in index", missing_from_index),
        ("only in index", extra_in_index),
        ("differs", differing),
    ] {
        if !list.is_empty() {
            println!("  {label}: {}", names(list).join(", "));
        }
    }
}

pub fn print_plan(planned: &Planned) {
    let plan = &planned.plan;
    println!(
        "Source      {}\nDestination {}",
        planned.source, planned.destination
    );
    println!(
        "{} add | {} update | {} remove | {} ignore | {} up to date",
        plan.adds.len(),
        plan.updates.len(),
        plan.removes.len(),
        plan.ignores.len(),
        plan.up_to_date.len(),
    );

    let mut rows: Vec<PlanRow> = plan
        .actions()
        .into_iter()
        .filter(|a| !matches!(a, Action::UpToDate(_)))
        .map(|action| {
            let name = action.name();
            PlanRow {
                package: name.to_string(),
                action: action_indicator(&action),
                detail: action_detail(&action, plan.source.get(name), plan.destination.get(name)),
            }
        })
        .collect();
    rows.extend(plan.suppressed_removals.iter().map(|name| PlanRow {
        package: name.to_string(),
        action: "KEEP".bright_black().bold().to_string(),
        detail: "not in source; kept (--no-remove)".to_string(),
    }));

    if !rows.is_empty() {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    let fallbacks = plan.time_fallbacks();
    if !fallbacks.is_empty() {
        println!(
            "{} no usable time field, storage modification time used: {}",
            "!".yellow().bold(),
            names(&fallbacks).join(", ")
        );
    }
}

fn action_indicator(action: &Action) -> String {
    match action {
        Action::Add(_) => "ADD".green().bold().to_string(),
        Action::Update(_) => "UPDATE".cyan().bold().to_string(),
        Action::Remove(_) => "REMOVE".red().bold().to_string(),
        Action::Ignore { .. } => "IGNORE".yellow().bold().to_string(),
        Action::UpToDate(_) => "CURRENT".bright_black().to_string(),
    }
}

fn action_detail(
    action: &Action,
    source: Option<&ManifestRecord>,
    destination: Option<&ManifestRecord>,
) -> String {
    match action {
        Action::Add(_) => source.map(|s| format!("source {}", stamp(s))).unwrap_or_default(),
        Action::Remove(_) => "not in source".to_string(),
        Action::Update(_) => match (source, destination) {
            (Some(s), Some(d)) => format!("{} → {}", stamp(d), stamp(s)),
            _ => String::new(),
        },
        Action::Ignore { reason, .. } => reason.to_string(),
        Action::UpToDate(_) => "up to date".to_string(),
    }
}

fn stamp(record: &ManifestRecord) -> String {
    let time = record.time.format(TIME_FORMAT).to_string();
    match record.time_source {
        TimeSource::Field => time,
        TimeSource::StorageModified => format!("{time} (mtime)"),
    }
}

pub fn print_diffs(diffs: &[ManifestDiff]) {
    if diffs.is_empty() {
        println!("No manifest content differences.");
        return;
    }
    for diff in diffs {
        print!("{}", diff.unified_diff);
        if !diff.unified_diff.ends_with('\n') {
            println!();
        }
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

pub fn print_report(
    destination: &str,
    index_name: &str,
    index_sha256: &str,
    report: &ExecutionReport,
) {
    println!(
        "{} '{destination}' synced ({} written, {} removed, {} artifacts copied, {} artifacts removed)",
        "✓".green().bold(),
        report.manifests_written.len(),
        report.manifests_removed.len(),
        report.artifacts_copied.len(),
        report.artifacts_removed.len(),
    );
    if report.index_published {
        println!("  ✎  {index_name} (sha256 {index_sha256})");
    } else {
        println!("  ·  {index_name} not published (--skip-index)");
    }
    for warning in &report.warnings {
        println!("  {} {warning}", "!".yellow().bold());
    }
    for failure in &report.removal_failures {
        println!(
            "  {} failed to remove {}: {}",
            "✗".red().bold(),
            failure.key,
            failure.message
        );
    }
}
