//! `pkgsync`: plan, confirm and apply a reconciliation run.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use pkgsync_core::{config, Repository, SyncConfig};
use pkgsync_reconcile::{diff::diff_plan, Consistency, Fetched, FsStore};

use super::{prompt, render};

/// Arguments for `pkgsync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Destination bucket.
    pub dest_bucket: String,

    /// Destination key prefix (may be empty: "").
    pub dest_prefix: String,

    /// Destination region; defaults to `default_region` from config.
    pub dest_region: Option<String>,

    /// Source bucket; defaults to `source.bucket` from config.
    #[arg(requires = "src_prefix")]
    pub src_bucket: Option<String>,

    /// Source key prefix.
    pub src_prefix: Option<String>,

    /// Source region; defaults to `default_region` from config.
    pub src_region: Option<String>,

    /// Never remove destination packages that are missing from the source.
    #[arg(long)]
    pub no_remove: bool,

    /// Answer yes to every confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Print the plan and stop without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the plan (and the run report) as JSON.
    #[arg(long)]
    pub json: bool,

    /// Show unified diffs of manifest content for updates and ignores.
    #[arg(long)]
    pub diff: bool,

    /// Build the destination index but do not publish it.
    #[arg(long)]
    pub skip_index: bool,

    /// Root directory of the object store; overrides `store_root` from config.
    #[arg(long, value_name = "DIR")]
    pub store_root: Option<PathBuf>,

    /// Config file to use instead of ~/.pkgsync/config.yaml.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = match &self.config {
            Some(path) => config::load_from(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => config::load().context("failed to load ~/.pkgsync/config.yaml")?,
        };
        let settings = config.settings();
        let (source, destination) = self.repositories(&config)?;
        let root = self
            .store_root
            .clone()
            .or_else(|| config.store_root.clone())
            .context("no object store root: pass --store-root or set store_root in config")?;
        let store = FsStore::new(root);
        tracing::info!("object store at {}", store.root().display());

        let fetched = Fetched::fetch(&store, &source, &store, &destination, &settings)
            .context("failed to read repositories")?;
        let consistency = fetched.consistency().context("source index check failed")?;
        if !self.json {
            render::print_consistency_warning(&settings.index_name, &consistency);
        }
        if matches!(consistency, Consistency::Mismatch { .. })
            && !self.yes
            && !self.dry_run
            && !prompt::confirm("Source index is inconsistent. Continue anyway?")?
        {
            bail!("aborted: source {} is inconsistent", settings.index_name);
        }

        let mut planned = fetched.plan();
        if self.no_remove {
            planned = planned.without_removals();
        }

        let diffs = self.diff.then(|| diff_plan(&planned.plan));
        if self.json {
            render::print_plan_json(&planned, &consistency, diffs.as_deref())?;
        } else {
            render::print_plan(&planned);
            if let Some(diffs) = &diffs {
                render::print_diffs(diffs);
            }
        }

        if planned.plan.is_empty() {
            if !self.json {
                println!("✓ '{}' is up to date, nothing to do", destination.label());
            }
            return Ok(());
        }
        if self.dry_run {
            if !self.json {
                println!("[dry-run] no changes made");
            }
            return Ok(());
        }

        let plan = &planned.plan;
        let changes = plan.adds.len() + plan.updates.len() + plan.removes.len();
        if !self.yes
            && !prompt::confirm(&format!(
                "Apply {changes} change(s) to {}?",
                destination.label()
            ))?
        {
            if !self.json {
                println!("Aborted; nothing changed.");
            }
            return Ok(());
        }

        let published = planned
            .apply(&store, &store, !self.skip_index)
            .with_context(|| format!("sync failed for '{}'", destination.label()))?;
        let digest = published.index.digest();
        let report = published.finish(&store);

        if self.json {
            render::print_report_json(&destination.label(), &digest, &report)?;
        } else {
            render::print_report(&destination.label(), &settings.index_name, &digest, &report);
        }
        Ok(())
    }

    /// Resolve (source, destination), filling gaps from `config`.
    fn repositories(&self, config: &SyncConfig) -> Result<(Repository, Repository)> {
        let dest_region = self
            .dest_region
            .clone()
            .unwrap_or_else(|| config.default_region.clone());
        let destination = Repository::new(self.dest_bucket.clone(), &self.dest_prefix, dest_region);

        let source = match (&self.src_bucket, &self.src_prefix) {
            (Some(bucket), Some(prefix)) => Repository::new(
                bucket.clone(),
                prefix,
                self.src_region
                    .clone()
                    .unwrap_or_else(|| config.default_region.clone()),
            ),
            _ => config.source_repository().context(
                "no source repository: pass <SRC_BUCKET> <SRC_PREFIX> or set `source` in config",
            )?,
        };

        if source == destination {
            bail!("source and destination are the same repository ({source})");
        }
        Ok((source, destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pkgsync_core::SourceDefaults;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SyncArgs,
    }

    fn parse(argv: &[&str]) -> SyncArgs {
        Harness::try_parse_from(std::iter::once("pkgsync").chain(argv.iter().copied()))
            .expect("parse")
            .args
    }

    fn configured() -> SyncConfig {
        SyncConfig {
            default_region: "s3-us-west-2".into(),
            source: Some(SourceDefaults {
                bucket: "upstream".into(),
                prefix: "stable".into(),
                region: None,
            }),
            ..SyncConfig::default()
        }
    }

    #[test]
    fn omitted_source_and_regions_come_from_config() {
        let (source, destination) = parse(&["mirror", "pkgs"]).repositories(&configured()).unwrap();
        assert_eq!(source, Repository::new("upstream", "stable", "s3-us-west-2"));
        assert_eq!(destination, Repository::new("mirror", "pkgs", "s3-us-west-2"));
    }

    #[test]
    fn positional_source_overrides_config() {
        let args = parse(&["mirror", "", "s3-eu-west-1", "other", "/beta", "s3"]);
        let (source, destination) = args.repositories(&configured()).unwrap();
        assert_eq!(source, Repository::new("other", "beta/", "s3"));
        assert_eq!(destination, Repository::new("mirror", "", "s3-eu-west-1"));
    }

    #[test]
    fn source_bucket_without_prefix_is_a_usage_error() {
        let err = Harness::try_parse_from(["pkgsync", "mirror", "pkgs", "s3", "upstream"])
            .err()
            .expect("usage error");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_source_everywhere_is_an_error() {
        let err = parse(&["mirror", "pkgs"])
            .repositories(&SyncConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("no source repository"));
    }

    #[test]
    fn syncing_a_repository_onto_itself_is_rejected() {
        let err = parse(&["upstream", "stable", "s3-us-west-2"])
            .repositories(&configured())
            .unwrap_err();
        assert!(err.to_string().contains("same repository"));
    }
}
