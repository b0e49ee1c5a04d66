//! # Update External Command Implementation
//!
//! This module implements the `update-external` subcommand, which scans the
//! archive for new versions of cataloged resources and prepares change
//! requests for them.
//!
//! ## Functionality
//!
//! - **Scan**: pages through the archive (at most `archive.max_pages` pages)
//!   and maps every hit to a candidate version.
//! - **Merge**: merges each candidate into the resource history, writing the
//!   updated `resource.yaml` below the dist directory. Blocked resources and
//!   known versions are skipped.
//! - **Select**: orders resources with new versions oldest first, caps them at
//!   `--max-resource-count` and drops those whose `auto-update-<id>` branch
//!   already exists on the remote.
//! - **Outputs**: emits `updated_resources_matrix` and `found_new_resources`
//!   as workflow step outputs.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use resource_catalog::config::Config;
use resource_catalog::git::{BranchSource, GitCli, StaticBranches};
use resource_catalog::ingest::changeset::UpdateDescriptor;
use resource_catalog::ingest::merger::VersionMerger;
use resource_catalog::ingest::scanner::{ArchiveScanner, HttpArchiveClient};
use resource_catalog::ingest::selector::Selection;
use resource_catalog::ingest::{self, IngestStats};
use resource_catalog::output::{emoji, OutputConfig, WorkflowCommandSink};
use resource_catalog::storage::ResourceStore;

use super::spinner;

/// Scan the archive for new resource versions
#[derive(Args, Debug)]
pub struct UpdateExternalArgs {
    /// Root of the canonical resource records.
    #[arg(long, value_name = "DIR")]
    pub collection: Option<PathBuf>,

    /// Root the merged resource records are written to.
    #[arg(long, value_name = "DIR")]
    pub dist: Option<PathBuf>,

    /// Maximum number of resources to open a change request for.
    #[arg(long, value_name = "N")]
    pub max_resource_count: Option<usize>,

    /// Search endpoint of the archive service.
    #[arg(long, value_name = "URL")]
    pub archive_url: Option<String>,

    /// Do not run git; take the remote branches from --remote-branch.
    #[arg(long)]
    pub offline: bool,

    /// A remote branch name, without the remote prefix. Repeatable.
    #[arg(long = "remote-branch", value_name = "BRANCH", requires = "offline")]
    pub remote_branches: Vec<String>,
}

impl UpdateExternalArgs {
    fn apply_to(&self, config: &mut Config) {
        if let Some(dir) = &self.collection {
            config.collection.collection_dir = dir.clone();
        }
        if let Some(dir) = &self.dist {
            config.collection.dist_dir = dir.clone();
        }
        if let Some(n) = self.max_resource_count {
            config.ingest.max_resource_count = n;
        }
        if let Some(url) = &self.archive_url {
            config.archive.base_url = url.clone();
        }
    }
}

/// Execute the `update-external` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `config` - The loaded configuration
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: UpdateExternalArgs, config: &Config, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let mut config = config.clone();
    args.apply_to(&mut config);
    config.validate()?;

    let store = ResourceStore::new(
        &config.collection.collection_dir,
        &config.collection.dist_dir,
    );
    let client = HttpArchiveClient::new(
        &config.archive.base_url,
        &config.archive.keywords,
        config.archive.timeout_secs,
    )?;

    let pb = spinner(&out, "Scanning archive...");
    let scanner = ArchiveScanner::new(&client, config.scan_options());
    let merger = VersionMerger::new(&store);
    let result = ingest::collect_updates(scanner, &merger);
    pb.finish_and_clear();
    let (changes, stats) = result.context("Failed to merge archive hits")?;

    let branches = if args.offline {
        StaticBranches::new(args.remote_branches.clone()).remote_branches()?
    } else {
        GitCli::new(".", &config.collection.remote).remote_branches()?
    };
    let selector = config.selector();
    let markers: HashSet<String> = branches
        .into_iter()
        .filter(|b| b.starts_with(&config.ingest.auto_update_prefix))
        .collect();
    let selection = selector.select(changes, &markers);

    let updates = selection
        .selected
        .iter()
        .map(|(id, versions)| UpdateDescriptor::new(id, versions))
        .collect::<resource_catalog::error::Result<Vec<_>>>()?;

    print_summary(&out, &stats, &selection);

    let mut sink = WorkflowCommandSink::stdout();
    ingest::publish_updates(&mut sink, &updates)?;
    Ok(())
}

fn print_summary(out: &OutputConfig, stats: &IngestStats, selection: &Selection) {
    println!(
        "{} Scanned {} archive hits: {} new, {} known, {} blocked",
        emoji(out, "🔍", "[SCAN]"),
        stats.hits,
        stats.merged,
        stats.known,
        stats.blocked
    );
    for id in &selection.already_pending {
        println!(
            "{} Change request already pending for {}",
            emoji(out, "⏳", "[PENDING]"),
            id
        );
    }
    if !selection.deferred.is_empty() {
        println!(
            "{} Deferred to a later run: {}",
            emoji(out, "⏭️", "[DEFER]"),
            selection.deferred.join(", ")
        );
    }
    if selection.is_empty() {
        println!("{} No new resources to update", emoji(out, "✅", "[OK]"));
    } else {
        println!(
            "{} Opening change requests for: {}",
            emoji(out, "📝", "[UPDATE]"),
            selection
                .selected
                .iter()
                .map(|(id, _)| id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> UpdateExternalArgs {
        UpdateExternalArgs {
            collection: None,
            dist: None,
            max_resource_count: None,
            archive_url: None,
            offline: false,
            remote_branches: Vec::new(),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        let args = UpdateExternalArgs {
            collection: Some(PathBuf::from("records")),
            max_resource_count: Some(1),
            archive_url: Some("http://127.0.0.1:9/api/records/".to_string()),
            ..args()
        };
        args.apply_to(&mut config);
        assert_eq!(config.collection.collection_dir, PathBuf::from("records"));
        assert_eq!(config.collection.dist_dir, PathBuf::from("dist"));
        assert_eq!(config.ingest.max_resource_count, 1);
        assert_eq!(config.archive.base_url, "http://127.0.0.1:9/api/records/");
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = Config::default();
        args().apply_to(&mut config);
        assert_eq!(config, Config::default());
    }
}
