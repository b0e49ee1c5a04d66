//! # Generate Collection Command Implementation
//!
//! This module implements the `generate-collection` subcommand, which builds
//! the catalog document from every accepted resource.
//!
//! ## Functionality
//!
//! - **Working trees**: checks out the published branch and, per resource,
//!   its preview branch when one exists on the remote. With `--offline` no git
//!   command runs and the checkouts must already exist.
//! - **Catalog**: writes `rdf.yaml` and `rdf.json` into the update tree.
//! - **Outputs**: emits `processed_gh_pages_previews` and
//!   `processed_any_gh_pages_previews` as workflow step outputs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use resource_catalog::aggregate::collector::AggregateLayout;
use resource_catalog::aggregate::{self, AggregateReport};
use resource_catalog::config::Config;
use resource_catalog::git::{GitCli, StaticBranches};
use resource_catalog::output::{emoji, OutputConfig, WorkflowCommandSink};
use resource_catalog::suggestions;

use super::spinner;

/// Build the catalog document from accepted resources
#[derive(Args, Debug)]
pub struct GenerateCollectionArgs {
    /// Root of the resource records.
    #[arg(long, value_name = "DIR")]
    pub collection: Option<PathBuf>,

    /// Directory holding the working trees.
    #[arg(long, value_name = "DIR")]
    pub dist: Option<PathBuf>,

    /// Catalog template.
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Do not run git; use existing checkouts and --remote-branch.
    #[arg(long)]
    pub offline: bool,

    /// A remote branch name, without the remote prefix. Repeatable.
    #[arg(long = "remote-branch", value_name = "BRANCH", requires = "offline")]
    pub remote_branches: Vec<String>,
}

impl GenerateCollectionArgs {
    fn apply_to(&self, config: &mut Config) {
        if let Some(dir) = &self.collection {
            config.collection.collection_dir = dir.clone();
        }
        if let Some(dir) = &self.dist {
            config.collection.dist_dir = dir.clone();
        }
        if let Some(template) = &self.template {
            config.collection.template = template.clone();
        }
    }
}

/// Execute the `generate-collection` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `config` - The loaded configuration
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: GenerateCollectionArgs, config: &Config, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let mut config = config.clone();
    args.apply_to(&mut config);

    let template = config.collection.template.clone();
    if !template.is_file() {
        return Err(suggestions::template_not_found(&template));
    }
    let layout = config.layout();

    let pb = spinner(&out, "Building catalog...");
    let result = if args.offline {
        if !layout.published_dir.is_dir() {
            pb.finish_and_clear();
            return Err(suggestions::worktree_missing(
                &layout.published_branch,
                &layout.published_dir,
            ));
        }
        let branches = StaticBranches::new(args.remote_branches.clone());
        aggregate::generate(&layout, &template, &branches, &branches)
    } else {
        let git = GitCli::new(".", &config.collection.remote);
        aggregate::generate(&layout, &template, &git, &git)
    };
    pb.finish_and_clear();
    let report = result.context("Failed to generate the catalog")?;

    print_summary(&out, &layout, &report);

    let mut sink = WorkflowCommandSink::stdout();
    aggregate::publish_previews(&mut sink, &report.consumed_previews)?;
    Ok(())
}

fn print_summary(out: &OutputConfig, layout: &AggregateLayout, report: &AggregateReport) {
    let stats = &report.stats;
    println!(
        "{} New catalog contains {} accepted of {} known resources",
        emoji(out, "📦", "[CATALOG]"),
        stats.accepted_resources(),
        report.known_resources
    );
    if !stats.n_resources.is_empty() {
        println!("   Accepted resources (versions) per type:");
        for (resource_type, count) in &stats.n_resources {
            let versions = stats
                .n_resource_versions
                .get(resource_type)
                .copied()
                .unwrap_or_default();
            println!("   - {}: {} ({})", resource_type, count, versions);
        }
    }

    let ignored = stats.ignored.len() + report.skipped.len();
    if ignored > 0 {
        println!("{} Ignored {} items:", emoji(out, "⚠️", "[WARN]"), ignored);
        for skipped in &report.skipped {
            println!("   - {}: {}", skipped.path.display(), skipped.reason);
        }
        for reason in &stats.ignored {
            println!("   - {}", reason);
        }
    }

    for branch in &report.consumed_previews {
        println!(
            "{} Consumed preview {} into {}",
            emoji(out, "🔀", "[PREVIEW]"),
            branch,
            layout.update_dir.display()
        );
    }
    println!(
        "{} Wrote {} and {}",
        emoji(out, "✅", "[OK]"),
        report.catalog_yaml.display(),
        report.catalog_json.display()
    );
}
