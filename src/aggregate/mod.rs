//! # Aggregation Pipeline
//!
//! Builds the catalog document from the per-resource records:
//!
//! 1. **Collect** (`collector`): walk the collection for resource records and
//!    resolve every accepted version of every accepted resource.
//! 2. **Resolve** (`resolver`): find version content in the preview tree of
//!    the resource, falling back to the published tree. Preview content is
//!    moved into the update tree.
//! 3. **Build** (`catalog`): file the latest version of each resource into
//!    its type bucket, with earlier versions as `previous_versions`.
//! 4. **Project** (`json`): write the document as YAML and as strict JSON.

pub mod catalog;
pub mod collector;
pub mod json;
pub mod resolver;

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde_json::json;

use crate::error::Result;
use crate::git::{BranchCheckout, BranchSource};
use crate::output::StepOutputSink;
use crate::storage::{write_file, write_yaml};
use catalog::{CatalogBuilder, CatalogStats};
use collector::{AggregateLayout, ResourceCollector, Skipped};

/// Base name of the written catalog documents.
pub const CATALOG_FILE: &str = "rdf";

/// Step output holding `{"preview-branch": [branch, ...]}`.
pub const PREVIEWS_OUTPUT: &str = "processed_gh_pages_previews";

/// Step output holding `yes` or `no`.
pub const ANY_PREVIEWS_OUTPUT: &str = "processed_any_gh_pages_previews";

/// What an aggregation run produced.
#[derive(Debug)]
pub struct AggregateReport {
    pub catalog_yaml: PathBuf,
    pub catalog_json: PathBuf,
    /// Resource records found, whatever their status.
    pub known_resources: usize,
    pub stats: CatalogStats,
    /// Preview branches whose content was moved into the update tree.
    pub consumed_previews: Vec<String>,
    pub skipped: Vec<Skipped>,
}

/// Run the aggregation pipeline and write the catalog into the update tree.
///
/// The template is read before anything else so a missing template aborts
/// the run without touching the working trees.
pub fn generate(
    layout: &AggregateLayout,
    template: &Path,
    branches: &dyn BranchSource,
    checkout: &dyn BranchCheckout,
) -> Result<AggregateReport> {
    let builder = CatalogBuilder::from_file(template)?;
    let remote_branches = branches.remote_branches()?;

    if let Err(e) = checkout.checkout(&layout.published_branch, &layout.published_dir) {
        warn!(
            "Published tree unavailable, only preview content can be resolved: {}",
            e
        );
    }
    fs::create_dir_all(&layout.update_dir)?;

    let collection = ResourceCollector::new(layout, remote_branches, checkout).collect()?;
    let (document, stats) = builder.build(&collection.resources)?;

    let catalog_yaml = layout.update_dir.join(format!("{}.yaml", CATALOG_FILE));
    let catalog_json = catalog_yaml.with_extension("json");
    let json = json::to_json_string(&document)?;
    write_yaml(&catalog_yaml, &document)?;
    write_file(&catalog_json, json.as_bytes())?;

    info!(
        "New catalog contains {} accepted of {} known resources",
        stats.accepted_resources(),
        collection.known
    );

    Ok(AggregateReport {
        catalog_yaml,
        catalog_json,
        known_resources: collection.known,
        stats,
        consumed_previews: collection.consumed_previews,
        skipped: collection.skipped,
    })
}

/// Hand the consumed previews to the CI workflow.
pub fn publish_previews<S: StepOutputSink>(sink: &mut S, consumed: &[String]) -> Result<()> {
    sink.set_json(PREVIEWS_OUTPUT, &json!({ "preview-branch": consumed }))?;
    sink.set(
        ANY_PREVIEWS_OUTPUT,
        if consumed.is_empty() { "no" } else { "yes" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingSink;

    #[test]
    fn test_publish_previews() {
        let mut sink = RecordingSink::default();
        publish_previews(&mut sink, &["gh-pages-auto-update-r1".to_string()]).unwrap();
        assert_eq!(
            sink.get(PREVIEWS_OUTPUT),
            Some(r#"{"preview-branch":["gh-pages-auto-update-r1"]}"#)
        );
        assert_eq!(sink.get(ANY_PREVIEWS_OUTPUT), Some("yes"));

        let mut sink = RecordingSink::default();
        publish_previews(&mut sink, &[]).unwrap();
        assert_eq!(sink.get(ANY_PREVIEWS_OUTPUT), Some("no"));
    }
}
