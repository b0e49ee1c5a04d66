//! # Ingest Pipeline
//!
//! Discovers new resource versions in the archive and merges them into the
//! per-resource history:
//!
//! 1. **Scan** (`scanner`): page through the archive, mapping each hit to a
//!    `RawHit`.
//! 2. **Merge** (`merger`): deduplicate each hit against the resource history
//!    and persist merged records to the output root.
//! 3. **Select** (`selector`): order resources with new versions by their
//!    oldest change and cap how many get a change request.
//! 4. **Describe** (`changeset`): render the selected resources as update
//!    descriptors for the CI workflow.

pub mod changeset;
pub mod merger;
pub mod scanner;
pub mod selector;

use log::{info, warn};
use serde_json::json;

use crate::error::Result;
use crate::output::StepOutputSink;
use changeset::{ChangeSet, PendingVersion, UpdateDescriptor};
use merger::{MergeOutcome, VersionMerger};
use scanner::RawHit;

/// Step output holding `{"update": [descriptor, ...]}`.
pub const UPDATES_OUTPUT: &str = "updated_resources_matrix";

/// Step output holding whether any change request is to be opened.
pub const FOUND_OUTPUT: &str = "found_new_resources";

/// Counters of one ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub hits: usize,
    pub merged: usize,
    pub known: usize,
    pub blocked: usize,
}

/// Merge every hit and collect the versions that were new.
///
/// Blocked resources and known versions are skipped. Integrity errors from
/// the merge abort the run.
pub fn collect_updates<I>(hits: I, merger: &VersionMerger<'_>) -> Result<(ChangeSet, IngestStats)>
where
    I: IntoIterator<Item = RawHit>,
{
    let mut changes = ChangeSet::new();
    let mut stats = IngestStats::default();

    for hit in hits {
        stats.hits += 1;
        let outcome = merger.apply(
            &hit.resource_id,
            &hit.resource_type,
            Some(&hit.resource_id),
            hit.to_version(),
        )?;

        match outcome {
            MergeOutcome::Merged { version, .. } => {
                stats.merged += 1;
                changes.record(&hit.resource_id, PendingVersion::new(version, hit.maintainers()));
            }
            MergeOutcome::OldHit => stats.known += 1,
            MergeOutcome::Blocked => {
                stats.blocked += 1;
                warn!(
                    "Ignoring version {} of blocked resource {}",
                    hit.version_id, hit.resource_id
                );
            }
        }
    }

    info!(
        "Processed {} hits: {} new, {} known, {} blocked",
        stats.hits, stats.merged, stats.known, stats.blocked
    );
    Ok((changes, stats))
}

/// Hand the selected updates to the CI workflow.
pub fn publish_updates<S: StepOutputSink>(sink: &mut S, updates: &[UpdateDescriptor]) -> Result<()> {
    sink.set_json(UPDATES_OUTPUT, &json!({ "update": updates }))?;
    sink.set_json(FOUND_OUTPUT, &!updates.is_empty())
}
