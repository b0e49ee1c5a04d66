//! Choosing which resources get a change request this run.
//!
//! Resources are ordered by the oldest `created` among their new versions,
//! ties broken by resource id, and capped at `max_resource_count`. Resources
//! that already have an open change request, recognised by an existing marker
//! named `<prefix><resource_id>`, are then dropped from the capped set.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use log::info;

use crate::ingest::changeset::{ChangeSet, PendingVersion};

/// Result of selecting updates from a change-set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Resources to open a change request for, oldest first.
    pub selected: Vec<(String, Vec<PendingVersion>)>,
    /// Within the cap, but a change request is already pending.
    pub already_pending: Vec<String>,
    /// Beyond the cap; picked up by a later run.
    pub deferred: Vec<String>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Prioritizes and caps resources with new versions.
#[derive(Debug, Clone)]
pub struct UpdateSelector {
    max_resource_count: usize,
    marker_prefix: String,
}

impl Default for UpdateSelector {
    fn default() -> Self {
        Self::new(
            crate::defaults::MAX_RESOURCE_COUNT,
            crate::defaults::AUTO_UPDATE_PREFIX,
        )
    }
}

impl UpdateSelector {
    pub fn new(max_resource_count: usize, marker_prefix: &str) -> Self {
        Self {
            max_resource_count,
            marker_prefix: marker_prefix.to_string(),
        }
    }

    /// Marker name signalling a pending change request for `resource_id`.
    pub fn marker_for(&self, resource_id: &str) -> String {
        format!("{}{}", self.marker_prefix, resource_id)
    }

    /// Order by (oldest new version, resource id) and keep the first entries.
    pub fn prioritize(&self, changes: ChangeSet) -> (Vec<(String, Vec<PendingVersion>)>, Vec<String>) {
        let mut ordered: Vec<(Option<NaiveDateTime>, String, Vec<PendingVersion>)> = changes
            .into_entries()
            .map(|(id, versions)| {
                let oldest = versions.iter().map(PendingVersion::created).min();
                (oldest, id, versions)
            })
            .collect();
        ordered.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

        let deferred = ordered
            .iter()
            .skip(self.max_resource_count)
            .map(|(_, id, _)| id.clone())
            .collect();
        let kept = ordered
            .into_iter()
            .take(self.max_resource_count)
            .map(|(_, id, versions)| (id, versions))
            .collect();
        (kept, deferred)
    }

    /// Prioritize, cap and drop resources with an existing marker.
    pub fn select(&self, changes: ChangeSet, existing_markers: &HashSet<String>) -> Selection {
        let total = changes.len();
        let (kept, deferred) = self.prioritize(changes);
        info!(
            "{} resources to update, limited to {} (oldest first)",
            total, self.max_resource_count
        );

        let mut selection = Selection {
            deferred,
            ..Default::default()
        };
        for (id, versions) in kept {
            if existing_markers.contains(&self.marker_for(&id)) {
                info!("Change request for {} is already pending", id);
                selection.already_pending.push(id);
            } else {
                selection.selected.push((id, versions));
            }
        }
        selection
    }
}
