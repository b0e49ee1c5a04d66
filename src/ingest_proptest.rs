//! Property-based tests for the ingest invariants.
//!
//! These tests use proptest to generate random version sequences and
//! change-sets and verify that merge ordering, deduplication and the
//! oldest-first selection cap hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use std::collections::HashSet;

    use chrono::{NaiveDate, NaiveDateTime};
    use proptest::prelude::*;

    use crate::ingest::changeset::{ChangeSet, PendingVersion};
    use crate::ingest::merger::{merge_version, MergeOutcome};
    use crate::ingest::selector::UpdateSelector;
    use crate::model::{RdfSource, Resource, Status, Version};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt + chrono::Duration::days(i64::from(d)))
            .unwrap()
    }

    fn source(k: u8) -> Option<RdfSource> {
        match k {
            0 => None,
            k => Some(RdfSource::Url(format!("https://example.org/{k}/rdf.yaml"))),
        }
    }

    /// (version id, day offset, source key)
    fn version_params() -> impl Strategy<Value = (u8, u32, u8)> {
        (0u8..6, 0u32..60, 0u8..3)
    }

    fn version((id, d, k): (u8, u32, u8)) -> Version {
        Version::new(format!("v{id}"), day(d), source(k))
    }

    /// Merge every version in order, returning the final record if any merged.
    fn merge_all(params: &[(u8, u32, u8)]) -> Option<Resource> {
        let mut current: Option<Resource> = None;
        for p in params {
            match merge_version(current.clone(), version(*p), "r1", "model", None).unwrap() {
                MergeOutcome::Merged { resource, .. } => current = Some(resource),
                MergeOutcome::OldHit => {}
                MergeOutcome::Blocked => unreachable!("new resources are accepted"),
            }
        }
        current
    }

    // ============================================================================
    // VersionMerger property tests
    // ============================================================================

    proptest! {
        /// Property: history stays sorted by created, descending
        #[test]
        fn merged_history_is_sorted(params in prop::collection::vec(version_params(), 1..30)) {
            let resource = merge_all(&params).unwrap();
            for pair in resource.versions.windows(2) {
                prop_assert!(pair[0].created >= pair[1].created);
            }
        }

        /// Property: no two versions share (version_id, rdf_source)
        #[test]
        fn merged_history_has_no_duplicates(params in prop::collection::vec(version_params(), 1..30)) {
            let resource = merge_all(&params).unwrap();
            for (i, a) in resource.versions.iter().enumerate() {
                for b in &resource.versions[i + 1..] {
                    prop_assert!(!b.is_same_as(&a.version_id, a.rdf_source.as_ref()));
                }
            }
        }

        /// Property: re-merging a known version is an OldHit and changes nothing
        #[test]
        fn remerge_is_old_hit(
            params in prop::collection::vec(version_params(), 1..20),
            pick in any::<prop::sample::Index>(),
            later in 0u32..60,
        ) {
            let resource = merge_all(&params).unwrap();
            let known = pick.get(&resource.versions).clone();
            // Same key, different timestamp: still the same version.
            let again = Version::new(known.version_id.clone(), day(later), known.rdf_source.clone());

            let outcome = merge_version(Some(resource.clone()), again, "r1", "model", None).unwrap();
            prop_assert_eq!(outcome, MergeOutcome::OldHit);
        }

        /// Property: a blocked resource rejects every version
        #[test]
        fn blocked_rejects_everything(
            params in prop::collection::vec(version_params(), 1..10),
            incoming in version_params(),
        ) {
            let mut resource = merge_all(&params).unwrap();
            resource.status = Status::Blocked;
            let outcome = merge_version(Some(resource), version(incoming), "r1", "dataset", None).unwrap();
            prop_assert_eq!(outcome, MergeOutcome::Blocked);
        }
    }

    // ============================================================================
    // UpdateSelector property tests
    // ============================================================================

    fn change_entries() -> impl Strategy<Value = Vec<(String, Vec<u32>)>> {
        prop::collection::btree_map("r[0-9]{1,2}", prop::collection::vec(0u32..90, 1..4), 0..12)
            .prop_map(|map| map.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    }

    fn change_set(entries: &[(String, Vec<u32>)]) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for (id, days) in entries {
            for (i, d) in days.iter().enumerate() {
                let version = Version::new(format!("{id}-{i}"), day(*d), None);
                changes.record(id, PendingVersion::new(version, Vec::new()));
            }
        }
        changes
    }

    proptest! {
        /// Property: never more than N resources are selected
        #[test]
        fn selection_respects_cap(entries in change_entries(), n in 0usize..6) {
            let selection = UpdateSelector::new(n, "auto-update-")
                .select(change_set(&entries), &HashSet::new());
            prop_assert!(selection.selected.len() <= n);
            prop_assert_eq!(
                selection.selected.len() + selection.deferred.len(),
                entries.len()
            );
        }

        /// Property: every selected resource is at least as old as every deferred one
        #[test]
        fn selection_is_oldest_first(entries in change_entries(), n in 0usize..6) {
            let oldest = |id: &str| {
                entries
                    .iter()
                    .find(|(e, _)| e == id)
                    .and_then(|(_, days)| days.iter().min().copied())
                    .unwrap()
            };
            let selection = UpdateSelector::new(n, "auto-update-")
                .select(change_set(&entries), &HashSet::new());

            for (selected, _) in &selection.selected {
                for deferred in &selection.deferred {
                    prop_assert!(oldest(selected) <= oldest(deferred));
                }
            }
        }
    }
}
