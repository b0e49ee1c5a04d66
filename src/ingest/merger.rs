//! Merging newly discovered versions into a resource's history.
//!
//! `merge_version` is the pure part: it decides what happens to a version
//! given the current record. `VersionMerger` wraps it with storage, loading the
//! current record and persisting the merged one to the output root.

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Resource, Status, Version};
use crate::storage::ResourceStore;

/// What merging one version into a resource produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The version was added. `version` is the record as stored, with owners
    /// hoisted to the resource.
    Merged {
        resource: Resource,
        version: Version,
        created: bool,
    },
    /// The resource is blocked and takes no further writes.
    Blocked,
    /// The version is already known.
    OldHit,
}

/// Merge `new_version` into `existing`, or start a new resource.
///
/// - A missing resource is created as accepted with this single version.
/// - A blocked resource yields `Blocked` without changes.
/// - A status other than accepted/pending, or an accepted/pending resource
///   without versions, is an integrity error.
/// - A version with the same `version_id` and `rdf_source` yields `OldHit`.
/// - Otherwise the version is inserted, the history re-sorted by `created`
///   descending and the resource type replaced by `resource_type`.
///
/// On success `owners` move from the version to the resource and an empty
/// `doi` is dropped from the resource.
pub fn merge_version(
    existing: Option<Resource>,
    mut new_version: Version,
    resource_id: &str,
    resource_type: &str,
    resource_doi: Option<&str>,
) -> Result<MergeOutcome> {
    let owners = new_version.owners.take();

    let (mut resource, created) = match existing {
        None => (
            Resource::new(
                resource_id,
                resource_type,
                resource_doi.map(str::to_string),
                new_version.clone(),
            ),
            true,
        ),
        Some(mut resource) => {
            match &resource.status {
                Status::Blocked => return Ok(MergeOutcome::Blocked),
                Status::Accepted | Status::Pending => resource.validate()?,
                Status::Other(status) => {
                    return Err(Error::InvalidStatus {
                        resource_id: resource_id.to_string(),
                        status: status.clone(),
                    })
                }
            }

            if resource.contains_version(&new_version.version_id, new_version.rdf_source.as_ref())
            {
                return Ok(MergeOutcome::OldHit);
            }

            resource.insert_version(new_version.clone());
            if resource.resource_type != resource_type {
                warn!(
                    "Type of {} changes from '{}' to '{}' with version {}",
                    resource_id, resource.resource_type, resource_type, new_version.version_id
                );
            }
            resource.resource_type = resource_type.to_string();
            (resource, false)
        }
    };

    if let Some(owners) = owners {
        resource.owners = Some(owners);
    }
    resource.normalize_doi();

    Ok(MergeOutcome::Merged {
        resource,
        version: new_version,
        created,
    })
}

/// Applies merges against a `ResourceStore`.
#[derive(Debug, Clone)]
pub struct VersionMerger<'a> {
    store: &'a ResourceStore,
}

impl<'a> VersionMerger<'a> {
    pub fn new(store: &'a ResourceStore) -> Self {
        Self { store }
    }

    /// Merge one version and persist the result to the output root.
    pub fn apply(
        &self,
        resource_id: &str,
        resource_type: &str,
        resource_doi: Option<&str>,
        new_version: Version,
    ) -> Result<MergeOutcome> {
        let existing = self.store.load_for_merge(resource_id)?;
        let version_id = new_version.version_id.clone();
        let outcome = merge_version(existing, new_version, resource_id, resource_type, resource_doi)?;

        match &outcome {
            MergeOutcome::Merged {
                resource, created, ..
            } => {
                let path = self.store.save(resource)?;
                info!(
                    "{} {} with version {} -> {}",
                    if *created { "Created" } else { "Updated" },
                    resource_id,
                    version_id,
                    path.display()
                );
            }
            MergeOutcome::Blocked => debug!("Skipping blocked resource {}", resource_id),
            MergeOutcome::OldHit => debug!("Version {} of {} is known", version_id, resource_id),
        }

        Ok(outcome)
    }
}
