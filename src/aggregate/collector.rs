//! Enumerating known resources and resolving their accepted versions.
//!
//! Every `resource.yaml` below the collection root is a known resource. For
//! accepted resources each accepted version is resolved through a
//! `VersionResolver` whose providers are, in order, the resource's preview
//! tree (when its branch exists on the remote) and the published tree.
//!
//! Per-item problems never abort collection: unreadable records, versions
//! without content and versions whose content is not a record are reported in
//! `Collection::skipped` and logged. A validation summary that cannot be read
//! is attached as an `output` message instead of dropping its version.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use log::{info, warn};
use serde_yaml::{Mapping, Value};
use walkdir::WalkDir;

use crate::aggregate::resolver::{ContentProvider, PreviewTree, PublishedTree, VersionResolver};
use crate::error::{Error, Result};
use crate::git::BranchCheckout;
use crate::model::{ModerationRecord, Status, ValidationSummary};
use crate::storage::{read_record, read_yaml_value, RESOURCE_FILE};

/// File name prefix of validation summaries.
pub const VALIDATION_SUMMARY_PREFIX: &str = "validation_summary_";

/// Directory layout an aggregation run works in.
#[derive(Debug, Clone)]
pub struct AggregateLayout {
    pub collection_dir: PathBuf,
    /// Checkout of the published branch.
    pub published_dir: PathBuf,
    /// Parent of the preview checkouts, one folder per branch.
    pub previews_dir: PathBuf,
    /// Tree receiving consumed preview content and the catalog.
    pub update_dir: PathBuf,
    pub published_branch: String,
    pub preview_prefix: String,
    pub descriptor: String,
}

impl AggregateLayout {
    /// Standard layout below `dist_dir`.
    pub fn under(
        collection_dir: impl Into<PathBuf>,
        dist_dir: &Path,
        published_branch: &str,
        preview_prefix: &str,
    ) -> Self {
        Self {
            collection_dir: collection_dir.into(),
            published_dir: dist_dir.join(published_branch),
            previews_dir: dist_dir.join(format!("{}-previews", published_branch)),
            update_dir: dist_dir.join(format!("{}-update", published_branch)),
            published_branch: published_branch.to_string(),
            preview_prefix: preview_prefix.to_string(),
            descriptor: crate::defaults::DESCRIPTOR_FILE.to_string(),
        }
    }

    pub fn preview_branch(&self, resource_id: &str) -> String {
        format!("{}{}", self.preview_prefix, resource_id)
    }
}

/// A version whose content was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVersion {
    pub version_id: String,
    pub content: Mapping,
    pub validation_summaries: Vec<ValidationSummary>,
    pub dir: PathBuf,
}

/// An accepted resource with its resolved accepted versions, most recent first.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResource {
    pub resource_id: String,
    pub record_path: PathBuf,
    pub versions: Vec<ResolvedVersion>,
}

/// Something left out of the catalog, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of enumerating the collection.
#[derive(Debug, Default)]
pub struct Collection {
    /// Number of resource records found, whatever their status.
    pub known: usize,
    pub resources: Vec<ResolvedResource>,
    /// Preview branches whose content was consumed, each listed once.
    pub consumed_previews: Vec<String>,
    pub skipped: Vec<Skipped>,
}

impl Collection {
    fn skip(&mut self, path: PathBuf, reason: impl std::fmt::Display) {
        warn!("Ignoring {}: {}", path.display(), reason);
        self.skipped.push(Skipped {
            path,
            reason: reason.to_string(),
        });
    }

    fn mark_consumed(&mut self, branch: String) {
        if !self.consumed_previews.contains(&branch) {
            self.consumed_previews.push(branch);
        }
    }
}

/// Find all resource records below `root`, sorted by path.
pub fn find_resource_records(root: &Path) -> Vec<PathBuf> {
    let mut records: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == RESOURCE_FILE)
        .map(|entry| entry.into_path())
        .collect();
    records.sort();
    records
}

/// Load the validation summaries stored next to a version's descriptor.
///
/// A summary file that cannot be read or parsed is replaced by a summary
/// whose `output` is the error message.
pub fn load_validation_summaries(dir: &Path) -> Result<Vec<ValidationSummary>> {
    let pattern = format!(
        "{}/{}*.yaml",
        Pattern::escape(&dir.to_string_lossy()),
        VALIDATION_SUMMARY_PREFIX
    );
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(|p| p.ok()).collect();
    paths.sort();

    let mut summaries = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(validator) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix(VALIDATION_SUMMARY_PREFIX))
        else {
            continue;
        };
        let raw = match read_yaml_value(&path) {
            Ok(raw) => raw.unwrap_or(Value::Null),
            Err(e) => {
                warn!("Unreadable validation summary {}: {}", path.display(), e);
                Value::from(format!("failed to load validation summary: {}", e))
            }
        };
        summaries.push(ValidationSummary::new(validator, raw));
    }
    Ok(summaries)
}

/// Walks the collection and resolves accepted versions.
pub struct ResourceCollector<'a> {
    layout: &'a AggregateLayout,
    remote_branches: HashSet<String>,
    checkout: &'a dyn BranchCheckout,
}

impl<'a> ResourceCollector<'a> {
    pub fn new(
        layout: &'a AggregateLayout,
        remote_branches: impl IntoIterator<Item = String>,
        checkout: &'a dyn BranchCheckout,
    ) -> Self {
        Self {
            layout,
            remote_branches: remote_branches.into_iter().collect(),
            checkout,
        }
    }

    /// Content providers for one resource, highest priority first.
    ///
    /// A preview whose checkout fails is left out and the published tree
    /// serves its versions.
    fn providers_for(&self, resource_id: &str) -> Vec<Box<dyn ContentProvider>> {
        let mut providers: Vec<Box<dyn ContentProvider>> = Vec::new();

        let branch = self.layout.preview_branch(resource_id);
        if self.remote_branches.contains(&branch) {
            let dir = self.layout.previews_dir.join(&branch);
            match self.checkout.checkout(&branch, &dir) {
                Ok(()) => providers.push(Box::new(PreviewTree::new(
                    &branch,
                    dir,
                    &self.layout.update_dir,
                ))),
                Err(e) => warn!("Ignoring preview {}: {}", branch, e),
            }
        }
        providers.push(Box::new(PublishedTree::new(
            &self.layout.published_branch,
            &self.layout.published_dir,
        )));
        providers
    }

    pub fn collect(&self) -> Result<Collection> {
        let mut collection = Collection::default();
        let records = find_resource_records(&self.layout.collection_dir);
        collection.known = records.len();
        info!(
            "Found {} resource records in {}",
            records.len(),
            self.layout.collection_dir.display()
        );

        for record_path in records {
            let resource = match read_record::<ModerationRecord>(&record_path) {
                Ok(resource) => resource,
                Err(e) => {
                    collection.skip(record_path, e);
                    continue;
                }
            };
            if resource.status != Status::Accepted {
                continue;
            }

            let versions = self.resolve_versions(&resource, &mut collection);
            collection.resources.push(ResolvedResource {
                resource_id: resource.resource_id,
                record_path,
                versions,
            });
        }

        Ok(collection)
    }

    fn resolve_versions(
        &self,
        resource: &ModerationRecord,
        collection: &mut Collection,
    ) -> Vec<ResolvedVersion> {
        let mut resolver = VersionResolver::new(
            self.providers_for(&resource.resource_id),
            &self.layout.descriptor,
        );

        let mut resolved = Vec::new();
        for version in resource.accepted_versions() {
            let located = match resolver.resolve(&version.version_id) {
                Ok(located) => located,
                Err(Error::MissingContent { path }) => {
                    collection.skip(path, "missing resource version");
                    continue;
                }
                Err(e) => {
                    collection.skip(resolver.fallback_path(&version.version_id), e);
                    continue;
                }
            };
            if let Some(branch) = located.consumed {
                collection.mark_consumed(branch);
            }

            let path = located.dir.join(&self.layout.descriptor);
            let content = match read_version_content(&path) {
                Ok(content) => content,
                Err(e) => {
                    collection.skip(path, e);
                    continue;
                }
            };

            let validation_summaries = match load_validation_summaries(&located.dir) {
                Ok(summaries) => summaries,
                Err(e) => {
                    collection.skip(located.dir, e);
                    continue;
                }
            };
            resolved.push(ResolvedVersion {
                version_id: version.version_id.clone(),
                content,
                validation_summaries,
                dir: located.dir,
            });
        }
        resolved
    }
}

/// Read a version descriptor, which must be a mapping.
fn read_version_content(path: &Path) -> Result<Mapping> {
    let malformed = |message: String| Error::MalformedContent {
        path: path.to_path_buf(),
        message,
    };
    match read_yaml_value(path) {
        Ok(Some(Value::Mapping(map))) => Ok(map),
        Ok(Some(other)) => Err(malformed(format!("expected a mapping, found {:?}", other))),
        Ok(None) => Err(Error::MissingContent {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(malformed(e.to_string())),
    }
}
