//! Building the catalog document from resolved resources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_yaml::{Mapping, Value};

use crate::aggregate::collector::ResolvedResource;
use crate::error::{Error, Result};
use crate::model::{ValidationSummary, UNKNOWN_TYPE};
use crate::storage::read_yaml_value;

pub const ATTACHMENTS_KEY: &str = "attachments";
pub const CONFIG_KEY: &str = "config";

/// Per-type counts of one catalog build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Accepted resources filed, per type.
    pub n_resources: BTreeMap<String, u64>,
    /// Accepted versions filed, per type.
    pub n_resource_versions: BTreeMap<String, u64>,
    /// Resources left out, with the reason.
    pub ignored: Vec<String>,
}

impl CatalogStats {
    pub fn accepted_resources(&self) -> u64 {
        self.n_resources.values().sum()
    }

    pub fn accepted_versions(&self) -> u64 {
        self.n_resource_versions.values().sum()
    }

    fn count(&mut self, resource_type: &str, versions: u64) {
        *self.n_resources.entry(resource_type.to_string()).or_default() += 1;
        *self
            .n_resource_versions
            .entry(resource_type.to_string())
            .or_default() += versions;
    }

    fn ignore(&mut self, reason: String) {
        warn!("{}", reason);
        self.ignored.push(reason);
    }
}

fn counts_mapping(counts: &BTreeMap<String, u64>) -> Value {
    Value::Mapping(
        counts
            .iter()
            .map(|(k, v)| (Value::from(k.as_str()), Value::from(*v)))
            .collect(),
    )
}

/// Assembles the catalog from a template document.
///
/// Only type buckets listed under `attachments` in the template receive
/// entries. Resources of any other type are left out.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    template: Mapping,
    source: PathBuf,
}

impl CatalogBuilder {
    /// Use an in-memory template, which must be a mapping.
    pub fn new(template: Value, source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let mut template = match template {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            other => {
                return Err(Error::MalformedContent {
                    path: source,
                    message: format!("template must be a mapping, found {:?}", other),
                })
            }
        };

        ensure_mapping(&mut template, ATTACHMENTS_KEY, &source)?;
        ensure_mapping(&mut template, CONFIG_KEY, &source)?;
        Ok(Self { template, source })
    }

    /// Load the template from a file. A missing template is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        match read_yaml_value(path)? {
            Some(value) => Self::new(value, path),
            None => Err(Error::MissingContent {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Type buckets the template accepts.
    pub fn buckets(&self) -> Vec<String> {
        self.template
            .get(ATTACHMENTS_KEY)
            .and_then(Value::as_mapping)
            .into_iter()
            .flatten()
            .filter(|(_, v)| v.is_sequence())
            .filter_map(|(k, _)| k.as_str().map(str::to_string))
            .collect()
    }

    /// Build the catalog document.
    pub fn build(&self, resources: &[ResolvedResource]) -> Result<(Value, CatalogStats)> {
        let mut document = self.template.clone();
        let mut stats = CatalogStats::default();

        {
            let attachments = mapping_mut(&mut document, ATTACHMENTS_KEY, &self.source)?;
            for resource in resources {
                let Some((entry, versions)) = catalog_entry(resource) else {
                    stats.ignore(format!(
                        "Ignoring resource at {} without any accepted versions",
                        resource.record_path.display()
                    ));
                    continue;
                };

                let resource_type = entry
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or(UNKNOWN_TYPE)
                    .to_string();
                match attachments.get_mut(resource_type.as_str()) {
                    Some(Value::Sequence(bucket)) => {
                        debug!(
                            "Filing {} under '{}' with {} versions",
                            resource.resource_id, resource_type, versions
                        );
                        bucket.push(Value::Mapping(entry));
                        stats.count(&resource_type, versions);
                    }
                    _ => stats.ignore(format!(
                        "Ignoring resource {} with type '{}'",
                        resource.record_path.display(),
                        resource_type
                    )),
                }
            }
        }

        let config = mapping_mut(&mut document, CONFIG_KEY, &self.source)?;
        config.insert(Value::from("n_resources"), counts_mapping(&stats.n_resources));
        config.insert(
            Value::from("n_resource_versions"),
            counts_mapping(&stats.n_resource_versions),
        );

        Ok((Value::Mapping(document), stats))
    }
}

/// The catalog entry of one resource and the number of versions it holds.
///
/// The first resolved version is the latest; every later one is appended to
/// its `previous_versions` in resolution order.
pub fn catalog_entry(resource: &ResolvedResource) -> Option<(Mapping, u64)> {
    let mut versions = resource.versions.iter().map(|version| {
        let mut content = version.content.clone();
        content.insert(
            Value::from("validation_summaries"),
            Value::Mapping(ValidationSummary::to_mapping(&version.validation_summaries)),
        );
        content
    });

    let mut latest = versions.next()?;
    let previous: Vec<Value> = versions.map(Value::Mapping).collect();
    let count = 1 + previous.len() as u64;
    latest.insert(
        Value::from("resource_id"),
        Value::from(resource.resource_id.as_str()),
    );
    latest.insert(Value::from("previous_versions"), Value::Sequence(previous));
    Some((latest, count))
}

/// Make `key` a mapping, creating it when absent or null.
fn ensure_mapping(document: &mut Mapping, key: &str, source: &Path) -> Result<()> {
    match document.get(key) {
        None | Some(Value::Null) => {
            document.insert(Value::from(key), Value::Mapping(Mapping::new()));
            Ok(())
        }
        Some(Value::Mapping(_)) => Ok(()),
        Some(other) => Err(Error::MalformedContent {
            path: source.to_path_buf(),
            message: format!("'{}' must be a mapping, found {:?}", key, other),
        }),
    }
}

fn mapping_mut<'a>(document: &'a mut Mapping, key: &str, source: &Path) -> Result<&'a mut Mapping> {
    document
        .get_mut(key)
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| Error::MalformedContent {
            path: source.to_path_buf(),
            message: format!("'{}' must be a mapping", key),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::collector::ResolvedVersion;

    fn template() -> Value {
        serde_yaml::from_str(
            r#"
name: Collection
attachments:
  model: []
  dataset: []
  notes: not a bucket
config:
  url: https://example.org
"#,
        )
        .unwrap()
    }

    fn version(id: &str, resource_type: &str) -> ResolvedVersion {
        let content: Mapping = serde_yaml::from_str(&format!(
            "version_id: {}\ntype: {}\nname: thing\n",
            id, resource_type
        ))
        .unwrap();
        ResolvedVersion {
            version_id: id.to_string(),
            content,
            validation_summaries: vec![ValidationSummary::new(
                "static",
                Value::from("ok"),
            )],
            dir: PathBuf::from(id),
        }
    }

    fn resource(id: &str, versions: Vec<ResolvedVersion>) -> ResolvedResource {
        ResolvedResource {
            resource_id: id.to_string(),
            record_path: PathBuf::from(format!("collection/{}/resource.yaml", id)),
            versions,
        }
    }

    #[test]
    fn test_template_without_attachments_or_config() {
        let builder = CatalogBuilder::new(Value::Mapping(Mapping::new()), "t.yaml").unwrap();
        assert!(builder.buckets().is_empty());
        let (doc, stats) = builder.build(&[]).unwrap();
        assert!(doc.get(ATTACHMENTS_KEY).unwrap().is_mapping());
        assert!(doc["config"]["n_resources"].as_mapping().unwrap().is_empty());
        assert_eq!(stats.accepted_resources(), 0);
    }

    #[test]
    fn test_template_scalar_rejected() {
        assert!(matches!(
            CatalogBuilder::new(Value::from("nope"), "t.yaml"),
            Err(Error::MalformedContent { .. })
        ));
    }

    #[test]
    fn test_buckets_lists_only_sequences() {
        let builder = CatalogBuilder::new(template(), "t.yaml").unwrap();
        let mut buckets = builder.buckets();
        buckets.sort();
        assert_eq!(buckets, vec!["dataset", "model"]);
    }

    #[test]
    fn test_latest_and_previous_versions() {
        let builder = CatalogBuilder::new(template(), "t.yaml").unwrap();
        let r = resource("r1", vec![version("v2", "model"), version("v1", "model")]);
        let (doc, stats) = builder.build(&[r]).unwrap();

        let entries = doc["attachments"]["model"].as_sequence().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry["version_id"].as_str(), Some("v2"));
        assert_eq!(entry["resource_id"].as_str(), Some("r1"));
        let previous = entry["previous_versions"].as_sequence().unwrap();
        assert_eq!(previous.len(), 1);
        assert_eq!(previous[0]["version_id"].as_str(), Some("v1"));
        assert!(previous[0].get("previous_versions").is_none());
        assert_eq!(
            entry["validation_summaries"]["static"]["output"].as_str(),
            Some("ok")
        );

        assert_eq!(stats.n_resources.get("model"), Some(&1));
        assert_eq!(stats.n_resource_versions.get("model"), Some(&2));
        assert_eq!(doc["config"]["n_resources"]["model"].as_u64(), Some(1));
        assert_eq!(doc["config"]["n_resource_versions"]["model"].as_u64(), Some(2));
        assert_eq!(doc["config"]["url"].as_str(), Some("https://example.org"));
    }

    #[test]
    fn test_unknown_and_non_list_types_are_dropped() {
        let builder = CatalogBuilder::new(template(), "t.yaml").unwrap();
        let resources = vec![
            resource("a", vec![version("a1", "application")]),
            resource("b", vec![version("b1", "notes")]),
            resource("c", vec![version("c1", "dataset")]),
        ];
        let (doc, stats) = builder.build(&resources).unwrap();

        assert_eq!(stats.ignored.len(), 2);
        assert_eq!(stats.accepted_resources(), 1);
        let attachments = doc["attachments"].as_mapping().unwrap();
        assert!(attachments.get("application").is_none());
        assert_eq!(attachments["notes"].as_str(), Some("not a bucket"));
    }

    #[test]
    fn test_resource_without_versions_is_ignored() {
        let builder = CatalogBuilder::new(template(), "t.yaml").unwrap();
        let (_, stats) = builder.build(&[resource("r1", vec![])]).unwrap();
        assert_eq!(stats.accepted_resources(), 0);
        assert!(stats.ignored[0].contains("without any accepted versions"));
    }

    #[test]
    fn test_missing_type_files_under_unknown() {
        let template: Value =
            serde_yaml::from_str("attachments:\n  unknown: []\n").unwrap();
        let builder = CatalogBuilder::new(template, "t.yaml").unwrap();
        let mut v = version("v1", "model");
        v.content.remove("type");
        let (doc, stats) = builder.build(&[resource("r1", vec![v])]).unwrap();
        assert_eq!(doc["attachments"]["unknown"].as_sequence().unwrap().len(), 1);
        assert_eq!(stats.n_resources.get(UNKNOWN_TYPE), Some(&1));
    }
}
