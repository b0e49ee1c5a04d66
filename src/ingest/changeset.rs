//! Newly discovered versions per resource and their update descriptors.
//!
//! A `ChangeSet` collects, per resource, the versions an ingest run added.
//! `UpdateDescriptor` renders one selected resource into the flat string
//! fields a CI workflow uses to open a change request.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_yaml::Value;

use crate::error::Result;
use crate::model::{RdfSource, Version};

/// Rendered when no maintainer handle is known.
pub const NO_MAINTAINERS: &str = "none specified";

/// Link prefix used for version DOIs in markdown lists.
const DOI_RESOLVER: &str = "https://www.doi.org/";

/// A version added during this run, with the maintainers its descriptor names.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingVersion {
    pub version: Version,
    pub maintainers: Vec<String>,
}

impl PendingVersion {
    pub fn new(version: Version, maintainers: Vec<String>) -> Self {
        Self {
            version,
            maintainers,
        }
    }

    pub fn created(&self) -> NaiveDateTime {
        self.version.created
    }
}

/// New versions per resource id, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    entries: BTreeMap<String, Vec<PendingVersion>>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, resource_id: &str, pending: PendingVersion) {
        self.entries
            .entry(resource_id.to_string())
            .or_default()
            .push(pending);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, resource_id: &str) -> Option<&[PendingVersion]> {
        self.entries.get(resource_id).map(Vec::as_slice)
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, Vec<PendingVersion>)> {
        self.entries.into_iter()
    }
}

/// Step-output fields describing one resource update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateDescriptor {
    pub resource_id: String,
    /// JSON array of version ids.
    pub new_version_ids: String,
    pub new_version_ids_md: String,
    /// JSON array of descriptor sources, `null` where unknown.
    pub new_version_sources: String,
    pub new_version_sources_md: String,
    pub resource_name: String,
    pub maintainers: String,
}

impl UpdateDescriptor {
    pub fn new(resource_id: &str, versions: &[PendingVersion]) -> Result<Self> {
        let ids: Vec<&str> = versions
            .iter()
            .map(|p| p.version.version_id.as_str())
            .collect();

        let ids_md = versions
            .iter()
            .map(|p| {
                let v = &p.version;
                format!(
                    "  - [{} ({})]({}{})",
                    v.version_id,
                    v.version_name().unwrap_or_default(),
                    DOI_RESOLVER,
                    v.doi().unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let sources: Vec<serde_json::Value> = versions
            .iter()
            .map(|p| source_json(p.version.rdf_source.as_ref()))
            .collect::<Result<_>>()?;

        let sources_md = versions
            .iter()
            .map(|p| format!("  - {}", source_markdown(p.version.rdf_source.as_ref())))
            .collect::<Vec<_>>()
            .join("\n");

        let handles: BTreeSet<&str> = versions
            .iter()
            .flat_map(|p| p.maintainers.iter().map(String::as_str))
            .collect();
        let maintainers = if handles.is_empty() {
            NO_MAINTAINERS.to_string()
        } else {
            handles.into_iter().collect::<Vec<_>>().join(", ")
        };

        Ok(Self {
            resource_id: resource_id.to_string(),
            new_version_ids: serde_json::to_string(&ids)?,
            new_version_ids_md: ids_md,
            new_version_sources: serde_json::to_string(&sources)?,
            new_version_sources_md: sources_md,
            resource_name: versions
                .first()
                .and_then(|p| p.version.name())
                .unwrap_or_default()
                .to_string(),
            maintainers,
        })
    }
}

fn source_json(source: Option<&RdfSource>) -> Result<serde_json::Value> {
    Ok(match source {
        None => serde_json::Value::Null,
        Some(RdfSource::Url(url)) if url.is_empty() => serde_json::Value::Null,
        Some(RdfSource::Url(url)) => serde_json::Value::String(url.clone()),
        Some(RdfSource::Inline(map)) => serde_json::to_value(map)?,
    })
}

fn source_markdown(source: Option<&RdfSource>) -> String {
    match source {
        None => "null".to_string(),
        Some(RdfSource::Url(url)) => url.clone(),
        Some(inline @ RdfSource::Inline(_)) => {
            format!("inline(name={}, ...)", inline.inline_name().unwrap_or("?"))
        }
    }
}

/// Normalize a maintainer handle to exactly one leading `@`, ignoring
/// surrounding whitespace.
pub fn normalize_handle(raw: &str) -> Option<String> {
    let handle = raw.trim().trim_matches('@');
    if handle.is_empty() {
        None
    } else {
        Some(format!("@{}", handle))
    }
}

/// Read `maintainers[*].github_user` from a descriptor.
///
/// Only a list made entirely of mappings is considered; entries without a
/// non-empty string handle are skipped.
pub fn maintainers_from_descriptor(descriptor: &Value) -> Vec<String> {
    let Some(list) = descriptor.get("maintainers").and_then(Value::as_sequence) else {
        return Vec::new();
    };
    if !list.iter().all(Value::is_mapping) {
        return Vec::new();
    }
    list.iter()
        .filter_map(|m| m.get("github_user").and_then(Value::as_str))
        .filter_map(normalize_handle)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::timestamp;
    use serde_yaml::Mapping;

    fn pending(id: &str, source: Option<RdfSource>, maintainers: &[&str]) -> PendingVersion {
        let version = Version::new(id, timestamp::parse("2024-01-01 00:00:00").unwrap(), source)
            .with_field("name", format!("Model {id}"))
            .with_field("version_name", "version 1")
            .with_field("doi", format!("10.5281/zenodo.{id}"));
        PendingVersion::new(version, maintainers.iter().map(|m| m.to_string()).collect())
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle("alice"), Some("@alice".to_string()));
        assert_eq!(normalize_handle("@@bob"), Some("@bob".to_string()));
        assert_eq!(normalize_handle(" @carol "), Some("@carol".to_string()));
        assert_eq!(normalize_handle("@"), None);
        assert_eq!(normalize_handle(""), None);
    }

    #[test]
    fn test_maintainers_from_descriptor() {
        let descriptor: Value = serde_yaml::from_str(
            "maintainers:\n  - github_user: alice\n  - name: No Handle\n  - github_user: ''\n",
        )
        .unwrap();
        assert_eq!(maintainers_from_descriptor(&descriptor), vec!["@alice"]);

        let mixed: Value = serde_yaml::from_str("maintainers:\n  - alice\n  - github_user: bob\n").unwrap();
        assert!(maintainers_from_descriptor(&mixed).is_empty());
    }

    #[test]
    fn test_changeset_groups_by_resource() {
        let mut changes = ChangeSet::new();
        changes.record("b", pending("2", None, &[]));
        changes.record("a", pending("1", None, &[]));
        changes.record("b", pending("3", None, &[]));
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get("b").unwrap().len(), 2);
        assert_eq!(changes.resource_ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_descriptor_rendering() {
        let mut inline = Mapping::new();
        inline.insert(Value::from("name"), Value::from("Inline One"));
        let versions = vec![
            pending("11", Some(RdfSource::Url("https://files/rdf.yaml".into())), &["@bob", "@alice"]),
            pending("12", Some(RdfSource::Inline(inline)), &["@alice"]),
            pending("13", None, &[]),
        ];

        let descriptor = UpdateDescriptor::new("10.5281/zenodo.10", &versions).unwrap();
        assert_eq!(descriptor.new_version_ids, r#"["11","12","13"]"#);
        assert_eq!(
            descriptor.new_version_ids_md.lines().next().unwrap(),
            "  - [11 (version 1)](https://www.doi.org/10.5281/zenodo.11)"
        );
        assert_eq!(
            descriptor.new_version_sources,
            r#"["https://files/rdf.yaml",{"name":"Inline One"},null]"#
        );
        assert_eq!(
            descriptor.new_version_sources_md,
            "  - https://files/rdf.yaml\n  - inline(name=Inline One, ...)\n  - null"
        );
        assert_eq!(descriptor.resource_name, "Model 11");
        assert_eq!(descriptor.maintainers, "@alice, @bob");
    }

    #[test]
    fn test_descriptor_without_maintainers() {
        let descriptor = UpdateDescriptor::new("r", &[pending("1", None, &[])]).unwrap();
        assert_eq!(descriptor.maintainers, NO_MAINTAINERS);
    }
}
