//! # Resource Data Model
//!
//! Typed records for the per-resource storage format shared by both
//! pipelines.
//!
//! - **`Resource`**: one `resource.yaml` record. Holds the moderation
//!   `Status`, the type classifier and the version history (most recent
//!   first).
//! - **`Version`**: one entry of a resource's history. `version_id` together
//!   with `rdf_source` identifies a version for deduplication. Descriptive
//!   fields the pipelines do not interpret (`name`, `doi`, `version_name`, ...)
//!   are kept in `extra` and written back untouched.
//! - **`ModerationRecord`**: the statuses of a record, all that aggregation
//!   needs from it.
//! - **`ValidationSummary`**: the result mapping of one validator for one
//!   version, attached to catalog entries.
//!
//! Timestamps are naive (`chrono::NaiveDateTime`). They are written as
//! `YYYY-MM-DD HH:MM:SS[.ffffff]` and read from either that form or RFC 3339,
//! in which case the offset is dropped and the wall-clock time kept.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};

/// Type classifier used when none is known.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Key stripped from validation summaries before they are attached.
const SOURCE_NAME_KEY: &str = "source_name";

/// Moderation status of a resource or version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Accepted,
    Pending,
    Blocked,
    /// Any status this tool does not know about, kept verbatim.
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Accepted => "accepted",
            Status::Pending => "pending",
            Status::Blocked => "blocked",
            Status::Other(s) => s,
        }
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            "accepted" => Status::Accepted,
            "pending" => Status::Pending,
            "blocked" => Status::Blocked,
            _ => Status::Other(value),
        }
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the descriptor of a version comes from: a URL or an inline mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RdfSource {
    Url(String),
    Inline(Mapping),
}

impl RdfSource {
    /// Value of the `name` field of an inline descriptor.
    pub fn inline_name(&self) -> Option<&str> {
        match self {
            RdfSource::Url(_) => None,
            RdfSource::Inline(map) => map.get("name").and_then(Value::as_str),
        }
    }
}

/// One published snapshot of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    #[serde(deserialize_with = "scalar_string")]
    pub version_id: String,
    pub status: Status,
    #[serde(with = "timestamp")]
    pub created: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdf_source: Option<RdfSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<Value>>,
    /// Descriptive fields passed through opaquely.
    #[serde(flatten)]
    pub extra: Mapping,
}

impl Version {
    /// Create an accepted version without descriptive fields.
    pub fn new(
        version_id: impl Into<String>,
        created: NaiveDateTime,
        rdf_source: Option<RdfSource>,
    ) -> Self {
        Self {
            version_id: version_id.into(),
            status: Status::Accepted,
            created,
            rdf_source,
            owners: None,
            extra: Mapping::new(),
        }
    }

    /// Set a descriptive field, returning the version for chaining.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(Value::from(key), value.into());
        self
    }

    /// Read a descriptive string field.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.field_str("name")
    }

    pub fn version_name(&self) -> Option<&str> {
        self.field_str("version_name")
    }

    pub fn doi(&self) -> Option<&str> {
        self.field_str("doi")
    }

    /// Whether this version matches the given deduplication key.
    pub fn is_same_as(&self, version_id: &str, rdf_source: Option<&RdfSource>) -> bool {
        self.version_id == version_id && self.rdf_source.as_ref() == rdf_source
    }
}

/// A cataloged entity and its version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(alias = "id", deserialize_with = "scalar_string")]
    pub resource_id: String,
    pub status: Status,
    #[serde(rename = "type", default = "unknown_type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainers: Option<Vec<Value>>,
    /// Most recent first.
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(flatten)]
    pub extra: Mapping,
}

fn unknown_type() -> String {
    UNKNOWN_TYPE.to_string()
}

impl Resource {
    /// Create a new accepted resource holding a single version.
    pub fn new(
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        doi: Option<String>,
        first_version: Version,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            status: Status::Accepted,
            resource_type: resource_type.into(),
            doi: doi.filter(|d| !d.is_empty()),
            owners: None,
            maintainers: None,
            versions: vec![first_version],
            extra: Mapping::new(),
        }
    }

    /// Check the structural invariants of a stored record.
    ///
    /// Accepted and pending resources must have at least one version and an
    /// unrecognised status is an integrity violation.
    pub fn validate(&self) -> Result<()> {
        match &self.status {
            Status::Accepted | Status::Pending if self.versions.is_empty() => {
                Err(Error::InvalidResource {
                    resource_id: self.resource_id.clone(),
                    message: format!("{} resource without any versions", self.status),
                })
            }
            Status::Other(status) => Err(Error::InvalidStatus {
                resource_id: self.resource_id.clone(),
                status: status.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub fn contains_version(&self, version_id: &str, rdf_source: Option<&RdfSource>) -> bool {
        self.versions
            .iter()
            .any(|v| v.is_same_as(version_id, rdf_source))
    }

    /// Insert a version and restore the `created`-descending order.
    ///
    /// The sort is stable, so a new version placed in front stays ahead of
    /// existing versions with the same timestamp.
    pub fn insert_version(&mut self, version: Version) {
        self.versions.insert(0, version);
        self.versions.sort_by(|a, b| b.created.cmp(&a.created));
    }

    pub fn accepted_versions(&self) -> impl Iterator<Item = &Version> {
        self.versions
            .iter()
            .filter(|v| v.status == Status::Accepted)
    }

    /// Drop an empty external identifier.
    pub fn normalize_doi(&mut self) {
        if self.doi.as_deref().is_some_and(str::is_empty) {
            self.doi = None;
        }
    }
}

/// The moderation state of a resource record, as aggregation reads it.
///
/// Only identifiers and statuses are required. Timestamps, sources and every
/// other field are ignored here, so a record missing them still aggregates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModerationRecord {
    #[serde(alias = "id", deserialize_with = "scalar_string")]
    pub resource_id: String,
    pub status: Status,
    /// Most recent first.
    #[serde(default)]
    pub versions: Vec<VersionStatus>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VersionStatus {
    #[serde(deserialize_with = "scalar_string")]
    pub version_id: String,
    pub status: Status,
}

impl ModerationRecord {
    pub fn accepted_versions(&self) -> impl Iterator<Item = &VersionStatus> {
        self.versions
            .iter()
            .filter(|v| v.status == Status::Accepted)
    }
}

/// The result mapping one validator produced for one version.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSummary {
    pub validator: String,
    pub result: Mapping,
}

impl ValidationSummary {
    /// Build a summary from a loaded record.
    ///
    /// A scalar or sequence is wrapped as `{output: <value>}`. The
    /// `source_name` key is removed.
    pub fn new(validator: impl Into<String>, raw: Value) -> Self {
        let mut result = match raw {
            Value::Mapping(map) => map,
            other => {
                let mut map = Mapping::new();
                map.insert(Value::from("output"), other);
                map
            }
        };
        result.remove(SOURCE_NAME_KEY);
        Self {
            validator: validator.into(),
            result,
        }
    }

    /// Collect summaries into the mapping attached to a catalog entry.
    pub fn to_mapping(summaries: &[ValidationSummary]) -> Mapping {
        summaries
            .iter()
            .map(|s| (Value::from(s.validator.clone()), Value::Mapping(s.result.clone())))
            .collect()
    }
}

/// Accept strings as well as numbers and booleans for identifier fields.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a scalar identifier, found {:?}",
            other
        ))),
    }
}

/// Serde adapter for naive timestamps.
pub mod timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    const OFFSET_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f %:z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
    ];

    /// Parse a timestamp, dropping any offset without converting.
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }
        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(dt);
            }
        }
        let zulu = raw.strip_suffix('Z').map(|s| format!("{s}+00:00"));
        let candidate = zulu.as_deref().unwrap_or(raw);
        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(candidate, format) {
                return Some(dt.naive_local());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    pub fn format(value: &NaiveDateTime) -> String {
        value.format(STORAGE_FORMAT).to_string()
    }

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as _;

        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }
}
