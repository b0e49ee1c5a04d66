//! # Configuration Schema and Parsing
//!
//! This module defines the `.resource-catalog.yaml` configuration file and
//! the logic for parsing it. Every key is optional; an empty file yields the
//! defaults from `crate::defaults`.
//!
//! ```yaml
//! archive:
//!   base_url: https://zenodo.org/api/records/
//!   keywords: bioimage.io
//!   page_size: 1000
//!   max_pages: 9
//! ingest:
//!   max_resource_count: 3
//! collection:
//!   collection_dir: collection
//!   dist_dir: dist
//!   template: collection_rdf_template.yaml
//! ```
//!
//! Unknown keys are rejected so a misspelt option does not silently fall back
//! to its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::aggregate::collector::AggregateLayout;
use crate::defaults;
use crate::error::{Error, Result};
use crate::ingest::scanner::ScanOptions;
use crate::ingest::selector::UpdateSelector;
use crate::suggestions;

/// Access to the archive service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub base_url: String,
    pub keywords: String,
    pub page_size: u32,
    /// Hard cap on pages requested per scan.
    pub max_pages: u32,
    pub descriptor_name: String,
    pub timeout_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::ARCHIVE_BASE_URL.to_string(),
            keywords: defaults::ARCHIVE_KEYWORDS.to_string(),
            page_size: defaults::ARCHIVE_PAGE_SIZE,
            max_pages: defaults::ARCHIVE_MAX_PAGES,
            descriptor_name: defaults::DESCRIPTOR_FILE.to_string(),
            timeout_secs: defaults::ARCHIVE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Change requests opened per run.
    pub max_resource_count: usize,
    pub auto_update_prefix: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_resource_count: defaults::MAX_RESOURCE_COUNT,
            auto_update_prefix: defaults::AUTO_UPDATE_PREFIX.to_string(),
        }
    }
}

/// Where resource records, working trees and the template live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionConfig {
    pub collection_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub template: PathBuf,
    pub published_branch: String,
    pub preview_prefix: String,
    pub remote: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            collection_dir: PathBuf::from(defaults::COLLECTION_DIR),
            dist_dir: PathBuf::from(defaults::DIST_DIR),
            template: PathBuf::from(defaults::TEMPLATE_FILE),
            published_branch: defaults::PUBLISHED_BRANCH.to_string(),
            preview_prefix: defaults::PREVIEW_PREFIX.to_string(),
            remote: defaults::REMOTE.to_string(),
        }
    }
}

/// The complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub archive: ArchiveConfig,
    pub ingest: IngestConfig,
    pub collection: CollectionConfig,
}

impl Config {
    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = Url::parse(&self.archive.base_url) {
            return Err(invalid(
                format!("archive.base_url '{}' is not a URL: {}", self.archive.base_url, e),
                "Use an absolute URL such as https://zenodo.org/api/records/",
            ));
        }
        if self.archive.page_size == 0 || self.archive.max_pages == 0 {
            return Err(invalid(
                "archive.page_size and archive.max_pages must be at least 1".to_string(),
                "Remove the keys to use the defaults (1000 and 9)",
            ));
        }
        if self.archive.descriptor_name.is_empty() {
            return Err(invalid(
                "archive.descriptor_name must not be empty".to_string(),
                "The archive descriptor is usually named rdf.yaml",
            ));
        }
        if self.ingest.auto_update_prefix.is_empty() || self.collection.preview_prefix.is_empty() {
            return Err(invalid(
                "branch prefixes must not be empty".to_string(),
                "An empty prefix would match every branch",
            ));
        }
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            page_size: self.archive.page_size,
            max_pages: self.archive.max_pages,
            descriptor_name: self.archive.descriptor_name.clone(),
        }
    }

    pub fn selector(&self) -> UpdateSelector {
        UpdateSelector::new(
            self.ingest.max_resource_count,
            &self.ingest.auto_update_prefix,
        )
    }

    pub fn layout(&self) -> AggregateLayout {
        let mut layout = AggregateLayout::under(
            &self.collection.collection_dir,
            &self.collection.dist_dir,
            &self.collection.published_branch,
            &self.collection.preview_prefix,
        );
        layout.descriptor = self.archive.descriptor_name.clone();
        layout
    }
}

fn invalid(message: String, hint: &str) -> Error {
    Error::ConfigParse {
        message,
        hint: Some(hint.to_string()),
    }
}

/// Parses a YAML string into a `Config`.
///
/// An empty document yields the defaults.
pub fn parse(yaml_content: &str) -> Result<Config> {
    if yaml_content.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_yaml::from_str(yaml_content).map_err(|e| {
        let message = e.to_string();
        let hint = suggestions::unknown_field_hint(&message);
        Error::ConfigParse { message, hint }
    })?;
    config.validate()?;
    Ok(config)
}

/// Parse a `Config` from a YAML file path
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}
