//! Default values for resource-catalog configuration.
//!
//! This module provides centralized default values used by the configuration
//! layer and the pipelines, ensuring consistency and avoiding duplication.

/// Configuration file looked up when `--config` is not given.
pub const CONFIG_FILE: &str = ".resource-catalog.yaml";

/// Search endpoint of the archive service.
pub const ARCHIVE_BASE_URL: &str = "https://zenodo.org/api/records/";

/// Keyword all cataloged archive records carry.
pub const ARCHIVE_KEYWORDS: &str = "bioimage.io";

pub const ARCHIVE_PAGE_SIZE: u32 = 1000;

/// Hard cap on archive pages requested per scan.
pub const ARCHIVE_MAX_PAGES: u32 = 9;

pub const ARCHIVE_TIMEOUT_SECS: u64 = 30;

/// Name of the descriptor file inside archive records and version folders.
pub const DESCRIPTOR_FILE: &str = "rdf.yaml";

/// Change requests opened per ingest run.
pub const MAX_RESOURCE_COUNT: usize = 3;

/// Branch prefix marking a pending change request.
pub const AUTO_UPDATE_PREFIX: &str = "auto-update-";

pub const COLLECTION_DIR: &str = "collection";
pub const DIST_DIR: &str = "dist";
pub const TEMPLATE_FILE: &str = "collection_rdf_template.yaml";
pub const PUBLISHED_BRANCH: &str = "gh-pages";

/// Prefix of per-resource preview branches.
pub const PREVIEW_PREFIX: &str = "gh-pages-auto-update-";

pub const REMOTE: &str = "origin";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_prefix_extends_published_branch() {
        assert!(PREVIEW_PREFIX.starts_with(PUBLISHED_BRANCH));
        assert!(PREVIEW_PREFIX.ends_with(AUTO_UPDATE_PREFIX));
    }
}
