//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a fixture that lays out a collection, a dist
//! directory with its working trees and a catalog template in a temporary
//! directory, plus YAML snippets for the records in it.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_template()
//!         .with_resource("r1", &configs::accepted_resource("r1", &["v1"]));
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

use resource_catalog::aggregate::collector::AggregateLayout;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

pub const COLLECTION_DIR: &str = "collection";
pub const DIST_DIR: &str = "dist";
pub const TEMPLATE_FILE: &str = "collection_rdf_template.yaml";
pub const PUBLISHED_BRANCH: &str = "gh-pages";
pub const PREVIEW_PREFIX: &str = "gh-pages-auto-update-";

/// Common YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// Catalog template with `model` and `dataset` buckets.
    pub const TEMPLATE: &str = r#"
format_version: 0.2.0
name: Test Collection
attachments:
  model: []
  dataset: []
config:
  generated_by: tests
"#;

    /// Tool configuration pointing the archive at a closed local port.
    pub const OFFLINE_ARCHIVE: &str = r#"
archive:
  base_url: http://127.0.0.1:9/api/records/
  max_pages: 1
  timeout_secs: 2
"#;

    /// Configuration with a misspelled key.
    pub const MISSPELLED: &str = r#"
archive:
  page_sise: 10
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "invalid: yaml: content:";

    /// An accepted resource whose versions are all accepted, most recent first.
    pub fn accepted_resource(resource_id: &str, versions: &[&str]) -> String {
        resource(
            resource_id,
            "accepted",
            &versions
                .iter()
                .map(|v| (*v, "accepted"))
                .collect::<Vec<_>>(),
        )
    }

    /// A resource record with the given version statuses, most recent first.
    ///
    /// Creation times decrease with the position in `versions`.
    pub fn resource(resource_id: &str, status: &str, versions: &[(&str, &str)]) -> String {
        let mut yaml = format!("id: {resource_id}\nstatus: {status}\ntype: model\nversions:\n");
        let count = versions.len();
        for (i, (version_id, version_status)) in versions.iter().enumerate() {
            yaml.push_str(&format!(
                "  - version_id: '{version_id}'\n    status: {version_status}\n    created: '2024-03-{:02} 10:00:00.000000'\n    rdf_source: https://files/{version_id}/rdf.yaml\n",
                count - i
            ));
        }
        yaml
    }

    /// Version content of a model.
    pub fn model_rdf(name: &str) -> String {
        format!("name: {name}\ntype: model\nformat_version: 0.4.9\n")
    }
}

/// A test fixture that provides a temporary directory laid out like a
/// catalog repository.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_template()
///     .with_resource("r1", &configs::accepted_resource("r1", &["v1"]))
///     .with_published_version("v1", &configs::model_rdf("Nucleus"));
///
/// fixture
///     .command()
///     .args(["generate-collection", "--offline"])
///     .assert()
///     .success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `.resource-catalog.yaml` configuration file with the given content.
    #[allow(dead_code)]
    pub fn with_config(self, content: &str) -> Self {
        self.with_file(".resource-catalog.yaml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add the catalog template at its default location.
    #[allow(dead_code)]
    pub fn with_template(self) -> Self {
        self.with_file(TEMPLATE_FILE, configs::TEMPLATE)
    }

    /// Add a canonical resource record.
    #[allow(dead_code)]
    pub fn with_resource(self, resource_id: &str, content: &str) -> Self {
        self.with_file(
            &format!("{COLLECTION_DIR}/{resource_id}/resource.yaml"),
            content,
        )
    }

    /// Add version content to the published tree.
    #[allow(dead_code)]
    pub fn with_published_version(self, version_id: &str, rdf: &str) -> Self {
        self.with_file(
            &format!("{DIST_DIR}/{PUBLISHED_BRANCH}/resources/{version_id}/rdf.yaml"),
            rdf,
        )
    }

    /// Add version content to the preview tree of `resource_id`.
    #[allow(dead_code)]
    pub fn with_preview_version(self, resource_id: &str, version_id: &str, rdf: &str) -> Self {
        self.with_file(
            &format!(
                "{DIST_DIR}/{PUBLISHED_BRANCH}-previews/{}/resources/{version_id}/rdf.yaml",
                preview_branch(resource_id)
            ),
            rdf,
        )
    }

    /// Make sure the published tree exists, even without content.
    #[allow(dead_code)]
    pub fn with_published_tree(self) -> Self {
        self.temp_dir
            .child(format!("{DIST_DIR}/{PUBLISHED_BRANCH}"))
            .create_dir_all()
            .expect("Failed to create published tree");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    #[allow(dead_code)]
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(".resource-catalog.yaml")
    }

    /// Get the path to the catalog template.
    #[allow(dead_code)]
    pub fn template_path(&self) -> PathBuf {
        self.temp_dir.path().join(TEMPLATE_FILE)
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Read a file below the temp directory.
    #[allow(dead_code)]
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
    }

    /// The standard aggregation layout inside this fixture.
    #[allow(dead_code)]
    pub fn layout(&self) -> AggregateLayout {
        AggregateLayout::under(
            self.path().join(COLLECTION_DIR),
            &self.path().join(DIST_DIR),
            PUBLISHED_BRANCH,
            PREVIEW_PREFIX,
        )
    }

    /// Create a command configured to run in this fixture's directory.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("resource-catalog");
        cmd.current_dir(self.path())
            .env_remove("RESOURCE_CATALOG_CONFIG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Name of the preview branch of `resource_id`.
#[allow(dead_code)]
pub fn preview_branch(resource_id: &str) -> String {
    format!("{PREVIEW_PREFIX}{resource_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_resource() {
        let fixture = TestFixture::new().with_resource("r1", &configs::accepted_resource("r1", &["v1"]));
        assert!(fixture.path().join("collection/r1/resource.yaml").exists());
    }

    #[test]
    fn test_resource_snippet_is_a_valid_record() {
        let yaml = configs::resource("r1", "accepted", &[("v2", "accepted"), ("v1", "blocked")]);
        let resource: resource_catalog::model::Resource = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(resource.resource_id, "r1");
        assert_eq!(resource.versions.len(), 2);
        assert!(resource.versions[0].created > resource.versions[1].created);
    }

    #[test]
    fn test_template_is_valid_yaml() {
        let value: serde_yaml::Value = serde_yaml::from_str(configs::TEMPLATE).unwrap();
        assert!(value.get("attachments").is_some());
    }
}
