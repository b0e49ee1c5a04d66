//! # Resource Catalog Library
//!
//! This library maintains a catalog of versioned resources published to an
//! external archive. It is designed to be used by the `resource-catalog`
//! command-line tool from CI workflows, but both pipelines are plain library
//! functions over narrow collaborator traits and can be driven directly.
//!
//! ## Quick Example
//!
//! ```
//! use resource_catalog::aggregate::catalog::CatalogBuilder;
//! use resource_catalog::aggregate::json;
//!
//! let template = serde_yaml::from_str("attachments:\n  model: []\n").unwrap();
//! let builder = CatalogBuilder::new(template, "template.yaml").unwrap();
//! let (document, stats) = builder.build(&[]).unwrap();
//!
//! assert_eq!(stats.accepted_resources(), 0);
//! assert!(json::to_json_string(&document).unwrap().contains("n_resources"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Data model (`model`, `storage`)**: `Resource` records with their
//!   `Version` history, stored as one `resource.yaml` per resource.
//! - **Ingest (`ingest`)**: scan the archive, merge new versions into the
//!   per-resource history and select which resources get a change request.
//! - **Aggregation (`aggregate`)**: resolve the content of every accepted
//!   version from preview or published trees and build the catalog document.
//! - **Collaborators (`git`, `output`)**: branch discovery and checkout, and
//!   the step-output sink the CI workflow reads results from.
//!
//! ## Execution Flow
//!
//! Ingest: `ArchiveScanner` → `VersionMerger` → `UpdateSelector` → update
//! descriptors.
//!
//! Aggregation: `ResourceCollector` → `VersionResolver` → `CatalogBuilder` →
//! `rdf.yaml` and `rdf.json` plus the list of consumed previews.

pub mod aggregate;
pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod ingest;
pub mod model;
pub mod output;
pub mod storage;
pub mod suggestions;

#[cfg(test)]
mod ingest_proptest;
