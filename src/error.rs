//! # Error Handling
//!
//! This module defines the centralized error type for the `resource-catalog`
//! library. It uses the `thiserror` library to create a single `Error` enum
//! covering the failure modes of both pipelines, with messages that carry
//! enough context (resource id, path, URL) to act on.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum that represents all possible errors raised by
//!   the library.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Not every variant aborts a run. The pipelines isolate per-item failures
//! (`Fetch`, `MissingContent`, `MalformedContent`) by logging and skipping the
//! item. Integrity violations (`InvalidStatus`, `InvalidResource`) and
//! `NonFiniteValue` during JSON projection are propagated to the caller.
//!
//! Skipping a blocked resource or an already-known version is not an error at
//! all; see `ingest::merger::MergeOutcome`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for resource-catalog operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing the configuration file.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A stored resource carries a status other than accepted, pending or
    /// blocked. This points at corrupted storage.
    #[error("Invalid status '{status}' for resource {resource_id}")]
    InvalidStatus { resource_id: String, status: String },

    /// A stored resource violates a structural invariant.
    #[error("Invalid resource {resource_id}: {message}")]
    InvalidResource {
        resource_id: String,
        message: String,
    },

    /// Fetching from the archive service or a descriptor URL failed.
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// A resolved content location holds no content.
    #[error("Missing content: {}", path.display())]
    MissingContent { path: PathBuf },

    /// Content was found but is not a record.
    #[error("Malformed content at {}: {message}", path.display())]
    MalformedContent { path: PathBuf, message: String },

    /// A non-finite number without a literal sentinel reached JSON projection.
    #[error("Non-finite value at '{path}' cannot be represented in JSON")]
    NonFiniteValue { path: String },

    /// An error occurred while executing a Git command.
    #[error("Git command failed: {command} - {stderr}")]
    GitCommand { command: String, stderr: String },

    /// Reading or writing a storage location failed.
    #[error("Storage error at {}: {message}", path.display())]
    Storage { path: PathBuf, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
