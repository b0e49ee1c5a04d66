//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `resource-catalog` command-line tool. Each subcommand is defined in its own
//! file to keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic.
//!
//! The `execute` function is the main entry point for the command and is
//! responsible for orchestrating the necessary operations, calling into the
//! `resource_catalog` library to perform the core logic.
//!
//! The helpers here are shared by both commands: loading the configuration,
//! setting up logging and progress spinners.

pub mod generate_collection;
pub mod update_external;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use resource_catalog::config::{self, Config};
use resource_catalog::defaults;
use resource_catalog::output::OutputConfig;
use resource_catalog::suggestions;

/// Initialise `env_logger`. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A logger may already be installed when running under a test harness.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

/// Load the configuration.
///
/// An explicitly given file must exist. Without one, the default file is
/// used when present and the built-in defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) if !path.is_file() => return Err(suggestions::config_not_found(path)),
        Some(path) => path,
        None => {
            let default = Path::new(defaults::CONFIG_FILE);
            if !default.is_file() {
                log::debug!("No {} found, using defaults", defaults::CONFIG_FILE);
                return Ok(Config::default());
            }
            default
        }
    };

    log::info!("Loading configuration from {}", path.display());
    config::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// A spinner on stderr, hidden when output is not decorated.
pub fn spinner(out: &OutputConfig, message: &str) -> ProgressBar {
    if !out.use_color {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_explicit_missing_has_hints() {
        let err = load_config(Some(Path::new("/nonexistent/.resource-catalog.yaml"))).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Configuration file not found"));
        assert!(message.contains("hint:"));
    }

    #[test]
    fn test_load_config_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.yaml");
        std::fs::write(&path, "ingest:\n  max_resource_count: 7\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.ingest.max_resource_count, 7);
    }

    #[test]
    fn test_load_config_reports_parse_errors_with_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.yaml");
        std::fs::write(&path, "archive:\n  page_sise: 1\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load config"));
        assert!(format!("{:#}", err).contains("page_size"));
    }

    #[test]
    #[serial]
    fn test_load_config_without_default_file_uses_defaults() {
        let original_dir = env::current_dir().unwrap();
        let temp_dir = TempDir::new().unwrap();
        env::set_current_dir(&temp_dir).unwrap();

        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());

        env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_load_config_picks_up_default_file() {
        let original_dir = env::current_dir().unwrap();
        let temp_dir = TempDir::new().unwrap();
        env::set_current_dir(&temp_dir).unwrap();

        std::fs::write(defaults::CONFIG_FILE, "collection:\n  dist_dir: build\n").unwrap();
        let config = load_config(None).unwrap();
        assert_eq!(config.collection.dist_dir, std::path::PathBuf::from("build"));

        env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    fn test_spinner_hidden_without_color() {
        let pb = spinner(&OutputConfig { use_color: false }, "working");
        assert!(pb.is_hidden());
    }
}
