//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Resource Catalog - Ingest archived resource versions and build the catalog
#[derive(Parser, Debug)]
#[command(name = "resource-catalog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file.
    ///
    /// Defaults to .resource-catalog.yaml when present, built-in defaults
    /// otherwise.
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "RESOURCE_CATALOG_CONFIG"
    )]
    config: Option<PathBuf>,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the archive for new versions and prepare change requests
    UpdateExternal(commands::update_external::UpdateExternalArgs),

    /// Build the catalog document from accepted resources
    GenerateCollection(commands::generate_collection::GenerateCollectionArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        commands::init_logging(&self.log_level);
        let config = commands::load_config(self.config.as_deref())?;

        match self.command {
            Commands::UpdateExternal(args) => {
                commands::update_external::execute(args, &config, &self.color)
            }
            Commands::GenerateCollection(args) => {
                commands::generate_collection::execute(args, &config, &self.color)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_remote_branch_requires_offline() {
        let result = Cli::try_parse_from([
            "resource-catalog",
            "generate-collection",
            "--remote-branch",
            "gh-pages",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_generate_offline() {
        let cli = Cli::try_parse_from([
            "resource-catalog",
            "--log-level",
            "debug",
            "generate-collection",
            "--offline",
            "--remote-branch",
            "gh-pages",
            "--remote-branch",
            "gh-pages-auto-update-r1",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::GenerateCollection(args) => {
                assert!(args.offline);
                assert_eq!(args.remote_branches.len(), 2);
            }
            other => panic!("Expected GenerateCollection, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        assert!(Cli::try_parse_from([
            "resource-catalog",
            "--log-level",
            "loud",
            "update-external"
        ])
        .is_err());
    }
}
