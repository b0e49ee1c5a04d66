//! # Output Configuration
//!
//! This module provides utilities for controlling CLI output appearance,
//! including color and emoji support based on terminal capabilities and
//! user preferences, and the step-output sink through which both pipelines
//! hand their results to the CI workflow.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resource_catalog::output::{OutputConfig, emoji};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//!
//! // Use emoji helper that respects config
//! println!("{} Scanning archive...", emoji(&config, "🔍", "[SCAN]"));
//! ```
//!
//! ## Step Outputs
//!
//! `StepOutputSink` is a key/value sink. `WorkflowCommandSink` writes each
//! pair as a `::set-output` workflow command, escaping `%`, CR and LF.

use std::env;
use std::io::Write;

use serde::Serialize;

use crate::error::Result;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the --color CLI flag: "always", "never", or "auto"
    ///
    /// # Behavior
    /// - `--color=always`: Force colors on (overrides NO_COLOR)
    /// - `--color=never`: Force colors off
    /// - `--color=auto`: Detect based on environment
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    /// Detect whether color output is supported based on environment.
    fn detect_color_support() -> bool {
        // Check NO_COLOR first (https://no-color.org/)
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        // Check CLICOLOR=0 disables colors
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        // Check CLICOLOR_FORCE=1 forces colors
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        // Check TERM=dumb
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        // Use console crate's detection for TTY and color support
        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the appropriate string based on color configuration.
///
/// When colors are enabled, returns the emoji. When disabled, returns
/// the plain text alternative.
///
/// # Arguments
/// * `config` - The output configuration
/// * `emoji` - The emoji to use when colors are enabled
/// * `plain` - The plain text to use when colors are disabled
///
/// # Example
/// ```rust,ignore
/// let config = OutputConfig::from_env_and_flag("auto");
/// println!("{} Collecting resources...", emoji(&config, "📦", "[COLLECT]"));
/// ```
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Receives named step outputs.
pub trait StepOutputSink {
    fn set(&mut self, name: &str, value: &str) -> Result<()>;

    /// Set an output to the JSON encoding of `value`.
    fn set_json<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let encoded = serde_json::to_string(value)?;
        self.set(name, &encoded)
    }
}

/// Escape a value for a workflow command.
pub fn escape_workflow_value(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Writes `::set-output name=<name>::<value>` lines.
pub struct WorkflowCommandSink<W: Write> {
    writer: W,
}

impl<W: Write> WorkflowCommandSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WorkflowCommandSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> StepOutputSink for WorkflowCommandSink<W> {
    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        writeln!(
            self.writer,
            "::set-output name={}::{}",
            name,
            escape_workflow_value(value)
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps outputs in memory, in the order they were set.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub outputs: Vec<(String, String)>,
}

impl RecordingSink {
    /// Last value set for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.outputs
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl StepOutputSink for RecordingSink {
    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.outputs.push((name.to_string(), value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_always() {
        let config = OutputConfig::from_env_and_flag("always");
        assert!(config.use_color);
    }

    #[test]
    fn test_color_never() {
        let config = OutputConfig::from_env_and_flag("never");
        assert!(!config.use_color);
    }

    #[test]
    fn test_emoji_helper_with_color() {
        let config = OutputConfig::with_color();
        assert_eq!(emoji(&config, "📦", "[COLLECT]"), "📦");
    }

    #[test]
    fn test_emoji_helper_without_color() {
        let config = OutputConfig::without_color();
        assert_eq!(emoji(&config, "📦", "[COLLECT]"), "[COLLECT]");
    }

    #[test]
    fn test_escape_workflow_value() {
        assert_eq!(escape_workflow_value("50%\r\nnext"), "50%25%0D%0Anext");
        assert_eq!(escape_workflow_value("plain"), "plain");
    }

    #[test]
    fn test_workflow_command_sink_writes_escaped_lines() {
        let mut sink = WorkflowCommandSink::new(Vec::new());
        sink.set("found_new_resources", "true").unwrap();
        sink.set("notes", "a\nb").unwrap();
        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            written,
            "::set-output name=found_new_resources::true\n::set-output name=notes::a%0Ab\n"
        );
    }

    #[test]
    fn test_set_json_encodes_value() {
        let mut sink = RecordingSink::default();
        sink.set_json("matrix", &serde_json::json!({"update": []}))
            .unwrap();
        sink.set_json("flag", &true).unwrap();
        assert_eq!(sink.get("matrix"), Some(r#"{"update":[]}"#));
        assert_eq!(sink.get("flag"), Some("true"));
    }
}
