//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Following CLI recommendations,
//! errors should tell users what went wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resource_catalog::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("Configuration file not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::config_not_found(path));
//! ```

use std::path::Path;

/// Generate an error for when an explicitly given configuration file is not
/// found.
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Omit --config to use the built-in defaults\n\
         hint: Use -c/--config to specify a different path\n\
         hint: Set RESOURCE_CATALOG_CONFIG environment variable",
        path = path.display()
    )
}

/// Generate an error for a missing catalog template.
pub fn template_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Catalog template not found: {path}\n\n\
         hint: Run from the repository root that holds the template\n\
         hint: Use --template or collection.template in the configuration to point at it",
        path = path.display()
    )
}

/// Generate an error for an offline run whose working tree is missing.
pub fn worktree_missing(branch: &str, path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "No checkout of '{branch}' at {path}\n\n\
         hint: Offline runs expect existing checkouts, e.g. 'git worktree add {path} {branch}'\n\
         hint: Drop --offline to let the command check branches out itself",
        path = path.display()
    )
}

/// Hint for a serde "unknown field" message, suggesting a close match.
///
/// Returns `None` when the message is not about an unknown field.
pub fn unknown_field_hint(message: &str) -> Option<String> {
    let rest = message.split("unknown field `").nth(1)?;
    let field = rest.split('`').next()?;
    let expected: Vec<&str> = rest
        .split_once("expected")
        .map(|(_, list)| list.split('`').skip(1).step_by(2).collect())
        .unwrap_or_default();

    Some(match find_similar(field, &expected) {
        Some(similar) => format!("Did you mean '{}'?", similar),
        None if expected.is_empty() => "Remove the key or check its spelling".to_string(),
        None => format!("Supported keys here are: {}", expected.join(", ")),
    })
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Single-row variant: `row[j]` is the distance between the first `i`
    // characters of `a` and the first `j` of `b`.
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, &ca) in a_chars.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b_chars.len()]
}
