//! Resolving where the content of a version comes from.
//!
//! A `VersionResolver` asks an ordered list of `ContentProvider`s for a
//! version; the first one with content wins. Preview providers move what they
//! serve into the update tree, so a preview is consumed at most once and a
//! second run over the same state finds nothing left in it.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};

/// Folder holding per-version content below a tree root.
pub const RESOURCES_DIR: &str = "resources";

/// A version's content folder as located by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// Folder that holds the descriptor and validation summaries.
    pub dir: PathBuf,
    /// Set when locating consumed a preview.
    pub consumed: Option<String>,
}

/// One source of version content.
pub trait ContentProvider {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Where this provider would hold `version_id`.
    fn version_dir(&self, version_id: &str) -> PathBuf;

    /// Locate the content of `version_id`, or `None` if this provider lacks it.
    fn locate(&mut self, version_id: &str, descriptor: &str) -> Result<Option<Located>>;
}

/// The published tree. Content is read in place.
#[derive(Debug, Clone)]
pub struct PublishedTree {
    name: String,
    root: PathBuf,
}

impl PublishedTree {
    pub fn new(name: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            root: root.into(),
        }
    }
}

impl ContentProvider for PublishedTree {
    fn name(&self) -> &str {
        &self.name
    }

    fn version_dir(&self, version_id: &str) -> PathBuf {
        self.root.join(RESOURCES_DIR).join(version_id)
    }

    fn locate(&mut self, version_id: &str, descriptor: &str) -> Result<Option<Located>> {
        let dir = self.version_dir(version_id);
        Ok(dir.join(descriptor).is_file().then_some(Located {
            dir,
            consumed: None,
        }))
    }
}

/// A per-resource preview tree. Content is moved into the update tree.
#[derive(Debug, Clone)]
pub struct PreviewTree {
    branch: String,
    root: PathBuf,
    update_root: PathBuf,
}

impl PreviewTree {
    pub fn new(branch: &str, root: impl Into<PathBuf>, update_root: impl Into<PathBuf>) -> Self {
        Self {
            branch: branch.to_string(),
            root: root.into(),
            update_root: update_root.into(),
        }
    }
}

impl ContentProvider for PreviewTree {
    fn name(&self) -> &str {
        &self.branch
    }

    fn version_dir(&self, version_id: &str) -> PathBuf {
        self.root.join(RESOURCES_DIR).join(version_id)
    }

    fn locate(&mut self, version_id: &str, descriptor: &str) -> Result<Option<Located>> {
        let source = self.version_dir(version_id);
        if !source.join(descriptor).is_file() {
            return Ok(None);
        }

        let target = self.update_root.join(RESOURCES_DIR).join(version_id);
        move_dir_contents(&source, &target)?;
        info!(
            "Moved preview content {} -> {}",
            source.display(),
            target.display()
        );
        Ok(Some(Located {
            dir: target,
            consumed: Some(self.branch.clone()),
        }))
    }
}

/// Move every entry of `source` into `target`, merging into existing folders.
pub fn move_dir_contents(source: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            move_dir_contents(&from, &to)?;
            fs::remove_dir(&from)?;
        } else if fs::rename(&from, &to).is_err() {
            // Cross-device: copy, then remove the source.
            fs::copy(&from, &to)?;
            fs::remove_file(&from)?;
        }
    }
    Ok(())
}

/// Queries providers in order and records consumed previews.
pub struct VersionResolver {
    providers: Vec<Box<dyn ContentProvider>>,
    descriptor: String,
}

impl VersionResolver {
    pub fn new(providers: Vec<Box<dyn ContentProvider>>, descriptor: &str) -> Self {
        Self {
            providers,
            descriptor: descriptor.to_string(),
        }
    }

    /// Resolve the content folder of `version_id`.
    ///
    /// Returns `MissingContent` naming the last place searched when no
    /// provider has the version.
    pub fn resolve(&mut self, version_id: &str) -> Result<Located> {
        for provider in self.providers.iter_mut() {
            if let Some(located) = provider.locate(version_id, &self.descriptor)? {
                debug!("Version {} resolved from {}", version_id, provider.name());
                return Ok(located);
            }
        }
        Err(Error::MissingContent {
            path: self.fallback_path(version_id),
        })
    }

    /// Descriptor path of `version_id` in the last provider searched.
    pub fn fallback_path(&self, version_id: &str) -> PathBuf {
        self.providers
            .last()
            .map(|p| p.version_dir(version_id).join(&self.descriptor))
            .unwrap_or_else(|| PathBuf::from(version_id))
    }
}
