//! Durable per-resource storage.
//!
//! Resource records live at `<root>/<resource_id>/resource.yaml`. The ingest
//! pipeline reads from the canonical collection root and writes merged records
//! to a separate output root, so the collection is only changed by a later
//! publish step.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::model::Resource;

/// File name of a resource record.
pub const RESOURCE_FILE: &str = "resource.yaml";

/// Canonical and output locations of resource records.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    collection_dir: PathBuf,
    output_dir: PathBuf,
}

impl ResourceStore {
    pub fn new(collection_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            collection_dir: collection_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn canonical_path(&self, resource_id: &str) -> PathBuf {
        self.collection_dir.join(resource_id).join(RESOURCE_FILE)
    }

    pub fn output_path(&self, resource_id: &str) -> PathBuf {
        self.output_dir.join(resource_id).join(RESOURCE_FILE)
    }

    /// Load the record a merge should start from.
    ///
    /// A record already written to the output root wins over the canonical one,
    /// so several new versions of one resource accumulate within a run.
    pub fn load_for_merge(&self, resource_id: &str) -> Result<Option<Resource>> {
        let output = self.output_path(resource_id);
        let path = if output.exists() {
            output
        } else {
            self.canonical_path(resource_id)
        };

        if !path.exists() {
            return Ok(None);
        }

        debug!("Loading resource {} from {}", resource_id, path.display());
        read_resource(&path).map(Some)
    }

    /// Persist a merged record to the output root.
    pub fn save(&self, resource: &Resource) -> Result<PathBuf> {
        let path = self.output_path(&resource.resource_id);
        write_yaml(&path, resource)?;
        Ok(path)
    }
}

/// Read and deserialize a resource record.
pub fn read_resource(path: &Path) -> Result<Resource> {
    read_record(path)
}

/// Read a resource record into any view of it.
pub fn read_record<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| Error::Storage {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str(&content).map_err(|e| Error::Storage {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read a YAML document as an untyped value, `None` if the file is absent.
pub fn read_yaml_value(path: &Path) -> Result<Option<Value>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_yaml::from_str(&content)?))
}

/// Serialize `value` as YAML to `path`, creating parent directories.
pub fn write_yaml<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_yaml::to_string(value)?;
    write_file(path, content.as_bytes())
}

pub fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Storage {
            path: parent.to_path_buf(),
            message: e.to_string(),
        })?;
    }
    fs::write(path, content).map_err(|e| Error::Storage {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
