//! Package manifest (`package.json`) loading and atomic persistence.
//!
//! The manifest is kept as an ordered JSON object so that a load/write cycle
//! preserves every field and the original key order.

mod transform;

pub use transform::{TransformStep, apply_all, apply_transform};

use crate::error::{ManifestError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Parsed package metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    fields: Map<String, Value>,
}

impl Manifest {
    /// Parse a manifest from JSON text; `origin` is only used for error messages
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        let value: Value = serde_json::from_str(content).map_err(|e| ManifestError::Parse {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;

        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ManifestError::Parse {
                path: origin.to_path_buf(),
                reason: format!("top-level value must be an object, found {}", json_kind(&other)),
            }
            .into()),
        }
    }

    /// Get a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Package name, if present and a string
    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// Package version, if present and a string
    pub fn version(&self) -> Option<&str> {
        self.get_str("version")
    }

    /// Entries of the `files` array; `None` if absent or not all strings
    pub fn files(&self) -> Option<Vec<&str>> {
        self.fields
            .get("files")?
            .as_array()?
            .iter()
            .map(Value::as_str)
            .collect()
    }

    /// Set a field, keeping its position if it already exists
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Mutable access to a field
    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    /// All fields in file order
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Serialize as pretty JSON with a trailing newline
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.fields)?;
        out.push('\n');
        Ok(out)
    }

    /// Convert into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for Manifest {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Load a manifest from disk
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ManifestError::NotFound {
            path: path.to_path_buf(),
        },
        // Not UTF-8, so not JSON
        ErrorKind::InvalidData => ManifestError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        _ => ManifestError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let manifest = Manifest::parse(&content, path)?;
    log::debug!("Loaded manifest {} ({} fields)", path.display(), manifest.fields.len());
    Ok(manifest)
}

/// Write a manifest atomically: temp file, fsync, then rename over the target
pub fn write_manifest(manifest: &Manifest, path: &Path) -> Result<()> {
    let serialized = manifest.to_pretty_json()?;
    let temp_path = temp_path_for(path);

    let io_err = |source: std::io::Error| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    };

    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = written {
        // Leave the original manifest untouched and drop the partial temp file
        let _ = fs::remove_file(&temp_path);
        return Err(io_err(e).into());
    }

    log::debug!("Wrote manifest {} ({} bytes)", path.display(), serialized.len());
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package.json".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}
