//! Publisher configuration.
//!
//! Values come from three layers, later layers winning: built-in defaults,
//! an optional TOML file, then command line flags (applied by the CLI).

use crate::error::{CliError, Result};
use crate::manifest::TransformStep;
use crate::pipeline::RetryPolicy;
use crate::registry::{Access, NPM_REGISTRY, PublishTarget};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the registry token by default
pub const DEFAULT_TOKEN_ENV: &str = "NPM_TOKEN";

/// A rename guarded by the current package name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenameRule {
    /// Name the manifest must carry
    pub from: String,
    /// Name to publish under
    pub to: String,
}

/// Everything a publish run needs, passed explicitly into the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Build output directory that gets packed
    pub artifact_dir: PathBuf,
    /// Manifest to transform; `None` means `<artifact_dir>/package.json`
    pub manifest_path: Option<PathBuf>,
    /// Registry base URL
    pub registry: String,
    /// Name of the environment variable holding the token
    pub token_env: String,
    /// Optional guarded rename
    pub rename: Option<RenameRule>,
    /// Entries ensured present in `files`
    pub add_files: Vec<String>,
    /// Top-level string fields to set, in order
    pub set_fields: Vec<(String, String)>,
    /// Package access on the registry
    pub access: Access,
    /// Dist-tag for the published version
    pub dist_tag: String,
    /// Tag that triggered the run, if known
    pub tag: Option<String>,
    /// Pack and validate but do not upload
    pub dry_run: bool,
    /// Query the registry for the version before uploading
    pub check_existing: bool,
    /// In-process retries for transient network failures
    pub network_retries: u32,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("pkg"),
            manifest_path: None,
            registry: NPM_REGISTRY.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            rename: None,
            add_files: Vec::new(),
            set_fields: Vec::new(),
            access: Access::Public,
            dist_tag: "latest".to_string(),
            tag: None,
            dry_run: false,
            check_existing: false,
            network_retries: 0,
        }
    }
}

impl PublisherConfig {
    /// Manifest path after applying the default
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| self.artifact_dir.join("package.json"))
    }

    /// Transform sequence in its fixed order: rename, augment files, set fields
    pub fn transform_steps(&self) -> Vec<TransformStep> {
        let mut steps = Vec::new();
        if let Some(rule) = &self.rename {
            steps.push(TransformStep::Rename {
                from: rule.from.clone(),
                to: rule.to.clone(),
            });
        }
        if !self.add_files.is_empty() {
            steps.push(TransformStep::AugmentFiles {
                entries: self.add_files.clone(),
            });
        }
        for (key, value) in &self.set_fields {
            steps.push(TransformStep::SetField {
                key: key.clone(),
                value: value.clone(),
            });
        }
        steps
    }

    /// Build the immutable publish target
    pub fn publish_target(&self) -> Result<PublishTarget> {
        Ok(PublishTarget::new(&self.registry, self.artifact_dir.clone())?
            .with_manifest_path(self.manifest_path())
            .with_access(self.access)
            .with_dist_tag(self.dist_tag.clone()))
    }

    /// Retry policy for the publish request
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_retries(self.network_retries)
    }

    /// Check the release trigger; returns the tag's version, if any
    pub fn check_tag(&self) -> Result<Option<semver::Version>> {
        let Some(tag) = self.tag.as_deref() else {
            return Ok(None);
        };

        let Some(rest) = tag.strip_prefix('v') else {
            return Err(CliError::InvalidTag {
                tag: tag.to_string(),
            }
            .into());
        };

        Ok(semver::Version::parse(rest).ok())
    }

    /// Validate values that clap and serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.token_env.trim().is_empty() {
            return Err(CliError::InvalidArguments {
                reason: "token environment variable name must not be empty".to_string(),
            }
            .into());
        }
        if self.dist_tag.trim().is_empty() {
            return Err(CliError::InvalidArguments {
                reason: "dist-tag must not be empty".to_string(),
            }
            .into());
        }
        if semver::Version::parse(&self.dist_tag).is_ok() {
            return Err(CliError::InvalidArguments {
                reason: format!("dist-tag '{}' looks like a version", self.dist_tag),
            }
            .into());
        }
        if let Some(rule) = &self.rename
            && (rule.from.is_empty() || rule.to.is_empty())
        {
            return Err(CliError::InvalidArguments {
                reason: "rename requires non-empty 'from' and 'to'".to_string(),
            }
            .into());
        }
        if self.network_retries > MAX_NETWORK_RETRIES {
            return Err(CliError::InvalidArguments {
                reason: format!(
                    "network retries too high: {} (max: {})",
                    self.network_retries, MAX_NETWORK_RETRIES
                ),
            }
            .into());
        }
        Ok(())
    }

    /// Overlay values present in a config file
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.artifact_dir {
            self.artifact_dir = v;
        }
        if let Some(v) = file.manifest {
            self.manifest_path = Some(v);
        }
        if let Some(v) = file.registry {
            self.registry = v;
        }
        if let Some(v) = file.token_env {
            self.token_env = v;
        }
        if let Some(v) = file.rename {
            self.rename = Some(v);
        }
        if let Some(v) = file.files {
            self.add_files = v;
        }
        if let Some(v) = file.set {
            self.set_fields = v;
        }
        if let Some(v) = file.access {
            self.access = v;
        }
        if let Some(v) = file.dist_tag {
            self.dist_tag = v;
        }
        if let Some(v) = file.check_existing {
            self.check_existing = v;
        }
        if let Some(v) = file.network_retries {
            self.network_retries = v;
        }
    }
}

/// Upper bound for in-process network retries
pub const MAX_NETWORK_RETRIES: u32 = 10;

/// On-disk configuration (`publish.toml`)
///
/// ```toml
/// artifact_dir = "pkg"
/// files = ["wasm_bg.js", "wasm_bg.wasm.d.ts"]
///
/// [rename]
/// from = "@swc/wasm"
/// to = "@swc/wasm-web"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    /// Build output directory
    #[serde(alias = "artifact_dir")]
    pub artifact_dir: Option<PathBuf>,
    /// Manifest path
    pub manifest: Option<PathBuf>,
    /// Registry base URL
    pub registry: Option<String>,
    /// Token environment variable name
    #[serde(alias = "token_env")]
    pub token_env: Option<String>,
    /// Guarded rename
    pub rename: Option<RenameRule>,
    /// Entries ensured present in `files`
    pub files: Option<Vec<String>>,
    /// Fields to set, in file order
    #[serde(default, deserialize_with = "ordered_string_fields")]
    pub set: Option<Vec<(String, String)>>,
    /// Package access
    pub access: Option<Access>,
    /// Dist-tag
    #[serde(alias = "dist_tag")]
    pub dist_tag: Option<String>,
    /// Query the registry before uploading
    #[serde(alias = "check_existing")]
    pub check_existing: Option<bool>,
    /// In-process network retries
    #[serde(alias = "network_retries")]
    pub network_retries: Option<u32>,
}

/// Read a `[set]` table as ordered `(key, value)` pairs; every value must be a string
fn ordered_string_fields<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<(String, String)>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;

    let Some(table) = Option::<toml::Table>::deserialize(deserializer)? else {
        return Ok(None);
    };
    table
        .into_iter()
        .map(|(key, value)| match value {
            toml::Value::String(value) => Ok((key, value)),
            other => Err(D::Error::custom(format!(
                "set.{} must be a string, found {}",
                key,
                other.type_str()
            ))),
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Some)
}

/// Load a config file
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| {
        CliError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;

    #[test]
    fn default_manifest_lives_in_artifact_dir() {
        let config = PublisherConfig::default();
        assert_eq!(config.manifest_path(), Path::new("pkg").join("package.json"));
        assert!(config.transform_steps().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn transform_steps_follow_fixed_order() {
        let config = PublisherConfig {
            set_fields: vec![("module".to_string(), "wasm.js".to_string())],
            add_files: vec!["wasm_bg.js".to_string()],
            rename: Some(RenameRule {
                from: "@swc/wasm".to_string(),
                to: "@swc/wasm-web".to_string(),
            }),
            ..PublisherConfig::default()
        };
        let names: Vec<&str> = config.transform_steps().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["rename", "augment-files", "set-field"]);
    }

    #[test]
    fn tag_must_start_with_v() {
        let mut config = PublisherConfig {
            tag: Some("v1.2.3".to_string()),
            ..PublisherConfig::default()
        };
        assert_eq!(
            config.check_tag().unwrap(),
            Some(semver::Version::new(1, 2, 3))
        );

        config.tag = Some("vnext".to_string());
        assert_eq!(config.check_tag().unwrap(), None);

        config.tag = Some("1.2.3".to_string());
        assert!(matches!(
            config.check_tag().unwrap_err(),
            ReleaseError::Cli(CliError::InvalidTag { .. })
        ));
    }

    #[test]
    fn validate_rejects_version_like_dist_tag() {
        let config = PublisherConfig {
            dist_tag: "1.0.0".to_string(),
            ..PublisherConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_config_overlays_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("publish.toml");
        std::fs::write(
            &path,
            r#"
artifact-dir = "out/pkg"
files = ["wasm_bg.js"]
access = "restricted"
network-retries = 2

[rename]
from = "@swc/wasm"
to = "@swc/wasm-web"

[set]
types = "wasm.d.ts"
module = "wasm.js"
"#,
        )
        .unwrap();

        let mut config = PublisherConfig::default();
        config.apply_file(load_file_config(&path).unwrap());

        assert_eq!(config.artifact_dir, PathBuf::from("out/pkg"));
        assert_eq!(config.add_files, ["wasm_bg.js"]);
        assert_eq!(config.access, Access::Restricted);
        assert_eq!(config.network_retries, 2);
        assert_eq!(config.rename.as_ref().map(|r| r.to.as_str()), Some("@swc/wasm-web"));
        // File order, not key order
        assert_eq!(
            config.set_fields,
            [
                ("types".to_string(), "wasm.d.ts".to_string()),
                ("module".to_string(), "wasm.js".to_string()),
            ]
        );
    }

    #[test]
    fn set_values_must_be_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("publish.toml");
        std::fs::write(&path, "[set]
sideEffects = false
").unwrap();
        let err = load_file_config(&path).unwrap_err();
        assert!(err.to_string().contains("set.sideEffects must be a string"));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("publish.toml");
        std::fs::write(&path, "registery = \"https://example\"\n").unwrap();
        assert!(matches!(
            load_file_config(&path).unwrap_err(),
            ReleaseError::Cli(CliError::Config { .. })
        ));
    }
}
