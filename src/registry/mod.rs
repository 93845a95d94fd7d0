//! npm-compatible registry publishing.
//!
//! This module provides the publish target and credential types, tarball
//! packing, and the HTTP client that uploads a package document.

mod client;
mod tarball;

pub use client::{RegistryClient, USER_AGENT, classify_response, escape_package_name};
pub use tarball::{PackedTarball, pack_directory, tarball_file_name};

use crate::error::{PublishError, Result, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Default public npm registry
pub const NPM_REGISTRY: &str = "https://registry.npmjs.org";

/// Registry authentication token
///
/// The token is only reachable through [`Credential::bearer_header`]; debug
/// and display output are redacted.
#[derive(Clone)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Wrap a token; blank tokens are an authentication error
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(PublishError::Auth {
                reason: "registry token is empty".to_string(),
            }
            .into());
        }
        Ok(Self { token })
    }

    /// Read the token from an environment variable
    pub fn from_env(var_name: &str) -> Result<Self> {
        match std::env::var(var_name) {
            Ok(value) if !value.trim().is_empty() => Self::new(value),
            Ok(_) => Err(PublishError::Auth {
                reason: format!("environment variable {} is empty", var_name),
            }
            .into()),
            Err(_) => Err(PublishError::Auth {
                reason: format!("environment variable {} is not set", var_name),
            }
            .into()),
        }
    }

    pub(crate) fn bearer_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("token", &"<redacted>").finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<redacted>")
    }
}

/// Package visibility on the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Anyone can install
    #[default]
    Public,
    /// Scoped package visible to the owning organization only
    Restricted,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public => write!(f, "public"),
            Access::Restricted => write!(f, "restricted"),
        }
    }
}

/// Destination registry and the artifact directory to ship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    registry: Url,
    artifact_dir: PathBuf,
    manifest_path: PathBuf,
    access: Access,
    dist_tag: String,
}

impl PublishTarget {
    /// Create a target; the manifest defaults to `<artifact_dir>/package.json`
    pub fn new(registry: &str, artifact_dir: impl Into<PathBuf>) -> Result<Self> {
        let registry = Url::parse(registry).map_err(|e| ValidationError::InvalidValue {
            field: "registry".to_string(),
            reason: format!("'{}' is not a valid URL: {}", registry, e),
        })?;
        if !matches!(registry.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidValue {
                field: "registry".to_string(),
                reason: format!("unsupported scheme '{}'", registry.scheme()),
            }
            .into());
        }

        let artifact_dir = artifact_dir.into();
        let manifest_path = artifact_dir.join("package.json");
        Ok(Self {
            registry,
            artifact_dir,
            manifest_path,
            access: Access::default(),
            dist_tag: "latest".to_string(),
        })
    }

    /// Use a manifest outside the default location
    pub fn with_manifest_path(mut self, manifest_path: impl Into<PathBuf>) -> Self {
        self.manifest_path = manifest_path.into();
        self
    }

    /// Set package access
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Set the dist-tag the version is published under
    pub fn with_dist_tag(mut self, dist_tag: impl Into<String>) -> Self {
        self.dist_tag = dist_tag.into();
        self
    }

    /// Registry base URL
    pub fn registry(&self) -> &Url {
        &self.registry
    }

    /// Registry base URL without a trailing slash
    pub fn registry_base(&self) -> &str {
        self.registry.as_str().trim_end_matches('/')
    }

    /// Directory whose contents are packed
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Manifest read at publish time
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Package access
    pub fn access(&self) -> Access {
        self.access
    }

    /// Dist-tag
    pub fn dist_tag(&self) -> &str {
        &self.dist_tag
    }
}

/// Confirmation of a publish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    /// Published package name
    pub name: String,
    /// Published version
    pub version: String,
    /// Registry the package was sent to
    pub registry: String,
    /// Dist-tag pointing at the version
    pub dist_tag: String,
    /// SHA-1 of the tarball, hex encoded
    pub shasum: String,
    /// Subresource integrity string of the tarball
    pub integrity: String,
    /// Tarball size in bytes
    pub tarball_size: usize,
    /// Number of files in the tarball
    pub file_count: usize,
    /// True if the upload was skipped
    pub dry_run: bool,
    /// When the registry accepted the package (or the dry run finished)
    pub published_at: DateTime<Utc>,
}

impl PublishResult {
    /// `name@version`
    pub fn spec(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}
