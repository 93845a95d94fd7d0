//! HTTP client for npm-compatible registries.

use super::tarball::{PackedTarball, pack_directory};
use super::{Credential, PublishResult, PublishTarget};
use crate::error::{PublishError, ReleaseError, Result, ValidationError};
use crate::manifest::{Manifest, load_manifest};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;

/// Default timeout for registry requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("kodegen_wasm_publish/", env!("CARGO_PKG_VERSION"));

/// Registry API client
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
}

impl RegistryClient {
    /// Create a client with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PublishError::Network {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Publish the artifact directory described by `target`
    ///
    /// The credential is consumed and dropped when this call returns.
    pub async fn publish(
        &self,
        target: &PublishTarget,
        credential: Credential,
    ) -> Result<PublishResult> {
        let (manifest, packed) = prepare(target)?;
        let (name, version) = identity(&manifest)?;
        let url = package_url(target, &name);
        let body = publish_document(target, &manifest, &packed, &name, &version);

        log::info!(
            "Publishing {}@{} to {} ({} bytes)",
            name,
            version,
            target.registry_base(),
            packed.bytes.len()
        );

        let response = self
            .client
            .put(&url)
            .header(reqwest::header::AUTHORIZATION, credential.bearer_header())
            .header("npm-command", "publish")
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Network {
                reason: format!("request to {} failed: {}", target.registry_base(), e),
            })?;
        drop(credential);

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        classify_response(status, &text, &name, &version)?;

        log::info!("Registry accepted {}@{} ({})", name, version, status);
        Ok(result(target, name, version, &packed, false))
    }

    /// Pack and validate without uploading
    pub fn dry_run(&self, target: &PublishTarget) -> Result<PublishResult> {
        let (manifest, packed) = prepare(target)?;
        let (name, version) = identity(&manifest)?;
        log::info!("Dry run: skipping upload of {}@{}", name, version);
        Ok(result(target, name, version, &packed, true))
    }

    /// Check whether `version` of `name` is already on the registry
    pub async fn version_exists(
        &self,
        target: &PublishTarget,
        name: &str,
        version: &str,
    ) -> Result<bool> {
        let url = package_url(target, name);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| PublishError::Network {
                reason: format!("request to {} failed: {}", url, e),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => {
                let packument: Value = response.json().await.map_err(|e| PublishError::Network {
                    reason: format!("invalid packument from {}: {}", url, e),
                })?;
                Ok(packument
                    .get("versions")
                    .and_then(Value::as_object)
                    .is_some_and(|versions| versions.contains_key(version)))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                classify_response(status, &text, name, version)?;
                Ok(false)
            }
        }
    }
}

fn prepare(target: &PublishTarget) -> Result<(Manifest, PackedTarball)> {
    let manifest = load_manifest(target.manifest_path())?;
    let packed = pack_directory(target.artifact_dir(), &manifest)?;
    Ok((manifest, packed))
}

fn identity(manifest: &Manifest) -> Result<(String, String)> {
    let missing = |field: &str| ValidationError::MissingField {
        step: "publish".to_string(),
        field: field.to_string(),
    };
    let name = manifest.name().ok_or_else(|| missing("name"))?;
    let version = manifest.version().ok_or_else(|| missing("version"))?;

    semver::Version::parse(version).map_err(|e| ValidationError::InvalidValue {
        field: "version".to_string(),
        reason: format!("'{}' is not a semantic version: {}", version, e),
    })?;

    Ok((name.to_string(), version.to_string()))
}

fn result(
    target: &PublishTarget,
    name: String,
    version: String,
    packed: &PackedTarball,
    dry_run: bool,
) -> PublishResult {
    PublishResult {
        name,
        version,
        registry: target.registry_base().to_string(),
        dist_tag: target.dist_tag().to_string(),
        shasum: packed.shasum.clone(),
        integrity: packed.integrity.clone(),
        tarball_size: packed.bytes.len(),
        file_count: packed.entries.len(),
        dry_run,
        published_at: chrono::Utc::now(),
    }
}

/// URL-escape a package name the way npm does (`@scope/name` -> `@scope%2fname`)
pub fn escape_package_name(name: &str) -> String {
    name.replace('/', "%2f")
}

fn package_url(target: &PublishTarget, name: &str) -> String {
    format!("{}/{}", target.registry_base(), escape_package_name(name))
}

fn publish_document(
    target: &PublishTarget,
    manifest: &Manifest,
    packed: &PackedTarball,
    name: &str,
    version: &str,
) -> Value {
    let mut version_doc = manifest.clone().into_value();
    if let Value::Object(fields) = &mut version_doc {
        fields.insert("_id".to_string(), json!(format!("{}@{}", name, version)));
        fields.insert(
            "dist".to_string(),
            json!({
                "shasum": packed.shasum,
                "integrity": packed.integrity,
                "tarball": format!("{}/{}/-/{}", target.registry_base(), name, packed.file_name),
            }),
        );
    }

    json!({
        "_id": name,
        "name": name,
        "description": manifest.get_str("description").unwrap_or_default(),
        "dist-tags": { target.dist_tag(): version },
        "versions": { version: version_doc },
        "access": target.access().to_string(),
        "_attachments": {
            packed.file_name.clone(): {
                "content_type": "application/octet-stream",
                "data": STANDARD.encode(&packed.bytes),
                "length": packed.bytes.len(),
            }
        }
    })
}

/// Map a registry response to the publish error taxonomy
pub fn classify_response(status: StatusCode, body: &str, name: &str, version: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    let reason = summarize(body, status);
    let lowered = body.to_ascii_lowercase();
    let conflict = || -> ReleaseError {
        PublishError::Conflict {
            package: name.to_string(),
            version: version.to_string(),
        }
        .into()
    };

    let err: ReleaseError = match status {
        StatusCode::CONFLICT => conflict(),
        StatusCode::FORBIDDEN
            if lowered.contains("previously published") || lowered.contains("cannot publish over") =>
        {
            conflict()
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublishError::Auth { reason }.into(),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            PublishError::Network { reason }.into()
        }
        status if status.is_server_error() => PublishError::Network { reason }.into(),
        status => PublishError::Rejected {
            status: status.as_u16(),
            reason,
        }
        .into(),
    };
    Err(err)
}

fn summarize(body: &str, status: StatusCode) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    if detail.is_empty() {
        status.to_string()
    } else {
        format!("{} ({})", detail, status)
    }
}
