//! Status command: report whether the manifest version is on the registry.

use crate::cli::{Args, RuntimeConfig};
use crate::error::{Result, ValidationError};
use crate::manifest::load_manifest;
use crate::registry::RegistryClient;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    name: &'a str,
    version: &'a str,
    registry: &'a str,
    published: bool,
}

/// Execute the status command
pub(super) async fn execute_status(args: &Args, config: &RuntimeConfig, json: bool) -> Result<()> {
    let publisher_config = args.publisher_config()?;
    let target = publisher_config.publish_target()?;
    let manifest = load_manifest(target.manifest_path())?;

    let missing = |field: &str| ValidationError::MissingField {
        step: "status".to_string(),
        field: field.to_string(),
    };
    let name = manifest.name().ok_or_else(|| missing("name"))?;
    let version = manifest.version().ok_or_else(|| missing("version"))?;

    let client = RegistryClient::new()?;
    let published = client.version_exists(&target, name, version).await?;

    if json {
        let report = StatusReport {
            name,
            version,
            registry: target.registry_base(),
            published,
        };
        // JSON goes to stdout even in quiet mode so it can be piped
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if published {
        config.warning_println(&format!(
            "{}@{} is already published on {}",
            name,
            version,
            target.registry_base()
        ));
    } else {
        let _ = config.output().info(&format!(
            "{}@{} is not yet on {}",
            name,
            version,
            target.registry_base()
        ));
    }
    Ok(())
}
