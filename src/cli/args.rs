//! Command line argument parsing and validation.
//!
//! Flags override values from `--config`, which override built-in defaults.

use super::retry_config::RetryConfig;
use crate::config::{PublisherConfig, RenameRule, load_file_config};
use crate::error::{CliError, Result};
use crate::registry::Access;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Publish wasm packages to an npm registry
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_wasm_publish",
    version,
    about = "Publish wasm packages to an npm registry",
    long_about = "Rename, augment and publish a wasm-pack build output.

Usage:
  kodegen_wasm_publish publish --artifact-dir pkg --rename-from @swc/wasm --rename-to @swc/wasm-web
  kodegen_wasm_publish transform --add-file wasm_bg.js
  kodegen_wasm_publish pack --out wasm-web.tgz
  kodegen_wasm_publish status"
)]
pub struct Args {
    /// TOML config file with publisher settings
    #[arg(long, global = true, value_name = "FILE", env = "KODEGEN_WASM_PUBLISH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Build output directory to pack (default: pkg)
    #[arg(long, global = true, value_name = "DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Manifest path (default: <artifact-dir>/package.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Registry base URL (default: https://registry.npmjs.org)
    #[arg(long, global = true, value_name = "URL")]
    pub registry: Option<String>,

    /// Show debug-level progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load, transform, write, pack and publish
    Publish {
        /// Manifest transforms
        #[command(flatten)]
        transform: TransformArgs,
        /// Registry options
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Load, transform and write the manifest without publishing
    Transform {
        /// Manifest transforms
        #[command(flatten)]
        transform: TransformArgs,
    },
    /// Pack the artifact directory into a tarball
    Pack {
        /// Output path (default: <name>-<version>.tgz in the current directory)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Report whether the manifest version is already on the registry
    Status {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Manifest transform flags
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TransformArgs {
    /// Name the manifest must currently carry
    #[arg(long, value_name = "NAME", requires = "rename_to")]
    pub rename_from: Option<String>,

    /// Name to publish under
    #[arg(long, value_name = "NAME", requires = "rename_from")]
    pub rename_to: Option<String>,

    /// Ensure an entry is present in `files` (repeatable)
    #[arg(long = "add-file", value_name = "PATH")]
    pub add_files: Vec<String>,

    /// Set a top-level string field (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub set_fields: Vec<(String, String)>,
}

/// Registry flags
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct PublishArgs {
    /// Environment variable holding the registry token (default: NPM_TOKEN)
    #[arg(long, value_name = "VAR")]
    pub token_env: Option<String>,

    /// Package access level
    #[arg(long, value_enum)]
    pub access: Option<Access>,

    /// Dist-tag to publish under (default: latest)
    #[arg(long, value_name = "TAG")]
    pub dist_tag: Option<String>,

    /// Git tag that triggered the release; must match v*
    #[arg(long, value_name = "TAG", env = "KODEGEN_WASM_PUBLISH_TAG")]
    pub tag: Option<String>,

    /// Pack and validate without uploading
    #[arg(long)]
    pub dry_run: bool,

    /// Query the registry for the version before uploading
    #[arg(long)]
    pub check_existing: bool,

    /// Exit successfully when the version is already published
    #[arg(long)]
    pub allow_existing: bool,

    /// Retries for transient network failures (default: 0)
    #[arg(long, value_name = "N")]
    pub network_retries: Option<u32>,
}

impl Command {
    /// Subcommand name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Publish { .. } => "publish",
            Command::Transform { .. } => "transform",
            Command::Pack { .. } => "pack",
            Command::Status { .. } => "status",
        }
    }
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(dir) = &self.artifact_dir
            && dir.as_os_str().is_empty()
        {
            return Err("--artifact-dir must not be empty".to_string());
        }
        if let Command::Publish { publish, .. } = &self.command
            && publish.allow_existing
            && publish.dry_run
        {
            return Err("--allow-existing has no effect with --dry-run".to_string());
        }
        Ok(())
    }

    /// Whether a registry conflict should end the run successfully
    pub fn allow_existing(&self) -> bool {
        matches!(&self.command, Command::Publish { publish, .. } if publish.allow_existing)
    }

    /// Build the publisher configuration: defaults, then config file, then flags
    pub fn publisher_config(&self) -> Result<PublisherConfig> {
        let mut config = PublisherConfig {
            network_retries: RetryConfig::from_env().network_publish,
            ..PublisherConfig::default()
        };

        if let Some(path) = &self.config {
            config.apply_file(load_file_config(path)?);
        }

        if let Some(dir) = &self.artifact_dir {
            config.artifact_dir = dir.clone();
        }
        if let Some(manifest) = &self.manifest {
            config.manifest_path = Some(manifest.clone());
        }
        if let Some(registry) = &self.registry {
            config.registry = registry.clone();
        }

        match &self.command {
            Command::Publish { transform, publish } => {
                apply_transform_args(&mut config, transform)?;
                apply_publish_args(&mut config, publish);
            }
            Command::Transform { transform } => apply_transform_args(&mut config, transform)?,
            Command::Pack { .. } | Command::Status { .. } => {}
        }

        Ok(config)
    }
}

fn apply_transform_args(config: &mut PublisherConfig, args: &TransformArgs) -> Result<()> {
    match (&args.rename_from, &args.rename_to) {
        (Some(from), Some(to)) => {
            config.rename = Some(RenameRule {
                from: from.clone(),
                to: to.clone(),
            });
        }
        (None, None) => {}
        _ => {
            return Err(CliError::InvalidArguments {
                reason: "--rename-from and --rename-to must be given together".to_string(),
            }
            .into());
        }
    }

    for entry in &args.add_files {
        if !config.add_files.contains(entry) {
            config.add_files.push(entry.clone());
        }
    }
    for (key, value) in &args.set_fields {
        config.set_fields.retain(|(existing, _)| existing != key);
        config.set_fields.push((key.clone(), value.clone()));
    }
    Ok(())
}

fn apply_publish_args(config: &mut PublisherConfig, args: &PublishArgs) {
    if let Some(v) = &args.token_env {
        config.token_env = v.clone();
    }
    if let Some(v) = args.access {
        config.access = v;
    }
    if let Some(v) = &args.dist_tag {
        config.dist_tag = v.clone();
    }
    if let Some(v) = &args.tag {
        config.tag = Some(v.clone());
    }
    if let Some(v) = args.network_retries {
        config.network_retries = v;
    }
    config.dry_run |= args.dry_run;
    config.check_existing |= args.check_existing;
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}
