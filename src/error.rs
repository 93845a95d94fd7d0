//! Comprehensive error types for kodegen_wasm_publish operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use crate::pipeline::{PipelineState, Stage};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kodegen_wasm_publish operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all kodegen_wasm_publish operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// A pipeline stage failed; wraps the underlying error with the stage name
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// Stage that was executing when the error occurred
        stage: Stage,
        /// Underlying error
        #[source]
        source: Box<ReleaseError>,
    },

    /// Manifest loading and persistence errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Transform and packing precondition errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Registry publishing errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// CLI argument and configuration errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Pipeline was driven out of order
    #[error("Invalid pipeline transition from {from} to {to}")]
    InvalidTransition {
        /// State the pipeline was in
        from: PipelineState,
        /// State that was requested
        to: PipelineState,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Manifest file errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file does not exist
    #[error("Manifest not found at {path}")]
    NotFound {
        /// Path where the manifest was expected
        path: PathBuf,
    },

    /// Manifest is not valid JSON or not a JSON object
    #[error("Failed to parse manifest {path}: {reason}")]
    Parse {
        /// Manifest path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Reading or writing the manifest failed
    #[error("Manifest IO failed for {path}: {source}")]
    Io {
        /// Manifest path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Precondition failures for transform steps and packing
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A field the step operates on is absent
    #[error("{step}: required field '{field}' is missing")]
    MissingField {
        /// Step that required the field
        step: String,
        /// Field name
        field: String,
    },

    /// A field is present but has the wrong JSON type
    #[error("{step}: field '{field}' must be {expected}")]
    FieldType {
        /// Step that inspected the field
        step: String,
        /// Field name
        field: String,
        /// Expected JSON shape
        expected: String,
    },

    /// Rename guard did not match the current package name
    #[error("rename: expected name '{expected}', found '{found}'")]
    NameMismatch {
        /// Name the rename step expected to replace
        expected: String,
        /// Name actually present in the manifest
        found: String,
    },

    /// A field value is unusable
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for the error
        reason: String,
    },

    /// A file listed for packing is missing from the artifact directory
    #[error("artifact '{entry}' listed in files was not found in {dir}")]
    MissingArtifact {
        /// Entry from the `files` array
        entry: String,
        /// Artifact directory searched
        dir: PathBuf,
    },
}

/// Publishing errors
#[derive(Error, Debug)]
pub enum PublishError {
    /// Credential missing or rejected by the registry
    #[error("Authentication failed: {reason}")]
    Auth {
        /// Reason for the error
        reason: String,
    },

    /// Registry unreachable or returned a transient failure
    #[error("Network error during publishing: {reason}")]
    Network {
        /// Reason for the error
        reason: String,
    },

    /// Version already exists on the registry
    #[error("Package '{package}' version '{version}' is already published")]
    Conflict {
        /// Package name
        package: String,
        /// Version string
        version: String,
    },

    /// Registry refused the request for a non-transient reason
    #[error("Registry rejected publish with status {status}: {reason}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body or summary
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Tag does not match the release trigger pattern
    #[error("Tag '{tag}' does not match the release pattern 'v*'")]
    InvalidTag {
        /// Tag name
        tag: String,
    },

    /// Configuration file could not be used
    #[error("Invalid config file {path}: {reason}")]
    Config {
        /// Config file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Attach the pipeline stage to an error, leaving already-tagged errors alone
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            ReleaseError::Stage { .. } => self,
            other => ReleaseError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage at which this error occurred, if known
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ReleaseError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error with stage wrappers removed
    pub fn root(&self) -> &ReleaseError {
        match self {
            ReleaseError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the registry already has this version
    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), ReleaseError::Publish(PublishError::Conflict { .. }))
    }

    /// Whether retrying the same operation could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.root(), ReleaseError::Publish(PublishError::Network { .. }))
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_conflict() { 2 } else { 1 }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self.root() {
            ReleaseError::Manifest(ManifestError::NotFound { path }) => vec![
                format!("Build the wasm package so that {} exists", path.display()),
                "Point --manifest or --artifact-dir at the build output".to_string(),
            ],
            ReleaseError::Manifest(ManifestError::Parse { .. }) => vec![
                "Check package.json for trailing commas or truncated content".to_string(),
            ],
            ReleaseError::Validation(ValidationError::NameMismatch { expected, found }) => {
                let mut suggestions = vec![format!(
                    "Expected package '{}' but the manifest names '{}'",
                    expected, found
                )];
                suggestions.push(
                    "If the manifest was already renamed by an earlier run, publish without --rename-from"
                        .to_string(),
                );
                suggestions
            }
            ReleaseError::Validation(ValidationError::MissingArtifact { entry, .. }) => vec![
                format!("Ensure the build emits '{}'", entry),
                "Remove the entry from --add-file if it is no longer produced".to_string(),
            ],
            ReleaseError::Publish(PublishError::Auth { .. }) => vec![
                "Export the registry token, e.g. NPM_TOKEN, in the job environment".to_string(),
                "Verify the token is an automation token with publish rights".to_string(),
            ],
            ReleaseError::Publish(PublishError::Conflict { version, .. }) => vec![
                format!("Version {} is immutable on the registry", version),
                "Bump the package version and push a new tag".to_string(),
            ],
            ReleaseError::Publish(PublishError::Network { .. }) => vec![
                "Re-run the job once the registry is reachable".to_string(),
                "Use --network-retries to retry transient failures in-process".to_string(),
            ],
            ReleaseError::Cli(CliError::InvalidTag { .. }) => vec![
                "Release tags must start with 'v', e.g. v1.2.3".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.root(),
            ReleaseError::Publish(PublishError::Conflict { .. })
                | ReleaseError::Publish(PublishError::Auth { .. })
                | ReleaseError::Publish(PublishError::Rejected { .. })
                | ReleaseError::Validation(_)
                | ReleaseError::Cli(_)
                | ReleaseError::InvalidTransition { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> ReleaseError {
        PublishError::Conflict {
            package: "@swc/wasm-web".to_string(),
            version: "1.2.3".to_string(),
        }
        .into()
    }

    #[test]
    fn stage_wrapper_is_applied_once() {
        let err = conflict().at_stage(Stage::Publish).at_stage(Stage::Write);
        assert_eq!(err.stage(), Some(Stage::Publish));
        assert!(err.to_string().starts_with("publish stage failed"));
    }

    #[test]
    fn conflict_is_distinguished_from_failures() {
        let err = conflict().at_stage(Stage::Publish);
        assert!(err.is_conflict());
        assert!(!err.is_retryable());
        assert!(!err.is_recoverable());
        assert_eq!(err.exit_code(), 2);

        let net: ReleaseError = PublishError::Network {
            reason: "connection refused".to_string(),
        }
        .into();
        assert!(net.is_retryable());
        assert_eq!(net.exit_code(), 1);
    }

    #[test]
    fn name_mismatch_reports_expected_and_found() {
        let err: ReleaseError = ValidationError::NameMismatch {
            expected: "@swc/wasm".to_string(),
            found: "@swc/wasm-web".to_string(),
        }
        .into();
        let message = err.at_stage(Stage::Transform).to_string();
        assert!(message.contains("transform stage failed"));
        assert!(message.contains("'@swc/wasm'"));
        assert!(message.contains("'@swc/wasm-web'"));
    }
}
