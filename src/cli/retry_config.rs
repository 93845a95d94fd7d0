//! Retry configuration for registry operations.
//!
//! Internal retries are off by default: a failed tag build is re-run by the
//! CI host. Setting `KODEGEN_WASM_PUBLISH_RETRY_NETWORK` opts in.

use crate::config::MAX_NETWORK_RETRIES;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RetryConfig {
    /// Max retries for transient failures of the publish request
    pub network_publish: u32,
}

impl RetryConfig {
    /// Parse retry count from environment variable with clamping to maximum
    ///
    /// # Arguments
    /// * `var_name` - Environment variable name
    /// * `default` - Default value if variable is not set or invalid
    /// * `max` - Maximum allowed value (values above this are clamped)
    fn parse_retry_env(var_name: &str, default: u32, max: u32) -> u32 {
        parse_retry_value(std::env::var(var_name).ok().as_deref(), default, max)
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        Self {
            network_publish: Self::parse_retry_env(
                "KODEGEN_WASM_PUBLISH_RETRY_NETWORK",
                0,
                MAX_NETWORK_RETRIES,
            ),
        }
    }
}

fn parse_retry_value(value: Option<&str>, default: u32, max: u32) -> u32 {
    value
        .and_then(|s| s.trim().parse::<u32>().ok())
        .map(|v| v.min(max))
        .unwrap_or(default)
}
