//! Command line interface for kodegen_wasm_publish.
//!
//! Parses arguments, layers configuration and maps pipeline outcomes to
//! process exit codes.

mod args;
pub mod commands;
mod output;
mod retry_config;

pub use args::{Args, Command, PublishArgs, RuntimeConfig, TransformArgs};
pub use commands::execute_command;
pub use output::OutputManager;
pub use retry_config::RetryConfig;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
