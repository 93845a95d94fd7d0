//! Command execution for each subcommand.
//!
//! Commands return the process exit code; errors are printed here so every
//! subcommand reports failures the same way.

mod pack;
mod publish;
mod status;
mod transform;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::{ReleaseError, Result};

use pack::execute_pack;
use publish::execute_publish;
use status::execute_status;
use transform::execute_transform;

/// Exit code for a version that already exists on the registry
pub const EXIT_CONFLICT: i32 = 2;

/// Execute the main command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        // Validation errors are shown even in quiet mode
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Publish { .. } => execute_publish(&args, &config).await,
        Command::Transform { .. } => execute_transform(&args, &config),
        Command::Pack { out } => execute_pack(&args, &config, out.as_deref()),
        Command::Status { json } => execute_status(&args, &config, *json).await,
    };

    match result {
        Ok(()) => Ok(0),
        Err(e) if e.is_conflict() => Ok(report_conflict(&args, &config, &e)),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {}", args.command.name(), e));
            print_suggestions(&config, &e);
            Ok(e.exit_code())
        }
    }
}

fn report_conflict(args: &Args, config: &RuntimeConfig, error: &ReleaseError) -> i32 {
    if args.allow_existing() {
        config.warning_println(&format!("{}; nothing to publish", error.root()));
        return 0;
    }
    config.error_println(&format!("Command '{}' stopped: {}", args.command.name(), error));
    print_suggestions(config, error);
    EXIT_CONFLICT
}

fn print_suggestions(config: &RuntimeConfig, error: &ReleaseError) {
    if !config.is_verbose() {
        return;
    }
    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() {
        config.println("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            config.indent(&format!("• {}", suggestion));
        }
    }
}
