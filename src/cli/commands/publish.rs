//! Publish command: the full tag-triggered release run.

use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::pipeline::Publisher;

/// Execute the publish command
pub(super) async fn execute_publish(args: &Args, config: &RuntimeConfig) -> Result<()> {
    let publisher_config = args.publisher_config()?;
    let _ = config.output().section("Publishing wasm package");
    config.verbose_println(&format!(
        "Artifact directory: {}",
        publisher_config.artifact_dir.display()
    ));
    for step in publisher_config.transform_steps() {
        config.verbose_println(&format!("Transform: {}", step));
    }

    let mut publisher = Publisher::new(publisher_config)?;
    let result = publisher.run().await?;

    if result.dry_run {
        config.success_println(&format!("Dry run packed {} (not uploaded)", result.spec()));
    } else {
        config.success_println(&format!(
            "Published {} to {} under '{}'",
            result.spec(),
            result.registry,
            result.dist_tag
        ));
    }
    config.indent(&format!("files:     {}", result.file_count));
    config.indent(&format!("size:      {} bytes", result.tarball_size));
    config.indent(&format!("shasum:    {}", result.shasum));
    config.indent(&format!("integrity: {}", result.integrity));
    Ok(())
}
