//! Transform command: rewrite the manifest in place without publishing.

use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::pipeline::Publisher;

/// Execute the transform command
pub(super) fn execute_transform(args: &Args, config: &RuntimeConfig) -> Result<()> {
    let publisher_config = args.publisher_config()?;
    let manifest_path = publisher_config.manifest_path();

    let mut publisher = Publisher::new(publisher_config)?;
    let manifest = publisher.run_local()?;

    config.success_println(&format!(
        "Wrote {} ({}@{})",
        manifest_path.display(),
        manifest.name().unwrap_or("<unnamed>"),
        manifest.version().unwrap_or("<unversioned>")
    ));
    if let Some(files) = manifest.files() {
        config.verbose_println(&format!("files: {}", files.join(", ")));
    }
    Ok(())
}
