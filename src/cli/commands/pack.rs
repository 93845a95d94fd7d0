//! Pack command: write the tarball that `publish` would upload.

use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::manifest::load_manifest;
use crate::registry::pack_directory;
use std::path::{Path, PathBuf};

/// Execute the pack command
pub(super) fn execute_pack(args: &Args, config: &RuntimeConfig, out: Option<&Path>) -> Result<()> {
    let publisher_config = args.publisher_config()?;
    let manifest = load_manifest(&publisher_config.manifest_path())?;
    let packed = pack_directory(&publisher_config.artifact_dir, &manifest)?;

    let out_path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&packed.file_name));
    std::fs::write(&out_path, &packed.bytes)?;

    for entry in &packed.entries {
        config.verbose_println(entry);
    }
    config.success_println(&format!(
        "Packed {} file(s) into {} ({} bytes)",
        packed.entries.len(),
        out_path.display(),
        packed.bytes.len()
    ));
    config.indent(&format!("shasum:    {}", packed.shasum));
    config.indent(&format!("integrity: {}", packed.integrity));
    Ok(())
}
