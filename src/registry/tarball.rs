//! Pack an artifact directory into an npm tarball.
//!
//! Entries live under `package/`, carry a fixed mtime and mode, and are sorted,
//! so packing the same directory twice yields identical bytes.

use crate::error::{Result, ValidationError};
use crate::manifest::Manifest;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::Digest as _;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// npm's fixed archive timestamp (1985-10-26T08:15:00Z)
const NPM_EPOCH: u64 = 499_162_500;

/// Root files npm always includes regardless of `files`
const ALWAYS_INCLUDED: &[&str] = &["readme", "license", "licence"];

/// A packed tarball and its digests
#[derive(Debug, Clone)]
pub struct PackedTarball {
    /// Gzipped tar bytes
    pub bytes: Vec<u8>,
    /// SHA-1, hex encoded
    pub shasum: String,
    /// `sha512-<base64>`
    pub integrity: String,
    /// Archive paths, each starting with `package/`
    pub entries: Vec<String>,
    /// Tarball file name, e.g. `wasm-web-1.2.3.tgz`
    pub file_name: String,
}

/// Tarball file name for a package; scoped names drop the scope
pub fn tarball_file_name(name: &str, version: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    format!("{}-{}.tgz", base, version)
}

/// Pack `artifact_dir` according to the manifest's `files` list
///
/// `package.json` is written from `manifest` rather than read from disk.
pub fn pack_directory(artifact_dir: &Path, manifest: &Manifest) -> Result<PackedTarball> {
    let name = manifest.name().ok_or_else(|| ValidationError::MissingField {
        step: "pack".to_string(),
        field: "name".to_string(),
    })?;
    let version = manifest
        .version()
        .ok_or_else(|| ValidationError::MissingField {
            step: "pack".to_string(),
            field: "version".to_string(),
        })?;

    let files = collect_files(artifact_dir, manifest)?;
    let manifest_json = manifest.to_pretty_json()?;

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut entries = Vec::with_capacity(files.len() + 1);

    let manifest_entry = "package/package.json".to_string();
    append_entry(&mut builder, &manifest_entry, manifest_json.as_bytes())?;
    entries.push(manifest_entry);

    for relative in &files {
        let data = fs::read(artifact_dir.join(relative))?;
        let entry = format!("package/{}", to_archive_path(relative));
        append_entry(&mut builder, &entry, &data)?;
        entries.push(entry);
    }

    let bytes = builder.into_inner()?.finish()?;

    let shasum = hex::encode(sha1::Sha1::digest(&bytes));
    let integrity = format!("sha512-{}", STANDARD.encode(sha2::Sha512::digest(&bytes)));

    log::debug!(
        "Packed {} file(s) from {} into {} bytes",
        entries.len(),
        artifact_dir.display(),
        bytes.len()
    );

    Ok(PackedTarball {
        bytes,
        shasum,
        integrity,
        entries,
        file_name: tarball_file_name(name, version),
    })
}

fn append_entry<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    path: &str,
    data: &[u8],
) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(NPM_EPOCH);
    builder.append_data(&mut header, path, data)?;
    Ok(())
}

/// Resolve the relative file set, excluding `package.json`
fn collect_files(artifact_dir: &Path, manifest: &Manifest) -> Result<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();

    // Without a `files` list npm ships the whole directory
    let listed = match manifest.files() {
        Some(listed) => listed,
        None if manifest.get("files").is_some() => {
            return Err(ValidationError::FieldType {
                step: "pack".to_string(),
                field: "files".to_string(),
                expected: "an array of strings".to_string(),
            }
            .into());
        }
        None => vec!["."],
    };

    for raw in listed {
        let entry = raw.trim_start_matches("./");
        let matched = if entry.is_empty() || entry == "." {
            walk_into(artifact_dir, artifact_dir, &mut files)?
        } else if is_pattern(entry) {
            // Only the entry is a pattern; brackets in the directory are literal
            let base = glob::Pattern::escape(&artifact_dir.to_string_lossy());
            let pattern = Path::new(&base).join(entry);
            let pattern = pattern.to_string_lossy();
            let mut matched = 0;
            let paths = glob::glob(&pattern).map_err(|e| ValidationError::InvalidValue {
                field: "files".to_string(),
                reason: format!("bad pattern '{}': {}", raw, e),
            })?;
            for path in paths.flatten() {
                matched += walk_into(artifact_dir, &path, &mut files)?;
            }
            matched
        } else {
            walk_into(artifact_dir, &artifact_dir.join(entry), &mut files)?
        };

        if matched == 0 {
            return Err(ValidationError::MissingArtifact {
                entry: raw.to_string(),
                dir: artifact_dir.to_path_buf(),
            }
            .into());
        }
    }

    for dir_entry in fs::read_dir(artifact_dir)? {
        let dir_entry = dir_entry?;
        let file_name = dir_entry.file_name().to_string_lossy().to_ascii_lowercase();
        if dir_entry.file_type()?.is_file()
            && ALWAYS_INCLUDED.iter().any(|prefix| file_name.starts_with(prefix))
        {
            files.insert(PathBuf::from(dir_entry.file_name()));
        }
    }

    files.remove(Path::new("package.json"));
    Ok(files)
}

/// Add a file, or every file below a directory; returns how many paths matched
fn walk_into(root: &Path, path: &Path, files: &mut BTreeSet<PathBuf>) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            if relative.components().any(|c| c.as_os_str() == "node_modules") {
                continue;
            }
            files.insert(relative.to_path_buf());
            count += 1;
        }
    }
    Ok(count)
}

fn is_pattern(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

fn to_archive_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;
    use flate2::read::GzDecoder;
    use serde_json::json;
    use std::io::Read;

    fn manifest(value: serde_json::Value) -> Manifest {
        Manifest::from(value.as_object().cloned().unwrap_or_default())
    }

    fn artifact_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("wasm.js"), "export {}").unwrap();
        fs::write(dir.path().join("wasm_bg.js"), "export {}").unwrap();
        fs::write(dir.path().join("wasm_bg.wasm"), [0u8, 97, 115, 109]).unwrap();
        fs::write(dir.path().join("wasm_bg.wasm.d.ts"), "export {}").unwrap();
        fs::write(dir.path().join("README.md"), "# wasm").unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join(".gitignore"), "*").unwrap();
        dir
    }

    fn archive_paths(bytes: &[u8]) -> Vec<String> {
        let mut archive = tar::Archive::new(GzDecoder::new(bytes));
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn file_name_strips_scope() {
        assert_eq!(tarball_file_name("@swc/wasm-web", "1.2.3"), "wasm-web-1.2.3.tgz");
        assert_eq!(tarball_file_name("left-pad", "0.0.1"), "left-pad-0.0.1.tgz");
    }

    #[test]
    fn packs_listed_files_under_package_prefix() {
        let dir = artifact_dir();
        let manifest = manifest(json!({
            "name": "@swc/wasm-web",
            "version": "1.2.3",
            "files": ["wasm.js", "wasm_bg.*"]
        }));

        let packed = pack_directory(dir.path(), &manifest).unwrap();
        let paths = archive_paths(&packed.bytes);

        assert_eq!(paths, packed.entries);
        assert_eq!(
            paths,
            [
                "package/package.json",
                "package/README.md",
                "package/wasm.js",
                "package/wasm_bg.js",
                "package/wasm_bg.wasm",
                "package/wasm_bg.wasm.d.ts",
            ]
        );
        assert_eq!(packed.shasum.len(), 40);
        assert!(packed.integrity.starts_with("sha512-"));
        assert_eq!(packed.file_name, "wasm-web-1.2.3.tgz");
    }

    #[test]
    fn globs_match_inside_directory_with_pattern_characters() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("build[web]");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("wasm_bg.js"), "export {}").unwrap();
        fs::write(dir.join("wasm_bg.wasm"), [0u8, 97, 115, 109]).unwrap();

        let manifest = manifest(json!({
            "name": "@swc/wasm-web",
            "version": "1.2.3",
            "files": ["wasm_bg.*"]
        }));

        let packed = pack_directory(&dir, &manifest).unwrap();
        assert_eq!(
            packed.entries,
            [
                "package/package.json",
                "package/wasm_bg.js",
                "package/wasm_bg.wasm",
            ]
        );
    }

    #[test]
    fn package_json_comes_from_manifest() {
        let dir = artifact_dir();
        let manifest = manifest(json!({"name": "a", "version": "1.0.0", "files": ["wasm.js"]}));
        let packed = pack_directory(dir.path(), &manifest).unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(packed.bytes.as_slice()));
        let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, manifest.to_pretty_json().unwrap());
    }

    #[test]
    fn packing_is_deterministic() {
        let dir = artifact_dir();
        let manifest = manifest(json!({"name": "a", "version": "1.0.0"}));
        let first = pack_directory(dir.path(), &manifest).unwrap();
        let second = pack_directory(dir.path(), &manifest).unwrap();
        assert_eq!(first.shasum, second.shasum);
        assert!(first.entries.contains(&"package/.gitignore".to_string()));
    }

    #[test]
    fn missing_listed_file_is_validation_error() {
        let dir = artifact_dir();
        let manifest = manifest(json!({
            "name": "a",
            "version": "1.0.0",
            "files": ["wasm.js", "snippets"]
        }));
        let err = pack_directory(dir.path(), &manifest).unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Validation(ValidationError::MissingArtifact { ref entry, .. }) if entry == "snippets"
        ));
    }

    #[test]
    fn version_is_required() {
        let dir = artifact_dir();
        let err = pack_directory(dir.path(), &manifest(json!({"name": "a"}))).unwrap_err();
        assert!(err.to_string().contains("'version' is missing"));
    }
}
