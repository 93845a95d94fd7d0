//! # Kodegen Wasm Publish
//!
//! Tag-triggered publishing for wasm packages built with `wasm-pack`.
//!
//! A release run loads the generated `package.json`, applies a fixed sequence
//! of manifest transforms, persists the result atomically, packs the artifact
//! directory and uploads it to an npm-compatible registry exactly once.
//!
//! ## Features
//!
//! - **Guarded Renames**: The package is renamed only if it still carries the expected name
//! - **Idempotent Transforms**: File-list augmentation can be re-run safely
//! - **Atomic Writes**: The manifest is replaced via temp file and rename
//! - **Typed Failures**: Each error names the stage that produced it
//! - **Conflict Awareness**: Republishing an existing version is reported, never retried
//!
//! ## Usage
//!
//! ```bash
//! kodegen_wasm_publish publish --artifact-dir pkg \
//!     --rename-from @swc/wasm --rename-to @swc/wasm-web \
//!     --add-file wasm_bg.js --add-file wasm_bg.wasm.d.ts
//! kodegen_wasm_publish transform --artifact-dir pkg --add-file wasm_bg.js
//! kodegen_wasm_publish status --artifact-dir pkg
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod registry;

// Re-export main types for public API
pub use cli::Args;
pub use config::{PublisherConfig, RenameRule};
pub use error::{ReleaseError, Result};
pub use manifest::{Manifest, TransformStep, apply_transform, load_manifest, write_manifest};
pub use pipeline::{PipelineState, Publisher, Stage};
pub use registry::{Access, Credential, PublishResult, PublishTarget, RegistryClient};
