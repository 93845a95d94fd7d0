//! Ordered manifest transformations applied before publishing.

use super::Manifest;
use crate::error::{Result, ValidationError};
use serde_json::Value;
use std::fmt;

/// A single deterministic mutation of the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformStep {
    /// Replace `name`, but only if it currently equals `from`
    Rename {
        /// Name the manifest must currently carry
        from: String,
        /// Replacement name
        to: String,
    },
    /// Append entries to `files` that are not already listed
    AugmentFiles {
        /// Entries to ensure are present, in order
        entries: Vec<String>,
    },
    /// Set a top-level string field
    SetField {
        /// Field name
        key: String,
        /// Field value
        value: String,
    },
}

impl TransformStep {
    /// Short step name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            TransformStep::Rename { .. } => "rename",
            TransformStep::AugmentFiles { .. } => "augment-files",
            TransformStep::SetField { .. } => "set-field",
        }
    }

    /// Apply this step, consuming the input manifest
    pub fn apply(&self, mut manifest: Manifest) -> Result<Manifest> {
        match self {
            TransformStep::Rename { from, to } => {
                let current = match manifest.get("name") {
                    None => {
                        return Err(ValidationError::MissingField {
                            step: self.name().to_string(),
                            field: "name".to_string(),
                        }
                        .into());
                    }
                    Some(Value::String(name)) => name.as_str(),
                    Some(_) => {
                        return Err(ValidationError::FieldType {
                            step: self.name().to_string(),
                            field: "name".to_string(),
                            expected: "a string".to_string(),
                        }
                        .into());
                    }
                };

                if current != from {
                    return Err(ValidationError::NameMismatch {
                        expected: from.clone(),
                        found: current.to_string(),
                    }
                    .into());
                }

                manifest.set("name", Value::String(to.clone()));
            }
            TransformStep::AugmentFiles { entries } => {
                let step = self.name();
                let files = manifest
                    .get_mut("files")
                    .ok_or_else(|| ValidationError::MissingField {
                        step: step.to_string(),
                        field: "files".to_string(),
                    })?;

                let type_error = || ValidationError::FieldType {
                    step: step.to_string(),
                    field: "files".to_string(),
                    expected: "an array of strings".to_string(),
                };

                let list = files.as_array_mut().ok_or_else(type_error)?;
                if !list.iter().all(Value::is_string) {
                    return Err(type_error().into());
                }

                for entry in entries {
                    if !list.iter().any(|existing| existing.as_str() == Some(entry.as_str())) {
                        list.push(Value::String(entry.clone()));
                    }
                }
            }
            TransformStep::SetField { key, value } => {
                if key.trim().is_empty() {
                    return Err(ValidationError::InvalidValue {
                        field: "set-field key".to_string(),
                        reason: "field name must not be empty".to_string(),
                    }
                    .into());
                }
                manifest.set(key.clone(), Value::String(value.clone()));
            }
        }

        Ok(manifest)
    }
}

impl fmt::Display for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformStep::Rename { from, to } => write!(f, "rename '{}' -> '{}'", from, to),
            TransformStep::AugmentFiles { entries } => {
                write!(f, "augment files with [{}]", entries.join(", "))
            }
            TransformStep::SetField { key, value } => write!(f, "set {} = '{}'", key, value),
        }
    }
}

/// Apply one step to a manifest
pub fn apply_transform(manifest: Manifest, step: &TransformStep) -> Result<Manifest> {
    step.apply(manifest)
}

/// Apply steps in order, stopping at the first failure
pub fn apply_all(manifest: Manifest, steps: &[TransformStep]) -> Result<Manifest> {
    steps.iter().try_fold(manifest, |manifest, step| {
        log::debug!("Applying transform: {}", step);
        step.apply(manifest)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;
    use serde_json::json;

    fn manifest(value: Value) -> Manifest {
        Manifest::from(value.as_object().cloned().unwrap_or_default())
    }

    fn rename() -> TransformStep {
        TransformStep::Rename {
            from: "@scope/pkg".to_string(),
            to: "@scope/pkg-web".to_string(),
        }
    }

    #[test]
    fn rename_replaces_only_the_name() {
        let input = manifest(json!({
            "name": "@scope/pkg",
            "version": "0.4.0",
            "files": ["pkg.js"],
            "sideEffects": false
        }));

        let output = apply_transform(input.clone(), &rename()).unwrap();

        assert_eq!(output.name(), Some("@scope/pkg-web"));
        for (key, value) in input.fields() {
            if key != "name" {
                assert_eq!(output.get(key), Some(value), "field {key} changed");
            }
        }
        assert_eq!(output.fields().len(), input.fields().len());
    }

    #[test]
    fn rename_twice_fails_with_mismatch() {
        let once = apply_transform(manifest(json!({"name": "@scope/pkg"})), &rename()).unwrap();
        let err = apply_transform(once, &rename()).unwrap_err();
        match err {
            ReleaseError::Validation(ValidationError::NameMismatch { expected, found }) => {
                assert_eq!(expected, "@scope/pkg");
                assert_eq!(found, "@scope/pkg-web");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rename_requires_string_name() {
        let err = apply_transform(manifest(json!({"version": "1.0.0"})), &rename()).unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Validation(ValidationError::MissingField { .. })
        ));

        let err = apply_transform(manifest(json!({"name": 7})), &rename()).unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Validation(ValidationError::FieldType { .. })
        ));
    }

    #[test]
    fn augment_files_is_idempotent() {
        let step = TransformStep::AugmentFiles {
            entries: vec![
                "wasm_bg.js".to_string(),
                "wasm.js".to_string(),
                "wasm_bg.js".to_string(),
            ],
        };
        let once = apply_transform(manifest(json!({"files": ["wasm.js"]})), &step).unwrap();
        let twice = apply_transform(once.clone(), &step).unwrap();

        assert_eq!(once, twice);
        assert_eq!(once.files(), Some(vec!["wasm.js", "wasm_bg.js"]));
    }

    #[test]
    fn augment_files_rejects_missing_or_malformed_files() {
        let step = TransformStep::AugmentFiles {
            entries: vec!["a.js".to_string()],
        };
        let err = apply_transform(manifest(json!({"name": "x"})), &step).unwrap_err();
        assert!(err.to_string().contains("'files' is missing"));

        let err = apply_transform(manifest(json!({"files": "a.js"})), &step).unwrap_err();
        assert!(err.to_string().contains("array of strings"));
    }

    #[test]
    fn wasm_web_scenario() {
        let steps = [
            TransformStep::Rename {
                from: "@swc/wasm".to_string(),
                to: "@swc/wasm-web".to_string(),
            },
            TransformStep::AugmentFiles {
                entries: vec!["wasm_bg.js".to_string(), "wasm_bg.wasm.d.ts".to_string()],
            },
        ];

        let output = apply_all(manifest(json!({"name": "@swc/wasm", "files": ["wasm.js"]})), &steps)
            .unwrap();

        assert_eq!(
            output.into_value(),
            json!({
                "name": "@swc/wasm-web",
                "files": ["wasm.js", "wasm_bg.js", "wasm_bg.wasm.d.ts"]
            })
        );
    }

    #[test]
    fn set_field_is_idempotent() {
        let step = TransformStep::SetField {
            key: "types".to_string(),
            value: "wasm.d.ts".to_string(),
        };
        let once = apply_transform(manifest(json!({"name": "x", "files": []})), &step).unwrap();
        let twice = apply_transform(once.clone(), &step).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.fields().len(), 3);
    }

    #[test]
    fn set_field_overwrites_in_place() {
        let step = TransformStep::SetField {
            key: "module".to_string(),
            value: "wasm.js".to_string(),
        };
        let output = apply_transform(
            manifest(json!({"name": "x", "module": "old.js", "files": []})),
            &step,
        )
        .unwrap();
        let keys: Vec<&str> = output.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, ["name", "module", "files"]);
        assert_eq!(output.get_str("module"), Some("wasm.js"));

        let empty = TransformStep::SetField {
            key: " ".to_string(),
            value: "v".to_string(),
        };
        assert!(apply_transform(output, &empty).is_err());
    }
}
