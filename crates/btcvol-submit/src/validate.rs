//! Cheap pre-flight checks on the model file.
//!
//! This is a substring heuristic, not a parse: a file passes when it exists,
//! has an accepted extension and mentions both configured markers anywhere in
//! its text. Deeper validation is the orchestrator's job.

use std::path::Path;

use tracing::debug;

use crate::config::ValidationSettings;
use crate::error::{SubmitError, SubmitResult};
use crate::types::{ModelFile, ModelKind};

/// Validate a model file and load its content.
///
/// Checks run in order and stop at the first failure: existence, extension,
/// markers. Nothing is written to disk.
pub fn validate_model_file(path: &Path, settings: &ValidationSettings) -> SubmitResult<ModelFile> {
    if !path.exists() {
        return Err(SubmitError::ModelNotFound(path.to_owned()));
    }

    let Some(kind) = ModelKind::from_path(path) else {
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        return Err(SubmitError::UnsupportedType { extension });
    };

    let content = std::fs::read_to_string(path).map_err(|source| SubmitError::ModelUnreadable {
        path: path.to_owned(),
        source,
    })?;
    if !content.contains(&settings.class_marker) || !content.contains(&settings.method_marker) {
        return Err(SubmitError::InvalidModel {
            class_marker: settings.class_marker.clone(),
            method_marker: settings.method_marker.clone(),
        });
    }

    debug!(path = %path.display(), ?kind, bytes = content.len(), "model file validated");

    Ok(ModelFile {
        path: path.to_owned(),
        kind,
        content,
    })
}
