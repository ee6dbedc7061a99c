//! Core types shared across the submission pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SubmitError, SubmitResult};

/// Kind of model file accepted for submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Plain Python script (`.py`).
    Script,
    /// Jupyter notebook (`.ipynb`).
    Notebook,
}

impl ModelKind {
    /// Determine the kind from a path's extension.
    ///
    /// Matching is exact: `.PY` is not accepted.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") => Some(Self::Script),
            Some("ipynb") => Some(Self::Notebook),
            _ => None,
        }
    }
}

/// A model file that passed validation.
#[derive(Debug, Clone)]
pub struct ModelFile {
    /// Path to the file on disk.
    pub path: PathBuf,
    /// Script or notebook.
    pub kind: ModelKind,
    /// Raw text content.
    pub content: String,
}

/// Slugified submission name, safe to use as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionName(String);

impl SubmissionName {
    /// Build a name from user input, or from the timestamp when none (or an
    /// empty string) is given.
    ///
    /// User input is lowercased, every character outside `[a-z0-9-]` becomes
    /// `-`, runs of `-` collapse and leading/trailing `-` are trimmed.
    pub fn generate(requested: Option<&str>, unix_secs: i64) -> SubmitResult<Self> {
        match requested.filter(|raw| !raw.is_empty()) {
            Some(raw) => Self::slugify(raw),
            None => Ok(Self(format!("submission-{unix_secs}"))),
        }
    }

    /// Slugify a user supplied name.
    pub fn slugify(raw: &str) -> SubmitResult<Self> {
        let mut slug = String::with_capacity(raw.len());
        for ch in raw.to_lowercase().chars() {
            let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
                ch
            } else {
                '-'
            };
            if ch == '-' && slug.ends_with('-') {
                continue;
            }
            slug.push(ch);
        }

        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            return Err(SubmitError::InvalidName(raw.to_owned()));
        }
        Ok(Self(slug.to_owned()))
    }

    /// The slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubmissionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a model in the orchestrator registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Generate an identifier from a base and the last four digits of the
    /// timestamp.
    ///
    /// Two submissions made in the same second, or exactly 10000 seconds
    /// apart, get the same identifier.
    pub fn generate(base: u64, unix_secs: i64) -> SubmitResult<Self> {
        let suffix = unix_secs.rem_euclid(10_000).unsigned_abs();
        base.checked_add(suffix)
            .map(|id| Self(id.to_string()))
            .ok_or_else(|| {
                SubmitError::ConfigInvalid(format!("registry.id_base {base} is too large"))
            })
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deployment status derived from the orchestrator logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStatus {
    /// The orchestrator reported the model as running.
    Running,
    /// The orchestrator reported a failure for the model.
    Failed,
    /// No marker seen before the polling window closed.
    Unknown,
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Failed => write!(f, "FAILED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
