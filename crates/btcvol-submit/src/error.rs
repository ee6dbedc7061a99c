//! Error types for the submission pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{DeploymentStatus, ModelId};

/// Coarse classification of a [`SubmitError`], used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input model file or support library missing.
    NotFound,
    /// Model file has an extension other than `.py` or `.ipynb`.
    UnsupportedType,
    /// Model file (or submission name) failed the heuristic checks.
    InvalidModel,
    /// Notebook could not be parsed.
    ParseError,
    /// Registry or configuration could not be read or written.
    ConfigIoError,
    /// The container runtime returned an error.
    ExternalCommandError,
    /// Deployment status was `FAILED` or never confirmed.
    DeploymentUnconfirmed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not-found"),
            Self::UnsupportedType => write!(f, "unsupported-type"),
            Self::InvalidModel => write!(f, "invalid-model"),
            Self::ParseError => write!(f, "parse-error"),
            Self::ConfigIoError => write!(f, "config-io"),
            Self::ExternalCommandError => write!(f, "external-command"),
            Self::DeploymentUnconfirmed => write!(f, "deployment-unconfirmed"),
        }
    }
}

/// Errors that can occur while submitting a model.
#[derive(Debug, Error)]
pub enum SubmitError {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Model file does not exist.
    #[error("model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    /// Model file extension is not accepted.
    #[error("model file must be .py or .ipynb, got: {extension}")]
    UnsupportedType {
        /// The rejected extension, with a leading dot (empty if none).
        extension: String,
    },

    /// Model file does not look like a tracker implementation.
    #[error("model file must contain a {class_marker} class with {method_marker}() method")]
    InvalidModel {
        /// Class marker that was searched for.
        class_marker: String,
        /// Method marker that was searched for.
        method_marker: String,
    },

    /// Model file exists but could not be read as text.
    #[error("failed to read model file {}: {source}", path.display())]
    ModelUnreadable {
        /// Model file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Submission name has no usable characters.
    #[error("invalid submission name: {0:?}")]
    InvalidName(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Extraction errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Notebook is not valid JSON or lacks the expected keys.
    #[error("failed to parse notebook {}: {source}", path.display())]
    NotebookParse {
        /// Notebook path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Submission structure errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The reference support library tree is missing.
    #[error("support library not found at {}", .0.display())]
    SupportLibraryMissing(PathBuf),

    /// Rebuilding the submission directory would delete the support library.
    #[error(
        "submission directory {} contains the support library {}; choose another name",
        submission.display(),
        support_library.display()
    )]
    SupportLibraryInSubmission {
        /// Submission directory that would be replaced.
        submission: PathBuf,
        /// Configured support library path.
        support_library: PathBuf,
    },

    /// Filesystem operation on the submission directory failed.
    #[error("failed to write submission at {}: {source}", path.display())]
    SubmissionIo {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to parse tool configuration.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Invalid tool configuration value.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Registry could not be read, parsed or written.
    #[error("failed to update models registry {}: {message}", path.display())]
    Registry {
        /// Registry file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Deployment errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Container runtime command failed.
    #[error("`{command}` failed: {message}")]
    ExternalCommand {
        /// Command line that was run.
        command: String,
        /// Error message or captured stderr.
        message: String,
        /// Command the user can run to inspect the runtime, if one applies.
        hint: Option<String>,
    },

    /// The orchestrator did not report the model as running.
    #[error("deployment of model {model_id} not confirmed (status: {status})")]
    DeploymentUnconfirmed {
        /// Model identifier.
        model_id: ModelId,
        /// Last observed status.
        status: DeploymentStatus,
        /// Command the user can run to inspect the orchestrator logs.
        hint: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Generic errors
    // ─────────────────────────────────────────────────────────────────────────
    /// I/O error outside the submission directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SubmitError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelNotFound(_) | Self::SupportLibraryMissing(_) => ErrorKind::NotFound,
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::InvalidModel { .. }
            | Self::ModelUnreadable { .. }
            | Self::InvalidName(_)
            | Self::SupportLibraryInSubmission { .. } => ErrorKind::InvalidModel,
            Self::NotebookParse { .. } => ErrorKind::ParseError,
            Self::SubmissionIo { .. }
            | Self::ConfigParse(_)
            | Self::ConfigInvalid(_)
            | Self::Registry { .. }
            | Self::Io(_) => ErrorKind::ConfigIoError,
            Self::ExternalCommand { .. } => ErrorKind::ExternalCommandError,
            Self::DeploymentUnconfirmed { .. } => ErrorKind::DeploymentUnconfirmed,
        }
    }

    /// A shell command the user can run to investigate, if one applies.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::DeploymentUnconfirmed { hint, .. } => Some(hint.as_str()),
            Self::ExternalCommand { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    /// Attach a diagnostic command to a runtime error that has none.
    #[must_use]
    pub fn or_hint(self, fallback: impl FnOnce() -> String) -> Self {
        match self {
            Self::ExternalCommand {
                command,
                message,
                hint: None,
            } => Self::ExternalCommand {
                command,
                message,
                hint: Some(fallback()),
            },
            other => other,
        }
    }

    pub(crate) fn submission_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SubmissionIo {
            path: path.into(),
            source,
        }
    }
}

impl From<figment::Error> for SubmitError {
    fn from(e: figment::Error) -> Self {
        Self::ConfigParse(e.to_string())
    }
}

/// Result type alias for submission operations.
pub type SubmitResult<T> = Result<T, SubmitError>;
