//! Model submission for the BTC volatility competition.
//!
//! This crate packages a prediction model (a Python script or a Jupyter
//! notebook) into the submission layout a local model orchestrator expects,
//! registers it in the orchestrator's YAML registry and redeploys the
//! orchestrator container.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Validator   │───▶│  Extractor   │───▶│  Submission  │
//! └──────────────┘    └──────────────┘    │   Builder    │
//!                                         └──────────────┘
//!                                                │
//!         ┌──────────────────────────────────────┘
//!         ▼
//!  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//!  │   Registry   │───▶│   Restart    │───▶│    Status    │
//!  │   (YAML)     │    │  container   │    │    Poller    │
//!  └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! The orchestrator itself is out of scope. This crate only prepares its
//! inputs and watches its logs.

pub mod config;
pub mod deploy;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod registry;
pub mod submission;
pub mod types;
pub mod validate;

// Re-export configuration types
pub use config::{
    ArtifactSettings, DeploySettings, PathSettings, RegistrySettings, SubmitConfig,
    ValidationSettings,
};

// Re-export error types
pub use error::{ErrorKind, SubmitError, SubmitResult};

// Re-export core types
pub use types::{DeploymentStatus, ModelFile, ModelId, ModelKind, SubmissionName};

// Re-export pipeline stages
pub use deploy::{ContainerRuntime, DockerCli, LogMarkers, StatusPoller};
pub use extract::extract_code;
pub use pipeline::{SubmitReport, SubmitRequest, Submitter};
pub use registry::{update_registry, ModelRecord, Registry, RegistryChange};
pub use submission::{BuiltSubmission, SubmissionBuilder};
pub use validate::validate_model_file;
