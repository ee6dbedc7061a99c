//! Submission tool configuration.
//!
//! Every fixed path, container name and timing constant the pipeline uses
//! lives here, with defaults matching the local orchestrator checkout layout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{SubmitError, SubmitResult};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "btcvol.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitConfig {
    /// Filesystem locations.
    #[serde(default)]
    pub paths: PathSettings,

    /// Names of the generated submission files.
    #[serde(default)]
    pub artifact: ArtifactSettings,

    /// Heuristic model checks.
    #[serde(default)]
    pub validation: ValidationSettings,

    /// Registry record defaults.
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Container runtime and status polling.
    #[serde(default)]
    pub deploy: DeploySettings,
}

impl SubmitConfig {
    /// Load configuration from defaults, files and environment.
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. `btcvol.toml` in the current directory (if present)
    /// 3. Specified config file path (if provided)
    /// 4. Environment variables with `BTCVOL_` prefix, nested with `__`
    pub fn load(path: Option<&Path>) -> SubmitResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(DEFAULT_CONFIG_FILE));

        if let Some(p) = path {
            if !p.exists() {
                return Err(SubmitError::ConfigInvalid(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Toml::file(p));
        }

        let config: Self = figment
            .merge(Env::prefixed("BTCVOL_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> SubmitResult<()> {
        if self.deploy.container.trim().is_empty() {
            return Err(SubmitError::ConfigInvalid(
                "deploy.container cannot be empty".to_owned(),
            ));
        }
        if self.deploy.poll_interval_secs == 0 {
            return Err(SubmitError::ConfigInvalid(
                "deploy.poll_interval_secs must be greater than zero".to_owned(),
            ));
        }
        if self.registry.models_key.is_empty() {
            return Err(SubmitError::ConfigInvalid(
                "registry.models_key cannot be empty".to_owned(),
            ));
        }
        if self.validation.class_marker.is_empty() || self.validation.method_marker.is_empty() {
            return Err(SubmitError::ConfigInvalid(
                "validation markers cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Filesystem locations used by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory holding one subdirectory per submission.
    #[serde(default = "default_submissions_dir")]
    pub submissions_dir: PathBuf,

    /// Orchestrator model registry (YAML).
    #[serde(default = "default_registry_file")]
    pub registry_file: PathBuf,

    /// Reference support library copied into every submission.
    #[serde(default = "default_support_library")]
    pub support_library: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            submissions_dir: default_submissions_dir(),
            registry_file: default_registry_file(),
            support_library: default_support_library(),
        }
    }
}

const ORCHESTRATOR_ROOT: &str = "deployment/model-orchestrator-local";

fn default_submissions_dir() -> PathBuf {
    PathBuf::from(ORCHESTRATOR_ROOT).join("data/submissions")
}

fn default_registry_file() -> PathBuf {
    PathBuf::from(ORCHESTRATOR_ROOT).join("config/models.dev.yml")
}

fn default_support_library() -> PathBuf {
    default_submissions_dir().join("model-1/btcvol")
}

/// Names of the files written into a submission directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSettings {
    /// Directory name the support library is copied to.
    #[serde(default = "default_support_dir_name")]
    pub support_dir_name: String,

    /// Entry-point file name.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    /// Dependency manifest file name.
    #[serde(default = "default_requirements")]
    pub requirements: String,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            support_dir_name: default_support_dir_name(),
            entry_point: default_entry_point(),
            requirements: default_requirements(),
        }
    }
}

fn default_support_dir_name() -> String {
    "btcvol".to_owned()
}

fn default_entry_point() -> String {
    "main.py".to_owned()
}

fn default_requirements() -> String {
    "requirements.txt".to_owned()
}

/// Marker substrings a model file must contain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Substring standing in for the tracker class.
    #[serde(default = "default_class_marker")]
    pub class_marker: String,

    /// Substring standing in for the prediction method.
    #[serde(default = "default_method_marker")]
    pub method_marker: String,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            class_marker: default_class_marker(),
            method_marker: default_method_marker(),
        }
    }
}

fn default_class_marker() -> String {
    "Tracker".to_owned()
}

fn default_method_marker() -> String {
    "predict".to_owned()
}

/// Defaults for new registry records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Top-level key holding the list of model records.
    #[serde(default = "default_models_key")]
    pub models_key: String,

    /// Base added to the timestamp suffix when generating model ids.
    #[serde(default = "default_id_base")]
    pub id_base: u64,

    /// Competition tag for new records.
    #[serde(default = "default_crunch_id")]
    pub crunch_id: String,

    /// Worker assignment tag for new records.
    #[serde(default = "default_cruncher_id")]
    pub cruncher_id: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            models_key: default_models_key(),
            id_base: default_id_base(),
            crunch_id: default_crunch_id(),
            cruncher_id: default_cruncher_id(),
        }
    }
}

fn default_models_key() -> String {
    "models".to_owned()
}

const fn default_id_base() -> u64 {
    12315
}

fn default_crunch_id() -> String {
    "btcvol".to_owned()
}

fn default_cruncher_id() -> String {
    "test_1".to_owned()
}

/// Container runtime and status polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySettings {
    /// Container runtime binary.
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Orchestrator container name.
    #[serde(default = "default_container")]
    pub container: String,

    /// Seconds to wait after restarting the orchestrator.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,

    /// Seconds between log polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum seconds to wait for a status marker.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Number of log lines fetched per poll.
    #[serde(default = "default_log_tail")]
    pub log_tail: usize,

    /// Orchestrator page listing deployed models, shown after success.
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,
}

impl DeploySettings {
    /// Grace period as a Duration.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    /// Poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Maximum wait as a Duration.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    /// Command the user can run to inspect the orchestrator logs for a model.
    #[must_use]
    pub fn log_hint(&self, model_id: &str) -> String {
        format!("{} logs {} | grep {model_id}", self.runtime, self.container)
    }

    /// Command the user can run to inspect the orchestrator container.
    #[must_use]
    pub fn status_hint(&self) -> String {
        format!("{} ps -a --filter name={}", self.runtime, self.container)
    }
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            container: default_container(),
            grace_period_secs: default_grace_period_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            log_tail: default_log_tail(),
            dashboard_url: default_dashboard_url(),
        }
    }
}

fn default_runtime() -> String {
    "docker".to_owned()
}

fn default_container() -> String {
    "dvol-model-orchestrator-local".to_owned()
}

const fn default_grace_period_secs() -> u64 {
    5
}

const fn default_poll_interval_secs() -> u64 {
    3
}

const fn default_max_wait_secs() -> u64 {
    60
}

const fn default_log_tail() -> usize {
    100
}

fn default_dashboard_url() -> String {
    "http://localhost:3000/models".to_owned()
}
