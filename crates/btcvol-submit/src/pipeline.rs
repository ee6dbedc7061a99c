//! End-to-end submission flow.
//!
//! ```text
//! validate → extract → build submission → update registry → restart → poll
//! ```
//!
//! Every step before the submission build is read-only, so a bad model file
//! or a broken notebook leaves nothing behind. When deploying, the container
//! runtime is checked right after validation. Later failures do not roll
//! back: the submission directory stays and a re-run overwrites it.

use std::path::PathBuf;

use tracing::{info, info_span, Instrument};

use crate::config::SubmitConfig;
use crate::deploy::{self, ContainerRuntime, StatusPoller};
use crate::error::{SubmitError, SubmitResult};
use crate::extract::extract_code;
use crate::registry::{update_registry, RegistryChange};
use crate::submission::SubmissionBuilder;
use crate::types::{DeploymentStatus, ModelId, SubmissionName};
use crate::validate::validate_model_file;

/// What to submit.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Path to the `.py` or `.ipynb` model file.
    pub model_file: PathBuf,
    /// Requested submission name; generated from the clock when absent.
    pub name: Option<String>,
    /// Prepare the submission and registry entry without deploying.
    pub skip_deploy: bool,
}

/// Summary of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmitReport {
    /// Submission slug.
    pub name: SubmissionName,
    /// Registry identifier.
    pub model_id: ModelId,
    /// Submission directory.
    pub submission_dir: PathBuf,
    /// Requirements written to the manifest.
    pub requirements: Vec<String>,
    /// Whether the registry record was added or updated.
    pub registry_change: RegistryChange,
    /// `None` when deployment was skipped, otherwise always `Running`.
    pub deployment: Option<DeploymentStatus>,
}

/// Runs submissions against one configuration and container runtime.
pub struct Submitter<'a> {
    config: &'a SubmitConfig,
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> Submitter<'a> {
    /// Create a submitter.
    #[must_use]
    pub fn new(config: &'a SubmitConfig, runtime: &'a dyn ContainerRuntime) -> Self {
        Self { config, runtime }
    }

    /// Submit using the current time for naming and identifiers.
    pub async fn submit(&self, request: &SubmitRequest) -> SubmitResult<SubmitReport> {
        self.submit_at(request, chrono::Utc::now().timestamp()).await
    }

    /// Submit as if the current time were `unix_secs`.
    ///
    /// Deployment that ends `FAILED` or `UNKNOWN` is returned as
    /// [`SubmitError::DeploymentUnconfirmed`].
    pub async fn submit_at(
        &self,
        request: &SubmitRequest,
        unix_secs: i64,
    ) -> SubmitResult<SubmitReport> {
        let config = self.config;

        let model = validate_model_file(&request.model_file, &config.validation)?;
        if !request.skip_deploy {
            self.runtime.check_available()?;
        }
        let name = SubmissionName::generate(request.name.as_deref(), unix_secs)?;
        let model_id = ModelId::generate(config.registry.id_base, unix_secs)?;
        info!(submission = %name, %model_id, "submission details");

        let span = info_span!("submit", submission = %name, %model_id);
        async {
            let code = extract_code(&model)?;

            let built = SubmissionBuilder::new(&config.paths, &config.artifact).build(&code, &name)?;

            let registry_change = update_registry(
                &config.paths.registry_file,
                &config.registry,
                &name,
                &model_id,
            )?;

            let mut report = SubmitReport {
                name: name.clone(),
                model_id: model_id.clone(),
                submission_dir: built.dir,
                requirements: built.requirements,
                registry_change,
                deployment: None,
            };

            if request.skip_deploy {
                info!("skipping deployment");
                return Ok(report);
            }

            let deploy_settings = &config.deploy;
            deploy::trigger_deployment(
                self.runtime,
                &deploy_settings.container,
                deploy_settings.grace_period(),
            )
            .await
            .map_err(|e| e.or_hint(|| deploy_settings.status_hint()))?;

            let status = StatusPoller::new(self.runtime, deploy_settings.container.clone())
                .with_interval(deploy_settings.poll_interval())
                .with_tail(deploy_settings.log_tail)
                .poll_status(&model_id, deploy_settings.max_wait())
                .await;

            match status {
                DeploymentStatus::Running => {
                    report.deployment = Some(status);
                    Ok(report)
                }
                DeploymentStatus::Failed | DeploymentStatus::Unknown => {
                    Err(SubmitError::DeploymentUnconfirmed {
                        hint: deploy_settings.log_hint(model_id.as_str()),
                        model_id: model_id.clone(),
                        status,
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}
