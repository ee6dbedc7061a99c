//! Orchestrator redeploy through a container runtime CLI.
//!
//! The orchestrator picks up registry changes on start, so deploying a model
//! means restarting its container and then watching the container logs.

pub mod status;

use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::error::{SubmitError, SubmitResult};

pub use status::{LogMarkers, StatusPoller};

/// Operations the pipeline needs from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Fail early when the runtime cannot be used at all.
    fn check_available(&self) -> SubmitResult<()> {
        Ok(())
    }

    /// Restart the named container.
    async fn restart(&self, container: &str) -> SubmitResult<()>;

    /// Fetch the last `tail` lines of the container's stdout and stderr.
    async fn logs(&self, container: &str, tail: usize) -> SubmitResult<String>;
}

/// [`ContainerRuntime`] backed by the `docker` CLI (or a compatible binary).
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    /// Use the given runtime binary, looked up on `PATH`.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> SubmitResult<Output> {
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!(%command, "running container runtime");

        Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SubmitError::ExternalCommand {
                command,
                message: e.to_string(),
                hint: None,
            })
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    fn check_available(&self) -> SubmitResult<()> {
        which::which(&self.binary)
            .map(|path| debug!(path = %path.display(), "container runtime found"))
            .map_err(|e| SubmitError::ExternalCommand {
                command: self.binary.clone(),
                message: format!("not found on PATH: {e}"),
                hint: None,
            })
    }

    async fn restart(&self, container: &str) -> SubmitResult<()> {
        let output = self.run(&["restart", container]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubmitError::ExternalCommand {
                command: format!("{} restart {container}", self.binary),
                message: format!(
                    "exit code {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
                hint: None,
            });
        }
        Ok(())
    }

    async fn logs(&self, container: &str, tail: usize) -> SubmitResult<String> {
        let tail = tail.to_string();
        let output = self.run(&["logs", container, "--tail", &tail]).await?;

        let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
        logs.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(logs)
    }
}

/// Restart the orchestrator and wait out its start-up grace period.
///
/// The grace period is waited unconditionally once the restart succeeds.
#[instrument(skip(runtime))]
pub async fn trigger_deployment(
    runtime: &dyn ContainerRuntime,
    container: &str,
    grace_period: Duration,
) -> SubmitResult<()> {
    runtime.restart(container).await?;
    info!("orchestrator restarted");

    tokio::time::sleep(grace_period).await;
    Ok(())
}
