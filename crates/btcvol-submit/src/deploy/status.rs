//! Deployment status polling.
//!
//! The orchestrator has no status API, so status is read off its log tail.
//! The matching rule lives in [`LogMarkers`]; the polling loop does not care
//! what it looks for.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::ContainerRuntime;
use crate::types::{DeploymentStatus, ModelId};

/// Log substrings that reveal a model's state.
#[derive(Debug, Clone)]
pub struct LogMarkers {
    /// Marker logged once a model runs; `{id}` is replaced by the model id.
    pub running: String,
    /// Prefix identifying log lines about a model; `{id}` is replaced.
    pub model: String,
    /// Marker logged when something failed.
    pub failed: String,
}

impl Default for LogMarkers {
    fn default() -> Self {
        Self {
            running: "Model {id} is RUNNING".to_owned(),
            model: "Model {id}".to_owned(),
            failed: "FAILED".to_owned(),
        }
    }
}

impl LogMarkers {
    /// Scan a log excerpt for the model's state.
    ///
    /// The failure check only requires that the model is mentioned somewhere
    /// and that the failure marker appears somewhere, not on the same line.
    #[must_use]
    pub fn scan(&self, logs: &str, model_id: &ModelId) -> Option<DeploymentStatus> {
        let id = model_id.as_str();
        if logs.contains(&self.running.replace("{id}", id)) {
            return Some(DeploymentStatus::Running);
        }
        if logs.contains(&self.model.replace("{id}", id)) && logs.contains(&self.failed) {
            return Some(DeploymentStatus::Failed);
        }
        None
    }
}

/// Polls container logs until a status marker shows up or time runs out.
pub struct StatusPoller<'a> {
    runtime: &'a dyn ContainerRuntime,
    container: String,
    interval: Duration,
    tail: usize,
    markers: LogMarkers,
}

impl<'a> StatusPoller<'a> {
    /// Create a poller for the given container.
    #[must_use]
    pub fn new(runtime: &'a dyn ContainerRuntime, container: impl Into<String>) -> Self {
        Self {
            runtime,
            container: container.into(),
            interval: Duration::from_secs(3),
            tail: 100,
            markers: LogMarkers::default(),
        }
    }

    /// Set the delay between polls.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set how many log lines are fetched per poll.
    #[must_use]
    pub fn with_tail(mut self, tail: usize) -> Self {
        self.tail = tail;
        self
    }

    /// Replace the log matching rule.
    #[must_use]
    pub fn with_markers(mut self, markers: LogMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Wait up to `max_wait` for the model to be reported running or failed.
    ///
    /// Returns [`DeploymentStatus::Unknown`] once the window closes without a
    /// match. A failed log fetch counts as a poll with no match.
    pub async fn poll_status(&self, model_id: &ModelId, max_wait: Duration) -> DeploymentStatus {
        let start = Instant::now();
        let mut polls = 0u32;

        while start.elapsed() < max_wait {
            polls += 1;
            match self.runtime.logs(&self.container, self.tail).await {
                Ok(logs) => {
                    if let Some(status) = self.markers.scan(&logs, model_id) {
                        info!(%model_id, %status, polls, "deployment status observed");
                        return status;
                    }
                }
                Err(e) => {
                    warn!(%model_id, error = %e, "could not read orchestrator logs");
                }
            }

            debug!(%model_id, polls, elapsed_secs = start.elapsed().as_secs(), "no status yet");
            tokio::time::sleep(self.interval).await;
        }

        info!(%model_id, polls, "deployment status not confirmed in time");
        DeploymentStatus::Unknown
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::{SubmitError, SubmitResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves one canned log per call, repeating the last one.
    struct ScriptedLogs {
        pages: Mutex<Vec<SubmitResult<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedLogs {
        fn new(pages: Vec<SubmitResult<String>>) -> Self {
            Self {
                pages: Mutex::new(pages),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContainerRuntime for ScriptedLogs {
        async fn restart(&self, _container: &str) -> SubmitResult<()> {
            Ok(())
        }

        async fn logs(&self, _container: &str, _tail: usize) -> SubmitResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut pages = self.pages.lock().unwrap();
            if pages.len() > 1 {
                return pages.remove(0);
            }
            match pages.first() {
                Some(Ok(page)) => Ok(page.clone()),
                _ => Ok(String::new()),
            }
        }
    }

    #[test]
    fn scan_detects_running() {
        let markers = LogMarkers::default();
        let id = ModelId::from("12345");
        assert_eq!(
            markers.scan("INFO Model 12345 is RUNNING\n", &id),
            Some(DeploymentStatus::Running)
        );
    }

    #[test]
    fn scan_detects_failure_anywhere_in_excerpt() {
        let markers = LogMarkers::default();
        let id = ModelId::from("12345");
        let logs = "INFO Model 12345 starting\nERROR build FAILED\n";
        assert_eq!(markers.scan(logs, &id), Some(DeploymentStatus::Failed));
    }

    #[test]
    fn scan_ignores_failures_of_unmentioned_models() {
        let markers = LogMarkers::default();
        let id = ModelId::from("12345");
        assert_eq!(markers.scan("Model 99999 FAILED\n", &id), None);
    }

    #[test]
    fn scan_prefers_running_over_failed() {
        let markers = LogMarkers::default();
        let id = ModelId::from("12345");
        let logs = "Model 12345 FAILED\nModel 12345 is RUNNING\n";
        assert_eq!(markers.scan(logs, &id), Some(DeploymentStatus::Running));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_running_without_waiting_for_timeout() {
        let runtime = ScriptedLogs::new(vec![
            Ok("starting orchestrator\n".to_owned()),
            Ok("Model 123 is RUNNING\n".to_owned()),
        ]);
        let poller = StatusPoller::new(&runtime, "orchestrator");

        let start = Instant::now();
        let status = poller
            .poll_status(&ModelId::from("123"), Duration::from_secs(60))
            .await;

        assert_eq!(status, DeploymentStatus::Running);
        assert_eq!(runtime.calls.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_failed_when_marked() {
        let runtime = ScriptedLogs::new(vec![Ok("Model 123 deploy FAILED\n".to_owned())]);
        let poller = StatusPoller::new(&runtime, "orchestrator");

        let status = poller
            .poll_status(&ModelId::from("123"), Duration::from_secs(60))
            .await;
        assert_eq!(status, DeploymentStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_unknown_only_after_full_window() {
        let runtime = ScriptedLogs::new(vec![Ok("nothing relevant\n".to_owned())]);
        let poller = StatusPoller::new(&runtime, "orchestrator");

        let start = Instant::now();
        let status = poller
            .poll_status(&ModelId::from("123"), Duration::from_secs(60))
            .await;

        assert_eq!(status, DeploymentStatus::Unknown);
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(runtime.calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn log_errors_do_not_stop_polling() {
        let runtime = ScriptedLogs::new(vec![
            Err(SubmitError::ExternalCommand {
                command: "docker logs orchestrator".to_owned(),
                message: "daemon unavailable".to_owned(),
                hint: None,
            }),
            Ok("Model 7 is RUNNING".to_owned()),
        ]);
        let poller = StatusPoller::new(&runtime, "orchestrator").with_interval(Duration::from_secs(1));

        let status = poller
            .poll_status(&ModelId::from("7"), Duration::from_secs(10))
            .await;
        assert_eq!(status, DeploymentStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_markers_swap_matching_rule() {
        let runtime = ScriptedLogs::new(vec![Ok("[7] state=ready".to_owned())]);
        let markers = LogMarkers {
            running: "[{id}] state=ready".to_owned(),
            model: "[{id}]".to_owned(),
            failed: "state=error".to_owned(),
        };
        let poller = StatusPoller::new(&runtime, "orchestrator").with_markers(markers);

        let status = poller
            .poll_status(&ModelId::from("7"), Duration::from_secs(10))
            .await;
        assert_eq!(status, DeploymentStatus::Running);
    }
}
