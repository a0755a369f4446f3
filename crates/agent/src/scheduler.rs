//! Fixed-cadence service loop
//!
//! Runs the certificate workflow, sleeps for the configured interval, and
//! repeats. certbot only renews certificates close to expiry, so a daily
//! run is enough.

use std::time::Duration;

use tracing::info;

use crate::error::CertResult;
use crate::retry::BackoffPolicy;
use crate::workflow::CertificateWorkflow;

/// Runs the workflow forever on a fixed interval
///
/// An error escaping a run (after backoff, when enabled) stops the loop so
/// the supervising scheduler can restart the task.
pub struct ServiceScheduler {
    workflow: CertificateWorkflow,
    interval: Duration,
    backoff: Option<BackoffPolicy>,
}

impl ServiceScheduler {
    pub fn new(workflow: CertificateWorkflow, interval: Duration) -> Self {
        Self {
            workflow,
            interval,
            backoff: None,
        }
    }

    /// Wrap every run in [`BackoffPolicy`] retries
    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = Some(policy);
        self
    }

    pub async fn run(&self) -> CertResult<()> {
        info!(
            interval_hours = self.interval.as_secs() / 3600,
            backoff = self.backoff.is_some(),
            "Starting certificate service"
        );

        loop {
            let outcome = match &self.backoff {
                Some(policy) => self.workflow.run_with_backoff(policy).await?,
                None => self.workflow.run_once().await?,
            };

            info!(
                outcome = ?outcome,
                next_run_secs = self.interval.as_secs(),
                "Certificate run completed"
            );
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl std::fmt::Debug for ServiceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScheduler")
            .field("interval", &self.interval)
            .field("backoff", &self.backoff)
            .finish()
    }
}
