//! Pushes the combined certificate into the marathon-lb app
//!
//! marathon-lb reads its default certificate from an environment variable
//! of its own app. Updating that variable makes Marathon roll the load
//! balancer, which then serves the new certificate.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use certsync_config::Config;

use super::client::MarathonApi;
use super::types::AppUpdate;
use crate::error::{CertError, CertResult};

/// What an upload did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The deployed certificate already matched; nothing was written
    Unchanged,
    /// The app was updated and the deployment converged
    Updated { deployment_id: String },
}

/// Keeps marathon-lb's certificate env entry in sync with the store
pub struct LoadBalancerUpdater {
    api: Arc<dyn MarathonApi>,
    lb_app_id: String,
    cert_env: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl LoadBalancerUpdater {
    pub fn new(config: &Config, api: Arc<dyn MarathonApi>) -> Self {
        Self {
            api,
            lb_app_id: config.lb_app_id.clone(),
            cert_env: config.lb_cert_env.clone(),
            poll_interval: config.timings.deployment_poll_interval,
            max_polls: config.timings.deployment_max_polls,
        }
    }

    /// Upload the certificate at `cert_path` if it differs from the deployed one
    ///
    /// Existing secrets are passed back unchanged. On update, blocks until
    /// the deployment leaves Marathon's active list.
    pub async fn upload(&self, cert_path: &Path) -> CertResult<UploadOutcome> {
        let cert = tokio::fs::read_to_string(cert_path).await?;

        info!(app_id = %self.lb_app_id, "Retrieving current load balancer certificate");
        let app = self.api.get_app(&self.lb_app_id).await?;

        let deployed = app.env_str(&self.cert_env).unwrap_or("");
        if deployed == cert {
            info!(app_id = %self.lb_app_id, "Certificate not changed, nothing to do");
            return Ok(UploadOutcome::Unchanged);
        }

        info!(
            app_id = %self.lb_app_id,
            env_key = %self.cert_env,
            path = %cert_path.display(),
            "Certificate changed, uploading"
        );

        let mut env = app.env;
        env.insert(self.cert_env.clone(), Value::String(cert));
        let update = AppUpdate {
            id: self.lb_app_id.clone(),
            env,
            secrets: app.secrets,
        };

        let deployment_id = self.submit(&update).await?;
        self.wait_for_deployment(&deployment_id).await?;

        info!(
            app_id = %self.lb_app_id,
            deployment_id = %deployment_id,
            "Successfully uploaded certificate"
        );
        Ok(UploadOutcome::Updated { deployment_id })
    }

    async fn submit(&self, update: &AppUpdate) -> CertResult<String> {
        let response = self.api.update_app(update).await?;
        match response.deployment_id {
            Some(id) if !id.is_empty() => {
                debug!(deployment_id = %id, version = ?response.version, "App update accepted");
                Ok(id)
            }
            _ => Err(CertError::Update(
                "marathon did not return a deployment id".to_string(),
            )),
        }
    }

    /// Poll the deployment list until `deployment_id` disappears
    ///
    /// Gives up after `max_polls` polls. The submitted update is left in
    /// place; Marathon keeps reconciling it.
    pub async fn wait_for_deployment(&self, deployment_id: &str) -> CertResult<()> {
        let start = Instant::now();

        for poll in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let deployments = self.api.deployments().await?;
            if !deployments.iter().any(|d| d.id == deployment_id) {
                debug!(
                    deployment_id = %deployment_id,
                    polls = poll,
                    elapsed_secs = start.elapsed().as_secs(),
                    "Deployment completed"
                );
                return Ok(());
            }

            debug!(deployment_id = %deployment_id, poll, "Waiting for deployment to complete");
        }

        let waited = self.poll_interval * self.max_polls;
        warn!(
            deployment_id = %deployment_id,
            waited_secs = waited.as_secs(),
            "Deployment did not complete in time"
        );
        Err(CertError::DeploymentTimeout {
            deployment_id: deployment_id.to_string(),
            waited,
        })
    }
}
