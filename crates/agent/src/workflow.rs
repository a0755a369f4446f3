//! One certificate run: resolve domains, acquire, bundle, upload.

use std::sync::Arc;

use tracing::info;

use certsync_config::Config;

use crate::acme::{AcquisitionEngine, CertificateIssuer, CertificateStorage};
use crate::domains::DomainResolver;
use crate::error::CertResult;
use crate::marathon::{LoadBalancerUpdater, MarathonApi, UploadOutcome};
use crate::retry::{retry_with_backoff, BackoffPolicy};

/// The full control loop chain, wired from a [`Config`]
pub struct CertificateWorkflow {
    resolver: DomainResolver,
    engine: AcquisitionEngine,
    storage: CertificateStorage,
    updater: LoadBalancerUpdater,
}

impl CertificateWorkflow {
    pub fn new(
        config: &Config,
        issuer: Arc<dyn CertificateIssuer>,
        api: Arc<dyn MarathonApi>,
    ) -> Self {
        let storage = CertificateStorage::new(&config.paths);
        Self {
            resolver: DomainResolver::new(config, api.clone()),
            engine: AcquisitionEngine::new(config, issuer, storage.clone()),
            storage,
            updater: LoadBalancerUpdater::new(config, api),
        }
    }

    /// Generate certificates if necessary and update the load balancer
    pub async fn run_once(&self) -> CertResult<UploadOutcome> {
        let domains = self.resolver.resolve().await?;
        info!(domains = %domains, "Requesting certificates");

        let primary = self.engine.acquire(&domains).await?;
        let cert_path = self.storage.combined_path(&primary)?;
        self.updater.upload(&cert_path).await
    }

    /// [`Self::run_once`], retried from the start on failure
    pub async fn run_with_backoff(&self, policy: &BackoffPolicy) -> CertResult<UploadOutcome> {
        retry_with_backoff(policy, "certificate run", || self.run_once()).await
    }
}
