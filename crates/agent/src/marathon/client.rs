//! Marathon REST client
//!
//! Calls go to the in-cluster Marathon endpoint, whose certificate is
//! usually self-signed, so TLS verification is disabled for this client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, trace};
use url::Url;

use super::types::{AppDefinition, AppResponse, AppUpdate, Deployment, UpdateResponse};
use crate::error::{CertError, CertResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the agent performs against the orchestrator
#[async_trait]
pub trait MarathonApi: Send + Sync {
    /// Fetch an app definition
    async fn get_app(&self, app_id: &str) -> CertResult<AppDefinition>;

    /// Replace an app's env and secrets
    ///
    /// A 2xx answer is returned as-is even without a deployment id; judging
    /// the response is up to the caller.
    async fn update_app(&self, update: &AppUpdate) -> CertResult<UpdateResponse>;

    /// List deployments currently in progress
    async fn deployments(&self) -> CertResult<Vec<Deployment>>;
}

/// HTTP implementation of [`MarathonApi`]
#[derive(Debug, Clone)]
pub struct MarathonClient {
    http: Client,
    base_url: Url,
}

impl MarathonClient {
    pub fn new(base_url: &str) -> CertResult<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            CertError::Configuration(format!("invalid marathon URL {:?}: {}", base_url, e))
        })?;
        // Url::join replaces the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> CertResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| CertError::Configuration(format!("invalid marathon path {:?}: {}", path, e)))
    }

    fn app_url(&self, app_id: &str) -> CertResult<Url> {
        self.endpoint(&format!("v2/apps/{}", app_id.trim_start_matches('/')))
    }
}

#[async_trait]
impl MarathonApi for MarathonClient {
    async fn get_app(&self, app_id: &str) -> CertResult<AppDefinition> {
        let url = self.app_url(app_id)?;
        trace!(url = %url, "GET app");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CertError::AppNotFound(app_id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CertError::Orchestrator {
                status: status.as_u16(),
                body,
            });
        }

        let app = response.json::<AppResponse>().await?.app;
        debug!(app_id = %app.id, "Fetched app definition");
        Ok(app)
    }

    async fn update_app(&self, update: &AppUpdate) -> CertResult<UpdateResponse> {
        let url = self.app_url(&update.id)?;
        trace!(url = %url, "PUT app");

        let response = self.http.put(url).json(update).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CertError::Update(format!(
                "marathon returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| CertError::Update(format!("unreadable response {:?}: {}", body, e)))
    }

    async fn deployments(&self) -> CertResult<Vec<Deployment>> {
        let url = self.endpoint("v2/deployments")?;
        trace!(url = %url, "GET deployments");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CertError::Orchestrator {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
