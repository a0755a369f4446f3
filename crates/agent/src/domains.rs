//! Domain sets and where they come from
//!
//! In HTTP mode the domains are whatever virtual hosts marathon-lb exposes
//! for this agent's own app, read from its `HAPROXY_0_VHOST` label. In DNS
//! mode they are configured statically, which is the only way to request
//! wildcard names.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use certsync_config::{Config, VerificationMethod};

use crate::error::{CertError, CertResult};
use crate::marathon::MarathonApi;

/// Label on the agent's own app listing the hostnames to certify
pub const VHOST_LABEL: &str = "HAPROXY_0_VHOST";

/// Name a domain is stored under by the ACME client
///
/// Wildcard certificates live under their apex: `*.example.com` is kept in
/// `example.com/`.
pub fn storage_name(domain: &str) -> &str {
    domain.strip_prefix("*.").unwrap_or(domain)
}

/// Ordered, non-empty list of hostnames
///
/// The first entry is the primary domain; it names the storage directory
/// and the combined PEM file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSet {
    domains: Vec<String>,
    canonical: String,
}

impl DomainSet {
    /// Parse a comma-delimited list, trimming whitespace around entries
    pub fn parse(raw: &str) -> CertResult<Self> {
        let domains: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();

        if domains.is_empty() {
            return Err(CertError::Configuration(format!(
                "domain list {:?} contains no hostnames",
                raw
            )));
        }

        let canonical = domains.join(",");
        Ok(Self { domains, canonical })
    }

    /// First domain, exactly as requested (may be a wildcard)
    pub fn primary(&self) -> &str {
        &self.domains[0]
    }

    /// Directory and file basename of the primary domain
    pub fn primary_storage_name(&self) -> &str {
        storage_name(self.primary())
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Comma-joined form, used for the state file and comparisons
    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for DomainSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Determines the domains to certify for the configured verification mode
pub struct DomainResolver {
    api: Arc<dyn MarathonApi>,
    verification: VerificationMethod,
    app_id: Option<String>,
    static_domains: Option<String>,
}

impl DomainResolver {
    pub fn new(config: &Config, api: Arc<dyn MarathonApi>) -> Self {
        Self {
            api,
            verification: config.verification,
            app_id: config.marathon_app_id.clone(),
            static_domains: config.domains.clone(),
        }
    }

    pub async fn resolve(&self) -> CertResult<DomainSet> {
        let raw = match self.verification {
            VerificationMethod::Http => self.vhost_label().await?,
            VerificationMethod::Dns => self
                .static_domains
                .clone()
                .ok_or_else(|| CertError::Configuration("DOMAINS is not set".to_string()))?,
        };

        let domains = DomainSet::parse(&raw)?;
        info!(
            verification = %self.verification,
            domains = %domains,
            "Resolved domains to certify"
        );
        Ok(domains)
    }

    async fn vhost_label(&self) -> CertResult<String> {
        let app_id = self
            .app_id
            .as_deref()
            .ok_or_else(|| CertError::Configuration("MARATHON_APP_ID is not set".to_string()))?;

        let app = match self.api.get_app(app_id).await {
            Ok(app) => app,
            Err(CertError::AppNotFound(id)) => {
                return Err(CertError::Configuration(format!(
                    "app {} not found in marathon",
                    id
                )));
            }
            Err(e) => return Err(e),
        };

        debug!(app_id = %app_id, labels = app.labels.len(), "Fetched own app definition");

        app.labels.get(VHOST_LABEL).cloned().ok_or_else(|| {
            CertError::Configuration(format!("app {} has no {} label", app_id, VHOST_LABEL))
        })
    }
}
