//! Certsync configuration
//!
//! The agent is configured entirely through environment variables, the way
//! container schedulers hand settings to a task. This crate reads them once
//! at startup and resolves them into a typed [`Config`] that is then passed
//! explicitly to every component.
//!
//! # Example
//!
//! ```text
//! MARATHON_LB_ID=/marathon-lb
//! MARATHON_APP_ID=/certsync
//! LETSENCRYPT_EMAIL=ops@example.com
//! LETSENCRYPT_VERIFICATION_METHOD=dns
//! DNS_PROVIDER=route53
//! DOMAINS=*.example.com,example.com
//! ```

mod env;
mod errors;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;
use validator::Validate;

use env::{non_empty, RawEnv};

pub use errors::{ConfigError, ConfigResult};

// ============================================================================
// Defaults
// ============================================================================

/// In-cluster Marathon endpoint
pub const DEFAULT_MARATHON_URL: &str = "https://marathon.mesos:8443/";

/// Let's Encrypt staging directory, used unless a server is configured
pub const DEFAULT_ACME_SERVER_URL: &str =
    "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Environment key in the load balancer app that carries the PEM bundle
pub const DEFAULT_LB_CERT_ENV: &str = "HAPROXY_SSL_CERT";

pub const DEFAULT_RSA_KEY_SIZE: u32 = 4096;

pub const DEFAULT_GOOGLE_CREDENTIALS: &str = "/certbot/google_service_account.json";

/// Seconds the ACME client waits for DNS records to propagate
pub const DEFAULT_DNS_PROPAGATION_SECS: u64 = 120;

/// Where certbot places the per-issuance directories
pub const DEFAULT_CERTIFICATES_DIR: &str = "/etc/letsencrypt/live";

/// Records the domain list of the last successful run
pub const DEFAULT_DOMAINS_FILE: &str = "/etc/letsencrypt/current_domains";

// ============================================================================
// Typed settings
// ============================================================================

/// Challenge mechanism used to prove domain control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationMethod {
    /// HTTP-01, answered by the ACME client's standalone responder
    #[default]
    Http,
    /// DNS-01, published through a DNS provider plugin
    Dns,
}

impl FromStr for VerificationMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "dns" => Ok(Self::Dns),
            _ => Err(ConfigError::InvalidValue {
                name: "LETSENCRYPT_VERIFICATION_METHOD",
                value: s.to_string(),
                expected: "http, dns",
            }),
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Dns => f.write_str("dns"),
        }
    }
}

/// DNS provider plugin used for DNS-01 challenges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DnsProvider {
    /// Google Cloud DNS
    #[default]
    Google,
    /// AWS Route 53
    Route53,
}

impl FromStr for DnsProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "route53" => Ok(Self::Route53),
            _ => Err(ConfigError::InvalidValue {
                name: "DNS_PROVIDER",
                value: s.to_string(),
                expected: "google, route53",
            }),
        }
    }
}

impl fmt::Display for DnsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => f.write_str("google"),
            Self::Route53 => f.write_str("route53"),
        }
    }
}

/// Filesystem locations shared with the ACME client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// Root of the certificate store, one directory per issuance
    pub certificates_dir: PathBuf,
    /// Single file holding the last processed domain list
    pub domains_file: PathBuf,
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            certificates_dir: PathBuf::from(DEFAULT_CERTIFICATES_DIR),
            domains_file: PathBuf::from(DEFAULT_DOMAINS_FILE),
        }
    }
}

/// Sleep intervals and limits of the control loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    /// Delay between deployment list polls
    pub deployment_poll_interval: Duration,
    /// Polls before a deployment is declared stuck
    pub deployment_max_polls: u32,
    /// First backoff sleep after a failed run
    pub backoff_initial: Duration,
    /// Cumulative backoff after which the last error is surfaced
    pub backoff_ceiling: Duration,
    /// Cadence of the service modes
    pub service_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            deployment_poll_interval: Duration::from_secs(5),
            deployment_max_polls: 60,
            backoff_initial: Duration::from_secs(30),
            backoff_ceiling: Duration::from_secs(60 * 60),
            service_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Fully resolved agent configuration
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// Challenge type used for issuance
    pub verification: VerificationMethod,

    /// DNS plugin, only consulted in DNS mode
    pub dns_provider: DnsProvider,

    /// Static comma-separated domain list (DNS mode)
    pub domains: Option<String>,

    /// Id of the app running this agent (HTTP mode reads its vhost label)
    pub marathon_app_id: Option<String>,

    /// Base URL of the Marathon REST API
    #[validate(url)]
    pub marathon_url: String,

    /// Id of the marathon-lb app receiving the certificate
    pub lb_app_id: String,

    /// Env key in the load balancer app holding the PEM bundle
    pub lb_cert_env: String,

    /// ACME directory URL
    #[validate(url)]
    pub acme_server_url: String,

    /// Contact address registered with the CA
    #[validate(email)]
    pub contact_email: String,

    #[validate(range(min = 1024, max = 16384))]
    pub rsa_key_size: u32,

    /// Credentials file handed to the Google DNS plugin
    pub google_credentials: PathBuf,

    /// DNS propagation wait passed to the DNS plugin
    pub dns_propagation: Duration,

    /// Service account JSON written to `google_credentials` at startup
    pub gce_service_account: Option<String>,

    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,

    pub paths: StorePaths,
    pub timings: Timings,
}

impl Config {
    /// Resolve configuration from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        let raw: RawEnv = envy::from_env()?;
        Self::resolve(raw)
    }

    /// Resolve configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: RawEnv = envy::from_iter(vars)?;
        Self::resolve(raw)
    }

    fn resolve(raw: RawEnv) -> ConfigResult<Self> {
        let verification = match non_empty(raw.letsencrypt_verification_method) {
            Some(v) => v.parse()?,
            None => VerificationMethod::default(),
        };
        // The provider only matters for DNS-01; HTTP mode ignores it
        let dns_provider = match (verification, non_empty(raw.dns_provider)) {
            (VerificationMethod::Dns, Some(v)) => v.parse()?,
            _ => DnsProvider::default(),
        };

        let config = Self {
            verification,
            dns_provider,
            domains: non_empty(raw.domains),
            marathon_app_id: non_empty(raw.marathon_app_id),
            marathon_url: non_empty(raw.marathon_url)
                .unwrap_or_else(|| DEFAULT_MARATHON_URL.to_string()),
            lb_app_id: non_empty(raw.marathon_lb_id).ok_or(ConfigError::Missing("MARATHON_LB_ID"))?,
            lb_cert_env: non_empty(raw.marathon_lb_cert_env)
                .unwrap_or_else(|| DEFAULT_LB_CERT_ENV.to_string()),
            acme_server_url: non_empty(raw.letsencrypt_server_url)
                .unwrap_or_else(|| DEFAULT_ACME_SERVER_URL.to_string()),
            contact_email: non_empty(raw.letsencrypt_email)
                .ok_or(ConfigError::Missing("LETSENCRYPT_EMAIL"))?,
            rsa_key_size: raw.rsa_key_size.unwrap_or(DEFAULT_RSA_KEY_SIZE),
            google_credentials: raw
                .google_application_credentials
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GOOGLE_CREDENTIALS)),
            dns_propagation: Duration::from_secs(
                raw.dns_propagation_timeout
                    .unwrap_or(DEFAULT_DNS_PROPAGATION_SECS),
            ),
            gce_service_account: non_empty(raw.gce_service_account),
            aws_access_key_id: non_empty(raw.aws_access_key_id),
            aws_secret_access_key: non_empty(raw.aws_secret_access_key),
            paths: StorePaths::default(),
            timings: Timings::default(),
        };

        config.validate()?;

        debug!(
            verification = %config.verification,
            dns_provider = %config.dns_provider,
            marathon_url = %config.marathon_url,
            lb_app_id = %config.lb_app_id,
            acme_server = %config.acme_server_url,
            "Resolved configuration"
        );

        Ok(config)
    }
}
