//! Certificate acquisition
//!
//! Decides between renewing and issuing, drives the [`CertificateIssuer`],
//! and on success records the domain list and rebuilds the combined PEM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info};

use certsync_config::{Config, DnsProvider, VerificationMethod};

use super::issuer::{CertificateIssuer, IssueRequest};
use super::storage::CertificateStorage;
use crate::domains::DomainSet;
use crate::error::{CertError, CertResult};

/// DNS-01 provider plugin and its flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsChallenge {
    Google {
        credentials: PathBuf,
        propagation: Duration,
    },
    /// AWS credentials are picked up by the plugin from its environment
    Route53 { propagation: Duration },
}

/// How domain control is proven
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// HTTP-01 through the client's standalone responder
    Http,
    Dns(DnsChallenge),
}

impl Challenge {
    pub fn from_config(config: &Config) -> Self {
        match config.verification {
            VerificationMethod::Http => Challenge::Http,
            VerificationMethod::Dns => Challenge::Dns(match config.dns_provider {
                DnsProvider::Google => DnsChallenge::Google {
                    credentials: config.google_credentials.clone(),
                    propagation: config.dns_propagation,
                },
                DnsProvider::Route53 => DnsChallenge::Route53 {
                    propagation: config.dns_propagation,
                },
            }),
        }
    }

    /// ACME client flags selecting this challenge
    pub fn args(&self) -> Vec<String> {
        match self {
            Challenge::Http => vec![
                "--standalone".into(),
                "--no-redirect".into(),
                "--preferred-challenges".into(),
                "http-01".into(),
            ],
            Challenge::Dns(dns) => {
                let mut args: Vec<String> =
                    vec!["--preferred-challenges".into(), "dns-01".into()];
                match dns {
                    DnsChallenge::Google {
                        credentials,
                        propagation,
                    } => args.extend([
                        "--dns-google".into(),
                        "--dns-google-credentials".into(),
                        credentials.display().to_string(),
                        "--dns-google-propagation-seconds".into(),
                        propagation.as_secs().to_string(),
                    ]),
                    DnsChallenge::Route53 { propagation } => args.extend([
                        "--dns-route53".into(),
                        "--dns-route53-propagation-seconds".into(),
                        propagation.as_secs().to_string(),
                    ]),
                }
                args
            }
        }
    }
}

/// Acquisition strategy for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// Same domains as last time and a combined PEM exists
    Renewal,
    /// New or changed domain list, or nothing bundled yet
    Issuance,
}

/// Obtains certificates and prepares the combined PEM
pub struct AcquisitionEngine {
    issuer: Arc<dyn CertificateIssuer>,
    storage: CertificateStorage,
    challenge: Challenge,
}

impl AcquisitionEngine {
    pub fn new(
        config: &Config,
        issuer: Arc<dyn CertificateIssuer>,
        storage: CertificateStorage,
    ) -> Self {
        Self {
            issuer,
            storage,
            challenge: Challenge::from_config(config),
        }
    }

    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// Choose renewal only when nothing changed since the last success
    pub fn plan(&self, domains: &DomainSet) -> CertResult<Acquisition> {
        let unchanged = self.storage.read_last_domains()? == domains.as_str();
        let bundled = self.storage.has_combined(domains.primary_storage_name());

        Ok(if unchanged && bundled {
            Acquisition::Renewal
        } else {
            Acquisition::Issuance
        })
    }

    /// Run the ACME client for `domains` and bundle the result
    ///
    /// Returns the primary domain's storage name. Nothing is recorded or
    /// bundled unless the client reports success.
    pub async fn acquire(&self, domains: &DomainSet) -> CertResult<String> {
        let start = Instant::now();
        let plan = self.plan(domains)?;

        let output = match plan {
            Acquisition::Renewal => {
                info!(domains = %domains, "About to attempt renewal of certificate");
                self.issuer.renew().await?
            }
            Acquisition::Issuance => {
                info!(domains = %domains, "Running ACME client to generate initial signed certificate");
                let request = IssueRequest {
                    domains: domains.domains().to_vec(),
                    challenge: self.challenge.clone(),
                };
                self.issuer.issue(&request).await?
            }
        };

        if !output.success() {
            error!(
                exit_code = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "Obtaining certificates failed"
            );
            return Err(CertError::ClientFailure(output));
        }

        self.storage.write_domains(domains)?;
        let primary = domains.primary_storage_name().to_string();
        self.storage.write_combined(&primary)?;

        info!(
            domain = %primary,
            strategy = ?plan,
            elapsed_secs = start.elapsed().as_secs(),
            "Certificate acquisition completed"
        );
        Ok(primary)
    }
}
