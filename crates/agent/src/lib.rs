//! Certsync agent library
//!
//! Obtains Let's Encrypt certificates for the virtual hosts served by a
//! marathon-lb group and pushes the combined PEM into the load balancer's
//! app definition.
//!
//! # Components
//!
//! - [`domains`] - which domains to certify
//! - [`acme`] - certbot invocation, certificate store and state file
//! - [`marathon`] - Marathon client and the load balancer updater
//! - [`retry`] - exponential backoff around a whole run
//! - [`workflow`] - one run of the chain
//! - [`scheduler`] - the daily service loop
//! - [`credentials`] - DNS provider credential files

pub mod acme;
pub mod credentials;
pub mod domains;
pub mod error;
pub mod marathon;
pub mod retry;
pub mod scheduler;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use acme::{AcquisitionEngine, CertbotIssuer, CertificateIssuer, CertificateStorage};
pub use credentials::prepare_dns_credentials;
pub use domains::{DomainResolver, DomainSet};
pub use error::{CertError, CertResult};
pub use marathon::{LoadBalancerUpdater, MarathonApi, MarathonClient, UploadOutcome};
pub use retry::{retry_with_backoff, BackoffPolicy};
pub use scheduler::ServiceScheduler;
pub use workflow::CertificateWorkflow;
