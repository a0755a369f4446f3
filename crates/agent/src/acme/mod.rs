//! ACME certificate acquisition
//!
//! Certificates are obtained by an external ACME client (certbot) that
//! writes into a filesystem store keyed by domain name.
//!
//! # Architecture
//!
//! - [`CertificateIssuer`] - Boundary to the ACME client, with [`CertbotIssuer`]
//!   running it as a subprocess
//! - [`CertificateStorage`] - Directory resolution, PEM bundling and the domain
//!   state file
//! - [`AcquisitionEngine`] - Chooses renewal or issuance and drives the issuer
//!
//! # Flow
//!
//! 1. [`AcquisitionEngine`] compares the domain list with the recorded one
//! 2. Unchanged list with an existing bundle: `certbot renew`
//! 3. Otherwise: `certbot certonly` with the challenge-specific flags
//! 4. On exit code 0 the domain list is recorded
//! 5. [`CertificateStorage`] concatenates `fullchain.pem` and `privkey.pem`
//!    from the newest directory into `<domain>.pem`

mod engine;
mod issuer;
mod storage;

pub use engine::{Acquisition, AcquisitionEngine, Challenge, DnsChallenge};
pub use issuer::{CertbotIssuer, CertificateIssuer, IssueRequest, IssuerOutput, CERTBOT_COMMAND};
pub use storage::{select_newest, CertificateStorage, FULLCHAIN_FILE, PRIVKEY_FILE};
