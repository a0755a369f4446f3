//! Raw environment view.
//!
//! Field names map one-to-one onto upper-case environment variables
//! (`marathon_lb_id` reads `MARATHON_LB_ID`). Everything is optional here;
//! defaults and requirements are applied when resolving into [`crate::Config`].

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawEnv {
    pub marathon_app_id: Option<String>,
    pub marathon_url: Option<String>,
    pub marathon_lb_id: Option<String>,
    pub marathon_lb_cert_env: Option<String>,
    pub letsencrypt_server_url: Option<String>,
    pub letsencrypt_email: Option<String>,
    pub letsencrypt_verification_method: Option<String>,
    pub domains: Option<String>,
    pub dns_provider: Option<String>,
    pub rsa_key_size: Option<u32>,
    pub google_application_credentials: Option<PathBuf>,
    pub dns_propagation_timeout: Option<u64>,
    pub gce_service_account: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
}

/// Treat `FOO=""` the same as an unset variable.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
