//! DNS provider credentials
//!
//! The DNS plugins of the ACME client read their credentials themselves:
//! the Google plugin from a JSON file, Route 53 from the AWS environment
//! variables. This only makes sure that material is in place before the
//! first run.

use std::fs;

use tracing::info;

use certsync_config::{Config, DnsProvider, VerificationMethod};

use crate::error::{CertError, CertResult};

/// Check and materialize DNS provider credentials for the configured mode
pub fn prepare_dns_credentials(config: &Config) -> CertResult<()> {
    if config.verification != VerificationMethod::Dns {
        return Ok(());
    }

    match config.dns_provider {
        DnsProvider::Google => {
            let account = config.gce_service_account.as_deref().ok_or_else(|| {
                CertError::Configuration("GCE_SERVICE_ACCOUNT is not defined".to_string())
            })?;

            let path = &config.google_credentials;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Drop a previous read-only copy before rewriting
            if path.exists() {
                fs::remove_file(path)?;
            }
            fs::write(path, account)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(path, fs::Permissions::from_mode(0o400))?;
            }

            info!(path = %path.display(), "Created GCE service account file");
        }
        DnsProvider::Route53 => {
            if config.aws_access_key_id.is_none() || config.aws_secret_access_key.is_none() {
                return Err(CertError::Configuration(
                    "AWS_ACCESS_KEY_ID or AWS_SECRET_ACCESS_KEY is not defined".to_string(),
                ));
            }
            info!("Using AWS credentials from environment for Route 53");
        }
    }

    Ok(())
}
