//! Certificate store access
//!
//! The ACME client owns the store; this module only reads what it produced,
//! writes the combined PEM next to it, and keeps the domain state file.
//!
//! # Directory Structure
//!
//! ```text
//! /etc/letsencrypt/
//! ├── current_domains           # Domain list of the last successful run
//! └── live/
//!     ├── example.com/
//!     │   ├── fullchain.pem     # Certificate chain
//!     │   ├── privkey.pem       # Private key
//!     │   └── example.com.pem   # Combined chain + key (written here)
//!     └── example.com-0001/     # Reissued with a different domain list
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, trace};

use certsync_config::StorePaths;

use crate::domains::{storage_name, DomainSet};
use crate::error::{CertError, CertResult};

pub const FULLCHAIN_FILE: &str = "fullchain.pem";
pub const PRIVKEY_FILE: &str = "privkey.pem";

/// Filesystem view of the certificate store and domain state file
#[derive(Debug, Clone)]
pub struct CertificateStorage {
    certificates_dir: PathBuf,
    domains_file: PathBuf,
}

impl CertificateStorage {
    pub fn new(paths: &StorePaths) -> Self {
        Self {
            certificates_dir: paths.certificates_dir.clone(),
            domains_file: paths.domains_file.clone(),
        }
    }

    pub fn certificates_dir(&self) -> &Path {
        &self.certificates_dir
    }

    // =========================================================================
    // Directory resolution
    // =========================================================================

    /// Locate the most recently created directory for a domain
    ///
    /// Wildcard names are looked up under their apex. Candidates are the
    /// directory named after the domain and its reissues (`<domain>-NNNN`).
    pub fn newest_dir(&self, domain: &str) -> CertResult<PathBuf> {
        let name = storage_name(domain);
        let mut candidates = Vec::new();

        let entries = match fs::read_dir(&self.certificates_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(self.not_found(name));
            }
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            if !is_issuance_dir(&entry.file_name().to_string_lossy(), name) {
                continue;
            }
            let meta = fs::metadata(entry.path())?;
            if !meta.is_dir() {
                continue;
            }
            let created = meta.created().or_else(|_| meta.modified())?;
            trace!(path = %entry.path().display(), "Certificate directory candidate");
            candidates.push((entry.path(), created));
        }

        let newest = select_newest(candidates).ok_or_else(|| self.not_found(name))?;
        debug!(domain = %name, dir = %newest.display(), "Resolved certificate directory");
        Ok(newest)
    }

    fn not_found(&self, domain: &str) -> CertError {
        CertError::NotFound {
            domain: domain.to_string(),
            root: self.certificates_dir.clone(),
        }
    }

    /// Path of the combined PEM for a domain in its newest directory
    pub fn combined_path(&self, domain: &str) -> CertResult<PathBuf> {
        let name = storage_name(domain);
        Ok(self.newest_dir(name)?.join(format!("{}.pem", name)))
    }

    /// Whether a combined PEM already exists for a domain
    pub fn has_combined(&self, domain: &str) -> bool {
        self.combined_path(domain)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    // =========================================================================
    // Bundling
    // =========================================================================

    /// Write `<domain>.pem` as the chain followed by the private key
    ///
    /// Bytes are copied verbatim, no separator is inserted. Any prior
    /// combined file is overwritten.
    pub fn write_combined(&self, domain: &str) -> CertResult<PathBuf> {
        let name = storage_name(domain);
        let dir = self.newest_dir(name)?;

        let mut combined = fs::read(dir.join(FULLCHAIN_FILE))?;
        combined.extend_from_slice(&fs::read(dir.join(PRIVKEY_FILE))?);

        let path = dir.join(format!("{}.pem", name));
        fs::write(&path, &combined)?;

        // Carries the private key
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        info!(
            domain = %name,
            path = %path.display(),
            bytes = combined.len(),
            "Wrote combined certificate"
        );
        Ok(path)
    }

    // =========================================================================
    // Domain state
    // =========================================================================

    /// Domain list recorded by the last successful run, empty on first run
    pub fn read_last_domains(&self) -> CertResult<String> {
        match fs::read_to_string(&self.domains_file) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %self.domains_file.display(), "No recorded domains");
                Ok(String::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the recorded domain list
    pub fn write_domains(&self, domains: &DomainSet) -> CertResult<()> {
        fs::write(&self.domains_file, domains.as_str())?;
        debug!(domains = %domains, "Recorded domain list");
        Ok(())
    }
}

/// Whether `dir_name` is `domain` or one of its numbered reissues
fn is_issuance_dir(dir_name: &str, domain: &str) -> bool {
    match dir_name.strip_prefix(domain) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

/// Pick the newest candidate, breaking timestamp ties by the lexically
/// greatest path
pub fn select_newest<I>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = (PathBuf, SystemTime)>,
{
    candidates
        .into_iter()
        .max_by(|(a_path, a_time), (b_path, b_time)| {
            a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
        })
        .map(|(path, _)| path)
}
