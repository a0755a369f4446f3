//! ACME client boundary
//!
//! The actual ACME exchange is performed by certbot, run as a subprocess.
//! [`CertificateIssuer`] is the seam the control loop talks to so the
//! subprocess can be swapped for a fake in tests.

use std::fmt;
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn, Level};

use certsync_config::Config;

use super::engine::Challenge;
use crate::error::CertResult;

/// Program invoked for every ACME operation
pub const CERTBOT_COMMAND: &str = "certbot";

/// Parameters of a fresh issuance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    /// Every name the certificate must cover, primary first
    pub domains: Vec<String>,
    /// Challenge mechanism and its provider flags
    pub challenge: Challenge,
}

/// Captured result of one ACME client invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerOutput {
    /// Full argument vector, program first
    pub command: Vec<String>,
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl IssuerOutput {
    /// Build from a finished process
    pub fn from_process(command: Vec<String>, output: &Output) -> Self {
        Self {
            command,
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl fmt::Display for IssuerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` ", self.command.join(" "))?;
        match self.exit_code {
            Some(code) => write!(f, "exited with status {}", code)?,
            None => f.write_str("was terminated by a signal")?,
        }
        if let Some(line) = self.stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            write!(f, ": {}", line.trim())?;
        }
        Ok(())
    }
}

/// Capability to obtain certificates from a CA
///
/// Implementations report the raw outcome; deciding whether a non-zero
/// exit is an error belongs to the caller.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    /// Obtain a new certificate for the request's domains
    async fn issue(&self, request: &IssueRequest) -> CertResult<IssuerOutput>;

    /// Renew every certificate the client manages
    async fn renew(&self) -> CertResult<IssuerOutput>;
}

/// [`CertificateIssuer`] backed by the certbot CLI
#[derive(Debug, Clone)]
pub struct CertbotIssuer {
    program: String,
    server_url: String,
    email: String,
    rsa_key_size: u32,
}

impl CertbotIssuer {
    pub fn new(config: &Config) -> Self {
        Self {
            program: CERTBOT_COMMAND.to_string(),
            server_url: config.acme_server_url.clone(),
            email: config.contact_email.clone(),
            rsa_key_size: config.rsa_key_size,
        }
    }

    /// Use a different executable than `certbot` on `PATH`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Argument vector for a fresh issuance, program first
    pub fn issue_command(&self, request: &IssueRequest) -> Vec<String> {
        let mut args = vec![
            self.program.clone(),
            "certonly".to_string(),
            "--server".to_string(),
            self.server_url.clone(),
            "--email".to_string(),
            self.email.clone(),
            "--agree-tos".to_string(),
            "--noninteractive".to_string(),
            "--rsa-key-size".to_string(),
            self.rsa_key_size.to_string(),
            "--expand".to_string(),
        ];
        for domain in &request.domains {
            args.push("-d".to_string());
            args.push(domain.clone());
        }
        args.extend(request.challenge.args());
        args
    }

    /// Argument vector for renewal, program first
    pub fn renew_command(&self) -> Vec<String> {
        vec![self.program.clone(), "renew".to_string()]
    }

    async fn execute(&self, command: Vec<String>) -> CertResult<IssuerOutput> {
        info!(command = %command.join(" "), "Running ACME client");

        let output = Command::new(&command[0])
            .args(&command[1..])
            .kill_on_drop(true)
            .output()
            .await?;

        let result = IssuerOutput::from_process(command, &output);
        for (level, line) in captured_lines(&result) {
            if level == Level::WARN {
                warn!(target: "certbot", "{}", line);
            } else {
                debug!(target: "certbot", "{}", line);
            }
        }
        Ok(result)
    }
}

/// Client output lines paired with the level they are logged at
///
/// On failure both streams are surfaced at `WARN`; a successful run only
/// keeps stdout, at `DEBUG`.
fn captured_lines(output: &IssuerOutput) -> Vec<(Level, &str)> {
    let failed = !output.success();
    let stdout_level = if failed { Level::WARN } else { Level::DEBUG };

    let mut lines: Vec<_> = output.stdout.lines().map(|l| (stdout_level, l)).collect();
    if failed {
        lines.extend(output.stderr.lines().map(|l| (Level::WARN, l)));
    }
    lines
}

#[async_trait]
impl CertificateIssuer for CertbotIssuer {
    async fn issue(&self, request: &IssueRequest) -> CertResult<IssuerOutput> {
        info!(
            server = %self.server_url,
            domains = %request.domains.join(","),
            "Requesting initial signed certificate"
        );
        self.execute(self.issue_command(request)).await
    }

    async fn renew(&self) -> CertResult<IssuerOutput> {
        info!("Attempting renewal of managed certificates");
        self.execute(self.renew_command()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acme::engine::DnsChallenge;
    use std::path::PathBuf;
    use std::time::Duration;

    fn output(exit_code: i32) -> IssuerOutput {
        IssuerOutput {
            command: vec!["certbot".into(), "renew".into()],
            exit_code: Some(exit_code),
            stdout: "Saving debug log\nProcessing example.com.conf\n".into(),
            stderr: "Challenge failed for domain example.com\n".into(),
        }
    }

    #[test]
    fn test_successful_output_logged_at_debug() {
        let out = output(0);
        let lines = captured_lines(&out);
        assert_eq!(
            lines,
            vec![
                (Level::DEBUG, "Saving debug log"),
                (Level::DEBUG, "Processing example.com.conf"),
            ]
        );
    }

    #[test]
    fn test_failed_output_logged_at_warn() {
        let out = output(1);
        let lines = captured_lines(&out);
        assert_eq!(
            lines,
            vec![
                (Level::WARN, "Saving debug log"),
                (Level::WARN, "Processing example.com.conf"),
                (Level::WARN, "Challenge failed for domain example.com"),
            ]
        );
    }

    fn issuer() -> CertbotIssuer {
        CertbotIssuer {
            program: CERTBOT_COMMAND.to_string(),
            server_url: "https://acme.test/directory".to_string(),
            email: "ops@example.com".to_string(),
            rsa_key_size: 4096,
        }
    }

    #[test]
    fn test_issue_command_http() {
        let request = IssueRequest {
            domains: vec!["example.com".into(), "www.example.com".into()],
            challenge: Challenge::Http,
        };

        let args = issuer().issue_command(&request);
        assert_eq!(
            args,
            vec![
                "certbot",
                "certonly",
                "--server",
                "https://acme.test/directory",
                "--email",
                "ops@example.com",
                "--agree-tos",
                "--noninteractive",
                "--rsa-key-size",
                "4096",
                "--expand",
                "-d",
                "example.com",
                "-d",
                "www.example.com",
                "--standalone",
                "--no-redirect",
                "--preferred-challenges",
                "http-01",
            ]
        );
    }

    #[test]
    fn test_issue_command_dns_google() {
        let request = IssueRequest {
            domains: vec!["*.example.com".into()],
            challenge: Challenge::Dns(DnsChallenge::Google {
                credentials: PathBuf::from("/secrets/gce.json"),
                propagation: Duration::from_secs(90),
            }),
        };

        let args = issuer().issue_command(&request);
        let tail: Vec<&str> = args[11..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "-d",
                "*.example.com",
                "--preferred-challenges",
                "dns-01",
                "--dns-google",
                "--dns-google-credentials",
                "/secrets/gce.json",
                "--dns-google-propagation-seconds",
                "90",
            ]
        );
    }

    #[test]
    fn test_renew_command() {
        assert_eq!(issuer().renew_command(), vec!["certbot", "renew"]);
    }

    #[test]
    fn test_output_display_includes_last_stderr_line() {
        let output = IssuerOutput {
            command: vec!["certbot".into(), "renew".into()],
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "Saving debug log\nChallenge failed for domain example.com\n\n".into(),
        };

        assert!(!output.success());
        assert_eq!(
            output.to_string(),
            "`certbot renew` exited with status 1: Challenge failed for domain example.com"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_captures_exit_status() {
        let issuer = issuer();

        let ok = issuer
            .execute(vec!["sh".into(), "-c".into(), "echo issued".into()])
            .await
            .unwrap();
        assert!(ok.success());
        assert_eq!(ok.stdout.trim(), "issued");

        let failed = issuer
            .execute(vec!["sh".into(), "-c".into(), "echo boom >&2; exit 3".into()])
            .await
            .unwrap();
        assert_eq!(failed.exit_code, Some(3));
        assert_eq!(failed.stderr.trim(), "boom");
    }

    #[tokio::test]
    async fn test_execute_missing_program() {
        let issuer = issuer().with_program("certsync-no-such-certbot");
        let err = issuer.renew().await.unwrap_err();
        assert!(matches!(err, crate::error::CertError::Io(_)));
    }
}
