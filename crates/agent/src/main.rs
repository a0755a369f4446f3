//! Certsync - Main entry point
//!
//! Keeps marathon-lb's default certificate issued and renewed.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use certsync_agent::{
    prepare_dns_credentials, BackoffPolicy, CertbotIssuer, CertificateWorkflow, MarathonClient,
    ServiceScheduler,
};
use certsync_config::Config;

/// Certsync - Let's Encrypt certificates for marathon-lb
#[derive(Parser, Debug)]
#[command(name = "certsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Run the certificate workflow once and exit (default)
    Once,
    /// Run the workflow every day, failing on the first error
    Service,
    /// Run the workflow every day, retrying failed runs with backoff
    #[command(alias = "service_with_backoff")]
    ServiceWithBackoff,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    let config = Config::from_env().context("Failed to load configuration from environment")?;
    prepare_dns_credentials(&config).context("Failed to prepare DNS credentials")?;

    let api = MarathonClient::new(&config.marathon_url).context("Failed to create Marathon client")?;
    let issuer = CertbotIssuer::new(&config);
    let workflow = CertificateWorkflow::new(&config, Arc::new(issuer), Arc::new(api));

    info!(
        verification = %config.verification,
        lb_app_id = %config.lb_app_id,
        marathon_url = %config.marathon_url,
        "Starting certsync"
    );

    match cli.command.unwrap_or(Commands::Once) {
        Commands::Once => {
            let outcome = workflow.run_once().await.context("Certificate run failed")?;
            info!(outcome = ?outcome, "Certificate run completed");
            Ok(())
        }
        Commands::Service => {
            let scheduler = ServiceScheduler::new(workflow, config.timings.service_interval);
            run_service(scheduler).await
        }
        Commands::ServiceWithBackoff => {
            let scheduler = ServiceScheduler::new(workflow, config.timings.service_interval)
                .with_backoff(BackoffPolicy::from(&config.timings));
            run_service(scheduler).await
        }
    }
}

fn init_logging(verbose: bool, format: LogFormat) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Run the service loop until it fails or the process is asked to stop
async fn run_service(scheduler: ServiceScheduler) -> Result<()> {
    tokio::select! {
        result = scheduler.run() => {
            result.context("Certificate service stopped")
        }
        signal = shutdown_signal() => {
            signal?;
            warn!("Shutdown signal received, stopping certificate service");
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for SIGINT"),
        _ = sigterm.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")
}
