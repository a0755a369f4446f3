//! Marathon integration
//!
//! - [`MarathonApi`] - the orchestrator operations the agent needs
//! - [`MarathonClient`] - HTTP implementation against `/v2/apps` and `/v2/deployments`
//! - [`LoadBalancerUpdater`] - idempotent certificate upload with deployment confirmation

mod client;
mod types;
mod updater;

pub use client::{MarathonApi, MarathonClient};
pub use types::{AppDefinition, AppResponse, AppUpdate, Deployment, UpdateResponse};
pub use updater::{LoadBalancerUpdater, UploadOutcome};
