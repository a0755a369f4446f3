//! Marathon REST payloads
//!
//! Only the fields this agent reads or must round-trip are modeled. Env
//! values stay as raw JSON because Marathon allows secret references
//! (`{"secret": "name"}`) next to plain strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `GET /v2/apps/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct AppResponse {
    pub app: AppDefinition,
}

/// The parts of an app definition the agent cares about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppDefinition {
    pub id: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub env: Map<String, Value>,
    #[serde(default)]
    pub secrets: Map<String, Value>,
}

impl AppDefinition {
    /// Plain string value of an env entry, `None` if absent or a secret ref
    pub fn env_str(&self, key: &str) -> Option<&str> {
        self.env.get(key).and_then(Value::as_str)
    }
}

/// Body of `PUT /v2/apps/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppUpdate {
    pub id: String,
    pub env: Map<String, Value>,
    pub secrets: Map<String, Value>,
}

/// Accepted update, as returned by Marathon
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateResponse {
    #[serde(rename = "deploymentId", default)]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Entry of `GET /v2/deployments`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Deployment {
    pub id: String,
}
