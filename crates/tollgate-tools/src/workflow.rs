//! Workflow engine trigger handler.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tollgate_core::{CapabilityName, HandlerFailure, TrustContext};
use tollgate_registry::ToolHandler;

/// Configuration for the workflow trigger handler.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Workflow engine API base, e.g. `https://workflows.cust01/api`.
    pub api_url: String,
    /// API key presented as a bearer token.
    pub api_key: String,
    /// Per-call HTTP timeout.
    pub timeout: Duration,
}

impl WorkflowConfig {
    /// Creates a config with the conventional timeout.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// `workflow.trigger` — start a named flow run.
///
/// Arguments: `{ "flow": "<name>", "params": { ... } }`, flow required.
pub struct TriggerFlow {
    config: WorkflowConfig,
    client: reqwest::Client,
}

impl TriggerFlow {
    /// Creates the handler; the HTTP client carries the configured timeout.
    pub fn new(config: WorkflowConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }
}

#[async_trait]
impl ToolHandler for TriggerFlow {
    fn capability(&self) -> CapabilityName {
        CapabilityName::new("workflow.trigger")
    }

    fn description(&self) -> &str {
        "Trigger a workflow engine flow run"
    }

    async fn invoke(
        &self,
        arguments: Value,
        ctx: &TrustContext,
    ) -> Result<Value, HandlerFailure> {
        let flow = arguments
            .get("flow")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerFailure::invalid_arguments("flow is required"))?
            .to_string();
        let params = arguments.get("params").cloned().unwrap_or(json!({}));
        if !params.is_object() {
            return Err(HandlerFailure::invalid_arguments("params must be an object"));
        }

        tracing::info!(
            tenant = %ctx.tenant_id,
            flow = %flow,
            request = %ctx.request_id,
            "Triggering flow run"
        );

        let url = format!(
            "{}/flows/{flow}/runs",
            self.config.api_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({ "parameters": params }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HandlerFailure::timeout(format!("workflow API call timed out: {e}"))
                } else {
                    HandlerFailure::external(format!("workflow API call failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(HandlerFailure::external(format!(
                "workflow API returned {status}: {body}"
            )));
        }

        let run: Value = response.json().await.unwrap_or(Value::Null);
        Ok(json!({ "triggered": true, "flow": flow, "run": run }))
    }
}
