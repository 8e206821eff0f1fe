//! Cloud inventory handlers.
//!
//! Talks to an ARM-style resource-manager REST API. Credentials and the
//! API base are per-tenant configuration; the handler logic is shared.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tollgate_core::{CapabilityName, HandlerFailure, TrustContext};
use tollgate_registry::ToolHandler;

/// Configuration for cloud inventory handlers.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// Resource-manager API base, e.g. `https://management.example.com`.
    pub api_base: String,
    /// Bearer token presented to the API.
    pub token: String,
    /// Subscription used when the invocation does not name one.
    pub default_subscription: Option<String>,
    /// API version query parameter.
    pub api_version: String,
    /// Per-call HTTP timeout.
    pub timeout: Duration,
}

impl CloudConfig {
    /// Creates a config with the conventional API version and timeout.
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            token: token.into(),
            default_subscription: None,
            api_version: "2024-03-01".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the default subscription.
    pub fn with_default_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.default_subscription = Some(subscription.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct ResourceGroupListWire {
    #[serde(default)]
    value: Vec<ResourceGroupWire>,
}

#[derive(Debug, Deserialize)]
struct ResourceGroupWire {
    name: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

fn translate_reqwest(e: reqwest::Error) -> HandlerFailure {
    if e.is_timeout() {
        HandlerFailure::timeout(format!("cloud API call timed out: {e}"))
    } else {
        HandlerFailure::external(format!("cloud API call failed: {e}"))
    }
}

/// `cloud.listResourceGroups` — list resource groups in a subscription.
///
/// Arguments: `{ "subscription": "<id>" }`, optional when the handler is
/// configured with a default.
pub struct ListResourceGroups {
    config: CloudConfig,
    client: reqwest::Client,
}

impl ListResourceGroups {
    /// Creates the handler; the HTTP client carries the configured timeout.
    pub fn new(config: CloudConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }
}

#[async_trait]
impl ToolHandler for ListResourceGroups {
    fn capability(&self) -> CapabilityName {
        CapabilityName::new("cloud.listResourceGroups")
    }

    fn description(&self) -> &str {
        "List resource groups in a cloud subscription"
    }

    async fn invoke(
        &self,
        arguments: Value,
        ctx: &TrustContext,
    ) -> Result<Value, HandlerFailure> {
        let subscription = arguments
            .get("subscription")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.config.default_subscription.clone())
            .ok_or_else(|| {
                HandlerFailure::invalid_arguments(
                    "subscription is required (no default configured)",
                )
            })?;

        tracing::debug!(
            tenant = %ctx.tenant_id,
            subscription = %subscription,
            "Listing resource groups"
        );

        let url = format!(
            "{}/subscriptions/{subscription}/resourcegroups",
            self.config.api_base.trim_end_matches('/')
        );
        let response = self
            .client
            .get(&url)
            .query(&[("api-version", self.config.api_version.as_str())])
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(translate_reqwest)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(HandlerFailure::external(format!(
                "cloud API returned {status}: {body}"
            )));
        }

        let wire: ResourceGroupListWire = response.json().await.map_err(translate_reqwest)?;
        let groups: Vec<Value> = wire
            .value
            .into_iter()
            .map(|g| {
                json!({
                    "name": g.name,
                    "location": g.location,
                    "id": g.id,
                })
            })
            .collect();

        Ok(json!({ "subscription": subscription, "resource_groups": groups }))
    }
}
