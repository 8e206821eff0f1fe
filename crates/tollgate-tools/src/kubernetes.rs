//! Kubernetes handlers backed by `kubectl`.
//!
//! Read-only cluster inspection: list pods in a namespace, describe one
//! pod. Output is requested as JSON and reduced to compact structures so
//! chat rendering stays small.

use crate::exec::run_checked;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tollgate_core::{CapabilityName, HandlerFailure, TrustContext};
use tollgate_registry::ToolHandler;

/// Shared configuration for kubectl-backed handlers.
#[derive(Debug, Clone)]
pub struct KubectlConfig {
    /// kubectl binary to invoke.
    pub kubectl_path: String,
    /// Namespace used when the invocation does not name one.
    pub default_namespace: String,
    /// Per-invocation subprocess timeout.
    pub timeout: Duration,
}

impl Default for KubectlConfig {
    fn default() -> Self {
        Self {
            kubectl_path: "kubectl".to_string(),
            default_namespace: "default".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// kubectl verbs the handlers may issue. All read-only.
const ALLOWED_VERBS: &[&str] = &["get", "describe", "logs", "top", "version"];

/// Runs kubectl with the configured binary and timeout, gating the verb.
///
/// A disallowed verb is an internal failure: handlers in this module
/// construct their own argument lists, so hitting the gate means a bug,
/// not bad user input.
async fn kubectl(config: &KubectlConfig, args: &[&str]) -> Result<String, HandlerFailure> {
    match args.first() {
        Some(verb) if ALLOWED_VERBS.contains(verb) => {}
        other => {
            return Err(HandlerFailure::internal(format!(
                "kubectl verb not allowed: {}",
                other.copied().unwrap_or("(none)")
            )));
        }
    }
    run_checked(&config.kubectl_path, args, config.timeout).await
}

fn namespace_from(arguments: &Value, config: &KubectlConfig) -> String {
    arguments
        .get("ns")
        .and_then(Value::as_str)
        .unwrap_or(&config.default_namespace)
        .to_string()
}

#[derive(Debug, Deserialize)]
struct PodListWire {
    #[serde(default)]
    items: Vec<PodWire>,
}

#[derive(Debug, Deserialize)]
struct PodWire {
    metadata: PodMetadata,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Debug, Deserialize)]
struct PodMetadata {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PodStatus {
    #[serde(default)]
    phase: Option<String>,
}

/// `k8s.listPods` — list pods in a namespace.
///
/// Arguments: `{ "ns": "<namespace>" }`, namespace optional.
pub struct ListPods {
    config: KubectlConfig,
}

impl ListPods {
    /// Creates the handler with the given kubectl configuration.
    pub fn new(config: KubectlConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolHandler for ListPods {
    fn capability(&self) -> CapabilityName {
        CapabilityName::new("k8s.listPods")
    }

    fn description(&self) -> &str {
        "List pods in a namespace"
    }

    async fn invoke(
        &self,
        arguments: Value,
        ctx: &TrustContext,
    ) -> Result<Value, HandlerFailure> {
        let ns = namespace_from(&arguments, &self.config);
        tracing::debug!(tenant = %ctx.tenant_id, namespace = %ns, "Listing pods");

        let stdout = kubectl(&self.config, &["get", "pods", "-n", &ns, "-o", "json"]).await?;

        let wire: PodListWire = serde_json::from_str(&stdout)
            .map_err(|e| HandlerFailure::external(format!("unparseable kubectl output: {e}")))?;

        let pods: Vec<Value> = wire
            .items
            .into_iter()
            .map(|pod| {
                json!({
                    "name": pod.metadata.name,
                    "phase": pod.status.phase.unwrap_or_else(|| "Unknown".to_string()),
                })
            })
            .collect();

        Ok(json!({ "namespace": ns, "pods": pods }))
    }
}

/// `k8s.describePod` — full JSON description of one pod.
///
/// Arguments: `{ "name": "<pod>", "ns": "<namespace>" }`, name required.
pub struct DescribePod {
    config: KubectlConfig,
}

impl DescribePod {
    /// Creates the handler with the given kubectl configuration.
    pub fn new(config: KubectlConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolHandler for DescribePod {
    fn capability(&self) -> CapabilityName {
        CapabilityName::new("k8s.describePod")
    }

    fn description(&self) -> &str {
        "Describe a single pod"
    }

    async fn invoke(
        &self,
        arguments: Value,
        ctx: &TrustContext,
    ) -> Result<Value, HandlerFailure> {
        let name = arguments
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerFailure::invalid_arguments("name is required"))?
            .to_string();
        let ns = namespace_from(&arguments, &self.config);
        tracing::debug!(tenant = %ctx.tenant_id, pod = %name, namespace = %ns, "Describing pod");

        let stdout = kubectl(&self.config, &["get", "pod", &name, "-n", &ns, "-o", "json"]).await?;

        serde_json::from_str(&stdout)
            .map_err(|e| HandlerFailure::external(format!("unparseable kubectl output: {e}")))
    }
}
