//! Handler manifest assembly from backend configuration.
//!
//! The `[capabilities.*]` sections of a backend config enable handler
//! families and carry their settings. Each recognized section
//! contributes its handlers to the manifest and its capability names to
//! the tenant's allowed set; an unrecognized section is a configuration
//! fault, never silently ignored.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tollgate_core::{CapabilityName, Error, Result};
use tollgate_registry::HandlerManifest;
use tollgate_tools::{
    CloudConfig, DescribePod, KubectlConfig, ListPods, ListResourceGroups, TriggerFlow,
    WorkflowConfig,
};

#[derive(Debug, Deserialize)]
struct K8sSection {
    #[serde(default = "default_kubectl_path")]
    kubectl_path: String,
    #[serde(default = "default_namespace")]
    default_namespace: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct CloudSection {
    api_base: String,
    token: String,
    #[serde(default)]
    default_subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkflowSection {
    api_url: String,
    api_key: String,
}

fn default_kubectl_path() -> String {
    "kubectl".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn parse_section<T: serde::de::DeserializeOwned>(name: &str, value: &toml::Value) -> Result<T> {
    value
        .clone()
        .try_into()
        .map_err(|e| Error::config(format!("invalid [capabilities.{name}] section: {e}")))
}

/// Builds the handler manifest and allowed set a backend config enables.
pub fn assemble(
    capabilities: &toml::Table,
) -> Result<(HandlerManifest, BTreeSet<CapabilityName>)> {
    let mut manifest = HandlerManifest::new();
    let mut allowed = BTreeSet::new();

    for (name, value) in capabilities {
        match name.as_str() {
            "k8s" => {
                let section: K8sSection = parse_section(name, value)?;
                let config = KubectlConfig {
                    kubectl_path: section.kubectl_path,
                    default_namespace: section.default_namespace,
                    timeout: Duration::from_secs(section.timeout_secs),
                };
                let list_config = config.clone();
                manifest = manifest
                    .with("k8s.listPods", move || {
                        Arc::new(ListPods::new(list_config.clone()))
                    })?
                    .with("k8s.describePod", move || {
                        Arc::new(DescribePod::new(config.clone()))
                    })?;
                allowed.insert(CapabilityName::new("k8s.listPods"));
                allowed.insert(CapabilityName::new("k8s.describePod"));
            }
            "cloud" => {
                let section: CloudSection = parse_section(name, value)?;
                let mut config = CloudConfig::new(section.api_base, section.token);
                if let Some(subscription) = section.default_subscription {
                    config = config.with_default_subscription(subscription);
                }
                manifest = manifest.with("cloud.listResourceGroups", move || {
                    Arc::new(ListResourceGroups::new(config.clone()))
                })?;
                allowed.insert(CapabilityName::new("cloud.listResourceGroups"));
            }
            "workflow" => {
                let section: WorkflowSection = parse_section(name, value)?;
                let config = WorkflowConfig::new(section.api_url, section.api_key);
                manifest = manifest.with("workflow.trigger", move || {
                    Arc::new(TriggerFlow::new(config.clone()))
                })?;
                allowed.insert(CapabilityName::new("workflow.trigger"));
            }
            other => {
                return Err(Error::config(format!(
                    "unknown capability section: {other}"
                )));
            }
        }
    }

    Ok((manifest, allowed))
}
