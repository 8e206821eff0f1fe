//! Routing configuration loading.
//!
//! The channel and tenant tables are plain TOML, loaded once at startup
//! and on explicit operator reload:
//!
//! ```toml
//! [channels]
//! "xyb58qpifff3df9pytodz3hfra" = "cust01"
//!
//! [tenants.cust01]
//! backend_url = "http://localhost:9001"
//! capabilities = ["k8s.listPods", "workflow.trigger"]
//! ```

use crate::table::{RoutingTable, TenantEntry};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tollgate_core::{Error, Result};

/// Serde model of the routing TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Channel id → tenant id bindings.
    #[serde(default)]
    pub channels: HashMap<String, String>,
    /// Tenant id → tenant definition.
    #[serde(default)]
    pub tenants: HashMap<String, TenantConfig>,
}

/// Serde model of one tenant definition.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantConfig {
    /// Base URL of the tenant's backend.
    pub backend_url: String,
    /// Capability names the tenant is entitled to.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl RoutingConfig {
    /// Parses a routing config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config(format!("invalid routing config: {e}")))
    }

    /// Loads and parses a routing config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Builds the validated routing table.
    pub fn into_table(self) -> Result<RoutingTable> {
        let channels = self
            .channels
            .into_iter()
            .map(|(channel, tenant)| (channel.into(), tenant.into()))
            .collect();
        let tenants = self
            .tenants
            .into_iter()
            .map(|(tenant, cfg)| {
                (
                    tenant.into(),
                    TenantEntry::new(cfg.backend_url, cfg.capabilities),
                )
            })
            .collect();
        RoutingTable::new(channels, tenants)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tollgate_core::{ChannelId, TenantId};

    const SAMPLE: &str = r#"
[channels]
"c1" = "cust01"
"c2" = "cust02"

[tenants.cust01]
backend_url = "http://localhost:9001"
capabilities = ["k8s.listPods", "k8s.describePod"]

[tenants.cust02]
backend_url = "http://localhost:9002"
capabilities = ["workflow.trigger"]
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = RoutingConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.tenants.len(), 2);

        let table = config.into_table().unwrap();
        assert_eq!(
            table.tenant_for_channel(&ChannelId::new("c1")),
            Some(&TenantId::new("cust01"))
        );
        let entry = table.tenant_entry(&TenantId::new("cust01")).unwrap();
        assert_eq!(entry.capabilities.len(), 2);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = RoutingConfig::from_toml("channels = 42").unwrap_err();
        assert!(err.to_string().contains("invalid routing config"));
    }

    #[test]
    fn test_dangling_binding_rejected_at_table_build() {
        let config = RoutingConfig::from_toml(
            r#"
[channels]
"c1" = "nobody"
"#,
        )
        .unwrap();
        assert!(config.into_table().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = RoutingConfig::load(file.path()).unwrap();
        assert_eq!(config.tenants.len(), 2);
    }
}
