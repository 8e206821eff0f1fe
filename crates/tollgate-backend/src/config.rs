//! Backend configuration.
//!
//! A backend process serves exactly one tenant, fixed for its lifetime.
//! The tenant identity is an explicit configuration value handed to the
//! server constructor — nothing reads ambient state during request
//! handling.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tollgate_core::{Error, Result, TenantId};

/// Token-bucket rate limit options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained requests per minute per channel.
    pub per_minute: u32,
    /// Burst allowance per channel.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: 30,
            burst: 5,
        }
    }
}

/// Everything a backend server needs at construction.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// The tenant this backend serves.
    pub tenant_id: TenantId,
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Shared secret the dispatcher presents; `None` disables the check
    /// (trust headers are still required).
    pub gateway_token: Option<String>,
    /// Bound on each handler invocation.
    pub handler_timeout: Duration,
    /// Per-channel rate limit; `None` disables the stage.
    pub rate_limit: Option<RateLimitConfig>,
}

impl BackendConfig {
    /// Creates a config with conventional defaults for a tenant.
    pub fn new(tenant_id: TenantId, bind_addr: SocketAddr) -> Self {
        Self {
            tenant_id,
            bind_addr,
            gateway_token: None,
            handler_timeout: Duration::from_secs(30),
            rate_limit: Some(RateLimitConfig::default()),
        }
    }
}

/// Serde model of the backend TOML file.
///
/// ```toml
/// tenant_id = "cust01"
/// bind_addr = "127.0.0.1:9001"
/// gateway_token = "shared-secret"
/// handler_timeout_secs = 30
///
/// [rate_limit]
/// per_minute = 30
/// burst = 5
///
/// [capabilities.k8s]
/// default_namespace = "cust01"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BackendFileConfig {
    /// The tenant this backend serves.
    pub tenant_id: String,
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Shared dispatcher secret.
    #[serde(default)]
    pub gateway_token: Option<String>,
    /// Bound on each handler invocation, in seconds.
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
    /// Per-channel rate limit; omit to disable.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    /// Free-form per-capability configuration, consumed by whoever
    /// assembles the handler manifest.
    #[serde(default)]
    pub capabilities: toml::Table,
}

fn default_handler_timeout_secs() -> u64 {
    30
}

impl BackendFileConfig {
    /// Parses a backend config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config(format!("invalid backend config: {e}")))
    }

    /// Loads and parses a backend config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Converts to the runtime [`BackendConfig`].
    pub fn into_config(self) -> BackendConfig {
        BackendConfig {
            tenant_id: TenantId::new(self.tenant_id),
            bind_addr: self.bind_addr,
            gateway_token: self.gateway_token,
            handler_timeout: Duration::from_secs(self.handler_timeout_secs),
            rate_limit: self.rate_limit,
        }
    }
}
