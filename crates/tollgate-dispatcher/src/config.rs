//! Dispatcher configuration.

use crate::forward::ForwardPolicy;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tollgate_core::{Error, ReplyType, Result};

/// Everything the dispatcher server needs at construction.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Platform verification token; `None` disables the check.
    pub verification_token: Option<String>,
    /// Shared secret presented to backends; `None` sends no secret.
    pub gateway_token: Option<String>,
    /// Display scope for successful replies.
    pub reply_type: ReplyType,
    /// Reply length above which output is truncated with a marker.
    pub max_reply_chars: usize,
    /// Timeout and retry policy for backend forwarding.
    pub forward: ForwardPolicy,
}

impl DispatcherConfig {
    /// Creates a config with conventional defaults.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            verification_token: None,
            gateway_token: None,
            reply_type: ReplyType::Ephemeral,
            max_reply_chars: 3500,
            forward: ForwardPolicy::default(),
        }
    }
}

/// Serde model of the dispatcher TOML file.
///
/// ```toml
/// bind_addr = "127.0.0.1:8080"
/// routes = "routes.toml"
/// verification_token = "platform-token"
/// gateway_token = "shared-secret"
/// response_type = "in_channel"
/// max_reply_chars = 3500
/// forward_timeout_secs = 15
/// forward_retries = 2
/// forward_backoff_ms = 500
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherFileConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Path to the routing table file, resolved relative to the working
    /// directory.
    pub routes: PathBuf,
    /// Platform verification token.
    #[serde(default)]
    pub verification_token: Option<String>,
    /// Shared secret presented to backends.
    #[serde(default)]
    pub gateway_token: Option<String>,
    /// Display scope for successful replies.
    #[serde(default = "default_response_type")]
    pub response_type: ReplyType,
    /// Reply truncation threshold, in characters.
    #[serde(default = "default_max_reply_chars")]
    pub max_reply_chars: usize,
    /// Forward timeout, in seconds.
    #[serde(default = "default_forward_timeout_secs")]
    pub forward_timeout_secs: u64,
    /// Extra forward attempts after the first, connect failures only.
    #[serde(default = "default_forward_retries")]
    pub forward_retries: usize,
    /// Initial forward backoff, in milliseconds.
    #[serde(default = "default_forward_backoff_ms")]
    pub forward_backoff_ms: u64,
}

fn default_response_type() -> ReplyType {
    ReplyType::Ephemeral
}

fn default_max_reply_chars() -> usize {
    3500
}

fn default_forward_timeout_secs() -> u64 {
    15
}

fn default_forward_retries() -> usize {
    2
}

fn default_forward_backoff_ms() -> u64 {
    500
}

impl DispatcherFileConfig {
    /// Parses a dispatcher config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config(format!("invalid dispatcher config: {e}")))
    }

    /// Loads and parses a dispatcher config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Converts to the runtime [`DispatcherConfig`].
    ///
    /// The `routes` path is not consumed here; the caller loads the
    /// routing table separately.
    pub fn into_config(self) -> DispatcherConfig {
        DispatcherConfig {
            bind_addr: self.bind_addr,
            verification_token: self.verification_token,
            gateway_token: self.gateway_token,
            reply_type: self.response_type,
            max_reply_chars: self.max_reply_chars,
            forward: ForwardPolicy {
                timeout: Duration::from_secs(self.forward_timeout_secs),
                max_retries: self.forward_retries,
                initial_backoff: Duration::from_millis(self.forward_backoff_ms),
            },
        }
    }
}
