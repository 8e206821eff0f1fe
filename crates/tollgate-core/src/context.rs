//! Per-request trust context.
//!
//! The dispatcher is the single trusted ingress: it resolves the tenant
//! once, builds a [`TrustContext`], and injects it as request headers.
//! Backends parse the headers once at the middleware boundary and thread
//! the value through by reference; no layer re-derives identity.

use crate::error::{Error, Result};
use crate::ids::{ChannelId, RequestId, TenantId};
use serde::{Deserialize, Serialize};

/// Header carrying the resolved tenant id.
pub const HEADER_TENANT: &str = "x-tollgate-tenant";
/// Header carrying the originating channel id.
pub const HEADER_CHANNEL: &str = "x-tollgate-channel";
/// Header carrying the invoking chat user id.
pub const HEADER_USER: &str = "x-tollgate-user";
/// Header carrying the correlation request id.
pub const HEADER_REQUEST: &str = "x-tollgate-request";
/// Header carrying the shared dispatcher secret, when one is configured.
pub const HEADER_GATEWAY_TOKEN: &str = "x-tollgate-gateway";

/// Ephemeral per-request trust assertion.
///
/// Created by the dispatcher after tenant resolution, discarded when the
/// request completes. Never shared between in-flight requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustContext {
    /// Correlation id for this dispatch.
    pub request_id: RequestId,
    /// The tenant the originating channel is bound to.
    pub tenant_id: TenantId,
    /// The channel the command came from.
    pub channel_id: ChannelId,
    /// The chat user who invoked the command.
    pub user_id: String,
}

impl TrustContext {
    /// Builds a fresh context for a newly resolved command.
    pub fn new(
        tenant_id: TenantId,
        channel_id: ChannelId,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            request_id: RequestId::new(),
            tenant_id,
            channel_id,
            user_id: user_id.into(),
        }
    }

    /// Returns the header name/value pairs the dispatcher injects.
    pub fn header_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (HEADER_TENANT, self.tenant_id.to_string()),
            (HEADER_CHANNEL, self.channel_id.to_string()),
            (HEADER_USER, self.user_id.clone()),
            (HEADER_REQUEST, self.request_id.to_string()),
        ]
    }

    /// Reconstructs a context from a header lookup function.
    ///
    /// `get` receives a lowercase header name and returns its value if
    /// present. All four trust headers are required; a backend must never
    /// accept a request missing any of them.
    pub fn from_header_lookup<'a, F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let require = |name: &str| -> Result<&'a str> {
            get(name).ok_or_else(|| Error::untrusted(format!("missing header {name}")))
        };

        let tenant = require(HEADER_TENANT)?;
        let channel = require(HEADER_CHANNEL)?;
        let user = require(HEADER_USER)?;
        let request = require(HEADER_REQUEST)?;

        let request_id = request
            .parse::<RequestId>()
            .map_err(|_| Error::untrusted(format!("invalid header {HEADER_REQUEST}")))?;

        Ok(Self {
            request_id,
            tenant_id: TenantId::new(tenant),
            channel_id: ChannelId::new(channel),
            user_id: user.to_string(),
        })
    }
}

/// Length-guarded constant-time string comparison.
///
/// Used for every shared-secret check (platform verification token,
/// gateway token) so comparison time does not depend on where the first
/// mismatching byte sits.
pub fn constant_eq(presented: &str, expected: &str) -> bool {
    let a = presented.as_bytes();
    let b = expected.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
