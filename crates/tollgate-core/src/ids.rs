//! Identifier newtypes for tenants, channels, capabilities, and requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier for a tenant (one customer with an isolated backend).
///
/// Tenant ids are human-assigned strings like `"cust01"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant id from a string.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Returns the tenant id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier for a chat channel as assigned by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(String);

impl ChannelId {
    /// Creates a channel id from a string.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Returns the channel id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of an invocable capability (a "tool"), e.g. `"k8s.listPods"`.
///
/// Dotted names are conventional: the segment before the first dot names
/// the handler family, the rest the operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapabilityName(String);

impl CapabilityName {
    /// Creates a capability name from a string.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Returns the capability name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CapabilityName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CapabilityName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for CapabilityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for one dispatched request.
///
/// Minted by the dispatcher when a command arrives, carried end to end
/// for log correlation. Internally a UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random request id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a request id from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_display() {
        let id = TenantId::new("cust01");
        assert_eq!(id.to_string(), "cust01");
        assert_eq!(id.as_str(), "cust01");
    }

    #[test]
    fn test_channel_id_from_str() {
        let id = ChannelId::from("xyb58qpifff3df9pytodz3hfra");
        assert_eq!(id.as_str(), "xyb58qpifff3df9pytodz3hfra");
    }

    #[test]
    fn test_capability_name_roundtrip_serialization() {
        let name = CapabilityName::new("k8s.listPods");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"k8s.listPods\"");
        let back: CapabilityName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn test_request_id_unique() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b, "Each new request id should be unique");
    }

    #[test]
    fn test_request_id_from_str() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_ids_usable_as_map_keys() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ChannelId::new("c1"), TenantId::new("t1"));
        assert_eq!(map.get(&ChannelId::new("c1")), Some(&TenantId::new("t1")));
    }
}
