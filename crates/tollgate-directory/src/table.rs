//! Immutable routing tables.

use std::collections::{BTreeSet, HashMap};
use tollgate_core::{CapabilityName, ChannelId, Error, Result, TenantId};

/// Everything the dispatcher knows about one tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantEntry {
    /// Base URL of the tenant's backend, e.g. `http://localhost:9001`.
    pub backend_url: String,
    /// Capability names this tenant is entitled to.
    pub capabilities: BTreeSet<CapabilityName>,
}

impl TenantEntry {
    /// Creates an entry for a backend with the given allowed capabilities.
    pub fn new<I, C>(backend_url: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CapabilityName>,
    {
        Self {
            backend_url: backend_url.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }
}

/// One consistent snapshot of channel bindings and tenant entries.
///
/// Tables are validated at construction and never mutated afterwards;
/// reconfiguration builds a new table and swaps it in wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingTable {
    channels: HashMap<ChannelId, TenantId>,
    tenants: HashMap<TenantId, TenantEntry>,
}

impl RoutingTable {
    /// Builds and validates a table from bindings and tenant entries.
    ///
    /// Fails with a configuration error when a channel is bound to a
    /// tenant that has no entry, or a tenant's backend URL is not an
    /// http(s) address.
    pub fn new(
        channels: HashMap<ChannelId, TenantId>,
        tenants: HashMap<TenantId, TenantEntry>,
    ) -> Result<Self> {
        for (channel, tenant) in &channels {
            if !tenants.contains_key(tenant) {
                return Err(Error::config(format!(
                    "channel {channel} is bound to undefined tenant {tenant}"
                )));
            }
        }
        for (tenant, entry) in &tenants {
            if !entry.backend_url.starts_with("http://")
                && !entry.backend_url.starts_with("https://")
            {
                return Err(Error::config(format!(
                    "tenant {tenant} has invalid backend url: {}",
                    entry.backend_url
                )));
            }
        }
        Ok(Self { channels, tenants })
    }

    /// Looks up the tenant a channel is bound to.
    pub fn tenant_for_channel(&self, channel: &ChannelId) -> Option<&TenantId> {
        self.channels.get(channel)
    }

    /// Looks up a tenant's entry.
    pub fn tenant_entry(&self, tenant: &TenantId) -> Option<&TenantEntry> {
        self.tenants.get(tenant)
    }

    /// Number of channel bindings in the table.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of tenants in the table.
    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    /// Iterates over channel bindings (for operator introspection).
    pub fn channels(&self) -> impl Iterator<Item = (&ChannelId, &TenantId)> {
        self.channels.iter()
    }

    /// Iterates over tenants (for operator introspection).
    pub fn tenants(&self) -> impl Iterator<Item = (&TenantId, &TenantEntry)> {
        self.tenants.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_table() -> RoutingTable {
        let channels = HashMap::from([
            (ChannelId::new("c1"), TenantId::new("cust01")),
            (ChannelId::new("c2"), TenantId::new("cust02")),
        ]);
        let tenants = HashMap::from([
            (
                TenantId::new("cust01"),
                TenantEntry::new("http://localhost:9001", ["k8s.listPods"]),
            ),
            (
                TenantId::new("cust02"),
                TenantEntry::new("http://localhost:9002", ["workflow.trigger"]),
            ),
        ]);
        RoutingTable::new(channels, tenants).unwrap()
    }

    #[test]
    fn test_lookup_bound_channel() {
        let table = sample_table();
        assert_eq!(
            table.tenant_for_channel(&ChannelId::new("c1")),
            Some(&TenantId::new("cust01"))
        );
    }

    #[test]
    fn test_lookup_unbound_channel_is_none() {
        let table = sample_table();
        assert_eq!(table.tenant_for_channel(&ChannelId::new("c-nope")), None);
    }

    #[test]
    fn test_binding_to_undefined_tenant_rejected() {
        let channels = HashMap::from([(ChannelId::new("c1"), TenantId::new("ghost"))]);
        let result = RoutingTable::new(channels, HashMap::new());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_non_http_backend_url_rejected() {
        let tenants = HashMap::from([(
            TenantId::new("cust01"),
            TenantEntry::new("localhost:9001", ["k8s.listPods"]),
        )]);
        let result = RoutingTable::new(HashMap::new(), tenants);
        assert!(result.is_err());
    }

    #[test]
    fn test_counts() {
        let table = sample_table();
        assert_eq!(table.channel_count(), 2);
        assert_eq!(table.tenant_count(), 2);
    }
}
