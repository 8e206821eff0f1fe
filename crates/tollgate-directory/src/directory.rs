//! The live tenant directory.

use crate::table::RoutingTable;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tollgate_core::{ChannelId, Error, Result, TenantId};

/// Resolves channels to tenants and tenants to backend addresses.
///
/// Internally holds the current [`RoutingTable`] behind an [`ArcSwap`]:
/// lookups load a consistent snapshot without locking, and [`reload`]
/// replaces the whole table in one atomic step. An in-flight request
/// keeps the snapshot it started with.
///
/// [`reload`]: TenantDirectory::reload
#[derive(Debug)]
pub struct TenantDirectory {
    table: ArcSwap<RoutingTable>,
}

impl TenantDirectory {
    /// Creates a directory serving the given table.
    pub fn new(table: RoutingTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
        }
    }

    /// Resolves the tenant a channel is bound to.
    ///
    /// An unbound channel is a client-addressable error, never a silent
    /// default.
    pub fn resolve_tenant(&self, channel: &ChannelId) -> Result<TenantId> {
        self.table
            .load()
            .tenant_for_channel(channel)
            .cloned()
            .ok_or_else(|| Error::UnknownChannel {
                channel: channel.clone(),
            })
    }

    /// Resolves a tenant's backend base URL.
    ///
    /// A missing entry here is an administrative inconsistency, distinct
    /// from an unknown channel.
    pub fn resolve_backend(&self, tenant: &TenantId) -> Result<String> {
        self.table
            .load()
            .tenant_entry(tenant)
            .map(|entry| entry.backend_url.clone())
            .ok_or_else(|| Error::UnknownTenant {
                tenant: tenant.clone(),
            })
    }

    /// Replaces the routing table atomically.
    ///
    /// Requests already holding the old snapshot complete against it;
    /// new requests see the new table.
    pub fn reload(&self, table: RoutingTable) {
        tracing::info!(
            channels = table.channel_count(),
            tenants = table.tenant_count(),
            "Routing table reloaded"
        );
        self.table.store(Arc::new(table));
    }

    /// Returns the current table snapshot (for operator introspection).
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.table.load_full()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::table::TenantEntry;
    use std::collections::HashMap;

    fn directory() -> TenantDirectory {
        let channels = HashMap::from([(ChannelId::new("c1"), TenantId::new("cust01"))]);
        let tenants = HashMap::from([(
            TenantId::new("cust01"),
            TenantEntry::new("http://localhost:9001", ["k8s.listPods"]),
        )]);
        TenantDirectory::new(RoutingTable::new(channels, tenants).unwrap())
    }

    #[test]
    fn test_resolve_bound_channel() {
        let dir = directory();
        let tenant = dir.resolve_tenant(&ChannelId::new("c1")).unwrap();
        assert_eq!(tenant, TenantId::new("cust01"));
    }

    #[test]
    fn test_resolve_unknown_channel_is_distinct_error() {
        let dir = directory();
        let err = dir.resolve_tenant(&ChannelId::new("c2")).unwrap_err();
        assert!(matches!(err, Error::UnknownChannel { .. }));
    }

    #[test]
    fn test_resolve_backend() {
        let dir = directory();
        let url = dir.resolve_backend(&TenantId::new("cust01")).unwrap();
        assert_eq!(url, "http://localhost:9001");
    }

    #[test]
    fn test_resolve_unknown_tenant_is_distinct_error() {
        let dir = directory();
        let err = dir.resolve_backend(&TenantId::new("ghost")).unwrap_err();
        assert!(matches!(err, Error::UnknownTenant { .. }));
    }

    #[test]
    fn test_reload_swaps_whole_table() {
        let dir = directory();

        let channels = HashMap::from([(ChannelId::new("c9"), TenantId::new("cust09"))]);
        let tenants = HashMap::from([(
            TenantId::new("cust09"),
            TenantEntry::new("http://localhost:9009", ["workflow.trigger"]),
        )]);
        dir.reload(RoutingTable::new(channels, tenants).unwrap());

        // Old binding gone, new binding visible.
        assert!(dir.resolve_tenant(&ChannelId::new("c1")).is_err());
        assert_eq!(
            dir.resolve_tenant(&ChannelId::new("c9")).unwrap(),
            TenantId::new("cust09")
        );
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let dir = directory();
        let before = dir.snapshot();
        dir.reload(RoutingTable::default());
        // The held snapshot still resolves the old binding.
        assert!(
            before
                .tenant_for_channel(&ChannelId::new("c1"))
                .is_some()
        );
    }
}
