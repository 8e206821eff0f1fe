//! Per-tenant capability registry.

use crate::handler::ToolHandler;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tollgate_core::{CapabilityName, Error, Result};

/// The set of handlers one backend can resolve, scoped to its tenant.
///
/// Built once at startup and read-only thereafter. Resolution checks
/// "handler exists" and "name is in the tenant's allowed set" as one
/// operation whose two failure modes are indistinguishable to the caller:
/// a capability this tenant may not invoke looks exactly like a
/// capability that does not exist. This is an isolation boundary, not a
/// discoverability boundary — the distinction is logged for audit inside
/// the registry and goes no further.
pub struct CapabilityRegistry {
    handlers: BTreeMap<CapabilityName, Arc<dyn ToolHandler>>,
    allowed: BTreeSet<CapabilityName>,
}

impl CapabilityRegistry {
    /// Starts building a registry for a tenant's allowed set.
    pub fn builder(allowed: BTreeSet<CapabilityName>) -> RegistryBuilder {
        RegistryBuilder {
            handlers: BTreeMap::new(),
            allowed,
        }
    }

    /// Resolves a capability to its handler.
    ///
    /// Returns `None` both for unknown names and for registered names
    /// outside the allowed set.
    pub fn resolve(&self, name: &CapabilityName) -> Option<Arc<dyn ToolHandler>> {
        match self.handlers.get(name) {
            Some(handler) if self.allowed.contains(name) => Some(handler.clone()),
            Some(_) => {
                // Audit trail only; the response is identical to unknown.
                tracing::warn!(
                    target: "tollgate::audit",
                    capability = %name,
                    "isolation: capability exists but is not allowlisted"
                );
                None
            }
            None => None,
        }
    }

    /// The capability names this tenant can actually invoke
    /// (allowed and registered). Safe to expose: it reflects only what
    /// is already permitted.
    pub fn capability_names(&self) -> Vec<CapabilityName> {
        self.handlers
            .keys()
            .filter(|name| self.allowed.contains(*name))
            .cloned()
            .collect()
    }

    /// Number of registered handlers, allowed or not.
    pub fn registered_count(&self) -> usize {
        self.handlers.len()
    }
}

// Handlers are trait objects, so Debug is by name only.
impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("allowed", &self.allowed)
            .finish()
    }
}

/// Builder enforcing idempotent registration.
pub struct RegistryBuilder {
    handlers: BTreeMap<CapabilityName, Arc<dyn ToolHandler>>,
    allowed: BTreeSet<CapabilityName>,
}

impl RegistryBuilder {
    /// Registers a handler under its own capability name.
    ///
    /// Re-registering a name is rejected deterministically; it never
    /// silently duplicates or replaces.
    pub fn register(mut self, handler: Arc<dyn ToolHandler>) -> Result<Self> {
        let name = handler.capability();
        if self.handlers.contains_key(&name) {
            return Err(Error::RegistrationConflict { capability: name });
        }
        self.handlers.insert(name, handler);
        Ok(self)
    }

    /// Finalizes the registry.
    pub fn build(self) -> CapabilityRegistry {
        CapabilityRegistry {
            handlers: self.handlers,
            allowed: self.allowed,
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("allowed", &self.allowed)
            .finish()
    }
}
