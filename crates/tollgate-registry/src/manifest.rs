//! Static handler manifest.
//!
//! The global capability→handler mapping is an explicit, enumerable value
//! built at startup, not a discovery mechanism. A backend's registry is
//! constructed from the manifest plus its tenant's allowed set; asking
//! for an allowed capability the manifest does not know is a
//! configuration fault caught before the server starts.

use crate::handler::ToolHandler;
use crate::registry::CapabilityRegistry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tollgate_core::{CapabilityName, Error, Result};

/// Constructs one handler instance.
///
/// Factories capture tenant-specific configuration (credentials, target
/// resource scope) at manifest assembly time.
pub type HandlerFactory = Box<dyn Fn() -> Arc<dyn ToolHandler> + Send + Sync>;

/// Enumerable mapping from capability name to handler constructor.
#[derive(Default)]
pub struct HandlerManifest {
    factories: BTreeMap<CapabilityName, HandlerFactory>,
}

impl HandlerManifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler constructor under a capability name.
    ///
    /// Duplicate names are rejected, matching registry semantics.
    pub fn with<F>(mut self, name: impl Into<CapabilityName>, factory: F) -> Result<Self>
    where
        F: Fn() -> Arc<dyn ToolHandler> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::RegistrationConflict { capability: name });
        }
        self.factories.insert(name, Box::new(factory));
        Ok(self)
    }

    /// All capability names the manifest knows.
    pub fn names(&self) -> Vec<CapabilityName> {
        self.factories.keys().cloned().collect()
    }

    /// Builds a tenant-scoped registry.
    ///
    /// Every manifest handler is registered (so isolation is enforced by
    /// the allowed set, not by absence), and every allowed name must be
    /// known to the manifest — an allowed set referencing an unknown
    /// capability is an administrative inconsistency.
    pub fn build_registry(&self, allowed: &BTreeSet<CapabilityName>) -> Result<CapabilityRegistry> {
        for name in allowed {
            if !self.factories.contains_key(name) {
                return Err(Error::config(format!(
                    "allowed capability {name} is not in the handler manifest"
                )));
            }
        }

        let mut builder = CapabilityRegistry::builder(allowed.clone());
        for factory in self.factories.values() {
            builder = builder.register(factory())?;
        }
        Ok(builder.build())
    }
}

// Factories are opaque closures, so Debug is by name only.
impl fmt::Debug for HandlerManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerManifest")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
