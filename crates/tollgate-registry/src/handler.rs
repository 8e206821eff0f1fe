//! The tool handler contract.

use async_trait::async_trait;
use serde_json::Value;
use tollgate_core::{CapabilityName, HandlerFailure, TrustContext};

/// One invocable capability.
///
/// Handlers are stateless per call: `invoke` takes the structured
/// arguments and the request's trust context and produces a structured
/// result or a typed [`HandlerFailure`]. Any external I/O a handler
/// performs must be wrapped in an explicit timeout and translated into a
/// typed failure — an external system error is not an internal bug, and
/// neither is a bad argument.
///
/// Handlers are reusable across tenants; only their configuration
/// (credentials, resource scope) varies per tenant.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The capability name this handler serves.
    fn capability(&self) -> CapabilityName;

    /// One-line human description, surfaced by introspection.
    fn description(&self) -> &str;

    /// Executes the capability.
    async fn invoke(
        &self,
        arguments: Value,
        ctx: &TrustContext,
    ) -> Result<Value, HandlerFailure>;
}
