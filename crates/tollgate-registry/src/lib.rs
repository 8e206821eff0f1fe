//! # tollgate-registry
//!
//! The capability registry: the [`ToolHandler`] contract every tool
//! implements, the per-tenant [`CapabilityRegistry`] that scopes which
//! handlers a backend will resolve, and the static [`HandlerManifest`]
//! that makes the global name→handler mapping enumerable and testable.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod handler;
pub mod manifest;
pub mod registry;

pub use handler::ToolHandler;
pub use manifest::{HandlerFactory, HandlerManifest};
pub use registry::CapabilityRegistry;
