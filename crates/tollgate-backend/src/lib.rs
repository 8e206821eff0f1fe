//! # tollgate-backend
//!
//! The backend server template. Every tenant backend is assembled the
//! same way — trust middleware, a fixed pipeline of request stages, the
//! invoke endpoint, and the standard introspection endpoints — around a
//! tenant-scoped capability registry. Tenant definitions are data (a
//! registry plus [`BackendConfig`] options), never a new server type.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod config;
pub mod introspect;
pub mod pipeline;
pub mod server;
pub mod trust;

pub use config::{BackendConfig, RateLimitConfig};
pub use pipeline::{AuditStage, Pipeline, RateLimitStage, Stage, StageReject};
pub use server::BackendServer;
pub use trust::TrustLayer;
