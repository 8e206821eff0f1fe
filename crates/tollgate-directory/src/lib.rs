//! # tollgate-directory
//!
//! The tenant directory: resolves chat channels to tenants and tenants to
//! backend addresses. Lookups are pure reads against an immutable
//! [`RoutingTable`] snapshot; reconfiguration replaces the whole table
//! atomically so no request ever observes a partial edit.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod config;
pub mod directory;
pub mod table;

pub use config::RoutingConfig;
pub use directory::TenantDirectory;
pub use table::{RoutingTable, TenantEntry};
