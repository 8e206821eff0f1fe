//! # tollgate-tools
//!
//! Concrete [`ToolHandler`] implementations. Each handler serves one
//! capability and wraps its external I/O (subprocess, REST call) in an
//! explicit timeout with typed failure translation. Handlers are
//! reusable across tenants; only their configuration differs.
//!
//! [`ToolHandler`]: tollgate_registry::ToolHandler

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cloud;
pub mod exec;
pub mod kubernetes;
pub mod workflow;

pub use cloud::{CloudConfig, ListResourceGroups};
pub use kubernetes::{DescribePod, KubectlConfig, ListPods};
pub use workflow::{TriggerFlow, WorkflowConfig};
