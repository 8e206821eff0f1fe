//! # tollgate-dispatcher
//!
//! The front door of a Tollgate deployment. Receives slash-command
//! payloads from the chat platform, resolves the originating channel to
//! a tenant and its backend, and forwards the invocation with the trust
//! headers backends require. The dispatcher is the only component that
//! talks to untrusted callers; everything behind it trusts the context
//! it injects.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod command;
pub mod config;
pub mod forward;
pub mod server;

pub use command::{SlashPayload, parse_command};
pub use config::{DispatcherConfig, DispatcherFileConfig};
pub use forward::{ForwardPolicy, Forwarder};
pub use server::DispatcherServer;
