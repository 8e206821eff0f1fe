//! # tollgate-core
//!
//! Core types shared across the Tollgate workspace:
//! - Identifier newtypes (tenants, channels, capabilities, requests)
//! - The per-request trust context and its header encoding
//! - Wire envelopes exchanged between the dispatcher and backends
//! - The error taxonomy every layer reports against

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod context;
pub mod envelope;
pub mod error;
pub mod ids;

pub use context::TrustContext;
pub use envelope::{
    CommandReply, FailureKind, HandlerFailure, InvocationRequest, InvocationResponse, ReplyType,
};
pub use error::{Error, ErrorKind, Result};
pub use ids::{CapabilityName, ChannelId, RequestId, TenantId};
