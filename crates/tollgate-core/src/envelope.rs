//! Wire envelopes between the dispatcher, backends, and the chat platform.
//!
//! The dispatcher forwards an [`InvocationRequest`] (JSON body) plus the
//! trust headers; backends answer with an [`InvocationResponse`]. The
//! dispatcher renders either into a [`CommandReply`] the chat platform
//! displays.

use crate::ids::CapabilityName;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A structured tool invocation, independent of transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// The capability to invoke.
    pub capability: CapabilityName,
    /// Structured arguments for the handler.
    #[serde(default)]
    pub arguments: Value,
}

impl InvocationRequest {
    /// Creates an invocation for a capability with the given arguments.
    pub fn new(capability: impl Into<CapabilityName>, arguments: Value) -> Self {
        Self {
            capability: capability.into(),
            arguments,
        }
    }
}

/// Classification of a handler failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The arguments did not satisfy the handler's contract.
    InvalidArguments,
    /// An external system the handler depends on failed.
    External,
    /// The handler exceeded its execution timeout.
    Timeout,
    /// A bug or unexpected state inside the handler.
    Internal,
    /// The capability is not available on this backend.
    ///
    /// Deliberately covers both "does not exist" and "not allowlisted":
    /// the two are indistinguishable outside the registry.
    UnknownCapability,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::InvalidArguments => "invalid_arguments",
            FailureKind::External => "external",
            FailureKind::Timeout => "timeout",
            FailureKind::Internal => "internal",
            FailureKind::UnknownCapability => "unknown_capability",
        };
        write!(f, "{s}")
    }
}

/// A typed handler failure carried inside the response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerFailure {
    /// What class of failure occurred.
    pub kind: FailureKind,
    /// Human-readable description, shown to the chat user for
    /// domain-meaningful failures.
    pub message: String,
}

impl HandlerFailure {
    /// Creates a failure of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an invalid-arguments failure.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidArguments, message)
    }

    /// Creates an external-system failure.
    pub fn external(message: impl Into<String>) -> Self {
        Self::new(FailureKind::External, message)
    }

    /// Creates a timeout failure.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    /// Creates an internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }

    /// The failure returned for a capability this backend does not serve.
    ///
    /// The same value is produced for a nonexistent capability and for a
    /// known capability outside the tenant's allowed set.
    pub fn unknown_capability(name: &CapabilityName) -> Self {
        Self::new(
            FailureKind::UnknownCapability,
            format!("unknown tool: {name}"),
        )
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// The normalized backend response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    /// Whether the invocation succeeded.
    pub ok: bool,
    /// Handler result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure detail when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HandlerFailure>,
}

impl InvocationResponse {
    /// Builds a success envelope.
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    /// Builds a failure envelope.
    pub fn failure(failure: HandlerFailure) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(failure),
        }
    }
}

/// How a chat reply is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyType {
    /// Visible only to the invoking user.
    Ephemeral,
    /// Visible to the whole channel.
    InChannel,
}

/// The payload the chat platform renders back to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    /// Display scope of the reply.
    pub response_type: ReplyType,
    /// Rendered reply text.
    pub text: String,
}

impl CommandReply {
    /// Builds a reply with the given display scope.
    pub fn new(response_type: ReplyType, text: impl Into<String>) -> Self {
        Self {
            response_type,
            text: text.into(),
        }
    }

    /// Builds an ephemeral reply (the conventional scope for errors).
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self::new(ReplyType::Ephemeral, text)
    }
}
