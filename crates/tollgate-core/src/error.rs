//! Error taxonomy for Tollgate.
//!
//! Every fault in the system falls into one of a small number of classes
//! with distinct audiences: client errors go back to the chat user with an
//! actionable message, configuration errors are operator-facing and render
//! as a generic "service unavailable", transport errors may be retried a
//! bounded number of times, and handler errors pass through largely
//! verbatim because they are domain-meaningful.

use crate::ids::{CapabilityName, ChannelId, TenantId};

/// Broad classification of an [`Error`], matching its audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caused by the caller; actionable message goes back to the user.
    Client,
    /// Administrative inconsistency; operator-facing, generic to the user.
    Configuration,
    /// Network or timeout failure between components.
    Transport,
}

/// Errors raised by the dispatch and backend layers.
///
/// Handler business-logic failures are not represented here; they travel
/// inside the response envelope as [`crate::envelope::HandlerFailure`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Inbound payload or command text could not be understood.
    #[error("malformed command: {message}")]
    MalformedCommand {
        /// What was wrong with the input.
        message: String,
    },

    /// The channel has no tenant binding.
    #[error("channel not registered: {channel}")]
    UnknownChannel {
        /// The unbound channel.
        channel: ChannelId,
    },

    /// A resolved tenant has no backend address — an administrative
    /// inconsistency, distinct from an unknown channel.
    #[error("no backend configured for tenant: {tenant}")]
    UnknownTenant {
        /// The tenant missing a backend entry.
        tenant: TenantId,
    },

    /// Invalid or inconsistent configuration.
    #[error("configuration error: {message}")]
    Config {
        /// What configuration is problematic.
        message: String,
    },

    /// A capability name was registered twice in one registry.
    #[error("capability already registered: {capability}")]
    RegistrationConflict {
        /// The conflicting capability name.
        capability: CapabilityName,
    },

    /// Network or timeout failure forwarding to a backend or an
    /// external system.
    #[error("transport failure: {message}")]
    Transport {
        /// Human-readable description of the failure.
        message: String,
        /// Whether the operation is safe to retry.
        retryable: bool,
    },

    /// A request reached a backend without a valid trust context.
    #[error("trust context rejected: {message}")]
    Untrusted {
        /// Why the context was rejected.
        message: String,
    },

    /// I/O error (config files, sockets).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience `Result` type alias for Tollgate operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a malformed-command error.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Error::MalformedCommand {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a transport error, marking whether a retry is safe.
    pub fn transport<S: Into<String>>(message: S, retryable: bool) -> Self {
        Error::Transport {
            message: message.into(),
            retryable,
        }
    }

    /// Creates an untrusted-request error.
    pub fn untrusted<S: Into<String>>(message: S) -> Self {
        Error::Untrusted {
            message: message.into(),
        }
    }

    /// Classifies the error by audience.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedCommand { .. } | Error::UnknownChannel { .. } => ErrorKind::Client,
            Error::UnknownTenant { .. }
            | Error::Config { .. }
            | Error::RegistrationConflict { .. } => ErrorKind::Configuration,
            Error::Untrusted { .. } => ErrorKind::Client,
            Error::Transport { .. } | Error::Io(_) => ErrorKind::Transport,
            Error::Serialization(_) => ErrorKind::Configuration,
        }
    }

    /// Returns whether the failed operation is safe to retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { retryable, .. } => *retryable,
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Renders the message shown to the chat user.
    ///
    /// Client errors carry their actionable detail; everything else is
    /// deliberately generic so tenant-isolated or operational detail never
    /// leaks into a channel.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Client => self.to_string(),
            ErrorKind::Configuration => "service unavailable, the operators have been notified"
                .to_string(),
            ErrorKind::Transport => {
                "the backend did not respond, please try again shortly".to_string()
            }
        }
    }
}
