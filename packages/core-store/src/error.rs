//! Error types for the store layer.

use nodestate_host::{HostError, NodeId};

/// Errors raised by store operations.
///
/// Validation errors ([`InvalidKey`](Error::InvalidKey),
/// [`InvalidTarget`](Error::InvalidTarget),
/// [`MissingTarget`](Error::MissingTarget)) are always returned to the
/// caller synchronously. Text that fails to parse is not an error: it is
/// handed back as a raw string.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The state key was empty.
    #[error("state key must be a non-empty string")]
    InvalidKey,

    /// The target handle does not name a node that can hold state.
    #[error("invalid target: {0}")]
    InvalidTarget(NodeId),

    /// A scoped operation had no target other than the root.
    #[error("scoped state needs an explicit target (or allow_root_scope)")]
    MissingTarget,

    /// The host has no frame clock, so writes cannot be batched.
    #[error("frame clock unavailable; writes cannot be batched")]
    SchedulerUnavailable,

    /// A value could not be encoded to text.
    #[error("encode error: {message}")]
    Encode { message: String },

    /// Stored state could not be decoded into the requested type.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Any other host failure.
    #[error("host error: {0}")]
    Host(#[source] HostError),
}

impl Error {
    /// Create an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Error::Encode {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
        }
    }
}

impl From<HostError> for Error {
    fn from(e: HostError) -> Self {
        match e {
            HostError::UnknownNode(node) | HostError::NotAnElement(node) => {
                Error::InvalidTarget(node)
            }
            HostError::ClockUnavailable => Error::SchedulerUnavailable,
            other => Error::Host(other),
        }
    }
}

/// Result alias for store operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use nodestate_host::ObserverId;
    use std::error::Error as StdError;

    #[test]
    fn invalid_key_display() {
        assert_eq!(
            format!("{}", Error::InvalidKey),
            "state key must be a non-empty string"
        );
    }

    #[test]
    fn invalid_target_display() {
        let e = Error::InvalidTarget(NodeId::from_raw(12));
        assert!(format!("{}", e).contains("node#12"));
    }

    #[test]
    fn decode_error_display() {
        let e = Error::decode("expected u32");
        let display = format!("{}", e);
        assert!(display.contains("decode error"));
        assert!(display.contains("expected u32"));
    }

    #[test]
    fn node_errors_become_invalid_target() {
        let node = NodeId::from_raw(3);
        assert!(matches!(
            Error::from(HostError::UnknownNode(node)),
            Error::InvalidTarget(n) if n == node
        ));
        assert!(matches!(
            Error::from(HostError::NotAnElement(node)),
            Error::InvalidTarget(n) if n == node
        ));
    }

    #[test]
    fn clock_error_becomes_scheduler_unavailable() {
        assert!(matches!(
            Error::from(HostError::ClockUnavailable),
            Error::SchedulerUnavailable
        ));
    }

    #[test]
    fn host_error_source() {
        let e = Error::from(HostError::UnknownObserver(ObserverId::from_raw(1)));
        assert!(matches!(e, Error::Host(_)));
        assert!(StdError::source(&e).is_some());
        assert!(StdError::source(&Error::InvalidKey).is_none());
    }
}
