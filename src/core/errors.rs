/*!
 * Error Types
 * Transport and session errors with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw status codes, compatible with Zircon's `zx_status_t` values
pub mod status {
    pub const OK: i32 = 0;
    pub const INTERNAL: i32 = -1;
    pub const NOT_SUPPORTED: i32 = -2;
    pub const INVALID_ARGS: i32 = -10;
    pub const BAD_HANDLE: i32 = -11;
    pub const OUT_OF_RANGE: i32 = -14;
    pub const BUFFER_TOO_SMALL: i32 = -15;
    pub const TIMED_OUT: i32 = -21;
    pub const SHOULD_WAIT: i32 = -22;
    pub const PEER_CLOSED: i32 = -24;
}

/// Map a raw status to a process exit code (its magnitude, saturated)
#[inline]
pub fn exit_code(status: i32) -> u8 {
    u8::try_from(status.unsigned_abs()).unwrap_or(u8::MAX)
}

/// Transport operation result
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised by channel and fifo primitives
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum TransportError {
    #[error("Invalid handle: endpoint already released")]
    #[diagnostic(
        code(transport::bad_handle),
        help("The endpoint was closed earlier in this scope. Handles cannot be used after release.")
    )]
    BadHandle,

    #[error("Operation should wait: transport not ready")]
    #[diagnostic(
        code(transport::should_wait),
        help("Wait for READABLE or WRITABLE before reading or writing.")
    )]
    ShouldWait,

    #[error("Peer closed")]
    #[diagnostic(
        code(transport::peer_closed),
        help("The other endpoint was released. The session is over.")
    )]
    PeerClosed,

    #[error("Timed out waiting for signals")]
    #[diagnostic(code(transport::timed_out))]
    TimedOut,

    #[error("Buffer too small: message carries {needed_bytes} bytes and {needed_handles} handles")]
    #[diagnostic(
        code(transport::buffer_too_small),
        help("The message was left queued. Read it with a buffer sized for the protocol step.")
    )]
    BufferTooSmall {
        needed_bytes: usize,
        needed_handles: usize,
    },

    #[error("Argument out of range: {0}")]
    #[diagnostic(code(transport::out_of_range))]
    OutOfRange(String),

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(transport::invalid_args))]
    InvalidArgs(String),

    #[error("Operation not supported: {0}")]
    #[diagnostic(code(transport::not_supported))]
    NotSupported(String),
}

impl TransportError {
    /// Raw status code for this error
    #[must_use]
    pub const fn status(&self) -> i32 {
        match self {
            Self::BadHandle => status::BAD_HANDLE,
            Self::ShouldWait => status::SHOULD_WAIT,
            Self::PeerClosed => status::PEER_CLOSED,
            Self::TimedOut => status::TIMED_OUT,
            Self::BufferTooSmall { .. } => status::BUFFER_TOO_SMALL,
            Self::OutOfRange(_) => status::OUT_OF_RANGE,
            Self::InvalidArgs(_) => status::INVALID_ARGS,
            Self::NotSupported(_) => status::NOT_SUPPORTED,
        }
    }
}

/// Session operation result
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that end a protocol session
///
/// `stage` names the protocol step that failed so role-tagged logs read like
/// a narrative of the session.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SessionError {
    #[error("Wait failed {stage}: {source}")]
    #[diagnostic(
        code(session::wait_failed),
        help("The readiness wait itself errored. This is fatal for the process.")
    )]
    WaitFailed {
        stage: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("Peer closed {stage}")]
    #[diagnostic(
        code(session::peer_closed),
        help("The peer released its endpoint in the middle of the protocol.")
    )]
    PeerClosed { stage: &'static str },

    #[error("Read failed {stage}: {source}")]
    #[diagnostic(code(session::read_failed))]
    ReadFailed {
        stage: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("Write failed {stage}: {source}")]
    #[diagnostic(code(session::write_failed))]
    WriteFailed {
        stage: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("Failed to create {object}: {source}")]
    #[diagnostic(code(session::create_failed))]
    CreateFailed {
        object: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("Malformed handoff: {reason} ({handles} handles received)")]
    #[diagnostic(
        code(session::malformed_handoff),
        help("A handoff message must carry exactly one fifo capability.")
    )]
    MalformedHandoff {
        handles: usize,
        reason: &'static str,
    },

    #[error("Malformed {what}: expected {expected} bytes, got {actual}")]
    #[diagnostic(code(session::decode))]
    Decode {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl SessionError {
    /// Map a failed read, folding peer closure into `PeerClosed`
    pub(crate) fn read(stage: &'static str, source: TransportError) -> Self {
        match source {
            TransportError::PeerClosed => Self::PeerClosed { stage },
            source => Self::ReadFailed { stage, source },
        }
    }

    /// Map a failed write, folding peer closure into `PeerClosed`
    pub(crate) fn write(stage: &'static str, source: TransportError) -> Self {
        match source {
            TransportError::PeerClosed => Self::PeerClosed { stage },
            source => Self::WriteFailed { stage, source },
        }
    }

    #[inline]
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, Self::PeerClosed { .. })
    }

    /// Status of the failing operation, propagated to the process exit code
    #[must_use]
    pub fn status(&self) -> i32 {
        match self {
            Self::WaitFailed { source, .. }
            | Self::ReadFailed { source, .. }
            | Self::WriteFailed { source, .. }
            | Self::CreateFailed { source, .. } => source.status(),
            Self::PeerClosed { .. } => status::PEER_CLOSED,
            Self::MalformedHandoff { .. } => status::INTERNAL,
            Self::Decode { .. } => status::INVALID_ARGS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_status_codes() {
        assert_eq!(TransportError::PeerClosed.status(), -24);
        assert_eq!(TransportError::ShouldWait.status(), -22);
        assert_eq!(TransportError::BadHandle.status(), -11);
    }

    #[test]
    fn test_session_status_propagates_source() {
        let err = SessionError::read("reading reply", TransportError::BufferTooSmall {
            needed_bytes: 8,
            needed_handles: 0,
        });
        assert_eq!(err.status(), status::BUFFER_TOO_SMALL);

        let err = SessionError::write("sending request", TransportError::PeerClosed);
        assert!(err.is_peer_closed());
        assert_eq!(err.status(), status::PEER_CLOSED);

        let err = SessionError::MalformedHandoff {
            handles: 0,
            reason: "no capability attached",
        };
        assert_eq!(err.status(), status::INTERNAL);
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(status::OK), 0);
        assert_eq!(exit_code(status::PEER_CLOSED), 24);
        assert_eq!(exit_code(i32::MIN), u8::MAX);
    }

    #[test]
    fn test_transport_error_serializes() {
        let json = serde_json::to_string(&TransportError::PeerClosed).unwrap();
        assert_eq!(json, r#"{"error":"peer_closed"}"#);
    }
}
