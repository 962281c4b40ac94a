//! Error types for the tapwire protocol.

use thiserror::Error;

/// Error returned by application callbacks.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Zero bytes received.
    #[error("empty frame")]
    Empty,

    /// Header carries a kind tag outside the known set.
    #[error("unknown frame kind tag: {0}")]
    UnknownKind(u8),

    /// Handshake reply payload has the wrong size.
    #[error("handshake reply must be {expected} bytes, got {actual}")]
    InvalidHandshakeReply {
        /// Required payload size.
        expected: usize,
        /// Actual payload size.
        actual: usize,
    },

    /// Frame size leaves no room for any payload after the header.
    #[error("frame size {0} leaves no room for payload")]
    FrameSizeTooSmall(usize),
}

/// Errors from the protocol engines.
///
/// `LinkLost` and `SequenceMismatch` are recovered from internally and only
/// reported as status; every other variant aborts the current transaction and
/// resets the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The transport returned no data.
    #[error("link lost")]
    LinkLost,

    /// The reply does not echo the sequence number of the request.
    #[error("sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch {
        /// Sequence number that was expected.
        expected: u8,
        /// Sequence number that arrived.
        actual: u8,
    },

    /// The peer reported a failure on its side.
    #[error("remote error: {0}")]
    RemoteError(String),

    /// Processing failed on this side.
    #[error("local error: {0}")]
    LocalError(String),

    /// Handshake could not be performed or its reply was malformed.
    #[error("handshake failed: {0}")]
    HandshakeFailure(String),

    /// A frame arrived that the state machine cannot accept.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The peer kept repeating the same request.
    #[error("retransmit limit of {0} exceeded")]
    RetransmitLimit(u32),

    /// The session is not active.
    #[error("session inactive")]
    Inactive,
}

impl ProtocolError {
    /// Check if the engine recovers from this error without a full reset.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProtocolError::LinkLost | ProtocolError::SequenceMismatch { .. }
        )
    }

    /// Check if this error aborts the transaction and resets the session.
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable() && !matches!(self, ProtocolError::Inactive)
    }
}

impl From<FrameError> for ProtocolError {
    fn from(err: FrameError) -> Self {
        ProtocolError::ProtocolViolation(err.to_string())
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors from the deferred reply register.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeferredReplyError {
    /// A deferred reply is already waiting to be picked up.
    #[error("a deferred reply is already pending")]
    AlreadyPending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(ProtocolError::LinkLost.is_recoverable());
        assert!(ProtocolError::SequenceMismatch { expected: 5, actual: 7 }.is_recoverable());

        assert!(!ProtocolError::RemoteError("x".into()).is_recoverable());
        assert!(!ProtocolError::HandshakeFailure("x".into()).is_recoverable());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(ProtocolError::RemoteError("x".into()).is_fatal());
        assert!(ProtocolError::LocalError("x".into()).is_fatal());
        assert!(ProtocolError::HandshakeFailure("x".into()).is_fatal());
        assert!(ProtocolError::ProtocolViolation("x".into()).is_fatal());
        assert!(ProtocolError::RetransmitLimit(8).is_fatal());

        assert!(!ProtocolError::LinkLost.is_fatal());
        assert!(!ProtocolError::Inactive.is_fatal());
    }

    #[test]
    fn test_frame_error_is_violation() {
        let err: ProtocolError = FrameError::UnknownKind(7).into();
        assert!(matches!(err, ProtocolError::ProtocolViolation(_)));
        assert!(err.is_fatal());
    }
}
