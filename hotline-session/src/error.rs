use hotline_core::RoomId;
use thiserror::Error;

/// Local capture could not be acquired. One-shot: the whole flow must be
/// retried by the user, never by the library.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("media capture failed: {0}")]
pub struct CaptureError(pub String);

/// The peer connection rejected a description or candidate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("negotiation failed: {0}")]
pub struct NegotiationError(pub String);

/// Failure of a signaling store operation. Not retried automatically:
/// signaling writes are not safely idempotent against a partially written
/// room.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("room {0} no longer exists")]
    RoomGone(RoomId),
    #[error("room field {0} is already written")]
    AlreadyWritten(&'static str),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Terminal session failures, surfaced to the presentation layer together
/// with an `Error` state transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("room {0:?} not found")]
    RoomNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}
