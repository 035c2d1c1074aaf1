//! Error types for the link layer

use thiserror::Error;

/// Errors that can occur opening, exchanging on, or resolving a channel
///
/// Every failure path in the core returns one of these; nothing terminates
/// the process. Note that a timed-out exchange that did collect bytes is NOT
/// an error; it resolves as a partial reply (see
/// [`crate::collector::Completion::Lapsed`]).
#[derive(Debug, Error)]
pub enum LinkError {
    /// No channel registered under the given id
    #[error("channel not registered: {0}")]
    NotRegistered(String),

    /// Device node missing or already exclusively held
    #[error("port unavailable: {path}: {reason}")]
    PortUnavailable { path: String, reason: String },

    /// The open step did not complete within its (short) window
    #[error("open timed out after {0}ms")]
    OpenTimeout(u64),

    /// No bytes at all arrived within the response window
    #[error("no response within {0}ms")]
    ResponseTimeout(u64),

    /// An exchange is already in flight on this channel
    #[error("channel busy: {0}")]
    Busy(String),

    /// Request rejected before encoding; no I/O took place
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] vtr_protocol::EncodeError),

    /// The exchange's cancellation token fired
    #[error("exchange cancelled")]
    Cancelled,

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
