//! Error taxonomy for a guessing session.
//!
//! Every variant is fatal for the session that produced it; nothing in the
//! protocol retries or recovers locally.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    /// The chooser was configured with `min >= max`.
    #[error("invalid range {min}-{max}: minimum must be less than maximum")]
    InvalidRange { min: i64, max: i64 },

    #[error("secret {secret} lies outside the range {min}-{max}")]
    SecretOutOfRange { secret: i64, min: i64, max: i64 },

    #[error("malformed range '{0}': expected '<min>-<max>'")]
    MalformedRange(String),

    /// A received payload could not be decoded into a protocol message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A peer sent more than `limit` bytes without a line break.
    #[error("message exceeds {limit} bytes without a line break")]
    LineTooLong { limit: usize },

    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    #[error("peer closed the connection before the game finished")]
    ConnectionClosed,

    #[error("expected {expected}, received {received}")]
    UnexpectedMessage {
        expected: &'static str,
        received: String,
    },

    /// The solver's working range became empty; the hints contradict each other.
    #[error("invalid range {min}-{max}: hints are contradictory")]
    InconsistentHints { min: i64, max: i64 },

    /// The peer ended the session with a `ProtocolError` message.
    #[error("peer reported an error: {0}")]
    Peer(String),
}

impl GameError {
    /// Errors caused by what the peer sent (or by contradictions in it), as
    /// opposed to local configuration or transport failures.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_)
                | Self::MalformedRange(_)
                | Self::LineTooLong { .. }
                | Self::UnexpectedMessage { .. }
                | Self::InconsistentHints { .. }
        )
    }

    pub(crate) fn unexpected(expected: &'static str, received: impl ToString) -> Self {
        Self::UnexpectedMessage {
            expected,
            received: received.to_string(),
        }
    }
}
