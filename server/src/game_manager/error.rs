use shared::ServerMessage;
use thiserror::Error;

/// Rejections surfaced to the requesting connection only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("not in this game room")]
    NotInRoom,
    #[error("too many requests, try again later")]
    RateLimited,
    #[error("already waiting for a match")]
    AlreadyQueued,
    #[error("already in a match")]
    AlreadyInMatch,
    #[error("no opponent found in time")]
    QueueTimeout,
}

impl GameError {
    pub const fn kind(self) -> &'static str {
        match self {
            Self::NotInRoom => "not_in_room",
            Self::RateLimited => "rate_limited",
            Self::AlreadyQueued => "already_queued",
            Self::AlreadyInMatch => "already_in_match",
            Self::QueueTimeout => "queue_timeout",
        }
    }

    pub fn to_message(self) -> ServerMessage {
        ServerMessage::Error {
            message: self.to_string(),
            kind: Some(self.kind().to_string()),
        }
    }

    /// Queue rejections are reported through the queue status channel.
    pub fn to_queue_status(self) -> ServerMessage {
        ServerMessage::QueueStatus {
            position: 0,
            estimated_wait_secs: 0,
            error: Some(self.to_string()),
        }
    }
}
