//! Error types shared across the engine.

use std::path::PathBuf;

use crate::adapters::GenerationError;
use crate::voice::VoiceError;

/// Failures surfaced by engine operations.
///
/// Generation and synthesis failures are normally absorbed into fallback
/// content before they get here; the variants exist for callers that talk
/// to the collaborators directly.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Operative {0} not found")]
    AgentNotFound(String),

    #[error("No active event to respond to")]
    NoActiveEvent,

    #[error("Template {name} unavailable: {reason}")]
    Template { name: String, reason: String },

    #[error("Storage failure at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GameError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corrupt {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// HTTP status a request boundary should answer with for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AgentNotFound(_) => 404,
            Self::NoActiveEvent => 409,
            Self::Voice(VoiceError::Unconfigured | VoiceError::NoVoice(_)) => 503,
            _ => 500,
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_status_codes() {
        assert_eq!(GameError::AgentNotFound("GHOST".into()).status_code(), 404);
        assert_eq!(GameError::NoActiveEvent.status_code(), 409);
        assert_eq!(GameError::Voice(VoiceError::Unconfigured).status_code(), 503);
        assert_eq!(GameError::Config("bad".into()).status_code(), 500);
        assert_eq!(
            GameError::corrupt("world_state", "missing field `turn`").status_code(),
            500
        );
    }
}
