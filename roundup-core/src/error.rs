use thiserror::Error;

use crate::card::{CardId, CardStatus};

/// All errors produced by roundup-core.
#[derive(Debug, Error)]
pub enum RoundupError {
    #[error("Mic access denied")]
    MicAccessDenied,

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("audio device error: {0}")]
    CaptureDevice(String),

    #[error("audio stream error: {0}")]
    CaptureStream(String),

    #[error("card {0} not found")]
    CardNotFound(CardId),

    #[error("card {0} is already recording")]
    AlreadyRecording(CardId),

    #[error("card {0} is not recording")]
    NotRecording(CardId),

    #[error("card {0} has no error to reset")]
    NotInError(CardId),

    #[error("card {id} cannot {action} while {from:?}")]
    InvalidTransition {
        id: CardId,
        from: CardStatus,
        action: &'static str,
    },

    #[error("summarization failed: {0}")]
    Summarize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RoundupError>;
