//! Speaker card data and status state machine.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──begin_recording──► Recording ──begin_processing──► Processing
//!   ▲                                                        │      │
//!   └────────reset───────── Error ◄──────────fail────────────┘      │
//!                             ▲                                     ▼
//!                             └(acquisition)              Completed ─┐
//!                                                             ▲      │
//!                                                             └──begin_recording
//! ```
//!
//! The transition methods below are the only way `status` changes; every
//! illegal edge returns an error rather than panicking. Field edits
//! (`set_speaker_name`, `set_text`, `set_context_text`, context-file
//! attachment) are legal in every state and never touch `status`.

pub mod pipeline;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoundupError};

/// Opaque per-board card identifier. Monotonic, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CardId(pub u64);

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current state of one speaker card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    /// Created, nothing in flight.
    Idle,
    /// Microphone session live, audio accumulating.
    Recording,
    /// Clip finalized, summarization call in flight.
    Processing,
    /// Summary text available (possibly user-edited since).
    Completed,
    /// Terminal failure; explicit reset required.
    Error,
}

/// An attached reference document, encoded for transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFile {
    /// Original file name.
    pub name: String,
    /// MIME type guessed from the extension.
    pub mime_type: String,
    /// Base64 of the raw content.
    pub data: String,
}

/// Partial update applied by `CardBoard::update_card`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    pub speaker_name: Option<String>,
    pub text: Option<String>,
    pub context_text: Option<String>,
}

/// One speaker's full card state. Owned exclusively by the board's ordered
/// collection; everything handed to callers is a snapshot clone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCard {
    pub id: CardId,
    pub speaker_name: String,
    pub status: CardStatus,
    /// Current summary; empty until the first successful completion,
    /// preserved across later recordings until new text arrives.
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Recorded duration, set when recording stops.
    pub duration_seconds: Option<u64>,
    /// Present only in `Error` state.
    pub error: Option<String>,
    pub context_text: Option<String>,
    pub context_file: Option<ContextFile>,
}

impl ReportCard {
    pub fn new(id: CardId, speaker_name: impl Into<String>) -> Self {
        Self {
            id,
            speaker_name: speaker_name.into(),
            status: CardStatus::Idle,
            text: String::new(),
            created_at: Utc::now(),
            duration_seconds: None,
            error: None,
            context_text: None,
            context_file: None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Idle | Completed → Recording. A fresh recording on a completed card
    /// keeps the old summary until new text arrives.
    pub fn begin_recording(&mut self) -> Result<()> {
        match self.status {
            CardStatus::Idle | CardStatus::Completed => {
                self.status = CardStatus::Recording;
                Ok(())
            }
            CardStatus::Recording => Err(RoundupError::AlreadyRecording(self.id)),
            from => Err(invalid(self.id, from, "start recording")),
        }
    }

    /// Recording → Processing, capturing the clip duration taken at stop time.
    pub fn begin_processing(&mut self, duration_seconds: u64) -> Result<()> {
        match self.status {
            CardStatus::Recording => {
                self.status = CardStatus::Processing;
                self.duration_seconds = Some(duration_seconds);
                Ok(())
            }
            _ => Err(RoundupError::NotRecording(self.id)),
        }
    }

    /// Processing → Completed. `text` is stored verbatim; empty-response
    /// fallback mapping happens in `pipeline::resolve_summary`.
    pub fn complete(&mut self, text: String) -> Result<()> {
        match self.status {
            CardStatus::Processing => {
                self.status = CardStatus::Completed;
                self.text = text;
                self.error = None;
                Ok(())
            }
            from => Err(invalid(self.id, from, "complete")),
        }
    }

    /// Processing → Error (submission failure).
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        match self.status {
            CardStatus::Processing => {
                self.status = CardStatus::Error;
                self.error = Some(message.into());
                Ok(())
            }
            from => Err(invalid(self.id, from, "fail")),
        }
    }

    /// Idle | Completed → Error, for capture-acquisition failures. The card
    /// never entered `Recording`.
    pub fn fail_acquisition(&mut self, message: impl Into<String>) -> Result<()> {
        match self.status {
            CardStatus::Idle | CardStatus::Completed => {
                self.status = CardStatus::Error;
                self.error = Some(message.into());
                Ok(())
            }
            from => Err(invalid(self.id, from, "fail acquisition")),
        }
    }

    /// Error → Idle; clears the error message. Summary text and duration
    /// survive the reset.
    pub fn reset(&mut self) -> Result<()> {
        match self.status {
            CardStatus::Error => {
                self.status = CardStatus::Idle;
                self.error = None;
                Ok(())
            }
            _ => Err(RoundupError::NotInError(self.id)),
        }
    }

    // ── Field edits (legal in every state) ───────────────────────────────

    pub fn set_speaker_name(&mut self, name: String) {
        self.speaker_name = name;
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub fn set_context_text(&mut self, text: String) {
        self.context_text = if text.is_empty() { None } else { Some(text) };
    }

    /// Attach a reference document, replacing any prior attachment.
    pub fn attach_context_file(&mut self, file: ContextFile) {
        self.context_file = Some(file);
    }

    /// Safe no-op when nothing is attached.
    pub fn remove_context_file(&mut self) {
        self.context_file = None;
    }

    /// Merge a partial update. Never touches `status`.
    pub fn apply_patch(&mut self, patch: CardPatch) {
        if let Some(name) = patch.speaker_name {
            self.set_speaker_name(name);
        }
        if let Some(text) = patch.text {
            self.set_text(text);
        }
        if let Some(context) = patch.context_text {
            self.set_context_text(context);
        }
    }
}

fn invalid(id: CardId, from: CardStatus, action: &'static str) -> RoundupError {
    RoundupError::InvalidTransition {
        id,
        from,
        action,
    }
}
