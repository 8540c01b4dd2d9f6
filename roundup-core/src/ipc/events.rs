//! Event types emitted over the Tauri IPC channel.
//!
//! ## Channel names
//!
//! | Event | Channel |
//! |-------|---------|
//! | `CardEvent` | `"roundup://cards"` |
//! | `RecordingTickEvent` | `"roundup://ticks"` |

use serde::{Deserialize, Serialize};

use crate::card::{CardId, CardStatus};

/// Emitted on channel `"roundup://cards"` whenever a card's status changes.
///
/// The frontend re-fetches the card list on receipt; the event itself only
/// identifies which card moved and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    pub card_id: CardId,
    pub status: CardStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Emitted on channel `"roundup://ticks"` once per second while a card is
/// recording, for the elapsed-time display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingTickEvent {
    pub card_id: CardId,
    pub elapsed_seconds: u64,
}
