//! Roundup core: per-speaker recording cards with cloud-backed stand-up
//! summaries.
//!
//! ```text
//!  commands ──► CardBoard ──► ReportCard state machine
//!                  │
//!                  ├─► CaptureBackend ─► cpal input stream ─► AudioClip (WAV)
//!                  │
//!                  └─► Summarizer ─► generative-language API ─► bullet text
//!                          │
//!                          └─ broadcast events ─► "roundup://cards" / "roundup://ticks"
//! ```
//!
//! The crate is UI-agnostic: everything a host needs is behind [`CardBoard`]
//! plus the two trait seams ([`CaptureBackend`], [`Summarizer`]). The Tauri
//! host in `roundup-app` is one such host; the integration tests are another.
//!
//! # Feature flags
//!
//! - `audio-cpal` (default): real microphone capture via [`CpalBackend`].
//! - `cloud`: [`CloudSummarizer`] over HTTPS; without it only
//!   [`StubSummarizer`] is available.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod board;
pub mod capture;
pub mod card;
pub mod context;
pub mod error;
pub mod ipc;
pub mod lang;
pub mod summarize;

pub use board::{BoardConfig, CardBoard};
pub use capture::{AudioClip, CaptureBackend, CaptureSession};
#[cfg(feature = "audio-cpal")]
pub use capture::CpalBackend;
pub use card::{CardId, CardPatch, CardStatus, ContextFile, ReportCard};
pub use context::read_context_file;
pub use error::{Result, RoundupError};
pub use ipc::events::{CardEvent, RecordingTickEvent};
pub use lang::{normalize_language, Language};
#[cfg(feature = "cloud")]
pub use summarize::{CloudConfig, CloudSummarizer};
pub use summarize::{RequestPart, StubSummarizer, Summarizer, SummaryRequest};
