//! Summarization backend abstraction.
//!
//! The `Summarizer` trait decouples the card pipeline from any specific
//! backend (offline stub, cloud generateContent API, a future local model).
//!
//! `summarize` is a blocking call by contract: the board always invokes it
//! inside `tokio::task::spawn_blocking`, one call per submission, so backends
//! are free to do synchronous network I/O without touching the async
//! executor. No retry and no extra timeout are layered on top — a failure
//! surfaces once, as the card's terminal error.

pub mod stub;

#[cfg(feature = "cloud")]
pub mod cloud;

#[cfg(feature = "cloud")]
pub use cloud::{CloudConfig, CloudSummarizer};

pub use stub::StubSummarizer;

use crate::error::Result;

/// One ordered piece of a summarization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPart {
    /// Plain instruction or context text.
    Text(String),
    /// Binary content (audio payload, attached document), base64-encoded.
    Blob {
        mime_type: String,
        /// Base64 of the raw bytes.
        data: String,
    },
}

/// A complete request for one submission.
///
/// Part order is part of the contract: context file (if any), context text
/// (if any), audio payload, closing instruction — see `card::pipeline`.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub parts: Vec<RequestPart>,
    /// System-level instruction sent alongside the parts.
    pub system_instruction: String,
    /// Model identifier forwarded to the backend.
    pub model: String,
}

impl SummaryRequest {
    /// Total number of blob parts (used for logging and the stub backend).
    pub fn blob_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, RequestPart::Blob { .. }))
            .count()
    }
}

/// Contract for summarization backends.
pub trait Summarizer: Send + Sync + 'static {
    /// Turn one assembled request into summary text.
    ///
    /// An empty string is a valid result — the caller maps it to the
    /// language-matched fallback literal, not the backend.
    fn summarize(&self, request: &SummaryRequest) -> Result<String>;
}
