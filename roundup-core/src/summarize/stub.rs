//! `StubSummarizer` — placeholder backend that echoes request metadata.
//!
//! Used when no API key is configured, so the full card pipeline (recording,
//! request assembly, status transitions, events) can be exercised end-to-end
//! without credentials.

use tracing::debug;

use crate::error::Result;
use crate::summarize::{RequestPart, SummaryRequest, Summarizer};

/// Echo-style stub backend. Deterministic for a given request shape.
pub struct StubSummarizer;

impl Summarizer for StubSummarizer {
    fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        debug!(
            parts = request.parts.len(),
            blobs = request.blob_count(),
            "StubSummarizer::summarize"
        );

        let audio_bytes: usize = request
            .parts
            .iter()
            .filter_map(|p| match p {
                RequestPart::Blob { mime_type, data } if mime_type.starts_with("audio/") => {
                    Some(data.len())
                }
                _ => None,
            })
            .sum();

        Ok(format!(
            "- [stub] {} request part(s), {} base64 audio byte(s)",
            request.parts.len(),
            audio_bytes
        ))
    }
}
