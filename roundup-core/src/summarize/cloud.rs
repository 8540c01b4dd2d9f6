//! Cloud summarizer backend.
//!
//! Talks to a generateContent-style generative-language endpoint: one JSON
//! POST carrying ordered parts (inline base64 blobs and text), a system
//! instruction, and the model id in the path. One call per submission — the
//! caller owns the no-retry policy, this client owns only the HTTP timeout.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RoundupError};
use crate::summarize::{RequestPart, SummaryRequest, Summarizer};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default request timeout. Audio uploads are large and the model is slow;
/// this bounds a hung connection, not normal latency.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for `CloudSummarizer`.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl CloudConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Blocking HTTP client for the remote summarization collaborator.
pub struct CloudSummarizer {
    config: CloudConfig,
    client: reqwest::blocking::Client,
}

impl CloudSummarizer {
    pub fn new(config: CloudConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RoundupError::Summarize(e.to_string()))?;
        Ok(Self { config, client })
    }
}

impl Summarizer for CloudSummarizer {
    fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        let body = GenerateRequest::from_summary_request(request);
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, request.model
        );

        debug!(
            model = %request.model,
            parts = request.parts.len(),
            blobs = request.blob_count(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    RoundupError::Summarize(format!(
                        "request timed out after {} s",
                        self.config.timeout_secs
                    ))
                } else {
                    RoundupError::Summarize(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RoundupError::Summarize(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| RoundupError::Summarize(format!("invalid response: {e}")))?;

        Ok(parsed.into_text())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GenerateRequest {
    fn from_summary_request(request: &SummaryRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                RequestPart::Text(text) => Part {
                    text: Some(text.clone()),
                    inline_data: None,
                },
                RequestPart::Blob { mime_type, data } => Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    }),
                },
            })
            .collect();

        Self {
            contents: vec![Content { parts }],
            system_instruction: Some(Content {
                parts: vec![Part {
                    text: Some(request.system_instruction.clone()),
                    inline_data: None,
                }],
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate. An absent or empty candidate
    /// yields an empty string; the board maps that to the fallback literal.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}
