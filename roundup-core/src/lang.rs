//! Output language for generated summaries.
//!
//! The language is a board-level setting, but submissions never read it live:
//! `CardBoard::stop_recording` copies the current value out of the lock and
//! moves that snapshot into the submission task, so a language change while a
//! call is in flight cannot affect it.

use serde::{Deserialize, Serialize};

/// Target language for the summarizer's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    German,
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

impl Language {
    /// Literal emitted when the summarizer returns an empty response.
    ///
    /// These strings are part of the product contract — the frontend matches
    /// on them to style the "nothing new" case. Do not reword.
    pub fn fallback_text(self) -> &'static str {
        match self {
            Language::English => "No new updates detected.",
            Language::German => "Keine neuen Updates erkannt.",
        }
    }

    /// Closing instruction appended as the final request part.
    pub fn closing_instruction(self) -> &'static str {
        match self {
            Language::English => {
                "Summarize the spoken status update above as short bullet points \
                 in English. Use the provided context to skip anything already \
                 known; if the recording adds nothing new, reply with an empty \
                 response."
            }
            Language::German => {
                "Fasse das gesprochene Status-Update oben als kurze Stichpunkte \
                 auf Deutsch zusammen. Nutze den mitgelieferten Kontext, um \
                 bereits Bekanntes zu überspringen; wenn die Aufnahme nichts \
                 Neues enthält, antworte mit einer leeren Antwort."
            }
        }
    }

    /// System-level instruction sent alongside every request.
    pub fn system_instruction(self) -> &'static str {
        match self {
            Language::English => {
                "You turn recorded verbal status updates into concise bullet-point \
                 meeting notes. Answer in English."
            }
            Language::German => {
                "Du wandelst aufgenommene mündliche Status-Updates in knappe \
                 Stichpunkt-Notizen um. Antworte auf Deutsch."
            }
        }
    }

    /// Short identifier used in settings files and IPC payloads.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::German => "de",
        }
    }
}

/// Parse a user- or settings-supplied language string, defaulting to English.
pub fn normalize_language(raw: &str) -> Language {
    match raw.trim().to_ascii_lowercase().as_str() {
        "de" | "ger" | "german" | "deutsch" => Language::German,
        _ => Language::English,
    }
}
