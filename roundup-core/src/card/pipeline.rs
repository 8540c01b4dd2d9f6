//! Submission request assembly and result resolution.
//!
//! Pure functions on purpose — the board calls them from inside its
//! submission task, and the tests exercise them without any runtime.
//!
//! Part order is fixed: context file (if attached), context text (if set),
//! audio payload, closing instruction. The remote model reads the request
//! top-down, so the context must precede the audio it deduplicates against.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::capture::AudioClip;
use crate::card::ContextFile;
use crate::lang::Language;
use crate::summarize::{RequestPart, SummaryRequest};

/// Label prepended to free-text context so the model can tell it apart from
/// the instruction part.
const CONTEXT_TEXT_LABEL: &str = "Existing status notes:";

/// Build the ordered multi-part request for one submission.
///
/// `language` is the board snapshot taken at stop time; it parameterizes the
/// closing and system instructions only.
pub fn assemble_request(
    context_file: Option<&ContextFile>,
    context_text: Option<&str>,
    clip: &AudioClip,
    language: Language,
    model: &str,
) -> SummaryRequest {
    let mut parts = Vec::with_capacity(4);

    if let Some(file) = context_file {
        parts.push(RequestPart::Blob {
            mime_type: file.mime_type.clone(),
            data: file.data.clone(),
        });
    }
    if let Some(text) = context_text {
        parts.push(RequestPart::Text(format!("{CONTEXT_TEXT_LABEL}\n{text}")));
    }
    parts.push(RequestPart::Blob {
        mime_type: clip.mime_type.to_string(),
        data: BASE64.encode(&clip.bytes),
    });
    parts.push(RequestPart::Text(language.closing_instruction().to_string()));

    SummaryRequest {
        parts,
        system_instruction: language.system_instruction().to_string(),
        model: model.to_string(),
    }
}

/// Map the summarizer's raw result to the card's summary text: non-empty
/// passes through verbatim, empty/whitespace becomes the language-matched
/// fallback literal.
pub fn resolve_summary(raw: &str, language: Language) -> String {
    if raw.trim().is_empty() {
        language.fallback_text().to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::clip::WAV_MIME;

    fn clip() -> AudioClip {
        AudioClip {
            mime_type: WAV_MIME,
            bytes: vec![1, 2, 3],
            duration_seconds: 5,
            sample_rate: 16_000,
        }
    }

    #[test]
    fn full_request_orders_file_text_audio_instruction() {
        let file = ContextFile {
            name: "status.pdf".into(),
            mime_type: "application/pdf".into(),
            data: "UERG".into(),
        };
        let request = assemble_request(
            Some(&file),
            Some("Already deployed v1"),
            &clip(),
            Language::English,
            "gemini-2.5-flash",
        );

        assert_eq!(request.parts.len(), 4);
        assert_eq!(
            request.parts[0],
            RequestPart::Blob {
                mime_type: "application/pdf".into(),
                data: "UERG".into(),
            }
        );
        assert_eq!(
            request.parts[1],
            RequestPart::Text("Existing status notes:\nAlready deployed v1".into())
        );
        assert_eq!(
            request.parts[2],
            RequestPart::Blob {
                mime_type: "audio/wav".into(),
                data: BASE64.encode([1u8, 2, 3]),
            }
        );
        assert_eq!(
            request.parts[3],
            RequestPart::Text(Language::English.closing_instruction().into())
        );
        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(
            request.system_instruction,
            Language::English.system_instruction()
        );
    }

    #[test]
    fn missing_context_drops_those_parts_but_keeps_order() {
        let request = assemble_request(None, None, &clip(), Language::German, "m");
        assert_eq!(request.parts.len(), 2);
        assert!(matches!(&request.parts[0], RequestPart::Blob { mime_type, .. } if mime_type == "audio/wav"));
        assert_eq!(
            request.parts[1],
            RequestPart::Text(Language::German.closing_instruction().into())
        );
    }

    #[test]
    fn empty_result_maps_to_language_fallback() {
        assert_eq!(
            resolve_summary("", Language::English),
            "No new updates detected."
        );
        assert_eq!(
            resolve_summary("  \n ", Language::German),
            "Keine neuen Updates erkannt."
        );
    }

    #[test]
    fn non_empty_result_passes_through_verbatim() {
        assert_eq!(
            resolve_summary("- Task A done\n", Language::German),
            "- Task A done\n"
        );
    }
}
