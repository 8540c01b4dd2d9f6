//! File-read collaborator: turn a user-selected file into a transport-ready
//! context attachment.
//!
//! A read failure here is context-level, not card-level — the command layer
//! logs it and leaves the card (and any prior attachment) untouched.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::card::ContextFile;
use crate::error::Result;

/// Read a file and encode it as a context attachment.
pub fn read_context_file(path: &Path) -> Result<ContextFile> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let mime_type = guess_mime(path).to_string();
    Ok(ContextFile {
        name,
        mime_type,
        data: BASE64.encode(bytes),
    })
}

/// Extension-based MIME guess. Unknown extensions fall back to octet-stream;
/// the remote API only uses this as a decoding hint.
fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_and_encodes_a_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"deployed v1").unwrap();

        let context = read_context_file(&path).unwrap();
        assert_eq!(context.name, "status.txt");
        assert_eq!(context.mime_type, "text/plain");
        assert_eq!(context.data, BASE64.encode(b"deployed v1"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_context_file(Path::new("/nonexistent/nope.pdf")).unwrap_err();
        assert!(matches!(err, crate::error::RoundupError::Io(_)));
    }

    #[test]
    fn unknown_extensions_fall_back_to_octet_stream() {
        assert_eq!(guess_mime(Path::new("a.xyz")), "application/octet-stream");
        assert_eq!(guess_mime(Path::new("deck.pdf")), "application/pdf");
        assert_eq!(guess_mime(Path::new("noext")), "application/octet-stream");
    }
}
