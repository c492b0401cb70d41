//! Text extraction for corpus documents.
//!
//! Ingestion supplies file bytes plus the path; this module returns plain
//! UTF-8 text. PDFs go through `pdf_extract`; markdown and plain text are
//! decoded as UTF-8. Failures surface as [`RagError::DocumentParse`] so
//! the ingest loop can skip the document and continue.

use std::path::Path;

use crate::error::RagError;

pub fn extract_text(document_id: &str, path: &Path, bytes: &[u8]) -> Result<String, RagError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "pdf" => pdf_extract::extract_text_from_mem(bytes).map_err(|e| parse_err(document_id, e)),
        "txt" | "md" => {
            String::from_utf8(bytes.to_vec()).map_err(|e| parse_err(document_id, e))
        }
        other => Err(RagError::DocumentParse {
            id: document_id.to_string(),
            reason: format!("unsupported extension: '{}'", other),
        }),
    }
}

fn parse_err(document_id: &str, e: impl std::fmt::Display) -> RagError {
    RagError::DocumentParse {
        id: document_id.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn plain_text_passes_through() {
        let text = extract_text("a.txt", &PathBuf::from("a.txt"), b"hello world").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn invalid_pdf_returns_parse_error() {
        let err = extract_text("a.pdf", &PathBuf::from("a.pdf"), b"not a pdf").unwrap_err();
        assert!(matches!(err, RagError::DocumentParse { .. }));
    }

    #[test]
    fn unsupported_extension_returns_parse_error() {
        let err = extract_text("a.bin", &PathBuf::from("a.bin"), b"data").unwrap_err();
        assert!(matches!(err, RagError::DocumentParse { .. }));
    }

    #[test]
    fn invalid_utf8_returns_parse_error() {
        let err = extract_text("a.txt", &PathBuf::from("a.txt"), &[0xff, 0xfe, 0xfd]).unwrap_err();
        assert!(matches!(err, RagError::DocumentParse { .. }));
    }
}
