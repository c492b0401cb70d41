//! Sliding-window text chunker.
//!
//! Splits normalized document text into overlapping word windows so that
//! retrieval keeps context that straddles a window boundary. Chunk ids are
//! derived from the document id and window ordinal, so re-ingesting
//! identical content yields identical chunks.

use sha2::{Digest, Sha256};

use crate::models::Chunk;

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into overlapping windows of `chunk_size` words.
///
/// Window starts advance by `chunk_size - chunk_overlap` and are strictly
/// increasing; the final window is truncated at the document end. A
/// document shorter than `chunk_size` yields exactly one chunk. Config
/// validation guarantees `chunk_overlap < chunk_size`.
pub fn chunk_document(
    document_id: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index: i64 = 0;

    loop {
        let end = (start + chunk_size).min(words.len());
        chunks.push(make_chunk(document_id, index, &words[start..end].join(" ")));
        index += 1;
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: format!("{}#{}", document_id, index),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_document("doc1", "a few words only", 10, 2);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "doc1#0");
        assert_eq!(chunks[0].text, "a few words only");
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(chunk_document("doc1", "", 10, 2).is_empty());
        assert!(chunk_document("doc1", "   \n\t ", 10, 2).is_empty());
    }

    #[test]
    fn test_windows_overlap() {
        // 10 words, size 4, overlap 1 => starts 0, 3, 6, ends at word 10
        let chunks = chunk_document("doc1", &words(10), 4, 1);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].text.ends_with("w3"));
        assert!(chunks[1].text.starts_with("w3"));
        assert!(chunks[2].text.ends_with("w9"));
    }

    #[test]
    fn test_indices_contiguous() {
        let chunks = chunk_document("doc1", &words(100), 10, 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64, "index mismatch at position {}", i);
            assert_eq!(c.id, format!("doc1#{}", i));
        }
    }

    #[test]
    fn test_deterministic() {
        let text = words(50);
        let a = chunk_document("doc1", &text, 8, 2);
        let b = chunk_document("doc1", &text, 8, 2);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.text, y.text);
            assert_eq!(x.hash, y.hash);
        }
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  a\n\nb\t c  "), "a b c");
        assert_eq!(normalize_text(""), "");
    }
}
