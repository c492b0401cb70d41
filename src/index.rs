//! In-memory vector index with brute-force cosine search.
//!
//! Entries are owned by the index once inserted and only change as a
//! batch tied to their source document (`add` / `remove`). Search is
//! exhaustive cosine similarity over all stored vectors, most similar
//! first, with ties broken by insertion order.
//!
//! The on-disk format is a versioned JSON envelope; vectors are stored
//! as base64-wrapped little-endian f32 blobs. `load` distinguishes a
//! version-incompatible file from a corrupt one in its error message,
//! but both are [`RagError::CorruptIndex`] - the caller decides whether
//! to rebuild.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::RagError;
use crate::models::{Chunk, ScoredChunk};

pub const INDEX_FORMAT: &str = "lexrag-index";
pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    format: String,
    version: u32,
    dims: usize,
    entries: Vec<StoredEntry>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    chunk: Chunk,
    /// base64 of the little-endian f32 blob.
    vector: String,
}

pub struct VectorIndex {
    dims: usize,
    entries: Vec<Entry>,
}

impl VectorIndex {
    /// Create an empty index bound to a fixed embedding dimension.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            entries: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_document(&self, document_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.chunk.document_id == document_id)
    }

    /// Insert a batch of chunks with their embeddings.
    ///
    /// Atomic per call: every vector is validated against the index
    /// dimension before anything is inserted, so a mismatch rejects the
    /// whole batch and leaves the index unchanged.
    pub fn add(&mut self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<(), RagError> {
        if chunks.len() != vectors.len() {
            return Err(RagError::Embedding(format!(
                "got {} embeddings for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        for v in &vectors {
            if v.len() != self.dims {
                return Err(RagError::DimensionMismatch {
                    expected: self.dims,
                    actual: v.len(),
                });
            }
        }
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            self.entries.push(Entry { chunk, vector });
        }
        Ok(())
    }

    /// Top-`k` entries by cosine similarity, most similar first, ties
    /// broken by insertion order. Fewer than `k` entries returns all of
    /// them; an empty index returns an empty vector.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }

    /// Delete all entries belonging to a document. Returns the number
    /// removed. Used for re-ingestion.
    pub fn remove(&mut self, document_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.chunk.document_id != document_id);
        before - self.entries.len()
    }

    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = IndexFile {
            format: INDEX_FORMAT.to_string(),
            version: INDEX_VERSION,
            dims: self.dims,
            entries: self
                .entries
                .iter()
                .map(|e| StoredEntry {
                    chunk: e.chunk.clone(),
                    vector: BASE64.encode(vec_to_blob(&e.vector)),
                })
                .collect(),
        };

        let json = serde_json::to_string(&file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, RagError> {
        let raw = std::fs::read_to_string(path)?;

        let file: IndexFile = serde_json::from_str(&raw)
            .map_err(|e| RagError::CorruptIndex(format!("unreadable index file: {}", e)))?;

        if file.format != INDEX_FORMAT {
            return Err(RagError::CorruptIndex(format!(
                "unexpected format marker '{}'",
                file.format
            )));
        }
        if file.version != INDEX_VERSION {
            return Err(RagError::CorruptIndex(format!(
                "index version {} is not supported (expected {})",
                file.version, INDEX_VERSION
            )));
        }

        let mut entries = Vec::with_capacity(file.entries.len());
        for stored in file.entries {
            let blob = BASE64.decode(&stored.vector).map_err(|e| {
                RagError::CorruptIndex(format!("bad vector blob for {}: {}", stored.chunk.id, e))
            })?;
            let vector = blob_to_vec(&blob);
            if vector.len() != file.dims {
                return Err(RagError::CorruptIndex(format!(
                    "entry {} has dimension {} (index declares {})",
                    stored.chunk.id,
                    vector.len(),
                    file.dims
                )));
            }
            entries.push(Entry {
                chunk: stored.chunk,
                vector,
            });
        }

        Ok(Self {
            dims: file.dims,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, doc: &str, index: i64) -> Chunk {
        Chunk {
            id: id.to_string(),
            document_id: doc.to_string(),
            chunk_index: index,
            text: format!("text of {}", id),
            hash: String::new(),
        }
    }

    #[test]
    fn add_rejects_dimension_mismatch_wholesale() {
        let mut index = VectorIndex::new(3);
        let result = index.add(
            vec![chunk("a#0", "a", 0), chunk("a#1", "a", 1)],
            vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0]],
        );
        assert!(matches!(
            result,
            Err(RagError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        // Nothing from the failed batch was committed
        assert!(index.is_empty());
    }

    #[test]
    fn search_empty_index_returns_nothing() {
        let index = VectorIndex::new(2);
        assert!(index.search(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn search_returns_all_when_k_exceeds_len() {
        let mut index = VectorIndex::new(2);
        index
            .add(
                vec![chunk("a#0", "a", 0), chunk("a#1", "a", 1)],
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 10).len(), 2);
    }

    #[test]
    fn search_orders_by_similarity_then_insertion() {
        let mut index = VectorIndex::new(2);
        index
            .add(
                vec![
                    chunk("a#0", "a", 0),
                    chunk("a#1", "a", 1),
                    chunk("a#2", "a", 2),
                ],
                vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]],
            )
            .unwrap();
        let hits = index.search(&[1.0, 0.0], 3);
        assert_eq!(hits[0].chunk.id, "a#1");
        // Tie between a#1 and a#2 resolves by insertion order
        assert_eq!(hits[1].chunk.id, "a#2");
        assert_eq!(hits[2].chunk.id, "a#0");
    }

    #[test]
    fn remove_deletes_only_that_document() {
        let mut index = VectorIndex::new(1);
        index
            .add(
                vec![chunk("a#0", "a", 0), chunk("b#0", "b", 0)],
                vec![vec![1.0], vec![1.0]],
            )
            .unwrap();
        assert_eq!(index.remove("a"), 1);
        assert_eq!(index.len(), 1);
        assert!(!index.contains_document("a"));
        assert!(index.contains_document("b"));
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = VectorIndex::new(2);
        index
            .add(vec![chunk("a#0", "a", 0)], vec![vec![0.5, -1.5]])
            .unwrap();
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.dims(), 2);
        assert_eq!(loaded.len(), 1);
        let hits = loaded.search(&[0.5, -1.5], 1);
        assert_eq!(hits[0].chunk.id, "a#0");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "not json at all {{{").unwrap();
        assert!(matches!(
            VectorIndex::load(&path),
            Err(RagError::CorruptIndex(_))
        ));
    }

    #[test]
    fn load_rejects_wrong_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"format":"lexrag-index","version":99,"dims":2,"entries":[]}"#,
        )
        .unwrap();
        let err = VectorIndex::load(&path).unwrap_err();
        match err {
            RagError::CorruptIndex(msg) => assert!(msg.contains("version")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn load_rejects_wrong_format_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"format":"something-else","version":1,"dims":2,"entries":[]}"#,
        )
        .unwrap();
        assert!(matches!(
            VectorIndex::load(&path),
            Err(RagError::CorruptIndex(_))
        ));
    }
}
