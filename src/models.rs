//! Core data models used throughout lexrag.
//!
//! These types represent the documents, chunks, turns, and reports that
//! flow through the ingestion, retrieval, and conversation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source document after extraction and whitespace normalization.
///
/// Immutable once ingested. Re-ingesting the same `id` replaces the
/// document's chunks in the index.
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable identifier: path relative to the corpus root.
    pub id: String,
    /// File stem, used for display.
    pub title: String,
    /// Normalized body text.
    pub body: String,
    /// SHA-256 of the body, for staleness detection.
    pub content_hash: String,
    pub ingested_at: DateTime<Utc>,
}

/// A bounded span of a document's body text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `"{document_id}#{chunk_index}"` - unique within the index and
    /// stable across re-ingestion of identical content.
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of the chunk text.
    pub hash: String,
}

/// A chunk paired with its similarity score for one query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// One question/answer exchange in a session.
///
/// `evidence` lists the ids of the chunks whose text entered the prompt,
/// in descending similarity order. An empty list means the answer was
/// produced without retrieval support. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub evidence: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, evidence: Vec<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            evidence,
            created_at: Utc::now(),
        }
    }
}

/// A per-document failure recorded during batch ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct FailedDocument {
    pub id: String,
    pub reason: String,
}

/// Summary of an ingestion run. Failures are aggregated here rather than
/// aborting the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub documents_processed: usize,
    pub chunks_created: usize,
    pub documents_failed: Vec<FailedDocument>,
}
