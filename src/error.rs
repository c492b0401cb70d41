//! Error taxonomy for the retrieval and answering pipeline.
//!
//! Ingestion-time errors ([`RagError::DocumentParse`], [`RagError::EmptyDocument`])
//! are recorded per document and never abort a batch run. Query-time errors
//! ([`RagError::Embedding`], [`RagError::Generation`]) abort the single
//! `answer()` call with no session state mutated, so a retry is safe.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// The document's content could not be read or parsed.
    #[error("failed to parse document '{id}': {reason}")]
    DocumentParse { id: String, reason: String },

    /// The document produced no text after extraction and normalization.
    #[error("document '{id}' produced no text")]
    EmptyDocument { id: String },

    /// A vector handed to the index does not match its fixed dimension.
    /// The whole `add` batch is rejected.
    #[error("embedding dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The serialized index is unreadable or version-incompatible.
    /// The caller decides whether to rebuild from the corpus.
    #[error("corrupt or incompatible index: {0}")]
    CorruptIndex(String),

    /// The session id is unknown to the conversation manager.
    #[error("unknown session: {0}")]
    SessionNotFound(String),

    /// The embedding backend failed. Transient; the caller may retry.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// The generation backend failed. Transient; no turn was recorded.
    #[error("generation request failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
