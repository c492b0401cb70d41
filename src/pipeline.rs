//! The orchestrator tying sessions, retrieval, and generation together.
//!
//! [`RagPipeline`] owns the vector index, the session store, and the two
//! backend handles. Backends are injected as trait objects so tests can
//! substitute deterministic fakes.
//!
//! The index sits behind a `tokio::sync::RwLock`: `answer` takes a read
//! guard for search only, while `initialize`/`load_index` take the write
//! guard, so index mutation never interleaves with live queries. Appends
//! to one session are serialized by the session store; keeping at most
//! one in-flight `answer` per session is the caller's discipline.

use std::path::Path;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::embedding::{embed_query, Embedder};
use crate::error::RagError;
use crate::generation::Generator;
use crate::index::VectorIndex;
use crate::ingest;
use crate::models::{IngestReport, ScoredChunk, Turn};
use crate::prompt;
use crate::session::SessionStore;

pub struct RagPipeline {
    config: Config,
    embedder: Box<dyn Embedder>,
    generator: Box<dyn Generator>,
    index: RwLock<VectorIndex>,
    sessions: SessionStore,
}

impl RagPipeline {
    pub fn new(config: Config, embedder: Box<dyn Embedder>, generator: Box<dyn Generator>) -> Self {
        let dims = embedder.dims();
        Self {
            config,
            embedder,
            generator,
            index: RwLock::new(VectorIndex::new(dims)),
            sessions: SessionStore::new(),
        }
    }

    /// Restore a previously built index from `index.path`.
    ///
    /// Returns `false` when no index file exists yet; a file that exists
    /// but cannot be read fails with [`RagError::CorruptIndex`] and the
    /// caller decides whether to rebuild via [`RagPipeline::initialize`].
    pub async fn load_index(&self) -> Result<bool, RagError> {
        let path = &self.config.index.path;
        if !path.exists() {
            return Ok(false);
        }
        let loaded = VectorIndex::load(path)?;
        info!(entries = loaded.len(), path = %path.display(), "loaded vector index");
        *self.index.write().await = loaded;
        Ok(true)
    }

    /// Ingest every matching document under `sources` and persist the
    /// index to `index.path`. Per-document failures are reported, not
    /// fatal.
    pub async fn initialize(&self, sources: &Path) -> Result<IngestReport, RagError> {
        let mut index = self.index.write().await;
        let report =
            ingest::ingest_directory(&self.config, self.embedder.as_ref(), &mut index, sources)
                .await?;
        index.save(&self.config.index.path)?;
        Ok(report)
    }

    pub async fn index_len(&self) -> usize {
        self.index.read().await.len()
    }

    pub fn create_session(&self) -> String {
        self.sessions.create_session()
    }

    pub fn get_history(&self, session_id: &str) -> Result<Vec<Turn>, RagError> {
        self.sessions.get_history(session_id)
    }

    pub fn clear_session(&self, session_id: &str) -> Result<(), RagError> {
        self.sessions.clear_session(session_id)
    }

    pub fn delete_session(&self, session_id: &str) -> Result<(), RagError> {
        self.sessions.delete_session(session_id)
    }

    pub fn list_sessions(&self) -> Vec<String> {
        self.sessions.list_sessions()
    }

    /// Embed a query and return the raw top-`k` hits. Used by the CLI's
    /// retrieval inspection and by the answering flow.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        let query_vec = embed_query(self.embedder.as_ref(), query).await?;
        Ok(self.index.read().await.search(&query_vec, k))
    }

    /// Answer a question within a session.
    ///
    /// Retrieval folds the recent conversation tail into the query so
    /// follow-ups resolve against prior turns. An empty index (or no hit
    /// above `retrieval.min_score`) is not an error: generation proceeds
    /// on history alone and the turn's evidence list is empty. If the
    /// generation backend fails, no turn is appended and the session is
    /// unchanged, so a retry is safe.
    pub async fn answer(&self, session_id: &str, question: &str) -> Result<Turn, RagError> {
        let query_tail = self
            .sessions
            .recent_history(session_id, self.config.context.query_history_turns)?;
        let query = prompt::build_retrieval_query(&query_tail, question);
        debug!(session = %session_id, query_len = query.len(), "formed retrieval query");

        let query_vec = embed_query(self.embedder.as_ref(), &query).await?;
        let mut evidence = {
            let index = self.index.read().await;
            index.search(&query_vec, self.config.retrieval.top_k)
        };
        evidence.retain(|hit| hit.score >= self.config.retrieval.min_score);
        debug!(session = %session_id, retrieved = evidence.len(), "retrieval complete");

        let history_tail = self
            .sessions
            .recent_history(session_id, self.config.context.max_history_turns)?;
        let assembled = prompt::build_prompt(
            &history_tail,
            &evidence,
            question,
            self.config.context.prompt_budget_chars,
        );
        if assembled.dropped_evidence > 0 || assembled.dropped_turns > 0 {
            debug!(
                dropped_evidence = assembled.dropped_evidence,
                dropped_turns = assembled.dropped_turns,
                "prompt truncated to fit budget"
            );
        }

        let answer = self
            .generator
            .generate(
                &assembled.system,
                &assembled.user,
                self.config.generation.max_tokens,
            )
            .await?;

        let turn = Turn::new(question, answer, assembled.evidence_ids);
        self.sessions.append_turn(session_id, turn.clone())?;
        info!(session = %session_id, evidence = turn.evidence.len(), "recorded turn");
        Ok(turn)
    }
}
