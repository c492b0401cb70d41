//! Corpus ingestion: scan, extract, chunk, embed, index.
//!
//! Walks the corpus root for files matching the configured globs and
//! pushes each one through extraction, normalization, chunking, and
//! embedding before handing the batch to the index. A failing document
//! is recorded in the report and skipped; it never aborts the run.
//! Re-ingesting a document id replaces its previous chunks.

use std::path::{Path, PathBuf};

use chrono::Utc;
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::chunk::{chunk_document, normalize_text};
use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::RagError;
use crate::extract::extract_text;
use crate::index::VectorIndex;
use crate::models::{Document, FailedDocument, IngestReport};

pub async fn ingest_directory(
    config: &Config,
    embedder: &dyn Embedder,
    index: &mut VectorIndex,
    root: &Path,
) -> Result<IngestReport, RagError> {
    let include = build_globset(&config.ingest.include_globs)?;
    let mut report = IngestReport::default();

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if include.is_match(rel) {
            files.push(entry.path().to_path_buf());
        }
    }
    // Stable ingestion order regardless of directory traversal order
    files.sort();

    for path in &files {
        let doc_id = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        match ingest_file(config, embedder, index, path, &doc_id).await {
            Ok(chunk_count) => {
                report.documents_processed += 1;
                report.chunks_created += chunk_count;
            }
            Err(err) => {
                warn!(document = %doc_id, error = %err, "skipping document");
                report.documents_failed.push(FailedDocument {
                    id: doc_id,
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        documents = report.documents_processed,
        chunks = report.chunks_created,
        failed = report.documents_failed.len(),
        "ingestion complete"
    );
    Ok(report)
}

async fn ingest_file(
    config: &Config,
    embedder: &dyn Embedder,
    index: &mut VectorIndex,
    path: &Path,
    doc_id: &str,
) -> Result<usize, RagError> {
    let bytes = std::fs::read(path)?;
    let body = normalize_text(&extract_text(doc_id, path, &bytes)?);
    if body.is_empty() {
        return Err(RagError::EmptyDocument {
            id: doc_id.to_string(),
        });
    }

    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    let document = Document {
        id: doc_id.to_string(),
        title: path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| doc_id.to_string()),
        body,
        content_hash: format!("{:x}", hasher.finalize()),
        ingested_at: Utc::now(),
    };
    debug!(document = %document.id, title = %document.title, hash = %document.content_hash, "extracted");

    let chunks = chunk_document(
        &document.id,
        &document.body,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(config.embedding.batch_size.max(1)) {
        vectors.extend(embedder.embed(batch).await?);
    }

    // Replace any previous chunks for this document id
    let removed = index.remove(&document.id);
    if removed > 0 {
        debug!(document = %document.id, removed, "replacing previously indexed chunks");
    }

    let count = chunks.len();
    index.add(chunks, vectors)?;
    info!(document = %document.id, chunks = count, "indexed document");
    Ok(count)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, RagError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()).into())
}
