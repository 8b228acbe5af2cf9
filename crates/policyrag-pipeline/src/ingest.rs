//! Full rebuild of both indexes from the general and personal document
//! directories.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use policyrag_core::config::ChunkingSettings;
use policyrag_core::data_processor::{DataProcessor, SourceDocument};
use policyrag_core::traits::{Embedder, MetadataTagger, VectorStore};
use policyrag_core::types::{Chunk, DocumentClass, DocumentTags};
use policyrag_core::{Error, Result};
use policyrag_text::LexicalIndex;

use crate::models::IngestReport;

const UNKNOWN_POLICY_TYPE: &str = "unknown";

/// Filename keyword → policy type, checked in order.
const POLICY_TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("homeowner", "homeowners"),
    ("auto", "auto"),
    ("commercial", "commercial"),
    ("umbrella", "umbrella"),
    ("renter", "renters"),
];

/// Tags a document with a policy type guessed from its filename.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameTagger;

impl MetadataTagger for FilenameTagger {
    fn tag_document(&self, _text: &str, filename: &str) -> DocumentTags {
        let lower = filename.to_lowercase();
        let policy_type = POLICY_TYPE_KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map_or(UNKNOWN_POLICY_TYPE, |&(_, policy_type)| policy_type);
        DocumentTags { policy_type: Some(policy_type.to_string()), ..DocumentTags::default() }
    }
}

#[derive(Debug, Clone)]
pub struct IngestPaths {
    pub general_docs_dir: PathBuf,
    pub personal_docs_dir: PathBuf,
    pub lexical_index_dir: PathBuf,
}

pub struct Ingestor {
    paths: IngestPaths,
    processor: DataProcessor,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    tagger: Box<dyn MetadataTagger>,
    build_lexical: bool,
    batch_size: usize,
    show_progress: bool,
}

impl Ingestor {
    pub fn new(paths: IngestPaths, chunking: &ChunkingSettings, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            paths,
            processor: DataProcessor::new(chunking),
            embedder,
            store,
            tagger: Box::new(FilenameTagger),
            build_lexical: true,
            batch_size: 32,
            show_progress: true,
        }
    }

    #[must_use]
    pub fn with_tagger(mut self, tagger: Box<dyn MetadataTagger>) -> Self {
        self.tagger = tagger;
        self
    }

    #[must_use]
    pub fn with_lexical(mut self, enabled: bool) -> Self {
        self.build_lexical = enabled;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Load, chunk, embed and index everything. An empty corpus leaves the
    /// existing indexes untouched.
    pub fn ingest(&self) -> Result<IngestReport> {
        let general = self.processor.load_documents(&self.paths.general_docs_dir, DocumentClass::General)?;
        let personal = self.processor.load_documents(&self.paths.personal_docs_dir, DocumentClass::Personal)?;
        let documents_processed = general.len() + personal.len();

        if documents_processed == 0 {
            tracing::warn!("no documents to ingest");
            return Ok(IngestReport {
                message: "No documents found. Please add default insurance knowledge documents.".into(),
                ..IngestReport::default()
            });
        }
        tracing::info!(general = general.len(), personal = personal.len(), "documents loaded");

        let chunks: Vec<Chunk> = general
            .iter()
            .chain(personal.iter())
            .flat_map(|doc: &SourceDocument| self.processor.chunk_document(doc, self.tagger.as_ref()))
            .collect();
        let policy_types_found: Vec<String> = chunks
            .iter()
            .filter_map(|c| c.metadata.policy_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let embeddings = self.embed_all(&chunks)?;
        self.store.index(&chunks, &embeddings)?;
        if self.build_lexical {
            LexicalIndex::build_in_dir(&self.paths.lexical_index_dir, chunks.clone())?;
        }

        let report = IngestReport {
            chunks_count: chunks.len(),
            documents_processed,
            general_docs_count: general.len(),
            personal_docs_count: personal.len(),
            policy_types_found,
            message: format!(
                "Successfully ingested {} chunks from {} documents ({} default, {} personal).",
                chunks.len(),
                documents_processed,
                general.len(),
                personal.len()
            ),
        };
        tracing::info!(chunks = report.chunks_count, documents = report.documents_processed, "ingestion complete");
        Ok(report)
    }

    fn embed_all(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let pb = if self.show_progress { ProgressBar::new(chunks.len() as u64) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}") {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("embedding");

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).map_err(Error::collaborator)?;
            if vectors.len() != texts.len() {
                return Err(Error::Collaborator(format!("embedder returned {} vectors for {} texts", vectors.len(), texts.len())));
            }
            embeddings.extend(vectors);
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("embedded");
        Ok(embeddings)
    }
}
