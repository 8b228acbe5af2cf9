use std::fs;
use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use policyrag_core::types::{Chunk, MetadataFilter};
use policyrag_core::{Error, Result};

use crate::tantivy_utils::{build_schema, register_tokenizer, ORD_FIELD, TEXT_FIELD};

const CHUNKS_FILE: &str = "chunks.json";
const TANTIVY_DIR: &str = "tantivy";
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Lowercase + whitespace split; the only normalization applied to queries.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_ascii_whitespace().map(str::to_lowercase).collect()
}

/// BM25 index over a fixed chunk set.
///
/// Tantivy documents carry the chunk's ordinal, so scores can be reported
/// per chunk in insertion order. The chunk list itself is kept alongside
/// (`chunks.json` on disk) because fusion needs the full chunk back.
pub struct LexicalIndex {
    reader: IndexReader,
    text_field: Field,
    ord_field: Field,
    chunks: Vec<Chunk>,
}

impl LexicalIndex {
    /// Build an in-memory index over `chunks`.
    pub fn build(chunks: Vec<Chunk>) -> Result<Self> {
        Self::populate(Index::create_in_ram(build_schema()), chunks)
    }

    /// Wipe `dir` and build a persistent index there.
    pub fn build_in_dir(dir: &Path, chunks: Vec<Chunk>) -> Result<Self> {
        if dir.exists() { fs::remove_dir_all(dir)?; }
        let tantivy_dir = dir.join(TANTIVY_DIR);
        fs::create_dir_all(&tantivy_dir)?;
        let index = Index::create_in_dir(&tantivy_dir, build_schema()).map_err(Error::operation)?;
        let built = Self::populate(index, chunks)?;
        // written last: its presence marks a complete build
        fs::write(dir.join(CHUNKS_FILE), serde_json::to_vec(&built.chunks)?)?;
        tracing::info!(dir = %dir.display(), chunks = built.chunks.len(), "lexical index built");
        Ok(built)
    }

    /// Reopen an index written by [`LexicalIndex::build_in_dir`].
    pub fn open(dir: &Path) -> Result<Self> {
        let chunks_path = dir.join(CHUNKS_FILE);
        let tantivy_dir = dir.join(TANTIVY_DIR);
        if !chunks_path.exists() || !tantivy_dir.join("meta.json").exists() {
            return Err(Error::IndexUnavailable(format!("no lexical index at {}", dir.display())));
        }
        let chunks: Vec<Chunk> = serde_json::from_slice(&fs::read(&chunks_path)?)?;
        let index = Index::open_in_dir(&tantivy_dir).map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        register_tokenizer(&index);
        let opened = Self::from_index(&index, chunks)?;
        let num_docs = opened.reader.searcher().num_docs();
        if num_docs != opened.chunks.len() as u64 {
            return Err(Error::IndexUnavailable(format!(
                "lexical index at {} is incomplete ({num_docs} documents for {} chunks)",
                dir.display(),
                opened.chunks.len()
            )));
        }
        Ok(opened)
    }

    fn populate(index: Index, chunks: Vec<Chunk>) -> Result<Self> {
        register_tokenizer(&index);
        let schema = index.schema();
        let text_field = schema.get_field(TEXT_FIELD).map_err(Error::operation)?;
        let ord_field = schema.get_field(ORD_FIELD).map_err(Error::operation)?;
        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES).map_err(Error::operation)?;
        for (ord, chunk) in chunks.iter().enumerate() {
            writer
                .add_document(doc!(ord_field => ord as u64, text_field => chunk.content.clone()))
                .map_err(Error::operation)?;
        }
        writer.commit().map_err(Error::operation)?;
        Self::from_index(&index, chunks)
    }

    fn from_index(index: &Index, chunks: Vec<Chunk>) -> Result<Self> {
        let schema = index.schema();
        let text_field = schema.get_field(TEXT_FIELD).map_err(Error::operation)?;
        let ord_field = schema.get_field(ORD_FIELD).map_err(Error::operation)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(Error::operation)?;
        Ok(Self { reader, text_field, ord_field, chunks })
    }

    pub fn chunks(&self) -> &[Chunk] { &self.chunks }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    /// One BM25 score per chunk, in chunk order; 0 where no token occurs.
    pub fn score(&self, query_tokens: &[String]) -> Result<Vec<f32>> {
        let mut scores = vec![0.0f32; self.chunks.len()];
        if self.chunks.is_empty() || query_tokens.is_empty() { return Ok(scores); }

        let clauses: Vec<(Occur, Box<dyn Query>)> = query_tokens
            .iter()
            .map(|token| {
                let term = Term::from_field_text(self.text_field, &token.to_lowercase());
                (Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
            })
            .collect();
        let query = BooleanQuery::new(clauses);
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(self.chunks.len())).map_err(Error::operation)?;
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr).map_err(Error::operation)?;
            let ord = doc.get_first(self.ord_field).and_then(|v| v.as_u64());
            if let Some(slot) = ord.and_then(|o| scores.get_mut(o as usize)) { *slot = score; }
        }
        Ok(scores)
    }

    /// Top `n` chunks with a positive score that pass `filter`, best first;
    /// equal scores keep chunk order.
    pub fn search(&self, query: &str, n: usize, filter: &MetadataFilter) -> Result<Vec<(Chunk, f32)>> {
        let scores = self.score(&tokenize(query))?;
        let mut hits: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|(i, s)| *s > 0.0 && filter.matches(&self.chunks[*i].metadata))
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits.truncate(n);
        tracing::debug!(query, hits = hits.len(), "lexical search");
        Ok(hits.into_iter().map(|(i, s)| (self.chunks[i].clone(), s)).collect())
    }
}
