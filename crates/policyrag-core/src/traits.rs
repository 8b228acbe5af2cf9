use crate::types::{Chunk, ChunkTags, DocumentTags, MetadataFilter, QueryMetrics, SimilarityHit};

/// Text → vector. Implementations return L2-normalized vectors of `dim()`.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))
    }
}

/// Nearest-neighbour index over chunk embeddings.
///
/// `search` returns at most `k` hits ordered by descending similarity, with
/// the filter applied before ranking. A store that has never been built
/// answers with [`crate::Error::IndexUnavailable`].
pub trait VectorStore: Send + Sync {
    fn index(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> crate::Result<()>;
    fn search(&self, query_vec: &[f32], k: usize, filter: &MetadataFilter) -> crate::Result<Vec<SimilarityHit>>;
}

/// Prompt → text. Used for answer synthesis and for fact-checking.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str, temperature: f32) -> anyhow::Result<String>;
}

/// Opaque document tagging collaborator run at ingestion.
pub trait MetadataTagger: Send + Sync {
    fn tag_document(&self, text: &str, filename: &str) -> DocumentTags;

    fn tag_chunk(&self, _content: &str) -> ChunkTags { ChunkTags::default() }
}

/// Receives one record per answered (or refused, or failed) query.
pub trait MetricsSink: Send + Sync {
    fn log_query(&self, metrics: &QueryMetrics);
}
