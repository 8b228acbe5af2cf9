use parking_lot::RwLock;

use policyrag_core::traits::VectorStore;
use policyrag_core::types::{Chunk, MetadataFilter, SimilarityHit};
use policyrag_core::{Error, Result};

/// Brute-force cosine store held in memory.
///
/// Unavailable until the first `index` call; each `index` replaces the
/// previous contents.
#[derive(Default)]
pub struct InMemoryVectorStore {
    rows: RwLock<Option<Vec<(Chunk, Vec<f32>)>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.rows.read().as_ref().map_or(0, Vec::len) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl VectorStore for InMemoryVectorStore {
    fn index(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(Error::operation(format!("{} chunks but {} embeddings", chunks.len(), embeddings.len())));
        }
        let rows = chunks.iter().cloned().zip(embeddings.iter().cloned()).collect();
        *self.rows.write() = Some(rows);
        Ok(())
    }

    fn search(&self, query_vec: &[f32], k: usize, filter: &MetadataFilter) -> Result<Vec<SimilarityHit>> {
        let guard = self.rows.read();
        let rows = guard.as_ref().ok_or_else(|| Error::IndexUnavailable("in-memory vector store has not been built".into()))?;
        let mut hits: Vec<SimilarityHit> = rows
            .iter()
            .filter(|(chunk, _)| filter.matches(&chunk.metadata))
            .map(|(chunk, vec)| SimilarityHit { chunk: chunk.clone(), similarity: cosine(query_vec, vec) })
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(k);
        Ok(hits)
    }
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}
