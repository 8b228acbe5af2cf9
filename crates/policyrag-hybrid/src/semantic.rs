use std::sync::Arc;

use policyrag_core::traits::{Embedder, VectorStore};
use policyrag_core::types::{MetadataFilter, SimilarityHit};
use policyrag_core::{Error, Result};

/// Embeds the query and asks the vector store for its nearest chunks.
#[derive(Clone)]
pub struct SemanticRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl SemanticRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self { Self { embedder, store } }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    pub fn store(&self) -> &Arc<dyn VectorStore> { &self.store }

    /// At most `k` hits, most similar first. An unbuilt store is
    /// [`Error::IndexUnavailable`]; embedding failures are collaborator errors.
    pub fn retrieve(&self, query: &str, k: usize, filter: &MetadataFilter) -> Result<Vec<SimilarityHit>> {
        if k == 0 { return Ok(vec![]); }
        let query_vec = self.embedder.embed_query(query).map_err(Error::collaborator)?;
        let mut hits = self.store.search(&query_vec, k, filter)?;
        hits.truncate(k);
        Ok(hits)
    }
}
