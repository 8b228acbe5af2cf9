use std::path::Path;

use policyrag_core::config::RetrievalSettings;
use policyrag_core::types::{Chunk, MetadataFilter};
use policyrag_core::Result;
use policyrag_text::LexicalIndex;

use crate::fusion::{fuse, FusionPolicy};
use crate::intent::is_personal_query;
use crate::semantic::SemanticRetriever;

/// Lexical + semantic retrieval with personal-document prioritization.
///
/// Either path may be missing (no lexical index yet, or an unbuilt vector
/// store); the other path still answers. Any other failure is returned.
pub struct HybridRetriever {
    lexical: Option<LexicalIndex>,
    semantic: SemanticRetriever,
    policy: FusionPolicy,
    hybrid_enabled: bool,
}

impl HybridRetriever {
    pub fn new(lexical: Option<LexicalIndex>, semantic: SemanticRetriever, policy: FusionPolicy) -> Self {
        Self { lexical, semantic, policy, hybrid_enabled: true }
    }

    /// Open the persisted lexical index at `lexical_dir` if there is one.
    pub fn open(settings: &RetrievalSettings, lexical_dir: &Path, semantic: SemanticRetriever) -> Result<Self> {
        let lexical = if settings.hybrid_enabled {
            match LexicalIndex::open(lexical_dir) {
                Ok(index) => Some(index),
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(error = %e, "lexical index unavailable; retrieval will be semantic-only");
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };
        Ok(Self { lexical, semantic, policy: FusionPolicy::from(settings), hybrid_enabled: settings.hybrid_enabled })
    }

    #[must_use]
    pub fn with_hybrid(mut self, enabled: bool) -> Self {
        self.hybrid_enabled = enabled;
        self
    }

    /// Swap in a freshly built lexical index (after ingestion).
    pub fn set_lexical(&mut self, lexical: Option<LexicalIndex>) { self.lexical = lexical; }

    pub fn lexical(&self) -> Option<&LexicalIndex> { self.lexical.as_ref() }

    pub fn semantic(&self) -> &SemanticRetriever { &self.semantic }

    pub fn policy(&self) -> &FusionPolicy { &self.policy }

    /// Top `k` chunks for `query`, each carrying its fused score as
    /// `relevance_score`. `prefer_personal` defaults to intent detection.
    pub fn retrieve(&self, query: &str, k: usize, filter: &MetadataFilter, prefer_personal: Option<bool>) -> Result<Vec<Chunk>> {
        if k == 0 { return Ok(vec![]); }
        let prefer_personal = prefer_personal.unwrap_or_else(|| is_personal_query(query));
        let candidates = k * 2;

        let lexical = match (&self.lexical, self.hybrid_enabled) {
            (Some(index), true) => index.search(query, candidates, filter)?,
            _ => vec![],
        };
        let semantic: Vec<Chunk> = match self.semantic.retrieve(query, candidates, filter) {
            Ok(hits) => hits.into_iter().map(|h| h.chunk).collect(),
            Err(e) if e.is_unavailable() => {
                tracing::warn!(error = %e, "semantic index unavailable; using lexical results only");
                vec![]
            }
            Err(e) => return Err(e),
        };

        let fused = fuse(&lexical, &semantic, prefer_personal, k, &self.policy);
        tracing::debug!(
            query,
            prefer_personal,
            lexical = lexical.len(),
            semantic = semantic.len(),
            returned = fused.len(),
            "hybrid retrieval"
        );
        Ok(fused.into_iter().map(|r| r.chunk.with_relevance(r.score)).collect())
    }
}
