//! Score fusion: lexical + semantic candidates into one ranked list.

use std::collections::HashMap;

use policyrag_core::config::RetrievalSettings;
use policyrag_core::types::{Chunk, ChunkIdentity};

/// Weights and the personal-document multiplier used when fusing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionPolicy {
    pub lexical_weight: f32,
    /// Flat contribution for presence in the semantic set; similarity magnitude is ignored.
    pub semantic_weight: f32,
    pub personal_boost: f32,
}

impl Default for FusionPolicy {
    fn default() -> Self { Self { lexical_weight: 0.5, semantic_weight: 0.5, personal_boost: 1.5 } }
}

impl From<&RetrievalSettings> for FusionPolicy {
    fn from(s: &RetrievalSettings) -> Self {
        Self { lexical_weight: s.lexical_weight, semantic_weight: s.semantic_weight, personal_boost: s.personal_boost }
    }
}

impl FusionPolicy {
    pub fn boost_for(&self, chunk: &Chunk, prefer_personal: bool) -> f32 {
        if prefer_personal && chunk.is_personal() { self.personal_boost } else { 1.0 }
    }
}

/// A fused candidate; only lives for one retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub chunk: Chunk,
    pub score: f32,
    pub is_personal: bool,
}

struct Candidate {
    chunk: Chunk,
    lexical: f32,
    in_semantic: bool,
}

/// Fuse already-filtered candidate lists and return the top `k`.
///
/// `lexical` holds `(chunk, raw score)` in lexical rank order; `semantic` holds
/// chunks in similarity order. Lexical scores are divided by the largest raw
/// score present (1 when none is positive). Identities seen on both paths sum
/// their contributions; first-seen order breaks ties.
pub fn fuse(lexical: &[(Chunk, f32)], semantic: &[Chunk], prefer_personal: bool, k: usize, policy: &FusionPolicy) -> Vec<ScoredResult> {
    let max_raw = lexical.iter().map(|(_, s)| *s).fold(0.0f32, f32::max);
    let norm = if max_raw > 0.0 { max_raw } else { 1.0 };

    let mut candidates: Vec<Candidate> = Vec::with_capacity(lexical.len() + semantic.len());
    let mut slots: HashMap<ChunkIdentity, usize> = HashMap::new();

    for (chunk, raw) in lexical {
        let contribution = policy.lexical_weight * (raw / norm);
        match slots.get(&chunk.identity()) {
            Some(&i) => candidates[i].lexical = candidates[i].lexical.max(contribution),
            None => {
                slots.insert(chunk.identity(), candidates.len());
                candidates.push(Candidate { chunk: chunk.clone(), lexical: contribution, in_semantic: false });
            }
        }
    }
    for chunk in semantic {
        match slots.get(&chunk.identity()) {
            Some(&i) => candidates[i].in_semantic = true,
            None => {
                slots.insert(chunk.identity(), candidates.len());
                candidates.push(Candidate { chunk: chunk.clone(), lexical: 0.0, in_semantic: true });
            }
        }
    }

    let mut results: Vec<ScoredResult> = candidates
        .into_iter()
        .map(|c| {
            let combined = c.lexical + if c.in_semantic { policy.semantic_weight } else { 0.0 };
            let score = combined * policy.boost_for(&c.chunk, prefer_personal);
            let is_personal = c.chunk.is_personal();
            ScoredResult { chunk: c.chunk, score, is_personal }
        })
        .collect();
    // sort_by is stable: equal scores keep first-seen order
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(k);
    results
}
