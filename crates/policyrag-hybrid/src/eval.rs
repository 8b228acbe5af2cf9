//! Retrieval quality metrics over labelled questions.

use std::path::Path;

use serde::{Deserialize, Serialize};

use policyrag_core::types::{Chunk, MetadataFilter};
use policyrag_core::Result;

use crate::retriever::HybridRetriever;

/// One labelled question; a result is relevant when its source contains
/// any of `relevant_sources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalCase {
    pub question: String,
    pub relevant_sources: Vec<String>,
    #[serde(default)]
    pub policy_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub mrr: f32,
    pub ndcg: f32,
    pub precision_at_k: f32,
    pub num_test_cases: usize,
}

fn is_relevant(chunk: &Chunk, relevant: &[String]) -> bool {
    relevant.iter().any(|r| !r.is_empty() && chunk.source.contains(r.as_str()))
}

/// Reciprocal rank of the first result from `relevant_source`; 0 if none.
pub fn mrr(results: &[Chunk], relevant_source: &str) -> f32 {
    if relevant_source.is_empty() { return 0.0; }
    results
        .iter()
        .position(|c| c.source.contains(relevant_source))
        .map_or(0.0, |i| 1.0 / (i + 1) as f32)
}

/// NDCG with a linear `1 / (rank + 1)` discount (1-based rank). The ideal
/// DCG starts at 1, so several hits from one relevant source can push the
/// ratio above 1.
pub fn ndcg(results: &[Chunk], relevant_sources: &[String]) -> f32 {
    if results.is_empty() || relevant_sources.is_empty() { return 0.0; }
    let dcg: f32 = results
        .iter()
        .enumerate()
        .filter(|(_, c)| is_relevant(c, relevant_sources))
        .map(|(i, _)| 1.0 / (i + 2) as f32)
        .sum();
    let ideal: f32 = (0..relevant_sources.len().min(results.len())).map(|i| 1.0 / (i + 1) as f32).sum();
    if ideal > 0.0 { dcg / ideal } else { 0.0 }
}

/// Fraction of returned results that are relevant.
pub fn precision(results: &[Chunk], relevant_sources: &[String]) -> f32 {
    if results.is_empty() { return 0.0; }
    results.iter().filter(|c| is_relevant(c, relevant_sources)).count() as f32 / results.len() as f32
}

pub fn load_cases(path: &Path) -> Result<Vec<EvalCase>> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

/// Average the three metrics over `cases`, retrieving `k` chunks per question.
pub fn evaluate(retriever: &HybridRetriever, cases: &[EvalCase], k: usize) -> Result<EvalReport> {
    if cases.is_empty() { return Ok(EvalReport::default()); }
    let (mut mrr_sum, mut ndcg_sum, mut precision_sum) = (0.0f32, 0.0f32, 0.0f32);
    for case in cases {
        let filter = MetadataFilter::new(case.policy_type.as_deref(), None);
        let results = retriever.retrieve(&case.question, k, &filter, None)?;
        let first = case.relevant_sources.first().map_or("", String::as_str);
        mrr_sum += mrr(&results, first);
        ndcg_sum += ndcg(&results, &case.relevant_sources);
        precision_sum += precision(&results, &case.relevant_sources);
    }
    let n = cases.len() as f32;
    let report = EvalReport { mrr: mrr_sum / n, ndcg: ndcg_sum / n, precision_at_k: precision_sum / n, num_test_cases: cases.len() };
    tracing::info!(mrr = report.mrr, ndcg = report.ndcg, precision = report.precision_at_k, cases = report.num_test_cases, "retrieval evaluation");
    Ok(report)
}
