use std::sync::Arc;

use policyrag_core::config::RetrievalSettings;
use policyrag_core::traits::{Embedder, VectorStore};
use policyrag_core::types::{Chunk, ChunkMetadata, DocumentClass, MetadataFilter};
use policyrag_embed::HashEmbedder;
use policyrag_hybrid::eval::{evaluate, mrr, ndcg, precision, EvalCase};
use policyrag_hybrid::{FusionPolicy, HybridRetriever, SemanticRetriever};
use policyrag_text::LexicalIndex;
use policyrag_vector::InMemoryVectorStore;

const DIM: usize = 256;

fn chunk(id: &str, source: &str, content: &str, policy_type: &str, class: DocumentClass) -> Chunk {
    let metadata = ChunkMetadata { policy_type: Some(policy_type.into()), document_class: class, ..ChunkMetadata::default() };
    Chunk::new(id, source, content, metadata)
}

fn corpus() -> Vec<Chunk> {
    vec![
        chunk("g0", "home_guide.txt", "A deductible is the amount you pay before coverage applies", "homeowners", DocumentClass::General),
        chunk("p0", "my_home_policy.txt", "Your deductible is $2,500 for all covered losses", "homeowners", DocumentClass::Personal),
        chunk("g1", "auto_guide.txt", "Collision coverage pays for damage to your car", "auto", DocumentClass::General),
        chunk("g2", "flood_guide.txt", "Flood damage is excluded from standard homeowners policies", "homeowners", DocumentClass::General),
    ]
}

fn semantic(chunks: &[Chunk], build_store: bool) -> SemanticRetriever {
    let embedder = Arc::new(HashEmbedder::new(DIM));
    let store = Arc::new(InMemoryVectorStore::new());
    if build_store {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).expect("embed");
        store.index(chunks, &embeddings).expect("index");
    }
    SemanticRetriever::new(embedder, store)
}

fn retriever(build_store: bool, with_lexical: bool) -> HybridRetriever {
    let chunks = corpus();
    let lexical = with_lexical.then(|| LexicalIndex::build(chunks.clone()).expect("lexical"));
    HybridRetriever::new(lexical, semantic(&chunks, build_store), FusionPolicy::default())
}

#[test]
fn retrieve_returns_at_most_k_scored_chunks() {
    let r = retriever(true, true);
    let results = r.retrieve("deductible coverage", 3, &MetadataFilter::default(), None).expect("retrieve");
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|c| c.metadata.relevance_score.is_some()));
    assert!(results.windows(2).all(|w| w[0].relevance() >= w[1].relevance()));
}

#[test]
fn personal_questions_put_personal_policies_first() {
    let r = retriever(true, true);
    let results = r.retrieve("what is my deductible", 2, &MetadataFilter::default(), None).expect("retrieve");
    assert_eq!(results[0].id, "p0");

    let forced = r.retrieve("deductible", 4, &MetadataFilter::default(), Some(true)).expect("retrieve");
    assert_eq!(forced[0].id, "p0");
}

#[test]
fn filter_drops_candidates_from_both_paths() {
    let r = retriever(true, true);
    let results = r.retrieve("coverage damage", 4, &MetadataFilter::new(Some("Auto"), None), None).expect("retrieve");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "g1");
}

#[test]
fn missing_lexical_index_degrades_to_semantic_only() {
    let r = retriever(true, false);
    let results = r.retrieve("flood damage", 2, &MetadataFilter::default(), Some(false)).expect("retrieve");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|c| (c.relevance() - 0.5).abs() < 1e-6));
}

#[test]
fn unbuilt_vector_store_degrades_to_lexical_only() {
    let r = retriever(false, true);
    let results = r.retrieve("flood", 4, &MetadataFilter::default(), Some(false)).expect("retrieve");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "g2");
    assert!((results[0].relevance() - 0.5).abs() < 1e-6);
}

#[test]
fn nothing_indexed_anywhere_is_an_empty_result() {
    let r = retriever(false, false);
    assert!(r.retrieve("flood", 4, &MetadataFilter::default(), None).expect("retrieve").is_empty());
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn dim(&self) -> usize { DIM }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { anyhow::bail!("embedding service down") }
}

#[test]
fn embedding_failures_propagate() {
    let semantic = SemanticRetriever::new(Arc::new(FailingEmbedder), Arc::new(InMemoryVectorStore::new()));
    let r = HybridRetriever::new(Some(LexicalIndex::build(corpus()).expect("lexical")), semantic, FusionPolicy::default());
    let err = r.retrieve("flood", 4, &MetadataFilter::default(), None).expect_err("should fail");
    assert!(!err.is_unavailable());
    assert!(err.to_string().contains("embedding service down"));
}

#[test]
fn open_without_persisted_lexical_index_is_semantic_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chunks = corpus();
    let r = HybridRetriever::open(&RetrievalSettings::default(), &dir.path().join("lexical"), semantic(&chunks, true)).expect("open");
    assert!(r.lexical().is_none());
    assert_eq!(r.policy(), &FusionPolicy::default());
}

#[test]
fn repeated_retrieval_is_stable() {
    let r = retriever(true, true);
    let first = r.retrieve("coverage", 4, &MetadataFilter::default(), None).expect("retrieve");
    for _ in 0..3 {
        assert_eq!(r.retrieve("coverage", 4, &MetadataFilter::default(), None).expect("retrieve"), first);
    }
}

#[test]
fn metrics_match_hand_computed_values() {
    let chunks = corpus();
    assert_eq!(mrr(&chunks, "auto_guide"), 1.0 / 3.0);
    assert_eq!(mrr(&chunks, "missing"), 0.0);
    let relevant = vec!["home".to_string()];
    // relevant at ranks 1 and 2; ideal counts a single relevant source
    let expected = (1.0 / 2.0 + 1.0 / 3.0) / 1.0;
    assert!((ndcg(&chunks, &relevant) - expected).abs() < 1e-6);
    assert!((precision(&chunks, &relevant) - 0.5).abs() < 1e-6);
    assert_eq!(precision(&[], &relevant), 0.0);
}

#[test]
fn evaluate_averages_over_cases() {
    let r = retriever(true, true);
    let cases = vec![
        EvalCase { question: "collision coverage car".into(), relevant_sources: vec!["auto_guide.txt".into()], policy_type: Some("auto".into()) },
        EvalCase { question: "flood excluded".into(), relevant_sources: vec!["nowhere.txt".into()], policy_type: None },
    ];
    let report = evaluate(&r, &cases, 3).expect("evaluate");
    assert_eq!(report.num_test_cases, 2);
    assert!((report.mrr - 0.5).abs() < 1e-6);
}
