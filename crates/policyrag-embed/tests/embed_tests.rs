use policyrag_core::config::EmbeddingSettings;
use policyrag_core::traits::Embedder;
use policyrag_embed::{get_default_embedder, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = HashEmbedder::new(256);
    let texts = vec!["flood damage exclusion".to_string(), "flood damage exclusion".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 2);
    assert_eq!(embs[0].len(), 256);

    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in embs[0].iter().zip(embs[1].iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_words_are_closer_than_disjoint_ones() {
    let embedder = HashEmbedder::new(512);
    let q = embedder.embed_query("flood damage").expect("query");
    let near = embedder.embed_query("flood damage is excluded").expect("near");
    let far = embedder.embed_query("roadside assistance hotline").expect("far");
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn hash_provider_is_selected_from_settings() {
    let settings = EmbeddingSettings { provider: "hash".into(), dim: 64, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.dim(), 64);
    assert_eq!(embedder.embed_query("deductible").expect("embed").len(), 64);
}

#[test]
fn unknown_provider_is_rejected() {
    if std::env::var("APP_USE_FAKE_EMBEDDINGS").is_ok() { return; }
    let settings = EmbeddingSettings { provider: "cloud".into(), ..EmbeddingSettings::default() };
    assert!(get_default_embedder(&settings).is_err());
}
