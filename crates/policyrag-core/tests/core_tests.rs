use std::fs;

use tempfile::TempDir;

use policyrag_core::config::{ChunkingSettings, Config, Settings};
use policyrag_core::data_processor::{DataProcessor, TextSplitter};
use policyrag_core::traits::MetadataTagger;
use policyrag_core::types::{Chunk, ChunkMetadata, ChunkTags, DocumentClass, DocumentTags, MetadataFilter};

struct FixedTagger;

impl MetadataTagger for FixedTagger {
    fn tag_document(&self, _text: &str, filename: &str) -> DocumentTags {
        DocumentTags { policy_type: Some("homeowners".into()), policy_number: Some(format!("HO-{}", filename.len())), ..DocumentTags::default() }
    }

    fn tag_chunk(&self, content: &str) -> ChunkTags {
        ChunkTags { section: content.contains("Deductible").then(|| "Section 2".to_string()), page: None }
    }
}

#[test]
fn short_text_is_a_single_chunk() {
    let splitter = TextSplitter::new(1500, 200);
    let chunks = splitter.split("Short text\n");
    assert_eq!(chunks, vec!["Short text".to_string()]);
}

#[test]
fn long_text_splits_into_bounded_overlapping_windows() {
    let words: Vec<String> = (0..400).map(|i| format!("w{i:03}")).collect();
    let text = words.join(" ");
    let splitter = TextSplitter::new(200, 40);
    let chunks = splitter.split(&text);

    assert!(chunks.len() > 1);
    for c in &chunks { assert!(c.chars().count() <= 200, "window too long: {}", c.len()); }
    // consecutive windows share their boundary words
    for pair in chunks.windows(2) {
        let last_word = pair[0].split_whitespace().last().expect("non-empty window");
        assert!(pair[1].contains(last_word), "expected overlap on '{last_word}'");
    }
    // nothing is lost
    assert!(chunks.last().expect("chunks").ends_with("w399"));
}

#[test]
fn paragraphs_are_preferred_boundaries() {
    let para_a = "a".repeat(80);
    let para_b = "b".repeat(80);
    let text = format!("{para_a}\n\n{para_b}");
    let chunks = TextSplitter::new(100, 10).split(&text);
    assert_eq!(chunks, vec![para_a, para_b]);
}

#[test]
fn load_and_chunk_directory_tags_class_and_metadata() {
    let tmp = TempDir::new().expect("tmp");
    let dir = tmp.path();
    fs::write(dir.join("home.txt"), "Deductible is $2,500 for all covered losses.").expect("write");
    fs::write(dir.join("notes.pdf"), "ignored binary").expect("write");
    fs::create_dir(dir.join("nested")).expect("mkdir");
    fs::write(dir.join("nested").join("guide.md"), "# Guide\n\nFlood is excluded.").expect("write");

    let processor = DataProcessor::new(&ChunkingSettings::default());
    let docs = processor.load_documents(dir, DocumentClass::Personal).expect("load");
    assert_eq!(docs.len(), 2, "only .txt and .md are read");
    assert_eq!(docs[0].filename, "home.txt");

    let chunks = processor.chunk_document(&docs[0], &FixedTagger);
    assert_eq!(chunks.len(), 1);
    let c = &chunks[0];
    assert_eq!(c.id, "home.txt:0");
    assert_eq!(c.source, "home.txt");
    assert!(c.is_personal());
    assert_eq!(c.metadata.policy_type.as_deref(), Some("homeowners"));
    assert_eq!(c.metadata.section.as_deref(), Some("Section 2"));
    assert!(c.metadata.relevance_score.is_none());
}

#[test]
fn missing_directory_yields_no_documents() {
    let tmp = TempDir::new().expect("tmp");
    let docs = DataProcessor::default().load_documents(&tmp.path().join("absent"), DocumentClass::General).expect("load");
    assert!(docs.is_empty());
}

#[test]
fn filter_matches_type_case_insensitively_and_number_exactly() {
    let meta = ChunkMetadata { policy_type: Some("Homeowners".into()), policy_number: Some("HO-1234-56789".into()), ..ChunkMetadata::default() };
    assert!(MetadataFilter::default().matches(&meta));
    assert!(MetadataFilter::new(Some("HOMEOWNERS"), None).matches(&meta));
    assert!(MetadataFilter::new(Some("homeowners"), Some("HO-1234-56789")).matches(&meta));
    assert!(!MetadataFilter::new(Some("homeowners"), Some("ho-1234-56789")).matches(&meta));
    assert!(!MetadataFilter::new(Some("auto"), None).matches(&meta));
    assert!(MetadataFilter::new(Some("  "), None).is_empty());
}

#[test]
fn identity_uses_source_and_fifty_char_prefix() {
    let long = "x".repeat(60);
    let a = Chunk::new("a", "f.txt", format!("{long}tail-a"), ChunkMetadata::default());
    let b = Chunk::new("b", "f.txt", format!("{long}tail-b"), ChunkMetadata::default());
    let c = Chunk::new("c", "g.txt", format!("{long}tail-a"), ChunkMetadata::default());
    assert_eq!(a.identity(), b.identity());
    assert_ne!(a.identity(), c.identity());
    assert_eq!(a.identity().prefix.chars().count(), 50);
}

#[test]
fn settings_defaults_validate_and_env_overrides_apply() {
    Settings::default().validate().expect("defaults are valid");

    let figment = figment::Figment::from(figment::providers::Serialized::defaults(Settings::default()))
        .merge(figment::providers::Serialized::default("retrieval.default_k", 8))
        .merge(figment::providers::Serialized::default("retrieval.personal_boost", 0.5));
    let config = Config::from_figment(figment);
    let settings = config.settings().expect("extract");
    assert_eq!(settings.retrieval.default_k, 8);
    assert_eq!(config.get::<usize>("chunking.chunk_size").expect("get"), 1500);
    assert!(settings.validate().is_err(), "boost below 1.0 is rejected");
}
