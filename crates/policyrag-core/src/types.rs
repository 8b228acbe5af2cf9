//! Domain types shared by the lexical, semantic and validation engines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ChunkId = String;
pub type Meta = BTreeMap<String, String>;

/// Number of leading content characters that, together with the source,
/// identify a chunk across the lexical and semantic result sets.
pub const IDENTITY_PREFIX_CHARS: usize = 50;

/// Whether a document is the user's own policy or general reference material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentClass {
    Personal,
    #[default]
    General,
}

impl DocumentClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "personal" => Some(Self::Personal),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Flat metadata record attached to every chunk.
///
/// `relevance_score` is empty at ingestion and filled in by the fusion engine
/// on the copies it returns; everything else is fixed when the chunk is made.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub policy_type: Option<String>,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub document_class: DocumentClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: Meta,
}

/// A windowed slice of a source document; the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    /// Source filename the chunk was cut from.
    pub source: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(id: impl Into<ChunkId>, source: impl Into<String>, content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { id: id.into(), source: source.into(), content: content.into(), metadata }
    }

    pub fn is_personal(&self) -> bool { self.metadata.document_class == DocumentClass::Personal }

    pub fn relevance(&self) -> f32 { self.metadata.relevance_score.unwrap_or(0.0) }

    pub fn identity(&self) -> ChunkIdentity {
        ChunkIdentity {
            source: self.source.clone(),
            prefix: self.content.chars().take(IDENTITY_PREFIX_CHARS).collect(),
        }
    }

    #[must_use]
    pub fn with_relevance(mut self, score: f32) -> Self {
        self.metadata.relevance_score = Some(score);
        self
    }
}

/// De-duplication key: (source, first [`IDENTITY_PREFIX_CHARS`] characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkIdentity {
    pub source: String,
    pub prefix: String,
}

/// Optional metadata predicate; both parts are conjoined when present.
///
/// Policy type compares case-insensitively, policy number exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub policy_type: Option<String>,
    pub policy_number: Option<String>,
}

impl MetadataFilter {
    pub fn new(policy_type: Option<&str>, policy_number: Option<&str>) -> Self {
        Self {
            policy_type: policy_type.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase),
            policy_number: policy_number.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool { self.policy_type.is_none() && self.policy_number.is_none() }

    pub fn matches(&self, meta: &ChunkMetadata) -> bool {
        if let Some(want) = &self.policy_type {
            match &meta.policy_type {
                Some(have) if have.eq_ignore_ascii_case(want) => {}
                _ => return false,
            }
        }
        if let Some(want) = &self.policy_number {
            if meta.policy_number.as_deref() != Some(want.as_str()) { return false; }
        }
        true
    }
}

/// One semantic search result: a chunk plus the store's similarity for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Per-document tags produced by a [`crate::traits::MetadataTagger`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTags {
    pub policy_type: Option<String>,
    pub policy_number: Option<String>,
    pub extra: Meta,
}

/// Per-chunk location tags (section heading, page label).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkTags {
    pub section: Option<String>,
    pub page: Option<String>,
}

/// One query's worth of pipeline measurements, handed to a metrics sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub question: String,
    pub endpoint: String,
    pub response_time_ms: u64,
    pub token_count: Option<usize>,
    pub confidence_score: Option<f32>,
    pub confidence_level: Option<String>,
    pub retrieval_score: Option<f32>,
    pub num_docs: Option<usize>,
    pub faithfulness_score: Option<f32>,
    pub success: bool,
    pub error_message: Option<String>,
}
