use policyrag_core::config::RetrievalSettings;
use policyrag_core::types::Chunk;

/// Whether the retrieved evidence is strong enough to answer from.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityVerdict {
    pub sufficient: bool,
    pub average_score: f32,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityGate {
    min_relevance: f32,
}

impl Default for QualityGate {
    fn default() -> Self { Self::new(0.5) }
}

impl From<&RetrievalSettings> for QualityGate {
    fn from(s: &RetrievalSettings) -> Self { Self::new(s.min_relevance_score) }
}

impl QualityGate {
    pub fn new(min_relevance: f32) -> Self { Self { min_relevance } }

    pub fn min_relevance(&self) -> f32 { self.min_relevance }

    /// Mean relevance (missing scores count as 0) against the threshold;
    /// only a strictly lower mean is insufficient.
    pub fn assess(&self, chunks: &[Chunk]) -> QualityVerdict {
        if chunks.is_empty() {
            return QualityVerdict {
                sufficient: false,
                average_score: 0.0,
                message: "No relevant documents found in the knowledge base.".into(),
            };
        }
        let average_score = chunks.iter().map(Chunk::relevance).sum::<f32>() / chunks.len() as f32;
        if average_score < self.min_relevance {
            return QualityVerdict {
                sufficient: false,
                average_score,
                message: format!("Retrieved documents have low relevance (score: {average_score:.2}). The answer may not be reliable."),
            };
        }
        QualityVerdict { sufficient: true, average_score, message: "Retrieval quality is good.".into() }
    }

    /// `(should_answer, reason)`; the reason is empty when answering.
    pub fn decide(&self, chunks: &[Chunk], verdict: &QualityVerdict) -> (bool, String) {
        if chunks.is_empty() {
            return (false, "No relevant policy documents found. Please ensure documents have been ingested.".into());
        }
        if !verdict.sufficient {
            return (false, format!("Insufficient context to provide a reliable answer. {}", verdict.message));
        }
        (true, String::new())
    }

    pub fn assess_and_decide(&self, chunks: &[Chunk]) -> (bool, String) {
        let verdict = self.assess(chunks);
        self.decide(chunks, &verdict)
    }
}

/// Refusal shown instead of a generated answer when the gate vetoes.
pub fn insufficient_context_response(question: &str, reason: &str) -> String {
    format!(
        "I don't have enough information in the available policy documents to answer your question reliably.

**Your Question:** {question}

**Issue:** {reason}

**Suggestions:**
- Ensure policy documents have been ingested (run the ingest command)
- Try rephrasing your question with more specific terms
- Check if your question relates to policies in the database
- For critical decisions, always verify with your actual policy documents or insurance provider
"
    )
}
