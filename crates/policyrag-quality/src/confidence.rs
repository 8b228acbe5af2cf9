use std::fmt;

use serde::{Deserialize, Serialize};

const RETRIEVAL_WEIGHT: f32 = 0.4;
const FAITHFULNESS_WEIGHT: f32 = 0.4;
const CITATION_WEIGHT: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            Self::High
        } else if score >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub score: f32,
    pub level: ConfidenceLevel,
}

impl Confidence {
    pub fn low(score: f32) -> Self { Self { score, level: ConfidenceLevel::Low } }

    /// Halve and force low when any number was flagged; unchanged otherwise.
    #[must_use]
    pub fn with_hallucination_override(self, flags: &[String]) -> Self {
        if flags.is_empty() { self } else { Self::low(self.score * 0.5) }
    }
}

/// `0.4·retrieval + 0.4·faithfulness + 0.2·(1.0 | 0.5)`, clamped to [0, 1].
///
/// Retrieval scores above 1 (boosted personal hits) saturate here.
pub fn compute_confidence(retrieval_score: f32, faithfulness_score: f32, has_citations: bool) -> Confidence {
    let citation = if has_citations { 1.0 } else { 0.5 };
    let score = (RETRIEVAL_WEIGHT * retrieval_score + FAITHFULNESS_WEIGHT * faithfulness_score + CITATION_WEIGHT * citation).clamp(0.0, 1.0);
    Confidence { score, level: ConfidenceLevel::from_score(score) }
}

/// Warning line appended to an answer whose numbers could not be verified.
pub fn hallucination_warning(flags: &[String]) -> Option<String> {
    if flags.is_empty() { return None; }
    let shown: Vec<&str> = flags.iter().take(2).map(String::as_str).collect();
    Some(format!("\n\n⚠️ Warning: Possible inconsistencies detected: {}", shown.join(", ")))
}

pub fn add_confidence_disclaimer(answer: &str, level: ConfidenceLevel, score: f32) -> String {
    match level {
        ConfidenceLevel::Low => format!(
            "{answer}\n\n⚠️ **Low Confidence ({score:.2})**: This answer has low confidence. Please verify with your actual policy documents or contact your insurance provider."
        ),
        ConfidenceLevel::Medium => format!(
            "{answer}\n\n📌 **Medium Confidence ({score:.2})**: This answer is based on available information, but consider verifying critical details with your policy documents."
        ),
        ConfidenceLevel::High => answer.to_string(),
    }
}
