use std::sync::Arc;

use serde::Deserialize;

use policyrag_core::config::ValidationSettings;
use policyrag_core::traits::Generator;

use crate::structured::{parse_structured, Structured};

const FAIL_OPEN_SCORE: f32 = 0.5;

const FACT_CHECK_PROMPT: &str = r#"You are a fact-checker. Your job is to verify if an answer is faithful to the given context.

CONTEXT:
{context}

QUESTION: {question}

ANSWER TO VALIDATE:
{answer}

Analyze if the answer contains ANY information not present in the context. Check for:
1. Fabricated policy numbers, amounts, or dates
2. Claims not supported by the context
3. Assumptions beyond what's stated

Respond with a single JSON object and nothing else:
{"faithful": true or false, "confidence": 0.0-1.0, "explanation": "brief explanation of your assessment"}"#;

/// Result of the fact-checking pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FaithfulnessVerdict {
    pub faithful: bool,
    pub score: f32,
    pub explanation: String,
}

impl FaithfulnessVerdict {
    fn fail_open(explanation: String) -> Self { Self { faithful: true, score: FAIL_OPEN_SCORE, explanation } }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

fn confidence_value(value: &serde_json::Value) -> Option<f32> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(|c| c as f32),
        serde_json::Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

impl Flag {
    fn is_yes(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "yes" | "true"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FactCheckReply {
    faithful: Flag,
    /// Number or numeric string; anything else falls back to the verdict default.
    #[serde(default)]
    confidence: Option<serde_json::Value>,
    #[serde(default)]
    explanation: Option<String>,
}

/// Asks the generator whether an answer is supported by its context.
///
/// Advisory only: generator failures and unparsable replies fail open at a
/// capped score instead of blocking the answer.
pub struct FaithfulnessChecker {
    generator: Arc<dyn Generator>,
    enabled: bool,
    context_chars: usize,
}

impl FaithfulnessChecker {
    pub fn new(generator: Arc<dyn Generator>, settings: &ValidationSettings) -> Self {
        Self { generator, enabled: settings.enable_faithfulness_check, context_chars: settings.faithfulness_context_chars }
    }

    pub fn check(&self, answer: &str, context: &str, question: &str) -> FaithfulnessVerdict {
        if !self.enabled {
            return FaithfulnessVerdict { faithful: true, score: 1.0, explanation: "Faithfulness check disabled".into() };
        }
        let context: String = context.chars().take(self.context_chars).collect();
        let prompt = FACT_CHECK_PROMPT
            .replace("{context}", &context)
            .replace("{question}", question)
            .replace("{answer}", answer);

        let reply = match self.generator.generate(&prompt, 0.0) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "faithfulness check failed; failing open");
                return FaithfulnessVerdict::fail_open(format!("Validation error: {e}"));
            }
        };
        match parse_structured::<FactCheckReply>(&reply) {
            Structured::Parsed(r) => {
                let faithful = r.faithful.is_yes();
                let fallback = if faithful { 0.7 } else { 0.3 };
                let score = r.confidence.as_ref().and_then(confidence_value).filter(|c| c.is_finite()).map_or(fallback, |c| c.clamp(0.0, 1.0));
                let explanation = r.explanation.filter(|e| !e.trim().is_empty()).unwrap_or_else(|| "Validation completed".into());
                FaithfulnessVerdict { faithful, score, explanation }
            }
            Structured::Unparsable(_) => {
                tracing::warn!("faithfulness reply was not valid JSON; failing open");
                FaithfulnessVerdict::fail_open("Validation error: unparsable fact-check reply".into())
            }
        }
    }
}
