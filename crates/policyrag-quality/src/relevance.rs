use serde::Deserialize;

use policyrag_core::traits::Generator;

use crate::structured::{parse_structured, Structured};

const RELEVANCE_PROMPT: &str = r#"Evaluate if the answer is relevant to the question.

QUESTION: {question}

ANSWER: {answer}

Rate the relevance on a scale of 0.0 to 1.0:
- 1.0: Directly answers the question
- 0.7-0.9: Partially answers with some relevant information
- 0.4-0.6: Tangentially related but misses key points
- 0.0-0.3: Not relevant or completely off-topic

Respond with a single JSON object and nothing else:
{"score": 0.0-1.0, "explanation": "brief explanation"}"#;

#[derive(Debug, Deserialize)]
struct RelevanceReply {
    score: f32,
    #[serde(default)]
    explanation: String,
}

/// LLM-judged answer relevance in [0, 1]; 0.5 with an error note when the
/// judge fails or replies off-schema.
pub fn evaluate_answer_relevance(generator: &dyn Generator, question: &str, answer: &str) -> (f32, String) {
    let prompt = RELEVANCE_PROMPT.replace("{question}", question).replace("{answer}", answer);
    match generator.generate(&prompt, 0.0) {
        Ok(reply) => match parse_structured::<RelevanceReply>(&reply) {
            Structured::Parsed(r) => (r.score.clamp(0.0, 1.0), r.explanation),
            Structured::Unparsable(_) => (0.5, "Evaluation error: unparsable relevance reply".into()),
        },
        Err(e) => (0.5, format!("Evaluation error: {e}")),
    }
}
