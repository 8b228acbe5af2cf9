use std::sync::Arc;

use parking_lot::Mutex;
use policyrag_core::config::ValidationSettings;
use policyrag_core::traits::Generator;
use policyrag_core::types::{Chunk, ChunkMetadata};
use policyrag_quality::{
    add_confidence_disclaimer, compute_confidence, evaluate_answer_relevance, find_hallucinated_numbers, hallucination_warning,
    insufficient_context_response, parse_structured, ConfidenceLevel, FaithfulnessChecker, QualityGate, Structured,
};
use serde::Deserialize;

fn scored(score: Option<f32>) -> Chunk {
    let metadata = ChunkMetadata { relevance_score: score, ..ChunkMetadata::default() };
    Chunk::new("id", "policy.txt", "text", metadata)
}

struct ScriptedGenerator {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn ok(reply: &str) -> Arc<Self> { Arc::new(Self { reply: Ok(reply.into()), prompts: Mutex::new(vec![]) }) }
    fn failing(msg: &str) -> Arc<Self> { Arc::new(Self { reply: Err(msg.into()), prompts: Mutex::new(vec![]) }) }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, prompt: &str, _temperature: f32) -> anyhow::Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.reply.clone().map_err(anyhow::Error::msg)
    }
}

fn checker(generator: Arc<ScriptedGenerator>) -> FaithfulnessChecker {
    FaithfulnessChecker::new(generator, &ValidationSettings::default())
}

// ---- quality gate ----

#[test]
fn empty_chunks_never_answer() {
    let gate = QualityGate::default();
    let verdict = gate.assess(&[]);
    assert!(!verdict.sufficient);
    assert_eq!(verdict.average_score, 0.0);
    assert_eq!(verdict.message, "No relevant documents found in the knowledge base.");
    let (answer, reason) = gate.assess_and_decide(&[]);
    assert!(!answer);
    assert!(reason.starts_with("No relevant policy documents found"));
}

#[test]
fn threshold_is_strict_less_than() {
    let gate = QualityGate::new(0.5);
    assert!(gate.assess(&[scored(Some(0.5)), scored(Some(0.5))]).sufficient);
    assert!(gate.assess(&[scored(Some(0.9)), scored(Some(1.2))]).sufficient);
    assert!(!gate.assess(&[scored(Some(0.49)), scored(Some(0.1))]).sufficient);
}

#[test]
fn missing_scores_count_as_zero() {
    let verdict = QualityGate::new(0.5).assess(&[scored(Some(0.8)), scored(None)]);
    assert!((verdict.average_score - 0.4).abs() < 1e-6);
    assert!(!verdict.sufficient);
}

#[test]
fn insufficient_reason_embeds_the_average() {
    let gate = QualityGate::new(0.5);
    let chunks = vec![scored(Some(0.25))];
    let (answer, reason) = gate.assess_and_decide(&chunks);
    assert!(!answer);
    assert!(reason.starts_with("Insufficient context to provide a reliable answer."));
    assert!(reason.contains("(score: 0.25)"));
    assert_eq!(gate.assess_and_decide(&[scored(Some(0.75))]), (true, String::new()));
}

#[test]
fn refusal_template_cites_question_and_reason() {
    let text = insufficient_context_response("Is hail covered?", "No relevant policy documents found.");
    assert!(text.starts_with("I don't have enough information"));
    assert!(text.contains("**Your Question:** Is hail covered?"));
    assert!(text.contains("**Issue:** No relevant policy documents found."));
}

// ---- hallucinated numbers ----

#[test]
fn unknown_amount_is_flagged() {
    let flags = find_hallucinated_numbers("The deductible is $5,000", "The deductible is $2,500");
    assert_eq!(flags, vec!["Amount $5,000 not found in policy documents".to_string()]);
}

#[test]
fn known_amount_is_clean() {
    assert!(find_hallucinated_numbers("The deductible is $2,500", "The deductible is $2,500 for all covered losses").is_empty());
}

#[test]
fn other_currencies_and_policy_numbers_are_checked() {
    let context = "Policy Number: HO-1234-567890. Deductible ₹10,000.";
    let answer = "Policy HO-1234-567890 has a ₹10,000 deductible; AU-9999-00001 pays €500.00 and £20";
    let flags = find_hallucinated_numbers(answer, context);
    assert_eq!(
        flags,
        vec![
            "Policy number AU-9999-00001 not found in documents".to_string(),
            "Amount €500.00 not found in policy documents".to_string(),
            "Amount £20 not found in policy documents".to_string(),
        ]
    );
}

#[test]
fn formatting_differences_are_flagged_once() {
    let flags = find_hallucinated_numbers("Pay $2500 now, then $2500 later", "Deductible: $2,500");
    assert_eq!(flags, vec!["Amount $2500 not found in policy documents".to_string()]);
}

#[test]
fn trailing_comma_is_part_of_the_amount() {
    let flags = find_hallucinated_numbers("The deductible is $2,500, payable per claim", "The deductible is $2,500 for all covered losses");
    assert_eq!(flags, vec!["Amount $2,500, not found in policy documents".to_string()]);
}

// ---- confidence ----

#[test]
fn confidence_levels_follow_thresholds() {
    let high = compute_confidence(0.9, 0.95, true);
    assert!(high.score >= 0.8);
    assert_eq!(high.level, ConfidenceLevel::High);

    let low = compute_confidence(0.3, 0.4, false);
    assert!(low.score < 0.6);
    assert_eq!(low.level, ConfidenceLevel::Low);

    let medium = compute_confidence(0.6, 0.7, true);
    assert!(medium.score >= 0.6 && medium.score < 0.8);
    assert_eq!(medium.level, ConfidenceLevel::Medium);
}

#[test]
fn boosted_retrieval_scores_saturate() {
    assert_eq!(compute_confidence(1.5, 1.0, true).score, 1.0);
}

#[test]
fn hallucination_override_halves_and_forces_low() {
    let base = compute_confidence(0.9, 0.95, true);
    let flags = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let overridden = base.with_hallucination_override(&flags);
    assert_eq!(overridden.level, ConfidenceLevel::Low);
    assert!((overridden.score - base.score * 0.5).abs() < 1e-6);
    assert_eq!(base.with_hallucination_override(&[]), base);

    let warning = hallucination_warning(&flags).expect("warning");
    assert_eq!(warning, "\n\n⚠️ Warning: Possible inconsistencies detected: a, b");
    assert_eq!(hallucination_warning(&[]), None);
}

#[test]
fn disclaimers_by_level() {
    let answer = "Flood is excluded.";
    let low = add_confidence_disclaimer(answer, ConfidenceLevel::Low, 0.4);
    assert!(low.starts_with(answer));
    assert!(low.contains("⚠️ **Low Confidence (0.40)**"));
    let medium = add_confidence_disclaimer(answer, ConfidenceLevel::Medium, 0.654);
    assert!(medium.contains("📌 **Medium Confidence (0.65)**"));
    assert_eq!(add_confidence_disclaimer(answer, ConfidenceLevel::High, 0.9), answer);
}

// ---- structured parsing ----

#[derive(Debug, Deserialize, PartialEq)]
struct Reply {
    answer: String,
}

#[test]
fn structured_parser_accepts_fenced_and_embedded_json() {
    let fenced = "```json\n{\"answer\": \"yes\"}\n```";
    assert_eq!(parse_structured::<Reply>(fenced), Structured::Parsed(Reply { answer: "yes".into() }));
    let plain_fence = "```\n{\"answer\": \"no\"}\n```";
    assert_eq!(parse_structured::<Reply>(plain_fence), Structured::Parsed(Reply { answer: "no".into() }));
    let prose = "Here you go: {\"answer\": \"maybe\"} hope that helps";
    assert!(parse_structured::<Reply>(prose).is_parsed());
}

#[test]
fn structured_parser_rejects_prose_and_wrong_schema() {
    let prose = "ANSWER: flood is excluded";
    assert_eq!(parse_structured::<Reply>(prose), Structured::Unparsable(prose.to_string()));
    assert!(!parse_structured::<Reply>("{\"other\": 1}").is_parsed());
}

// ---- faithfulness ----

#[test]
fn faithfulness_reads_json_verdict() {
    let generator = ScriptedGenerator::ok(r#"{"faithful": true, "confidence": 0.92, "explanation": "All claims supported"}"#);
    let verdict = checker(generator.clone()).check("answer", "context", "question");
    assert!(verdict.faithful);
    assert!((verdict.score - 0.92).abs() < 1e-6);
    assert_eq!(verdict.explanation, "All claims supported");
    assert_eq!(generator.prompts.lock().len(), 1);
}

#[test]
fn faithfulness_defaults_missing_fields() {
    let yes = checker(ScriptedGenerator::ok(r#"{"faithful": "YES"}"#)).check("a", "c", "q");
    assert!(yes.faithful);
    assert!((yes.score - 0.7).abs() < 1e-6);
    assert_eq!(yes.explanation, "Validation completed");

    let no = checker(ScriptedGenerator::ok(r#"{"faithful": false, "confidence": 3.0}"#)).check("a", "c", "q");
    assert!(!no.faithful);
    assert_eq!(no.score, 1.0);

    let no_default = checker(ScriptedGenerator::ok(r#"{"faithful": false}"#)).check("a", "c", "q");
    assert!((no_default.score - 0.3).abs() < 1e-6);
}

#[test]
fn faithfulness_keeps_verdict_when_confidence_is_malformed() {
    let no = checker(ScriptedGenerator::ok(r#"{"faithful": false, "confidence": "low", "explanation": "invented limit"}"#))
        .check("a", "c", "q");
    assert!(!no.faithful);
    assert!((no.score - 0.3).abs() < 1e-6);
    assert_eq!(no.explanation, "invented limit");

    let yes = checker(ScriptedGenerator::ok(r#"{"faithful": true, "confidence": null}"#)).check("a", "c", "q");
    assert!(yes.faithful);
    assert!((yes.score - 0.7).abs() < 1e-6);

    let numeric_text = checker(ScriptedGenerator::ok(r#"{"faithful": true, "confidence": " 0.85 "}"#)).check("a", "c", "q");
    assert!((numeric_text.score - 0.85).abs() < 1e-6);
}

#[test]
fn faithfulness_fails_open_on_generator_error() {
    let verdict = checker(ScriptedGenerator::failing("rate limited")).check("a", "c", "q");
    assert!(verdict.faithful);
    assert_eq!(verdict.score, 0.5);
    assert_eq!(verdict.explanation, "Validation error: rate limited");
}

#[test]
fn faithfulness_fails_open_on_unparsable_reply() {
    let verdict = checker(ScriptedGenerator::ok("FAITHFUL: YES")).check("a", "c", "q");
    assert!(verdict.faithful);
    assert_eq!(verdict.score, 0.5);
    assert!(verdict.explanation.starts_with("Validation error"));
}

#[test]
fn faithfulness_truncates_context_and_can_be_disabled() {
    let generator = ScriptedGenerator::ok(r#"{"faithful": true}"#);
    let settings = ValidationSettings { enable_faithfulness_check: true, faithfulness_context_chars: 10 };
    let long_context = format!("{}{}", "a".repeat(10), "SHOULD_NOT_APPEAR");
    FaithfulnessChecker::new(generator.clone(), &settings).check("answer", &long_context, "q");
    let prompts = generator.prompts.lock();
    assert!(prompts[0].contains(&"a".repeat(10)));
    assert!(!prompts[0].contains("SHOULD_NOT_APPEAR"));
    drop(prompts);

    let disabled = ValidationSettings { enable_faithfulness_check: false, ..ValidationSettings::default() };
    let silent = ScriptedGenerator::ok("unused");
    let verdict = FaithfulnessChecker::new(silent.clone(), &disabled).check("a", "c", "q");
    assert_eq!((verdict.faithful, verdict.score), (true, 1.0));
    assert_eq!(verdict.explanation, "Faithfulness check disabled");
    assert!(silent.prompts.lock().is_empty());
}

#[test]
fn answer_relevance_parses_score_or_falls_back() {
    let judged = ScriptedGenerator::ok(r#"{"score": 0.8, "explanation": "direct"}"#);
    assert_eq!(evaluate_answer_relevance(judged.as_ref(), "q", "a"), (0.8, "direct".to_string()));
    let (score, note) = evaluate_answer_relevance(ScriptedGenerator::failing("down").as_ref(), "q", "a");
    assert_eq!(score, 0.5);
    assert_eq!(note, "Evaluation error: down");
}
