//! Question answering, coverage checks and policy comparison on top of
//! hybrid retrieval and the validation stages.

use std::sync::Arc;
use std::time::Instant;

use policyrag_core::config::Settings;
use policyrag_core::traits::{Generator, MetricsSink};
use policyrag_core::types::{Chunk, MetadataFilter, QueryMetrics};
use policyrag_core::{Error, Result};
use policyrag_hybrid::HybridRetriever;
use policyrag_quality::{
    add_confidence_disclaimer, compute_confidence, find_hallucinated_numbers, hallucination_warning, insufficient_context_response,
    parse_structured, Confidence, ConfidenceLevel, FaithfulnessChecker, QualityGate, Structured,
};

use crate::context::{build_citations, extract_sources, format_context};
use crate::models::{CompareResponse, CoverageCheckResponse, ExclusionInfo, PolicyComparisonItem, QueryResponse};
use crate::prompts::{render, CompareReply, CoverageReply, QaReply, COMPARE_PROMPT, COVERAGE_PROMPT, QA_PROMPT};

const QUERY_ENDPOINT: &str = "query";

#[derive(Debug, Clone, Copy)]
struct Limits {
    default_k: usize,
    max_k: usize,
    compare_k_per_type: usize,
    temperature: f32,
}

pub struct AnswerPipeline {
    retriever: HybridRetriever,
    generator: Arc<dyn Generator>,
    gate: QualityGate,
    faithfulness: FaithfulnessChecker,
    metrics: Arc<dyn MetricsSink>,
    limits: Limits,
}

impl AnswerPipeline {
    pub fn new(retriever: HybridRetriever, generator: Arc<dyn Generator>, metrics: Arc<dyn MetricsSink>, settings: &Settings) -> Self {
        Self {
            retriever,
            gate: QualityGate::from(&settings.retrieval),
            faithfulness: FaithfulnessChecker::new(Arc::clone(&generator), &settings.validation),
            generator,
            metrics,
            limits: Limits {
                default_k: settings.retrieval.default_k,
                max_k: settings.retrieval.max_k,
                compare_k_per_type: settings.retrieval.compare_k_per_type,
                temperature: settings.llm.temperature,
            },
        }
    }

    pub fn retriever(&self) -> &HybridRetriever { &self.retriever }

    fn generate(&self, prompt: &str) -> Result<String> {
        self.generator.generate(prompt, self.limits.temperature).map_err(Error::collaborator)
    }

    /// Answer a question from the retrieved policy text. Every call, refused
    /// or failed included, produces one metrics record.
    pub fn answer(&self, question: &str, filter: &MetadataFilter) -> Result<QueryResponse> {
        let start = Instant::now();
        let outcome = self.answer_inner(question, filter, start);
        if let Err(e) = &outcome {
            self.metrics.log_query(&QueryMetrics {
                question: question.to_string(),
                endpoint: QUERY_ENDPOINT.into(),
                response_time_ms: elapsed_ms(start),
                success: false,
                error_message: Some(e.to_string()),
                ..QueryMetrics::default()
            });
        }
        outcome
    }

    fn answer_inner(&self, question: &str, filter: &MetadataFilter, start: Instant) -> Result<QueryResponse> {
        let chunks = self.retriever.retrieve(question, self.limits.default_k, filter, None)?;
        let verdict = self.gate.assess(&chunks);
        let (can_answer, reason) = self.gate.decide(&chunks, &verdict);

        if !can_answer {
            tracing::info!(docs = chunks.len(), score = verdict.average_score, "refusing to answer");
            self.metrics.log_query(&QueryMetrics {
                question: question.to_string(),
                endpoint: QUERY_ENDPOINT.into(),
                response_time_ms: elapsed_ms(start),
                confidence_score: Some(0.0),
                confidence_level: Some(ConfidenceLevel::Low.to_string()),
                retrieval_score: Some(verdict.average_score),
                num_docs: Some(chunks.len()),
                success: true,
                ..QueryMetrics::default()
            });
            return Ok(QueryResponse {
                answer: insufficient_context_response(question, &reason),
                citations: vec![],
                coverage_limits: None,
                deductibles: None,
                sources: vec![],
                confidence: ConfidenceLevel::Low,
            });
        }

        let context = format_context(&chunks);
        let sources = extract_sources(&chunks);
        let citations = build_citations(&chunks);
        let raw = self.generate(&render(QA_PROMPT, &[("context", &context), ("question", question)]))?;

        let (mut answer, coverage_limits, deductibles, parsed) = match parse_structured::<QaReply>(&raw) {
            Structured::Parsed(reply) => (
                reply.answer,
                reply.coverage_limits.filter(|m| !m.is_empty()),
                reply.deductibles.filter(|m| !m.is_empty()),
                true,
            ),
            Structured::Unparsable(text) => {
                tracing::warn!("answer reply was not valid JSON; using raw text");
                (text.trim().to_string(), None, None, false)
            }
        };

        let faithfulness = self.faithfulness.check(&answer, &context, question);
        let flags = find_hallucinated_numbers(&answer, &context);
        let mut confidence = compute_confidence(verdict.average_score, faithfulness.score, !citations.is_empty());
        if !parsed {
            confidence = Confidence::low(confidence.score);
        }
        confidence = confidence.with_hallucination_override(&flags);
        if let Some(warning) = hallucination_warning(&flags) {
            tracing::warn!(flags = ?flags, "unverified numbers in answer");
            answer.push_str(&warning);
        }
        let answer = add_confidence_disclaimer(&answer, confidence.level, confidence.score);

        self.metrics.log_query(&QueryMetrics {
            question: question.to_string(),
            endpoint: QUERY_ENDPOINT.into(),
            response_time_ms: elapsed_ms(start),
            token_count: Some(raw.split_whitespace().count()),
            confidence_score: Some(confidence.score),
            confidence_level: Some(confidence.level.to_string()),
            retrieval_score: Some(verdict.average_score),
            num_docs: Some(chunks.len()),
            faithfulness_score: Some(faithfulness.score),
            success: true,
            error_message: None,
        });

        Ok(QueryResponse { answer, citations, coverage_limits, deductibles, sources, confidence: confidence.level })
    }

    /// Decide whether a claim scenario is covered, checking exclusions too.
    pub fn check_coverage(&self, scenario: &str, filter: &MetadataFilter) -> Result<CoverageCheckResponse> {
        let query = format!("{scenario} coverage exclusion");
        let chunks = self.retriever.retrieve(&query, self.limits.max_k, filter, None)?;
        if chunks.is_empty() {
            return Ok(CoverageCheckResponse::undetermined(
                scenario,
                "No relevant policy documents found. Cannot determine coverage.".into(),
                vec![],
            ));
        }

        let context = format_context(&chunks);
        let sources = extract_sources(&chunks);
        let raw = self.generate(&render(COVERAGE_PROMPT, &[("context", &context), ("scenario", scenario)]))?;

        let reply = match parse_structured::<CoverageReply>(&raw) {
            Structured::Parsed(reply) => reply,
            Structured::Unparsable(text) => {
                tracing::warn!("coverage reply was not valid JSON; returning raw text");
                return Ok(CoverageCheckResponse::undetermined(scenario, text, sources));
            }
        };
        let exclusions_checked = reply
            .exclusions_checked
            .unwrap_or_default()
            .into_iter()
            .map(|e| ExclusionInfo {
                section: e.section.unwrap_or_else(|| "Unknown".into()),
                description: e.description.unwrap_or_default(),
                applies: e.applies.unwrap_or(false),
            })
            .collect();
        Ok(CoverageCheckResponse {
            scenario: scenario.to_string(),
            is_covered: reply.is_covered.unwrap_or(false),
            coverage_determination: reply.coverage_determination.unwrap_or_else(|| "Unable to determine".into()),
            policy_section: reply.policy_section,
            coverage_limit: reply.coverage_limit,
            deductible: reply.deductible,
            exclusions_checked,
            conditions: reply.conditions,
            sources,
            confidence: reply.confidence.as_deref().and_then(ConfidenceLevel::parse).unwrap_or(ConfidenceLevel::Medium),
        })
    }

    /// Compare one aspect across policy types; with no types given, across
    /// everything retrieved for the query.
    pub fn compare(&self, query: &str, policy_types: &[String]) -> Result<CompareResponse> {
        let chunks: Vec<Chunk> = if policy_types.is_empty() {
            self.retriever.retrieve(query, self.limits.max_k, &MetadataFilter::default(), None)?
        } else {
            let mut all = Vec::new();
            for policy_type in policy_types {
                let filter = MetadataFilter::new(Some(policy_type), None);
                all.extend(self.retriever.retrieve(query, self.limits.compare_k_per_type, &filter, None)?);
            }
            all
        };
        if chunks.is_empty() {
            return Ok(CompareResponse {
                comparison_type: query.to_string(),
                comparison_items: vec![],
                summary: "No relevant policy documents found for comparison.".into(),
                sources: vec![],
            });
        }

        let context = format_context(&chunks);
        let sources = extract_sources(&chunks);
        let raw = self.generate(&render(COMPARE_PROMPT, &[("context", &context), ("comparison_query", query)]))?;

        match parse_structured::<CompareReply>(&raw) {
            Structured::Parsed(reply) => Ok(CompareResponse {
                comparison_type: reply.comparison_type.unwrap_or_else(|| query.to_string()),
                comparison_items: reply
                    .comparison_items
                    .unwrap_or_default()
                    .into_iter()
                    .map(|item| PolicyComparisonItem {
                        policy_type: item.policy_type.unwrap_or_else(|| "Unknown".into()),
                        policy_number: item.policy_number,
                        value: item.value.unwrap_or_else(|| "Not found".into()),
                        section: item.section,
                        notes: item.notes,
                    })
                    .collect(),
                summary: reply.summary.unwrap_or_default(),
                sources,
            }),
            Structured::Unparsable(text) => {
                tracing::warn!("comparison reply was not valid JSON; returning raw text");
                Ok(CompareResponse { comparison_type: query.to_string(), comparison_items: vec![], summary: text, sources })
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 { u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX) }
