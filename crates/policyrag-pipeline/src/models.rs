//! Response records returned by the answer pipeline and ingestion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use policyrag_quality::ConfidenceLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Section heading, or "Not specified" when only a page is known.
    pub section: String,
    pub page: Option<String>,
    pub text_snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub coverage_limits: Option<BTreeMap<String, String>>,
    pub deductibles: Option<BTreeMap<String, String>>,
    pub sources: Vec<String>,
    pub confidence: ConfidenceLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionInfo {
    pub section: String,
    pub description: String,
    pub applies: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageCheckResponse {
    pub scenario: String,
    pub is_covered: bool,
    pub coverage_determination: String,
    pub policy_section: Option<String>,
    pub coverage_limit: Option<String>,
    pub deductible: Option<String>,
    pub exclusions_checked: Vec<ExclusionInfo>,
    pub conditions: Option<String>,
    pub sources: Vec<String>,
    pub confidence: ConfidenceLevel,
}

impl CoverageCheckResponse {
    pub(crate) fn undetermined(scenario: &str, determination: String, sources: Vec<String>) -> Self {
        Self {
            scenario: scenario.to_string(),
            is_covered: false,
            coverage_determination: determination,
            policy_section: None,
            coverage_limit: None,
            deductible: None,
            exclusions_checked: vec![],
            conditions: None,
            sources,
            confidence: ConfidenceLevel::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyComparisonItem {
    pub policy_type: String,
    pub policy_number: Option<String>,
    pub value: String,
    pub section: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareResponse {
    pub comparison_type: String,
    pub comparison_items: Vec<PolicyComparisonItem>,
    pub summary: String,
    pub sources: Vec<String>,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub chunks_count: usize,
    pub documents_processed: usize,
    pub general_docs_count: usize,
    pub personal_docs_count: usize,
    pub policy_types_found: Vec<String>,
    pub message: String,
}
