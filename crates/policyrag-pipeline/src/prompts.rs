//! Prompt templates and the JSON shapes the generator is asked to return.

use std::collections::BTreeMap;

use serde::Deserialize;

pub const QA_PROMPT: &str = r#"You are an expert insurance policy analyst. Answer questions based ONLY on the provided policy documents.

CRITICAL RULES:
1. ONLY use information from the provided context. Do not use external knowledge about insurance.
2. Always cite the specific policy section and page when available (e.g., "Section 3.1, Page 12").
3. When discussing coverage limits, always include the exact rupee amounts found in the documents.
4. When discussing deductibles, always include the exact rupee amounts found in the documents.
5. If something is NOT covered, clearly state it's an EXCLUSION and cite the exclusion section.
6. If the information is not found in the provided documents, answer EXACTLY with: "This information is not found in the provided policy documents."
7. Never fabricate policy numbers, rupee amounts, dates, or any other specific details.
8. If you're uncertain, say so explicitly.

EXAMPLES OF GOOD ANSWERS:

Q: What is my homeowner's deductible?
A: According to Section 2, Deductibles (Page 5), your homeowner's insurance deductible is ₹2,500 for all covered losses.

Q: Is flood damage covered?
A: No, flood damage is NOT covered. According to Section 4, Exclusions (Page 8), "We do not cover loss caused by flood, surface water, or water that backs up through sewers or drains."

POLICY DOCUMENTS:
{context}

QUESTION: {question}

Respond with a single JSON object and nothing else:
{
    "answer": "Your detailed answer with citations",
    "coverage_limits": {"Limit name": "₹X,XXX"},
    "deductibles": {"Deductible name": "₹X,XXX"},
    "citations": ["Section X.X, Page N"]
}
Use empty objects or lists when nothing applies."#;

pub const COVERAGE_PROMPT: &str = r#"You are an expert insurance claims adjuster. Analyze whether the described scenario is covered under the provided policy documents.

CRITICAL RULES:
1. Carefully check BOTH coverage sections AND exclusion sections.
2. Exclusions override coverage - if an exclusion applies, the claim is NOT covered.
3. Be precise about policy section references - cite exact section numbers.
4. Include exact coverage limits and deductibles in rupees (₹) ONLY if found in the documents.
5. If you cannot determine coverage from the documents, set confidence to "low" and explain why.
6. Never fabricate policy details, amounts, or section numbers.
7. Look for specific exclusion language that might apply to the scenario.

EXAMPLES:

Scenario: "My basement flooded from heavy rain"
Analysis: Check for water damage coverage AND flood exclusions. If policy excludes "surface water" or "flooding", claim is NOT covered even if water damage is generally covered.

Scenario: "Someone slipped on my icy driveway"
Analysis: Check liability coverage section. If covered, note the liability limit (e.g., ₹300,000) and any applicable deductible.

POLICY DOCUMENTS:
{context}

CLAIM SCENARIO: {scenario}

Analyze this scenario and respond in EXACTLY this JSON format:
{
    "is_covered": true or false,
    "coverage_determination": "Detailed explanation of why this is or is not covered, citing specific policy sections",
    "policy_section": "Section X.X" or null,
    "coverage_limit": "₹X,XXX" or null,
    "deductible": "₹X,XXX" or null,
    "exclusions_checked": [
        {"section": "Section X.X", "description": "Brief description", "applies": true or false}
    ],
    "conditions": "Any conditions or requirements for coverage" or null,
    "confidence": "high", "medium", or "low"
}

Use "low" confidence if:
- The documents don't contain enough information
- The scenario is ambiguous
- Multiple interpretations are possible"#;

pub const COMPARE_PROMPT: &str = r#"You are an expert insurance policy analyst. Compare the requested aspect across the provided policy documents.

POLICY DOCUMENTS:
{context}

COMPARISON REQUEST: {comparison_query}

Provide a comparison in EXACTLY this JSON format:
{
    "comparison_type": "What is being compared (e.g., 'Deductibles', 'Liability Limits')",
    "comparison_items": [
        {
            "policy_type": "homeowners/auto/commercial/etc",
            "policy_number": "Policy number if available" or null,
            "value": "The value being compared (e.g., '₹1,000')",
            "section": "Section reference" or null,
            "notes": "Any relevant notes" or null
        }
    ],
    "summary": "Natural language summary of the comparison"
}"#;

/// Substitute `{name}` placeholders in a template.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| acc.replace(&format!("{{{name}}}"), value))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QaReply {
    pub answer: String,
    #[serde(default)]
    pub coverage_limits: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub deductibles: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub citations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExclusionReply {
    pub section: Option<String>,
    pub description: Option<String>,
    pub applies: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverageReply {
    pub is_covered: Option<bool>,
    pub coverage_determination: Option<String>,
    pub policy_section: Option<String>,
    pub coverage_limit: Option<String>,
    pub deductible: Option<String>,
    #[serde(default)]
    pub exclusions_checked: Option<Vec<ExclusionReply>>,
    pub conditions: Option<String>,
    pub confidence: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComparisonItemReply {
    pub policy_type: Option<String>,
    pub policy_number: Option<String>,
    pub value: Option<String>,
    pub section: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompareReply {
    pub comparison_type: Option<String>,
    #[serde(default)]
    pub comparison_items: Option<Vec<ComparisonItemReply>>,
    pub summary: Option<String>,
}
