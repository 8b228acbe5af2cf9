//! Renders retrieved chunks into the generator's context block, personal
//! policies first, and derives sources and citations from the same chunks.

use policyrag_core::types::Chunk;

use crate::models::Citation;

const SNIPPET_CHARS: usize = 200;

fn banner() -> String { "=".repeat(80) }

fn citation_header(label: &str, chunk: &Chunk, with_policy_number: bool) -> String {
    let meta = &chunk.metadata;
    let mut parts = vec![format!("[{label} | Source: {}", chunk.source)];
    if with_policy_number {
        if let Some(number) = meta.policy_number.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("Policy #: {number}"));
        }
    }
    if let Some(policy_type) = meta.policy_type.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("Type: {policy_type}"));
    }
    parts.extend(meta.section.iter().filter(|s| !s.is_empty()).cloned());
    parts.extend(meta.page.iter().filter(|s| !s.is_empty()).cloned());
    format!("{}]", parts.join(", "))
}

pub fn format_context(chunks: &[Chunk]) -> String {
    let (personal, general): (Vec<&Chunk>, Vec<&Chunk>) = chunks.iter().partition(|c| c.is_personal());
    let mut parts = Vec::new();

    if !personal.is_empty() {
        parts.push(banner());
        parts.push("📄 PERSONAL POLICY DOCUMENTS (User's Actual Coverage)".to_string());
        parts.push(banner());
        for (i, chunk) in personal.iter().enumerate() {
            let header = citation_header("PERSONAL POLICY", chunk, true);
            parts.push(format!("\n--- Personal Policy Document {} {header} ---\n{}", i + 1, chunk.content));
        }
    }
    if !general.is_empty() {
        parts.push(format!("\n{}", banner()));
        parts.push("📚 GENERAL INSURANCE GUIDES (Educational Reference Only)".to_string());
        parts.push(banner());
        for (i, chunk) in general.iter().enumerate() {
            let header = citation_header("GENERAL GUIDE", chunk, false);
            parts.push(format!("\n--- General Guide {} {header} ---\n{}", i + 1, chunk.content));
        }
    }
    parts.join("\n\n")
}

/// Distinct non-empty sources in first-seen order.
pub fn extract_sources(chunks: &[Chunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for chunk in chunks {
        if !chunk.source.is_empty() && !sources.contains(&chunk.source) {
            sources.push(chunk.source.clone());
        }
    }
    sources
}

/// One citation per chunk that carries a section or a page.
pub fn build_citations(chunks: &[Chunk]) -> Vec<Citation> {
    chunks
        .iter()
        .filter_map(|chunk| {
            let section = chunk.metadata.section.clone().filter(|s| !s.is_empty());
            let page = chunk.metadata.page.clone().filter(|s| !s.is_empty());
            if section.is_none() && page.is_none() { return None; }
            Some(Citation {
                section: section.unwrap_or_else(|| "Not specified".to_string()),
                page,
                text_snippet: snippet(&chunk.content),
            })
        })
        .collect()
}

fn snippet(content: &str) -> String {
    if content.chars().count() > SNIPPET_CHARS {
        format!("{}...", content.chars().take(SNIPPET_CHARS).collect::<String>())
    } else {
        content.to_string()
    }
}
