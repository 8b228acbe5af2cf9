//! policyrag-text
//!
//! Keyword relevance over chunk text: a BM25 index built with Tantivy over a
//! lowercase/whitespace token stream, rebuilt from scratch on every ingestion.

pub mod index;
pub mod tantivy_utils;

pub use index::{tokenize, LexicalIndex};
