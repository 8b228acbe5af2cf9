//! policyrag-core
//!
//! Shared domain types, collaborator traits, error taxonomy, configuration and
//! the ingestion-side text splitter used by every other crate in the workspace.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
