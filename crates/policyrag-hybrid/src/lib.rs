//! Hybrid retrieval: BM25 and vector search fused into one ranking, with a
//! boost for the user's own policy documents on personal questions.

pub mod eval;
pub mod fusion;
pub mod intent;
pub mod retriever;
pub mod semantic;

pub use fusion::{fuse, FusionPolicy, ScoredResult};
pub use intent::is_personal_query;
pub use retriever::HybridRetriever;
pub use semantic::SemanticRetriever;
