//! Answer validation: the retrieval quality gate, the faithfulness and
//! hallucinated-number checks, and confidence scoring.

pub mod confidence;
pub mod faithfulness;
pub mod gate;
pub mod hallucination;
pub mod relevance;
pub mod structured;

pub use confidence::{add_confidence_disclaimer, compute_confidence, hallucination_warning, Confidence, ConfidenceLevel};
pub use faithfulness::{FaithfulnessChecker, FaithfulnessVerdict};
pub use gate::{insufficient_context_response, QualityGate, QualityVerdict};
pub use hallucination::find_hallucinated_numbers;
pub use relevance::evaluate_answer_relevance;
pub use structured::{parse_structured, Structured};
