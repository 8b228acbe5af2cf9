//! Orchestration: ingestion, context formatting, the answer pipeline and
//! query metrics.

pub mod answer;
pub mod context;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod prompts;

pub use answer::AnswerPipeline;
pub use ingest::{FilenameTagger, IngestPaths, Ingestor};
pub use metrics::{sink_from_settings, JsonlMetrics, MetricsRecord, MetricsSummary, NoopMetrics, TracingMetrics};
pub use models::{Citation, CompareResponse, CoverageCheckResponse, ExclusionInfo, IngestReport, PolicyComparisonItem, QueryResponse};
