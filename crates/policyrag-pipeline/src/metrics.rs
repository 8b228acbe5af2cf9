//! Query metrics sinks and the summary computed from a JSON-lines log.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use policyrag_core::config::MonitoringSettings;
use policyrag_core::traits::MetricsSink;
use policyrag_core::types::QueryMetrics;
use policyrag_core::Result;

// gpt-4o-mini list prices per token, assuming a 70/30 input/output split
const INPUT_COST_PER_TOKEN: f64 = 0.15 / 1_000_000.0;
const OUTPUT_COST_PER_TOKEN: f64 = 0.60 / 1_000_000.0;

/// Pick a sink for the monitoring section: disabled → no-op, a log path →
/// JSON lines, otherwise tracing events.
pub fn sink_from_settings(settings: &MonitoringSettings, base: &Path) -> Arc<dyn MetricsSink> {
    if !settings.enabled { return Arc::new(NoopMetrics); }
    match settings.log_path.as_deref() {
        Some(path) => Arc::new(JsonlMetrics::new(policyrag_core::config::resolve_with_base(base, path))),
        None => Arc::new(TracingMetrics),
    }
}

pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn log_query(&self, _metrics: &QueryMetrics) {}
}

pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn log_query(&self, m: &QueryMetrics) {
        tracing::info!(
            target: "policyrag::metrics",
            endpoint = %m.endpoint,
            response_time_ms = m.response_time_ms,
            token_count = ?m.token_count,
            confidence_score = ?m.confidence_score,
            confidence_level = ?m.confidence_level,
            retrieval_score = ?m.retrieval_score,
            num_docs = ?m.num_docs,
            faithfulness_score = ?m.faithfulness_score,
            success = m.success,
            error = ?m.error_message,
            "query"
        );
    }
}

/// One line of the query log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// RFC 3339, UTC.
    pub timestamp: String,
    #[serde(flatten)]
    pub metrics: QueryMetrics,
}

impl MetricsRecord {
    fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok().map(|t| t.with_timezone(&Utc))
    }
}

/// Appends one JSON object per query to a file. Write failures are logged
/// and dropped; metrics never fail a query.
pub struct JsonlMetrics {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlMetrics {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into(), lock: Mutex::new(()) } }

    pub fn path(&self) -> &Path { &self.path }

    fn append(&self, metrics: &QueryMetrics) -> Result<()> {
        let record = MetricsRecord { timestamp: Utc::now().to_rfc3339(), metrics: metrics.clone() };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl MetricsSink for JsonlMetrics {
    fn log_query(&self, metrics: &QueryMetrics) {
        if let Err(e) = self.append(metrics) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to log query metrics");
        }
    }
}

/// Read every well-formed record from a query log; a missing file is empty.
pub fn read_records(path: &Path) -> Result<Vec<MetricsRecord>> {
    if !path.exists() { return Ok(vec![]); }
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| match serde_json::from_str(l) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed metrics line");
                None
            }
        })
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_queries: usize,
    pub avg_response_time_ms: f64,
    pub avg_confidence: f64,
    pub success_rate: f64,
    pub total_tokens: usize,
    pub estimated_cost: f64,
    pub avg_retrieval_score: f64,
    pub avg_faithfulness: f64,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Aggregate records from the last `days` days relative to `now`.
pub fn summarize(records: &[MetricsRecord], days: i64, now: DateTime<Utc>) -> MetricsSummary {
    let cutoff = now - Duration::days(days);
    let recent: Vec<&QueryMetrics> = records
        .iter()
        .filter(|r| r.time().is_some_and(|t| t >= cutoff))
        .map(|r| &r.metrics)
        .collect();
    if recent.is_empty() { return MetricsSummary::default(); }

    let total_tokens: usize = recent.iter().filter_map(|m| m.token_count).sum();
    let tokens = total_tokens as f64;
    MetricsSummary {
        total_queries: recent.len(),
        avg_response_time_ms: mean(recent.iter().map(|m| m.response_time_ms as f64)),
        avg_confidence: mean(recent.iter().filter_map(|m| m.confidence_score).map(f64::from)),
        success_rate: recent.iter().filter(|m| m.success).count() as f64 / recent.len() as f64,
        total_tokens,
        estimated_cost: tokens * 0.7 * INPUT_COST_PER_TOKEN + tokens * 0.3 * OUTPUT_COST_PER_TOKEN,
        avg_retrieval_score: mean(recent.iter().filter_map(|m| m.retrieval_score).map(f64::from)),
        avg_faithfulness: mean(recent.iter().filter_map(|m| m.faithfulness_score).map(f64::from)),
    }
}

/// Successful queries below `threshold` confidence, newest first.
pub fn low_confidence_queries(records: &[MetricsRecord], threshold: f32, limit: usize) -> Vec<&MetricsRecord> {
    let mut low: Vec<&MetricsRecord> = records
        .iter()
        .filter(|r| r.metrics.success && r.metrics.confidence_score.is_some_and(|s| s < threshold))
        .collect();
    low.sort_by(|a, b| b.time().cmp(&a.time()));
    low.truncate(limit);
    low
}
