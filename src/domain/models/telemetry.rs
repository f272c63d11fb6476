//! Invocation telemetry and aggregated quality metrics.
//!
//! Invocations are appended by the request layer; this subsystem only
//! reads them, ranged by a trailing time window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a single invocation against a deployed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationOutcome {
    Ok,
    Error,
}

impl InvocationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ok" | "success" => Some(Self::Ok),
            "error" | "failure" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One row of the append-only invocation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub id: Uuid,
    pub artifact_id: Uuid,
    pub tool_name: Option<String>,
    pub latency_ms: Option<f64>,
    pub outcome: InvocationOutcome,
    pub error_message: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Invocation {
    pub fn new(artifact_id: Uuid, outcome: InvocationOutcome, latency_ms: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            artifact_id,
            tool_name: None,
            latency_ms: Some(latency_ms),
            outcome,
            error_message: None,
            request_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Trailing time window for metric aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsWindow {
    Hour,
    SixHours,
    Day,
    Week,
    Month,
}

impl Default for MetricsWindow {
    fn default() -> Self {
        Self::Hour
    }
}

impl MetricsWindow {
    pub fn as_secs(&self) -> i64 {
        match self {
            Self::Hour => 3_600,
            Self::SixHours => 21_600,
            Self::Day => 86_400,
            Self::Week => 604_800,
            Self::Month => 2_592_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "1h",
            Self::SixHours => "6h",
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1h" => Some(Self::Hour),
            "6h" => Some(Self::SixHours),
            "24h" => Some(Self::Day),
            "7d" => Some(Self::Week),
            "30d" => Some(Self::Month),
            _ => None,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.as_secs())
    }
}

/// Aggregated quality metrics for one artifact over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub artifact_id: Uuid,
    pub window: MetricsWindow,
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    /// Fraction in [0, 1]
    pub error_rate: f64,
    pub p99_latency_ms: f64,
    pub avg_latency_ms: f64,
    pub qps: f64,
    pub collected_at: DateTime<Utc>,
}

impl QualityMetrics {
    /// Zero metrics for an artifact with no telemetry yet.
    pub fn empty(artifact_id: Uuid, window: MetricsWindow) -> Self {
        Self {
            artifact_id,
            window,
            total_requests: 0,
            success_count: 0,
            error_count: 0,
            error_rate: 0.0,
            p99_latency_ms: 0.0,
            avg_latency_ms: 0.0,
            qps: 0.0,
            collected_at: Utc::now(),
        }
    }

    /// Aggregate a batch of invocations into window metrics.
    pub fn from_invocations(
        artifact_id: Uuid,
        window: MetricsWindow,
        invocations: &[Invocation],
    ) -> Self {
        if invocations.is_empty() {
            return Self::empty(artifact_id, window);
        }

        let total = invocations.len() as u64;
        let errors = invocations
            .iter()
            .filter(|i| i.outcome == InvocationOutcome::Error)
            .count() as u64;

        let mut latencies: Vec<f64> = invocations.iter().filter_map(|i| i.latency_ms).collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let p99 = percentile(&latencies, 0.99);
        let avg = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        };

        Self {
            artifact_id,
            window,
            total_requests: total,
            success_count: total - errors,
            error_count: errors,
            error_rate: errors as f64 / total as f64,
            p99_latency_ms: p99,
            avg_latency_ms: avg,
            qps: total as f64 / window.as_secs() as f64,
            collected_at: Utc::now(),
        }
    }
}

/// Nearest-rank percentile over a sorted slice. Returns 0 for empty input.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}
