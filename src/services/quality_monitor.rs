//! Quality monitor for deployed artifacts.
//!
//! Aggregates recent invocation telemetry, compares it against fixed
//! thresholds, and resubmits degraded artifacts to the generation
//! orchestrator as refinement children. The degraded artifact itself is
//! never stopped, mutated in status, or deleted by this path; cutting
//! over to the child is an operator decision.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Artifact, MetricsWindow, MonitorConfig, QualityMetrics};
use crate::domain::ports::{ArtifactRepository, TelemetryRepository};
use crate::services::generation_orchestrator::{GenerationOrchestrator, GenerationRequest};

pub struct QualityMonitor {
    telemetry: Arc<dyn TelemetryRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    orchestrator: Arc<GenerationOrchestrator>,
    config: MonitorConfig,
}

impl QualityMonitor {
    pub fn new(
        telemetry: Arc<dyn TelemetryRepository>,
        artifacts: Arc<dyn ArtifactRepository>,
        orchestrator: Arc<GenerationOrchestrator>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            telemetry,
            artifacts,
            orchestrator,
            config,
        }
    }

    /// Aggregate invocation telemetry for the trailing window.
    /// An artifact with no telemetry yields all-zero metrics, not an error.
    pub async fn collect_metrics(
        &self,
        artifact_id: Uuid,
        window: MetricsWindow,
    ) -> DomainResult<QualityMetrics> {
        let since = Utc::now() - window.duration();
        let invocations = self.telemetry.list_since(artifact_id, since).await?;
        Ok(QualityMetrics::from_invocations(
            artifact_id,
            window,
            &invocations,
        ))
    }

    /// Fixed-threshold health verdict. Either breach alone fails.
    pub fn is_healthy(&self, metrics: &QualityMetrics) -> bool {
        metrics.error_rate <= self.config.error_rate_threshold
            && metrics.p99_latency_ms <= self.config.p99_latency_threshold_ms
    }

    /// Evaluate the trailing hour and, when degraded, resubmit the
    /// artifact's requirement augmented with the diagnosed failure modes.
    /// Returns the new task id, or None when no action was taken.
    pub async fn evaluate_and_refine_if_needed(
        &self,
        artifact_id: Uuid,
    ) -> DomainResult<Option<Uuid>> {
        let metrics = self.collect_metrics(artifact_id, MetricsWindow::Hour).await?;

        // Too little traffic to judge.
        if metrics.total_requests < self.config.min_sample_size {
            return Ok(None);
        }

        if self.is_healthy(&metrics) {
            return Ok(None);
        }

        warn!(
            artifact_id = %artifact_id,
            error_rate = metrics.error_rate,
            p99_latency_ms = metrics.p99_latency_ms,
            "Artifact quality degraded; starting refinement"
        );

        let mut artifact = self
            .artifacts
            .get(artifact_id)
            .await?
            .ok_or(DomainError::ArtifactNotFound(artifact_id))?;

        let augmented = self.build_refinement_requirement(&artifact, &metrics);

        let new_task_id = self
            .orchestrator
            .start_generation(GenerationRequest {
                owner_id: artifact.owner_id,
                requirement: augmented,
                model: Some(artifact.model_identifier.clone()),
                name: Some(format!("{} (refined)", artifact.name)),
                description: Some(format!("Auto-refined version of {artifact_id}")),
                parent_artifact_id: Some(artifact_id),
            })
            .await?;

        artifact.refinement_count += 1;
        artifact.updated_at = Utc::now();
        self.artifacts.update(&artifact).await?;

        info!(
            artifact_id = %artifact_id,
            new_task_id = %new_task_id,
            "Refinement generation started"
        );

        Ok(Some(new_task_id))
    }

    /// Original requirement plus a structured diagnosis block naming the
    /// breached thresholds and generic remediation directives.
    fn build_refinement_requirement(&self, artifact: &Artifact, metrics: &QualityMetrics) -> String {
        format!(
            "Original requirement:\n{original}\n\n\
             Observed problems over the last hour:\n\
             - error rate: {error_rate:.1}% (threshold: {error_threshold:.1}%)\n\
             - p99 latency: {p99:.0}ms (threshold: {p99_threshold:.0}ms)\n\
             - average latency: {avg:.0}ms\n\n\
             Requirements for the regenerated service:\n\
             1. Strengthen error handling and input validation\n\
             2. Reduce latency on the hot paths\n\
             3. Add retry with backoff and circuit breaking around downstream calls\n\
             4. Improve logging so failures can be diagnosed\n\n\
             Regenerate a higher-quality service that addresses these problems.",
            original = artifact.requirement_text,
            error_rate = metrics.error_rate * 100.0,
            error_threshold = self.config.error_rate_threshold * 100.0,
            p99 = metrics.p99_latency_ms,
            p99_threshold = self.config.p99_latency_threshold_ms,
            avg = metrics.avg_latency_ms,
        )
    }

    /// Deterministic markdown quality report derived purely from the
    /// window metrics and threshold comparisons.
    pub async fn generate_report(
        &self,
        artifact_id: Uuid,
        window: MetricsWindow,
    ) -> DomainResult<String> {
        let artifact = self
            .artifacts
            .get(artifact_id)
            .await?
            .ok_or(DomainError::ArtifactNotFound(artifact_id))?;

        let metrics = self.collect_metrics(artifact_id, window).await?;

        let availability = (1.0 - metrics.error_rate) * 100.0;
        let healthy = self.is_healthy(&metrics);

        let mut report = format!(
            "# Service Quality Report\n\n\
             **Artifact**: {name}  \n\
             **Artifact ID**: {id}  \n\
             **Created**: {created}  \n\
             **Window**: {window}\n\n\
             ---\n\n\
             ## Metrics\n\n\
             | Metric | Value | Status | Threshold |\n\
             |--------|-------|--------|----------|\n\
             | Total requests | {total} | - | - |\n\
             | Successful | {success} | - | - |\n\
             | Failed | {errors} | - | - |\n\
             | Error rate | {error_rate:.2}% | {error_mark} | <{error_threshold:.1}% |\n\
             | P99 latency | {p99:.0}ms | {p99_mark} | <{p99_threshold:.0}ms |\n\
             | Avg latency | {avg:.0}ms | {avg_mark} | <{avg_threshold:.0}ms |\n\
             | QPS | {qps:.2} | - | - |\n\n\
             ---\n\n\
             ## Availability\n\n\
             - Availability: {availability:.2}%\n\
             - Rating: {rating}\n\n\
             {availability_note}\n\n\
             ## Performance\n\n\
             {performance_notes}\n\n\
             ## Recommendations\n\n\
             {recommendations}\n\n\
             ---\n\n\
             - Overall: {overall}\n\
             - Refinements spawned: {refinements}\n\
             - Deployed: {deployed}\n",
            name = artifact.name,
            id = artifact_id,
            created = artifact.created_at.format("%Y-%m-%d %H:%M:%S"),
            window = window.as_str(),
            total = metrics.total_requests,
            success = metrics.success_count,
            errors = metrics.error_count,
            error_rate = metrics.error_rate * 100.0,
            error_mark = threshold_mark(metrics.error_rate, self.config.error_rate_threshold),
            error_threshold = self.config.error_rate_threshold * 100.0,
            p99 = metrics.p99_latency_ms,
            p99_mark = threshold_mark(metrics.p99_latency_ms, self.config.p99_latency_threshold_ms),
            p99_threshold = self.config.p99_latency_threshold_ms,
            avg = metrics.avg_latency_ms,
            avg_mark = threshold_mark(metrics.avg_latency_ms, self.config.avg_latency_threshold_ms),
            avg_threshold = self.config.avg_latency_threshold_ms,
            qps = metrics.qps,
            availability = availability,
            rating = availability_rating(metrics.error_rate),
            availability_note = availability_note(metrics.error_rate),
            performance_notes = self.performance_notes(&metrics),
            recommendations = self.recommendations(&metrics),
            overall = if healthy { "healthy" } else { "needs attention" },
            refinements = artifact.refinement_count,
            deployed = if artifact.is_running { "yes" } else { "no" },
        );

        report.push_str("\n*Generated by the hatchery quality monitor*\n");
        Ok(report)
    }

    fn performance_notes(&self, metrics: &QualityMetrics) -> String {
        let mut notes = Vec::new();

        if metrics.p99_latency_ms < self.config.p99_latency_threshold_ms {
            notes.push("- P99 latency is within budget".to_string());
        } else {
            notes.push(format!(
                "- P99 latency is too high ({:.0}ms); inspect slow queries and add caching",
                metrics.p99_latency_ms
            ));
        }

        if metrics.avg_latency_ms < self.config.avg_latency_threshold_ms {
            notes.push("- Average latency is acceptable".to_string());
        } else {
            notes.push(format!(
                "- Average latency is elevated ({:.0}ms); profile the request path",
                metrics.avg_latency_ms
            ));
        }

        if metrics.qps > 0.0 {
            notes.push(format!("- Current load is {:.2} qps", metrics.qps));
        }

        notes.join("\n")
    }

    fn recommendations(&self, metrics: &QualityMetrics) -> String {
        let mut recs = Vec::new();

        if metrics.error_rate > self.config.error_rate_threshold {
            recs.push(
                "### Error rate\n\
                 - Strengthen input validation and exception handling\n\
                 - Add retry with exponential backoff\n\
                 - Apply a circuit breaker to prevent cascading failures\n\
                 - Log errors with enough context to diagnose them"
                    .to_string(),
            );
        }

        if metrics.p99_latency_ms > self.config.p99_latency_threshold_ms {
            recs.push(
                "### Latency\n\
                 - Optimize storage queries (indexes, batch fetches)\n\
                 - Introduce a cache in front of repeated computation\n\
                 - Prefer async I/O on concurrent paths"
                    .to_string(),
            );
        }

        if metrics.total_requests < 10 {
            recs.push(
                "### Insufficient data\n\
                 - Traffic in this window is too low for stable conclusions\n\
                 - Exercise the service with representative load"
                    .to_string(),
            );
        }

        if recs.is_empty() {
            recs.push(
                "### Quality is good\n\
                 - Keep monitoring; no action required"
                    .to_string(),
            );
        }

        recs.join("\n\n")
    }
}

fn threshold_mark(value: f64, threshold: f64) -> &'static str {
    if value < threshold {
        "ok"
    } else if value < threshold * 1.5 {
        "warn"
    } else {
        "crit"
    }
}

fn availability_rating(error_rate: f64) -> &'static str {
    let availability = (1.0 - error_rate) * 100.0;
    if availability >= 99.9 {
        "excellent (three nines)"
    } else if availability >= 99.0 {
        "good (two nines)"
    } else if availability >= 95.0 {
        "passable"
    } else {
        "failing"
    }
}

fn availability_note(error_rate: f64) -> &'static str {
    if error_rate < 0.01 {
        "Availability is excellent; the error rate is well controlled."
    } else if error_rate < 0.05 {
        "Availability is acceptable but there is room to improve; watch the error log."
    } else {
        "Availability is below target; refinement is recommended."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_marks() {
        assert_eq!(threshold_mark(0.01, 0.05), "ok");
        assert_eq!(threshold_mark(0.06, 0.05), "warn");
        assert_eq!(threshold_mark(0.2, 0.05), "crit");
    }

    #[test]
    fn test_availability_rating_ladder() {
        assert_eq!(availability_rating(0.0005), "excellent (three nines)");
        assert_eq!(availability_rating(0.005), "good (two nines)");
        assert_eq!(availability_rating(0.03), "passable");
        assert_eq!(availability_rating(0.2), "failing");
    }
}
