//! Embedded stub pipeline.
//!
//! Used when no remote generator endpoint is configured, and by tests.
//! Writes a small runnable FastAPI service into the output directory so
//! the rest of the lifecycle (entry resolution, deployment, monitoring)
//! can be exercised end to end without the real pipeline.

use async_trait::async_trait;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::domain::models::DeliverabilityVerdict;
use crate::domain::ports::{GenerationPipeline, PipelineError, PipelineOutput, PipelineRequest};

/// Stub pipeline with a configurable verdict and simulated latency.
#[derive(Debug, Clone)]
pub struct StubPipeline {
    verdict: DeliverabilityVerdict,
    delay: Duration,
    fail_with: Option<String>,
}

impl Default for StubPipeline {
    fn default() -> Self {
        Self {
            verdict: DeliverabilityVerdict::Deliverable,
            delay: Duration::from_millis(200),
            fail_with: None,
        }
    }
}

impl StubPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the verdict returned on success.
    pub fn with_verdict(mut self, verdict: DeliverabilityVerdict) -> Self {
        self.verdict = verdict;
        self
    }

    /// Override the simulated generation delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every invocation fail with the given reason.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(reason.into()),
            ..Self::default()
        }
    }

    fn service_name(requirement: &str) -> &'static str {
        let lower = requirement.to_lowercase();
        if lower.contains("product") {
            "product_service"
        } else if lower.contains("order") {
            "order_service"
        } else if lower.contains("trace") {
            "traceability_service"
        } else {
            "custom_service"
        }
    }

    fn render_source(name: &str) -> String {
        format!(
            r#""""{name} - auto-generated stub service."""
from datetime import datetime

from fastapi import FastAPI

app = FastAPI(title="{name}", version="1.0.0")


@app.get("/health")
async def health_check():
    return {{"status": "healthy", "service": "{name}", "timestamp": datetime.now().isoformat()}}


@app.get("/")
async def root():
    return {{"service": "{name}"}}
"#
        )
    }
}

#[async_trait]
impl GenerationPipeline for StubPipeline {
    async fn invoke(&self, request: PipelineRequest) -> Result<PipelineOutput, PipelineError> {
        tokio::time::sleep(self.delay).await;

        if let Some(reason) = &self.fail_with {
            return Err(PipelineError::Invocation(reason.clone()));
        }

        let name = Self::service_name(&request.requirement);
        let source_code = Self::render_source(name);

        fs::create_dir_all(&request.output_dir).await?;
        let entry_file = request.output_dir.join(format!("{name}.py"));
        fs::write(&entry_file, &source_code).await?;

        info!(entry = %entry_file.display(), "Stub pipeline wrote artifact");

        Ok(PipelineOutput {
            source_code,
            entry_file,
            dependency_manifest: "fastapi>=0.100.0\nuvicorn>=0.23.0\npydantic>=2.0.0".to_string(),
            readme: format!(
                "# {name}\n\n## Requirement\n{}",
                request.requirement.chars().take(200).collect::<String>()
            ),
            verdict: self.verdict,
        })
    }
}
