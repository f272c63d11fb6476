//! Remote generation pipeline over HTTP.
//!
//! POSTs the requirement to a generator endpoint and materializes the
//! returned source under the artifact's output directory. The endpoint is
//! treated as opaque and slow; the request timeout is minutes-scale.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::domain::models::DeliverabilityVerdict;
use crate::domain::ports::{GenerationPipeline, PipelineError, PipelineOutput, PipelineRequest};

#[derive(Debug, Clone)]
pub struct HttpPipelineConfig {
    /// Base URL of the generator service
    pub endpoint: String,
    /// Request timeout; generation takes minutes
    pub timeout: Duration,
}

pub struct HttpPipeline {
    client: Client,
    config: HttpPipelineConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    requirement: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    source_code: String,
    #[serde(default)]
    entry_name: Option<String>,
    #[serde(default)]
    dependency_manifest: String,
    #[serde(default)]
    readme: String,
    #[serde(default)]
    deliverability_assessment: String,
    #[serde(default)]
    error: Option<String>,
}

impl HttpPipeline {
    pub fn new(config: HttpPipelineConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Invocation(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl GenerationPipeline for HttpPipeline {
    async fn invoke(&self, request: PipelineRequest) -> Result<PipelineOutput, PipelineError> {
        let url = format!("{}/generate", self.config.endpoint.trim_end_matches('/'));
        info!(url = %url, model = %request.model, "Invoking remote generation pipeline");

        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                requirement: &request.requirement,
                model: &request.model,
            })
            .send()
            .await
            .map_err(|e| PipelineError::Invocation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Pipeline endpoint returned an error");
            return Err(PipelineError::Invocation(format!(
                "pipeline endpoint returned {status}: {body}"
            )));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Invocation(e.to_string()))?;

        if let Some(error) = payload.error {
            return Err(PipelineError::Invocation(error));
        }
        if payload.source_code.trim().is_empty() {
            return Err(PipelineError::EmptyOutput);
        }

        let entry_name = payload
            .entry_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "main".to_string());

        fs::create_dir_all(&request.output_dir).await?;
        let entry_file = request.output_dir.join(format!("{entry_name}.py"));
        fs::write(&entry_file, &payload.source_code).await?;

        Ok(PipelineOutput {
            source_code: payload.source_code,
            entry_file,
            dependency_manifest: payload.dependency_manifest,
            readme: payload.readme,
            verdict: DeliverabilityVerdict::from_assessment(&payload.deliverability_assessment),
        })
    }
}
