//! Generation orchestrator.
//!
//! Accepts a requirement, runs the black-box pipeline as a cancellable
//! background task tracked in an in-flight registry, and persists the
//! outcome. Pipeline failures are recorded, never retried here; retries
//! belong to the quality monitor's refinement path, which issues a new
//! task rather than re-running this one.

use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Artifact, ArtifactStatus, GenerationConfig};
use crate::domain::ports::{
    ArtifactRepository, GenerationPipeline, Notification, Notifier, OwnerRepository,
    PipelineOutput, PipelineRequest,
};
use crate::services::progress::{self, GenerationStage};

/// One generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub owner_id: Uuid,
    pub requirement: String,
    /// Model identifier; the configured default is used when unset
    pub model: Option<String>,
    /// Display name; derived from the requirement when unset
    pub name: Option<String>,
    pub description: Option<String>,
    /// Set when this request refines an existing artifact
    pub parent_artifact_id: Option<Uuid>,
}

impl GenerationRequest {
    pub fn new(owner_id: Uuid, requirement: impl Into<String>) -> Self {
        Self {
            owner_id,
            requirement: requirement.into(),
            model: None,
            name: None,
            description: None,
            parent_artifact_id: None,
        }
    }
}

/// Operator-facing status of one generation task.
#[derive(Debug, Clone)]
pub struct GenerationStatus {
    pub artifact_id: Uuid,
    pub status: ArtifactStatus,
    /// Display-only estimate; never used to gate decisions
    pub progress_percent: u8,
    pub stage: Option<GenerationStage>,
    pub quality_score: Option<f64>,
}

struct OrchestratorInner {
    artifacts: Arc<dyn ArtifactRepository>,
    owners: Arc<dyn OwnerRepository>,
    pipeline: Arc<dyn GenerationPipeline>,
    notifier: Arc<dyn Notifier>,
    workspace_root: PathBuf,
    config: GenerationConfig,
    in_flight: Mutex<HashMap<Uuid, AbortHandle>>,
}

/// Orchestrates background generation tasks.
pub struct GenerationOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl GenerationOrchestrator {
    pub fn new(
        artifacts: Arc<dyn ArtifactRepository>,
        owners: Arc<dyn OwnerRepository>,
        pipeline: Arc<dyn GenerationPipeline>,
        notifier: Arc<dyn Notifier>,
        workspace_root: PathBuf,
        config: GenerationConfig,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                artifacts,
                owners,
                pipeline,
                notifier,
                workspace_root,
                config,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create an artifact record and launch its generation.
    /// Returns the task id immediately; never blocks on the pipeline.
    pub async fn start_generation(&self, request: GenerationRequest) -> DomainResult<Uuid> {
        self.inner
            .owners
            .get(request.owner_id)
            .await?
            .ok_or(DomainError::OwnerNotFound(request.owner_id))?;

        let model = request
            .model
            .unwrap_or_else(|| self.inner.config.default_model.clone());

        let mut artifact = Artifact::new(request.owner_id, request.requirement, model);
        if let Some(name) = request.name {
            artifact = artifact.with_name(name);
        }
        if let Some(description) = request.description {
            artifact = artifact.with_description(description);
        }
        if let Some(parent_id) = request.parent_artifact_id {
            artifact = artifact.with_parent(parent_id);
        }

        self.inner.artifacts.create(&artifact).await?;
        self.inner
            .owners
            .increment_artifact_count(request.owner_id)
            .await?;

        let task_id = artifact.id;
        info!(task_id = %task_id, owner_id = %artifact.owner_id, "Generation task created");

        self.launch(artifact).await;
        Ok(task_id)
    }

    /// Launch the pipeline for an already-persisted record. Used by
    /// `start_generation` and by the control loop's intake pass; a no-op
    /// when the task is already in flight.
    pub async fn launch(&self, artifact: Artifact) {
        let task_id = artifact.id;
        let mut in_flight = self.inner.in_flight.lock().await;
        if in_flight.contains_key(&task_id) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            inner.run_generation(artifact).await;
        });
        // Insertion happens under the same lock the task's final removal
        // takes, so the entry can never be removed before it exists.
        in_flight.insert(task_id, handle.abort_handle());
    }

    /// Cancel an in-flight generation. The record still terminates in
    /// Failed through the shared completion path. Returns false when the
    /// task is not in flight.
    pub async fn cancel(&self, task_id: Uuid) -> DomainResult<bool> {
        let handle = self.inner.in_flight.lock().await.remove(&task_id);
        let Some(handle) = handle else {
            return Ok(false);
        };

        handle.abort();
        self.inner
            .finish_failure(task_id, "generation cancelled".to_string())
            .await;
        info!(task_id = %task_id, "Generation cancelled");
        Ok(true)
    }

    /// Abort the in-flight task for a record the stuck sweep is failing.
    pub async fn abort_if_in_flight(&self, task_id: Uuid) {
        if let Some(handle) = self.inner.in_flight.lock().await.remove(&task_id) {
            handle.abort();
        }
    }

    /// Read the task's status plus a heuristic progress estimate.
    pub async fn get_status(&self, task_id: Uuid) -> DomainResult<GenerationStatus> {
        let artifact = self
            .inner
            .artifacts
            .get(task_id)
            .await?
            .ok_or(DomainError::ArtifactNotFound(task_id))?;

        let (progress_percent, stage) = match artifact.status {
            ArtifactStatus::Generating => {
                let elapsed = (Utc::now() - artifact.created_at)
                    .to_std()
                    .unwrap_or_default();
                let estimate = progress::estimate(
                    elapsed,
                    Duration::from_secs(self.inner.config.expected_duration_secs),
                );
                (estimate.percent, Some(estimate.stage))
            }
            ArtifactStatus::Testing => (80, Some(GenerationStage::Testing)),
            ArtifactStatus::Failed => (0, None),
            ArtifactStatus::Ready | ArtifactStatus::Deployed | ArtifactStatus::Archived => {
                (100, None)
            }
        };

        Ok(GenerationStatus {
            artifact_id: task_id,
            status: artifact.status,
            progress_percent,
            stage,
            quality_score: artifact.quality_score,
        })
    }

    /// Whether a task currently has a live pipeline invocation.
    pub async fn is_in_flight(&self, task_id: Uuid) -> bool {
        self.inner.in_flight.lock().await.contains_key(&task_id)
    }

    /// Number of live pipeline invocations.
    pub async fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().await.len()
    }
}

impl OrchestratorInner {
    async fn run_generation(self: Arc<Self>, artifact: Artifact) {
        let task_id = artifact.id;
        let started = Instant::now();
        info!(task_id = %task_id, model = %artifact.model_identifier, "Pipeline invocation started");

        let request = PipelineRequest {
            requirement: artifact.requirement_text.clone(),
            model: artifact.model_identifier.clone(),
            output_dir: self.workspace_root.join(task_id.to_string()),
        };

        let result = tokio::time::timeout(
            Duration::from_secs(self.config.pipeline_timeout_secs),
            self.pipeline.invoke(request),
        )
        .await;

        match result {
            Ok(Ok(output)) => {
                let duration_secs = started.elapsed().as_secs() as i64;
                self.finish_success(task_id, output, duration_secs).await;
            }
            Ok(Err(e)) => {
                error!(task_id = %task_id, error = %e, "Pipeline invocation failed");
                self.finish_failure(task_id, e.to_string()).await;
            }
            Err(_) => {
                error!(task_id = %task_id, "Pipeline invocation timed out");
                self.finish_failure(task_id, "pipeline invocation timed out".to_string())
                    .await;
            }
        }

        // Registry cleanup runs on every outcome so completed tasks never
        // linger in the in-flight map.
        self.in_flight.lock().await.remove(&task_id);
    }

    async fn finish_success(&self, task_id: Uuid, output: PipelineOutput, duration_secs: i64) {
        let mut artifact = match self.artifacts.get(task_id).await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                warn!(task_id = %task_id, "Generated artifact record disappeared");
                return;
            }
            Err(e) => {
                error!(task_id = %task_id, error = %e, "Failed to load artifact after generation");
                return;
            }
        };

        if let Err(e) = artifact.transition_to(ArtifactStatus::Ready) {
            // The stuck sweep may have force-failed the record meanwhile.
            warn!(task_id = %task_id, error = %e, "Completed generation cannot be recorded");
            return;
        }

        let quality_score = output.verdict.quality_score();
        artifact.entry_location = Some(
            output
                .entry_file
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| output.entry_file.display().to_string()),
        );
        artifact.source_code = Some(output.source_code);
        artifact.readme = Some(output.readme);
        artifact.dependency_manifest = Some(output.dependency_manifest);
        artifact.quality_score = Some(quality_score);
        artifact.generation_duration_secs = Some(duration_secs);

        if let Err(e) = self.artifacts.update(&artifact).await {
            error!(task_id = %task_id, error = %e, "Failed to persist generation result");
            return;
        }

        info!(
            task_id = %task_id,
            quality_score = quality_score,
            duration_secs = duration_secs,
            "Generation completed"
        );

        self.notifier
            .notify(Notification::completed(
                task_id,
                serde_json::json!({
                    "artifact_id": task_id,
                    "quality_score": quality_score,
                }),
            ))
            .await;
    }

    async fn finish_failure(&self, task_id: Uuid, reason: String) {
        match self.artifacts.get(task_id).await {
            Ok(Some(mut artifact)) => {
                if !artifact.is_terminal() {
                    if let Err(e) = artifact.transition_to(ArtifactStatus::Failed) {
                        warn!(task_id = %task_id, error = %e, "Failed artifact cannot transition");
                    } else {
                        if artifact.description.is_empty() {
                            artifact.description = format!("[error] {reason}");
                        } else {
                            artifact.description.push_str(&format!("\n\n[error] {reason}"));
                        }
                        artifact.updated_at = Utc::now();
                        if let Err(e) = self.artifacts.update(&artifact).await {
                            error!(task_id = %task_id, error = %e, "Failed to persist failure");
                        }
                    }
                }
            }
            Ok(None) => warn!(task_id = %task_id, "Failed artifact record disappeared"),
            Err(e) => error!(task_id = %task_id, error = %e, "Failed to load artifact for failure"),
        }

        self.notifier
            .notify(Notification::error(task_id, reason))
            .await;
    }
}
