//! Control loop daemon.
//!
//! The single always-on process that drives the artifact lifecycle:
//! picks up newly-created generation requests, fails tasks stuck past a
//! timeout, runs daily maintenance, and evaluates deployed artifacts for
//! refinement. Every pass is fault-isolated; an error in one pass is
//! logged and the loop continues on its next tick.

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{ArtifactStatus, DaemonConfig};
use crate::domain::ports::{ArtifactRepository, OwnerRepository, TelemetryRepository};
use crate::services::generation_orchestrator::GenerationOrchestrator;
use crate::services::quality_monitor::QualityMonitor;

/// Counters accumulated across ticks.
#[derive(Debug, Clone, Default)]
pub struct LoopStatus {
    pub running: bool,
    pub ticks: u64,
    pub generations_launched: u64,
    pub stuck_tasks_failed: u64,
    pub refinements_started: u64,
}

/// Handle to observe and stop a running control loop.
pub struct LoopHandle {
    stop_flag: Arc<AtomicBool>,
    status: Arc<RwLock<LoopStatus>>,
}

impl LoopHandle {
    /// Request the loop to stop after its current tick.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }

    pub async fn status(&self) -> LoopStatus {
        self.status.read().await.clone()
    }
}

pub struct ControlLoop {
    artifacts: Arc<dyn ArtifactRepository>,
    owners: Arc<dyn OwnerRepository>,
    telemetry: Arc<dyn TelemetryRepository>,
    orchestrator: Arc<GenerationOrchestrator>,
    monitor: Arc<QualityMonitor>,
    config: DaemonConfig,
    status: Arc<RwLock<LoopStatus>>,
    stop_flag: Arc<AtomicBool>,
    last_daily_reset: RwLock<NaiveDate>,
}

impl ControlLoop {
    pub fn new(
        artifacts: Arc<dyn ArtifactRepository>,
        owners: Arc<dyn OwnerRepository>,
        telemetry: Arc<dyn TelemetryRepository>,
        orchestrator: Arc<GenerationOrchestrator>,
        monitor: Arc<QualityMonitor>,
        config: DaemonConfig,
    ) -> Self {
        Self {
            artifacts,
            owners,
            telemetry,
            orchestrator,
            monitor,
            config,
            status: Arc::new(RwLock::new(LoopStatus::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
            last_daily_reset: RwLock::new(Utc::now().date_naive()),
        }
    }

    /// Get a handle to control the loop.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            stop_flag: self.stop_flag.clone(),
            status: self.status.clone(),
        }
    }

    /// Run until stopped via the handle.
    pub async fn run(&self) {
        {
            let mut status = self.status.write().await;
            status.running = true;
        }
        info!(
            tick_interval_secs = self.config.tick_interval_secs,
            "Control loop started"
        );

        let mut ticker = interval(Duration::from_secs(self.config.tick_interval_secs));

        loop {
            ticker.tick().await;
            if self.stop_flag.load(Ordering::Acquire) {
                break;
            }
            self.run_tick_once().await;
        }

        {
            let mut status = self.status.write().await;
            status.running = false;
        }
        info!("Control loop stopped");
    }

    /// One full tick: daily maintenance, intake, stuck sweep, quality
    /// evaluation. Public so tests can drive the loop deterministically.
    pub async fn run_tick_once(&self) {
        {
            let mut status = self.status.write().await;
            status.ticks += 1;
        }

        if let Err(e) = self.run_daily_maintenance().await {
            error!(error = %e, "Daily maintenance pass failed");
        }
        if let Err(e) = self.run_intake().await {
            error!(error = %e, "Generation intake pass failed");
        }
        if let Err(e) = self.run_stuck_sweep().await {
            error!(error = %e, "Stuck-task sweep failed");
        }
        if let Err(e) = self.run_quality_pass().await {
            error!(error = %e, "Quality evaluation pass failed");
        }
    }

    /// Once per calendar day: reset per-owner counters and prune old
    /// telemetry.
    async fn run_daily_maintenance(&self) -> DomainResult<()> {
        let today = Utc::now().date_naive();
        {
            let last = self.last_daily_reset.read().await;
            if today <= *last {
                return Ok(());
            }
        }

        let owners_reset = self.owners.reset_daily_counters().await?;
        let cutoff = Utc::now() - ChronoDuration::days(self.config.retention_days);
        let pruned = self.telemetry.prune_older_than(cutoff).await?;

        info!(
            owners_reset = owners_reset,
            invocations_pruned = pruned,
            "Daily maintenance completed"
        );

        *self.last_daily_reset.write().await = today;
        Ok(())
    }

    /// Hand not-yet-started generation records to the orchestrator.
    async fn run_intake(&self) -> DomainResult<()> {
        let pending = self.artifacts.list_pending_generation().await?;
        if pending.is_empty() {
            return Ok(());
        }

        let mut launched = 0u64;
        for artifact in pending {
            if self.orchestrator.is_in_flight(artifact.id).await {
                continue;
            }
            info!(task_id = %artifact.id, "Intake: launching pending generation");
            self.orchestrator.launch(artifact).await;
            launched += 1;
        }

        if launched > 0 {
            let mut status = self.status.write().await;
            status.generations_launched += launched;
        }
        Ok(())
    }

    /// Force Generating records older than the stuck timeout to Failed.
    /// Backstop for imperfect cooperative cancellation.
    async fn run_stuck_sweep(&self) -> DomainResult<()> {
        let cutoff = Utc::now() - ChronoDuration::minutes(self.config.stuck_timeout_mins);
        let stuck = self.artifacts.list_stuck(cutoff).await?;
        if stuck.is_empty() {
            return Ok(());
        }

        let mut failed = 0u64;
        for mut artifact in stuck {
            warn!(task_id = %artifact.id, "Generation appears stuck; marking as failed");
            self.orchestrator.abort_if_in_flight(artifact.id).await;

            if artifact.transition_to(ArtifactStatus::Failed).is_ok() {
                if artifact.description.is_empty() {
                    artifact.description = "[error] generation stuck past timeout".to_string();
                } else {
                    artifact
                        .description
                        .push_str("\n\n[error] generation stuck past timeout");
                }
                self.artifacts.update(&artifact).await?;
                failed += 1;
            }
        }

        info!(count = failed, "Marked stuck generations as failed");
        let mut status = self.status.write().await;
        status.stuck_tasks_failed += failed;
        Ok(())
    }

    /// Evaluate every deployed artifact; degraded ones spawn refinement
    /// children.
    async fn run_quality_pass(&self) -> DomainResult<()> {
        if !self.config.enable_auto_refine {
            return Ok(());
        }

        let deployed = self.artifacts.list_by_status(ArtifactStatus::Deployed).await?;
        let mut refinements = 0u64;

        for artifact in deployed {
            match self.monitor.evaluate_and_refine_if_needed(artifact.id).await {
                Ok(Some(new_task_id)) => {
                    info!(
                        artifact_id = %artifact.id,
                        new_task_id = %new_task_id,
                        "Quality pass triggered refinement"
                    );
                    refinements += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    // One bad artifact must not stop the rest of the pass.
                    error!(artifact_id = %artifact.id, error = %e, "Quality evaluation failed");
                }
            }
        }

        if refinements > 0 {
            let mut status = self.status.write().await;
            status.refinements_started += refinements;
        }
        Ok(())
    }
}
