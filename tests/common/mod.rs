//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hatchery::adapters::pipeline::StubPipeline;
use hatchery::adapters::notify::NullNotifier;
use hatchery::adapters::sqlite::{
    all_embedded_migrations, create_test_pool, Migrator, SqliteArtifactRepository,
    SqliteOwnerRepository, SqliteTelemetryRepository,
};
use hatchery::domain::models::{ArtifactStatus, DeployConfig, GenerationConfig};
use hatchery::{
    Artifact, ArtifactRepository, GenerationOrchestrator, Owner, OwnerRepository,
    TelemetryRepository,
};
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct TestStore {
    pub pool: SqlitePool,
    pub artifacts: Arc<dyn ArtifactRepository>,
    pub owners: Arc<dyn OwnerRepository>,
    pub telemetry: Arc<dyn TelemetryRepository>,
}

pub async fn setup_store() -> TestStore {
    let pool = create_test_pool().await.expect("failed to create test pool");
    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .expect("failed to run migrations");

    TestStore {
        artifacts: Arc::new(SqliteArtifactRepository::new(pool.clone())),
        owners: Arc::new(SqliteOwnerRepository::new(pool.clone())),
        telemetry: Arc::new(SqliteTelemetryRepository::new(pool.clone())),
        pool,
    }
}

pub async fn seed_owner(store: &TestStore) -> Owner {
    let owner = Owner::new("test-owner");
    store.owners.create(&owner).await.expect("failed to seed owner");
    owner
}

/// Create and persist an artifact in the Ready state.
pub async fn seed_ready_artifact(
    store: &TestStore,
    owner_id: Uuid,
    entry_location: Option<String>,
) -> Artifact {
    let mut artifact = Artifact::new(owner_id, "test requirement", "test-model");
    artifact.transition_to(ArtifactStatus::Ready).unwrap();
    artifact.source_code = Some("app = FastAPI()".to_string());
    artifact.entry_location = entry_location;
    store
        .artifacts
        .create(&artifact)
        .await
        .expect("failed to seed artifact");
    artifact
}

/// Deploy config that runs a shell command instead of a real process host.
pub fn shell_deploy_config(script: &str) -> DeployConfig {
    DeployConfig {
        command_template: vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()],
        precheck_wait_ms: 150,
        stop_timeout_secs: 2,
        ..DeployConfig::default()
    }
}

/// Orchestrator wired to an instant stub pipeline.
pub fn stub_orchestrator(
    store: &TestStore,
    pipeline: StubPipeline,
    workspace: PathBuf,
) -> Arc<GenerationOrchestrator> {
    Arc::new(GenerationOrchestrator::new(
        store.artifacts.clone(),
        store.owners.clone(),
        Arc::new(pipeline),
        Arc::new(NullNotifier),
        workspace,
        GenerationConfig::default(),
    ))
}

/// Poll until the condition holds or the timeout elapses.
pub async fn wait_until<F, Fut>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Write a one-file python artifact directory and return its path.
pub fn write_artifact_dir(root: &std::path::Path, name: &str, source: &str) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{name}.py")), source).unwrap();
    dir
}
