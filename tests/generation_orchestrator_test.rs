//! Integration tests for the generation orchestrator.

mod common;

use std::time::Duration;

use common::{seed_owner, setup_store, stub_orchestrator, wait_until};
use hatchery::adapters::pipeline::StubPipeline;
use hatchery::domain::models::{ArtifactStatus, DeliverabilityVerdict};
use hatchery::GenerationRequest;
use uuid::Uuid;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_successful_generation_reaches_ready() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let workspace = tempfile::tempdir().unwrap();

    let orchestrator = stub_orchestrator(
        &store,
        StubPipeline::new().with_delay(Duration::ZERO),
        workspace.path().to_path_buf(),
    );

    let task_id = orchestrator
        .start_generation(GenerationRequest::new(
            owner.id,
            "Create a product query service",
        ))
        .await
        .unwrap();

    assert!(
        wait_until(|| async { !orchestrator.is_in_flight(task_id).await }, WAIT).await,
        "generation did not finish in time"
    );

    let artifact = store.artifacts.get(task_id).await.unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Ready);
    assert_eq!(artifact.quality_score, Some(85.0));
    assert!(artifact.entry_location.is_some());
    assert!(artifact.source_code.as_deref().unwrap().contains("FastAPI"));
    assert!(artifact.readme.is_some());
    assert!(artifact.dependency_manifest.is_some());
    assert!(artifact.generation_duration_secs.is_some());

    // Registry never leaks completed tasks.
    assert_eq!(orchestrator.in_flight_count().await, 0);

    // The owner's generation counter was incremented.
    let owner = store.owners.get(owner.id).await.unwrap().unwrap();
    assert_eq!(owner.artifact_count, 1);
}

#[tokio::test]
async fn test_needs_refinement_scores_below_deliverable() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let workspace = tempfile::tempdir().unwrap();

    let deliverable = stub_orchestrator(
        &store,
        StubPipeline::new()
            .with_verdict(DeliverabilityVerdict::Deliverable)
            .with_delay(Duration::ZERO),
        workspace.path().join("a"),
    );
    let refinable = stub_orchestrator(
        &store,
        StubPipeline::new()
            .with_verdict(DeliverabilityVerdict::NeedsRefinement)
            .with_delay(Duration::ZERO),
        workspace.path().join("b"),
    );

    let high_id = deliverable
        .start_generation(GenerationRequest::new(owner.id, "same requirement"))
        .await
        .unwrap();
    let low_id = refinable
        .start_generation(GenerationRequest::new(owner.id, "same requirement"))
        .await
        .unwrap();

    assert!(wait_until(|| async { !deliverable.is_in_flight(high_id).await }, WAIT).await);
    assert!(wait_until(|| async { !refinable.is_in_flight(low_id).await }, WAIT).await);

    let high = store.artifacts.get(high_id).await.unwrap().unwrap();
    let low = store.artifacts.get(low_id).await.unwrap().unwrap();
    assert!(low.quality_score.unwrap() < high.quality_score.unwrap());
}

#[tokio::test]
async fn test_pipeline_failure_reaches_failed() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let workspace = tempfile::tempdir().unwrap();

    let orchestrator = stub_orchestrator(
        &store,
        StubPipeline::failing("model quota exhausted").with_delay(Duration::ZERO),
        workspace.path().to_path_buf(),
    );

    let task_id = orchestrator
        .start_generation(GenerationRequest::new(owner.id, "doomed request"))
        .await
        .unwrap();

    assert!(wait_until(|| async { !orchestrator.is_in_flight(task_id).await }, WAIT).await);

    let artifact = store.artifacts.get(task_id).await.unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Failed);
    assert!(artifact.entry_location.is_none());
    assert!(artifact.description.contains("model quota exhausted"));
}

#[tokio::test]
async fn test_cancel_routes_through_failure_path() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let workspace = tempfile::tempdir().unwrap();

    let orchestrator = stub_orchestrator(
        &store,
        StubPipeline::new().with_delay(Duration::from_secs(60)),
        workspace.path().to_path_buf(),
    );

    let task_id = orchestrator
        .start_generation(GenerationRequest::new(owner.id, "slow request"))
        .await
        .unwrap();
    assert!(orchestrator.is_in_flight(task_id).await);

    let cancelled = orchestrator.cancel(task_id).await.unwrap();
    assert!(cancelled);

    let artifact = store.artifacts.get(task_id).await.unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Failed);
    assert!(artifact.description.contains("cancelled"));
    assert_eq!(orchestrator.in_flight_count().await, 0);
}

#[tokio::test]
async fn test_cancel_unknown_task_returns_false() {
    let store = setup_store().await;
    let workspace = tempfile::tempdir().unwrap();
    let orchestrator = stub_orchestrator(
        &store,
        StubPipeline::new().with_delay(Duration::ZERO),
        workspace.path().to_path_buf(),
    );

    assert!(!orchestrator.cancel(Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn test_start_generation_rejects_unknown_owner() {
    let store = setup_store().await;
    let workspace = tempfile::tempdir().unwrap();
    let orchestrator = stub_orchestrator(
        &store,
        StubPipeline::new().with_delay(Duration::ZERO),
        workspace.path().to_path_buf(),
    );

    let result = orchestrator
        .start_generation(GenerationRequest::new(Uuid::new_v4(), "orphan request"))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_status_of_in_flight_generation() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let workspace = tempfile::tempdir().unwrap();

    let orchestrator = stub_orchestrator(
        &store,
        StubPipeline::new().with_delay(Duration::from_secs(60)),
        workspace.path().to_path_buf(),
    );

    let task_id = orchestrator
        .start_generation(GenerationRequest::new(owner.id, "slow request"))
        .await
        .unwrap();

    let status = orchestrator.get_status(task_id).await.unwrap();
    assert_eq!(status.status, ArtifactStatus::Generating);
    assert!(status.progress_percent < 100);
    assert!(status.stage.is_some());
    assert!(status.quality_score.is_none());

    orchestrator.cancel(task_id).await.unwrap();
}
