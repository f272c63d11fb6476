//! Integration tests for the SQLite repositories.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{seed_owner, setup_store};
use hatchery::domain::models::ArtifactStatus;
use hatchery::{Artifact, ArtifactFilter, Invocation, InvocationOutcome, Owner};
use uuid::Uuid;

#[tokio::test]
async fn test_create_and_get_artifact() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;

    let artifact = Artifact::new(owner.id, "Build an order service", "test-model");
    store.artifacts.create(&artifact).await.unwrap();

    let retrieved = store.artifacts.get(artifact.id).await.unwrap().unwrap();
    assert_eq!(retrieved.id, artifact.id);
    assert_eq!(retrieved.owner_id, owner.id);
    assert_eq!(retrieved.requirement_text, "Build an order service");
    assert_eq!(retrieved.status, ArtifactStatus::Generating);
    assert!(retrieved.entry_location.is_none());
}

#[tokio::test]
async fn test_get_nonexistent_artifact() {
    let store = setup_store().await;
    let result = store.artifacts.get(Uuid::new_v4()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_update_persists_status_and_fields() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;

    let mut artifact = Artifact::new(owner.id, "req", "test-model");
    store.artifacts.create(&artifact).await.unwrap();

    artifact.transition_to(ArtifactStatus::Ready).unwrap();
    artifact.entry_location = Some("/workspace/svc".to_string());
    artifact.quality_score = Some(85.0);
    artifact.generation_duration_secs = Some(42);
    store.artifacts.update(&artifact).await.unwrap();

    let retrieved = store.artifacts.get(artifact.id).await.unwrap().unwrap();
    assert_eq!(retrieved.status, ArtifactStatus::Ready);
    assert_eq!(retrieved.entry_location.as_deref(), Some("/workspace/svc"));
    assert_eq!(retrieved.quality_score, Some(85.0));
    assert_eq!(retrieved.generation_duration_secs, Some(42));
}

#[tokio::test]
async fn test_update_missing_artifact_fails() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let artifact = Artifact::new(owner.id, "req", "test-model");

    let result = store.artifacts.update(&artifact).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_list_by_status_and_owner() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;

    let generating = Artifact::new(owner.id, "one", "test-model");
    let mut ready = Artifact::new(owner.id, "two", "test-model");
    ready.transition_to(ArtifactStatus::Ready).unwrap();

    store.artifacts.create(&generating).await.unwrap();
    store.artifacts.create(&ready).await.unwrap();

    let ready_list = store
        .artifacts
        .list_by_status(ArtifactStatus::Ready)
        .await
        .unwrap();
    assert_eq!(ready_list.len(), 1);
    assert_eq!(ready_list[0].id, ready.id);

    let owned = store
        .artifacts
        .list(ArtifactFilter {
            owner_id: Some(owner.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(owned.len(), 2);
}

#[tokio::test]
async fn test_pending_generation_excludes_records_with_source() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;

    let pending = Artifact::new(owner.id, "pending", "test-model");
    let mut in_progress = Artifact::new(owner.id, "has source", "test-model");
    in_progress.source_code = Some("app = FastAPI()".to_string());

    store.artifacts.create(&pending).await.unwrap();
    store.artifacts.create(&in_progress).await.unwrap();

    let queue = store.artifacts.list_pending_generation().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, pending.id);
}

#[tokio::test]
async fn test_list_stuck_uses_cutoff() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;

    let mut stuck = Artifact::new(owner.id, "old", "test-model");
    stuck.created_at = Utc::now() - ChronoDuration::minutes(45);
    let fresh = Artifact::new(owner.id, "new", "test-model");

    store.artifacts.create(&stuck).await.unwrap();
    store.artifacts.create(&fresh).await.unwrap();

    let cutoff = Utc::now() - ChronoDuration::minutes(30);
    let found = store.artifacts.list_stuck(cutoff).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, stuck.id);
}

#[tokio::test]
async fn test_lineage_round_trip() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;

    let parent = Artifact::new(owner.id, "parent", "test-model");
    let child = Artifact::new(owner.id, "child", "test-model").with_parent(parent.id);

    store.artifacts.create(&parent).await.unwrap();
    store.artifacts.create(&child).await.unwrap();

    let children = store.artifacts.get_children(parent.id).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].parent_artifact_id, Some(parent.id));
}

#[tokio::test]
async fn test_owner_counters() {
    let store = setup_store().await;

    let owner = Owner::new("farmer");
    store.owners.create(&owner).await.unwrap();

    store.owners.increment_artifact_count(owner.id).await.unwrap();
    store.owners.increment_artifact_count(owner.id).await.unwrap();

    let retrieved = store.owners.get(owner.id).await.unwrap().unwrap();
    assert_eq!(retrieved.artifact_count, 2);
}

#[tokio::test]
async fn test_owner_daily_reset() {
    let store = setup_store().await;

    let mut owner = Owner::new("farmer");
    owner.calls_today = 17;
    store.owners.create(&owner).await.unwrap();

    let affected = store.owners.reset_daily_counters().await.unwrap();
    assert_eq!(affected, 1);

    let retrieved = store.owners.get(owner.id).await.unwrap().unwrap();
    assert_eq!(retrieved.calls_today, 0);
}

#[tokio::test]
async fn test_increment_unknown_owner_fails() {
    let store = setup_store().await;
    let result = store.owners.increment_artifact_count(Uuid::new_v4()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_telemetry_window_and_prune() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let artifact = Artifact::new(owner.id, "req", "test-model");
    store.artifacts.create(&artifact).await.unwrap();

    let mut recent = Invocation::new(artifact.id, InvocationOutcome::Ok, 120.0);
    recent.created_at = Utc::now() - ChronoDuration::minutes(5);
    let mut old = Invocation::new(artifact.id, InvocationOutcome::Error, 900.0);
    old.created_at = Utc::now() - ChronoDuration::days(10);

    store.telemetry.record(&recent).await.unwrap();
    store.telemetry.record(&old).await.unwrap();

    let window = store
        .telemetry
        .list_since(artifact.id, Utc::now() - ChronoDuration::hours(1))
        .await
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, recent.id);

    let pruned = store
        .telemetry
        .prune_older_than(Utc::now() - ChronoDuration::days(7))
        .await
        .unwrap();
    assert_eq!(pruned, 1);

    let remaining = store
        .telemetry
        .list_since(artifact.id, Utc::now() - ChronoDuration::days(30))
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
}
