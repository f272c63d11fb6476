//! Integration tests for the process lifecycle manager.
//!
//! The process host command is replaced by small shell scripts so the
//! tests exercise real spawn/terminate behavior without a python stack.

#![cfg(unix)]

mod common;

use common::{seed_owner, seed_ready_artifact, setup_store, shell_deploy_config, write_artifact_dir};
use hatchery::domain::models::ArtifactStatus;
use hatchery::{DeploymentManager, DomainError};
use uuid::Uuid;

const PY_SOURCE: &str = "app = FastAPI()\n";

#[tokio::test]
async fn test_crashing_artifact_fails_with_diagnostic_and_frees_port() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let workspace = tempfile::tempdir().unwrap();
    let dir = write_artifact_dir(workspace.path(), "crasher", PY_SOURCE);

    let artifact = seed_ready_artifact(&store, owner.id, Some(dir.display().to_string())).await;

    let manager = DeploymentManager::new(
        shell_deploy_config("echo boom >&2; exit 1"),
        store.artifacts.clone(),
    );

    let err = manager.deploy(artifact.id, &dir).await.unwrap_err();
    match err {
        DomainError::DeploymentCrashed { diagnostic } => {
            assert!(!diagnostic.is_empty());
            assert!(diagnostic.contains("boom"), "diagnostic was: {diagnostic}");
        }
        other => panic!("expected DeploymentCrashed, got: {other}"),
    }

    // The allocated port must be observed free immediately after.
    assert!(manager.held_ports().await.is_empty());

    // The record is untouched by the failed deploy.
    let record = store.artifacts.get(artifact.id).await.unwrap().unwrap();
    assert_eq!(record.status, ArtifactStatus::Ready);
    assert!(record.deployed_port.is_none());
}

#[tokio::test]
async fn test_deploy_and_stop_round_trip() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let workspace = tempfile::tempdir().unwrap();
    let dir = write_artifact_dir(workspace.path(), "svc", PY_SOURCE);

    let artifact = seed_ready_artifact(&store, owner.id, Some(dir.display().to_string())).await;

    let manager =
        DeploymentManager::new(shell_deploy_config("sleep 30"), store.artifacts.clone());

    let deployment = manager.deploy(artifact.id, &dir).await.unwrap();
    assert!((8100..8200).contains(&deployment.port));
    assert!(deployment.pid > 0);
    assert!(deployment
        .endpoints
        .iter()
        .any(|e| e.ends_with("/health")));

    let status = manager.status(artifact.id).await.unwrap();
    assert!(status.running);
    assert_eq!(status.port, deployment.port);

    let record = store.artifacts.get(artifact.id).await.unwrap().unwrap();
    assert_eq!(record.status, ArtifactStatus::Deployed);
    assert_eq!(record.deployed_port, Some(deployment.port));
    assert!(record.is_running);
    assert!(record.deployed_at.is_some());

    let stopped = manager.stop(artifact.id).await.unwrap();
    assert!(stopped);

    assert!(manager.status(artifact.id).await.is_none());
    assert!(manager.held_ports().await.is_empty());

    let record = store.artifacts.get(artifact.id).await.unwrap().unwrap();
    assert_eq!(record.status, ArtifactStatus::Ready);
    assert!(record.deployed_port.is_none());
    assert!(!record.is_running);
}

#[tokio::test]
async fn test_stop_on_never_deployed_artifact_is_noop() {
    let store = setup_store().await;
    let manager =
        DeploymentManager::new(shell_deploy_config("sleep 30"), store.artifacts.clone());

    let stopped = manager.stop(Uuid::new_v4()).await.unwrap();
    assert!(!stopped);
    assert!(manager.list().await.is_empty());
}

#[tokio::test]
async fn test_parallel_deploys_receive_distinct_ports() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let workspace = tempfile::tempdir().unwrap();
    let dir_a = write_artifact_dir(workspace.path(), "svc_a", PY_SOURCE);
    let dir_b = write_artifact_dir(workspace.path(), "svc_b", PY_SOURCE);

    let artifact_a = seed_ready_artifact(&store, owner.id, Some(dir_a.display().to_string())).await;
    let artifact_b = seed_ready_artifact(&store, owner.id, Some(dir_b.display().to_string())).await;

    let manager = std::sync::Arc::new(DeploymentManager::new(
        shell_deploy_config("sleep 30"),
        store.artifacts.clone(),
    ));

    let (a, b) = tokio::join!(
        manager.deploy(artifact_a.id, &dir_a),
        manager.deploy(artifact_b.id, &dir_b),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_ne!(a.port, b.port);
    assert!((8100..8200).contains(&a.port));
    assert!((8100..8200).contains(&b.port));

    let held = manager.held_ports().await;
    assert_eq!(held.len(), 2);

    assert!(manager.stop(artifact_a.id).await.unwrap());
    assert!(manager.stop(artifact_b.id).await.unwrap());
    assert!(manager.held_ports().await.is_empty());
}

#[tokio::test]
async fn test_released_port_is_reused_after_stop() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let workspace = tempfile::tempdir().unwrap();
    let dir = write_artifact_dir(workspace.path(), "svc", PY_SOURCE);

    let first = seed_ready_artifact(&store, owner.id, Some(dir.display().to_string())).await;
    let second = seed_ready_artifact(&store, owner.id, Some(dir.display().to_string())).await;

    let manager =
        DeploymentManager::new(shell_deploy_config("sleep 30"), store.artifacts.clone());

    let deployment = manager.deploy(first.id, &dir).await.unwrap();
    let port = deployment.port;
    assert!(manager.stop(first.id).await.unwrap());

    let redeployed = manager.deploy(second.id, &dir).await.unwrap();
    assert_eq!(redeployed.port, port);
    assert!(manager.stop(second.id).await.unwrap());
}

#[tokio::test]
async fn test_deploy_missing_entry_fails_before_any_allocation() {
    let store = setup_store().await;
    let manager =
        DeploymentManager::new(shell_deploy_config("sleep 30"), store.artifacts.clone());

    let err = manager
        .deploy(Uuid::new_v4(), std::path::Path::new("/nonexistent/location"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::EntryNotFound(_)));
    assert!(manager.held_ports().await.is_empty());
}

#[tokio::test]
async fn test_health_check_returns_false_for_untracked_artifact() {
    let store = setup_store().await;
    let manager =
        DeploymentManager::new(shell_deploy_config("sleep 30"), store.artifacts.clone());

    assert!(!manager.health_check(Uuid::new_v4()).await);
}

#[tokio::test]
async fn test_port_exhaustion_is_reported() {
    let store = setup_store().await;
    let owner = seed_owner(&store).await;
    let workspace = tempfile::tempdir().unwrap();
    let dir_a = write_artifact_dir(workspace.path(), "svc_a", PY_SOURCE);
    let dir_b = write_artifact_dir(workspace.path(), "svc_b", PY_SOURCE);

    let artifact_a = seed_ready_artifact(&store, owner.id, Some(dir_a.display().to_string())).await;
    let artifact_b = seed_ready_artifact(&store, owner.id, Some(dir_b.display().to_string())).await;

    let mut config = shell_deploy_config("sleep 30");
    config.base_port = 8150;
    config.max_port = 8151; // a single-port pool

    let manager = DeploymentManager::new(config, store.artifacts.clone());

    manager.deploy(artifact_a.id, &dir_a).await.unwrap();
    let err = manager.deploy(artifact_b.id, &dir_b).await.unwrap_err();
    assert!(matches!(err, DomainError::NoPortsAvailable));

    assert!(manager.stop(artifact_a.id).await.unwrap());
}
