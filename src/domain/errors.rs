//! Domain errors for the hatchery orchestrator.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur across the artifact lifecycle.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(Uuid),

    #[error("Owner not found: {0}")]
    OwnerNotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("No runnable entry point: {0}")]
    EntryNotFound(String),

    #[error("No available ports in the deployment range")]
    NoPortsAvailable,

    #[error("Deployment crashed on startup: {diagnostic}")]
    DeploymentCrashed { diagnostic: String },

    #[error("Deployment precheck timed out waiting for the process")]
    DeploymentTimeout,

    #[error("Artifact is not deployable: {0}")]
    NotDeployable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}
