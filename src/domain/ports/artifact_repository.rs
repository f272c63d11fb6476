use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Artifact, ArtifactStatus};

/// Filters for querying artifacts
#[derive(Default, Debug, Clone)]
pub struct ArtifactFilter {
    pub status: Option<ArtifactStatus>,
    pub owner_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Repository port for artifact persistence
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Insert a new artifact record
    async fn create(&self, artifact: &Artifact) -> DomainResult<()>;

    /// Get an artifact by ID
    async fn get(&self, id: Uuid) -> DomainResult<Option<Artifact>>;

    /// Update an existing artifact
    async fn update(&self, artifact: &Artifact) -> DomainResult<()>;

    /// List artifacts with optional filters
    async fn list(&self, filter: ArtifactFilter) -> DomainResult<Vec<Artifact>>;

    /// List artifacts in a given status
    async fn list_by_status(&self, status: ArtifactStatus) -> DomainResult<Vec<Artifact>>;

    /// Generating records whose source has not been produced yet
    /// (the control loop's intake queue)
    async fn list_pending_generation(&self) -> DomainResult<Vec<Artifact>>;

    /// Generating records created before the cutoff (stuck-task sweep)
    async fn list_stuck(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Artifact>>;

    /// Refinement children of an artifact
    async fn get_children(&self, parent_id: Uuid) -> DomainResult<Vec<Artifact>>;
}
