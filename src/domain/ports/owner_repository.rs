use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Owner;

/// Repository port for owner (tenant) persistence
#[async_trait]
pub trait OwnerRepository: Send + Sync {
    /// Insert a new owner
    async fn create(&self, owner: &Owner) -> DomainResult<()>;

    /// Get an owner by ID
    async fn get(&self, id: Uuid) -> DomainResult<Option<Owner>>;

    /// List all owners
    async fn list(&self) -> DomainResult<Vec<Owner>>;

    /// Bump the lifetime generation counter
    async fn increment_artifact_count(&self, id: Uuid) -> DomainResult<()>;

    /// Zero every owner's daily call counter; returns rows affected
    async fn reset_daily_counters(&self) -> DomainResult<u64>;
}
