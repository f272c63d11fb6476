use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Invocation;

/// Repository port for the append-only invocation log.
///
/// Writes come from the request layer; this subsystem records rows in
/// tests, reads them ranged by window, and prunes them on retention.
#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Append one invocation row
    async fn record(&self, invocation: &Invocation) -> DomainResult<()>;

    /// Invocations for an artifact since the given instant
    async fn list_since(
        &self,
        artifact_id: Uuid,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<Invocation>>;

    /// Delete rows older than the cutoff; returns rows deleted
    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> DomainResult<u64>;
}
