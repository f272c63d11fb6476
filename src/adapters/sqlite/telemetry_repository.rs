//! SQLite implementation of the TelemetryRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Invocation, InvocationOutcome};
use crate::domain::ports::TelemetryRepository;

#[derive(Clone)]
pub struct SqliteTelemetryRepository {
    pool: SqlitePool,
}

impl SqliteTelemetryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TelemetryRepository for SqliteTelemetryRepository {
    async fn record(&self, invocation: &Invocation) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO invocations (id, artifact_id, tool_name, latency_ms, outcome,
               error_message, request_id, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(invocation.id.to_string())
        .bind(invocation.artifact_id.to_string())
        .bind(&invocation.tool_name)
        .bind(invocation.latency_ms)
        .bind(invocation.outcome.as_str())
        .bind(&invocation.error_message)
        .bind(&invocation.request_id)
        .bind(invocation.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_since(
        &self,
        artifact_id: Uuid,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<Invocation>> {
        let rows: Vec<InvocationRow> = sqlx::query_as(
            r#"SELECT * FROM invocations
               WHERE artifact_id = ? AND created_at >= ?
               ORDER BY created_at"#,
        )
        .bind(artifact_id.to_string())
        .bind(since.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Invocation::try_from).collect()
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM invocations WHERE created_at < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct InvocationRow {
    id: String,
    artifact_id: String,
    tool_name: Option<String>,
    latency_ms: Option<f64>,
    outcome: String,
    error_message: Option<String>,
    request_id: Option<String>,
    created_at: String,
}

impl TryFrom<InvocationRow> for Invocation {
    type Error = DomainError;

    fn try_from(row: InvocationRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;
        let artifact_id = Uuid::parse_str(&row.artifact_id)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        let outcome = InvocationOutcome::from_str(&row.outcome).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid outcome: {}", row.outcome))
        })?;

        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        Ok(Invocation {
            id,
            artifact_id,
            tool_name: row.tool_name,
            latency_ms: row.latency_ms,
            outcome,
            error_message: row.error_message,
            request_id: row.request_id,
            created_at,
        })
    }
}
