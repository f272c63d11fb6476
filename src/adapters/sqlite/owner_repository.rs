//! SQLite implementation of the OwnerRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Owner;
use crate::domain::ports::OwnerRepository;

#[derive(Clone)]
pub struct SqliteOwnerRepository {
    pool: SqlitePool,
}

impl SqliteOwnerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OwnerRepository for SqliteOwnerRepository {
    async fn create(&self, owner: &Owner) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO owners (id, name, artifact_count, calls_today, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(owner.id.to_string())
        .bind(&owner.name)
        .bind(owner.artifact_count)
        .bind(owner.calls_today)
        .bind(owner.created_at.to_rfc3339())
        .bind(owner.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Owner>> {
        let row: Option<OwnerRow> = sqlx::query_as("SELECT * FROM owners WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Owner::try_from).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<Owner>> {
        let rows: Vec<OwnerRow> = sqlx::query_as("SELECT * FROM owners ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Owner::try_from).collect()
    }

    async fn increment_artifact_count(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE owners SET artifact_count = artifact_count + 1, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::OwnerNotFound(id));
        }

        Ok(())
    }

    async fn reset_daily_counters(&self) -> DomainResult<u64> {
        let result = sqlx::query("UPDATE owners SET calls_today = 0, updated_at = ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct OwnerRow {
    id: String,
    name: String,
    artifact_count: i64,
    calls_today: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<OwnerRow> for Owner {
    type Error = DomainError;

    fn try_from(row: OwnerRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        let parse = |s: &str| -> Result<DateTime<Utc>, DomainError> {
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| DomainError::SerializationError(e.to_string()))
        };

        Ok(Owner {
            id,
            name: row.name,
            artifact_count: row.artifact_count,
            calls_today: row.calls_today,
            created_at: parse(&row.created_at)?,
            updated_at: parse(&row.updated_at)?,
        })
    }
}
