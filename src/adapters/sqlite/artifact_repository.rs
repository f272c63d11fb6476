//! SQLite implementation of the ArtifactRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Artifact, ArtifactStatus};
use crate::domain::ports::{ArtifactFilter, ArtifactRepository};

#[derive(Clone)]
pub struct SqliteArtifactRepository {
    pool: SqlitePool,
}

impl SqliteArtifactRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtifactRepository for SqliteArtifactRepository {
    async fn create(&self, artifact: &Artifact) -> DomainResult<()> {
        let endpoints_json = serde_json::to_string(&artifact.endpoint_urls)?;

        sqlx::query(
            r#"INSERT INTO artifacts (id, owner_id, name, description, requirement_text,
               model_identifier, status, entry_location, source_code, readme,
               dependency_manifest, quality_score, generation_duration_secs, is_running,
               deployed_port, endpoint_urls, deployed_at, call_count, error_count,
               avg_latency_ms, refinement_count, parent_artifact_id, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(artifact.id.to_string())
        .bind(artifact.owner_id.to_string())
        .bind(&artifact.name)
        .bind(&artifact.description)
        .bind(&artifact.requirement_text)
        .bind(&artifact.model_identifier)
        .bind(artifact.status.as_str())
        .bind(&artifact.entry_location)
        .bind(&artifact.source_code)
        .bind(&artifact.readme)
        .bind(&artifact.dependency_manifest)
        .bind(artifact.quality_score)
        .bind(artifact.generation_duration_secs)
        .bind(artifact.is_running)
        .bind(artifact.deployed_port.map(i64::from))
        .bind(&endpoints_json)
        .bind(artifact.deployed_at.map(|t| t.to_rfc3339()))
        .bind(artifact.call_count)
        .bind(artifact.error_count)
        .bind(artifact.avg_latency_ms)
        .bind(artifact.refinement_count)
        .bind(artifact.parent_artifact_id.map(|id| id.to_string()))
        .bind(artifact.created_at.to_rfc3339())
        .bind(artifact.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Artifact>> {
        let row: Option<ArtifactRow> = sqlx::query_as("SELECT * FROM artifacts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Artifact::try_from).transpose()
    }

    async fn update(&self, artifact: &Artifact) -> DomainResult<()> {
        let endpoints_json = serde_json::to_string(&artifact.endpoint_urls)?;

        let result = sqlx::query(
            r#"UPDATE artifacts SET name = ?, description = ?, status = ?,
               entry_location = ?, source_code = ?, readme = ?, dependency_manifest = ?,
               quality_score = ?, generation_duration_secs = ?, is_running = ?,
               deployed_port = ?, endpoint_urls = ?, deployed_at = ?, call_count = ?,
               error_count = ?, avg_latency_ms = ?, refinement_count = ?,
               parent_artifact_id = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&artifact.name)
        .bind(&artifact.description)
        .bind(artifact.status.as_str())
        .bind(&artifact.entry_location)
        .bind(&artifact.source_code)
        .bind(&artifact.readme)
        .bind(&artifact.dependency_manifest)
        .bind(artifact.quality_score)
        .bind(artifact.generation_duration_secs)
        .bind(artifact.is_running)
        .bind(artifact.deployed_port.map(i64::from))
        .bind(&endpoints_json)
        .bind(artifact.deployed_at.map(|t| t.to_rfc3339()))
        .bind(artifact.call_count)
        .bind(artifact.error_count)
        .bind(artifact.avg_latency_ms)
        .bind(artifact.refinement_count)
        .bind(artifact.parent_artifact_id.map(|id| id.to_string()))
        .bind(artifact.updated_at.to_rfc3339())
        .bind(artifact.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ArtifactNotFound(artifact.id));
        }

        Ok(())
    }

    async fn list(&self, filter: ArtifactFilter) -> DomainResult<Vec<Artifact>> {
        let mut query = String::from("SELECT * FROM artifacts WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        if let Some(owner_id) = &filter.owner_id {
            query.push_str(" AND owner_id = ?");
            bindings.push(owner_id.to_string());
        }
        if let Some(parent_id) = &filter.parent_id {
            query.push_str(" AND parent_artifact_id = ?");
            bindings.push(parent_id.to_string());
        }

        query.push_str(" ORDER BY created_at DESC");

        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut q = sqlx::query_as::<_, ArtifactRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<ArtifactRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(Artifact::try_from).collect()
    }

    async fn list_by_status(&self, status: ArtifactStatus) -> DomainResult<Vec<Artifact>> {
        self.list(ArtifactFilter {
            status: Some(status),
            ..Default::default()
        })
        .await
    }

    async fn list_pending_generation(&self) -> DomainResult<Vec<Artifact>> {
        let rows: Vec<ArtifactRow> = sqlx::query_as(
            r#"SELECT * FROM artifacts
               WHERE status = 'generating'
                 AND (source_code IS NULL OR source_code = '')
               ORDER BY created_at"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Artifact::try_from).collect()
    }

    async fn list_stuck(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Artifact>> {
        let rows: Vec<ArtifactRow> = sqlx::query_as(
            r#"SELECT * FROM artifacts
               WHERE status = 'generating' AND created_at < ?
               ORDER BY created_at"#,
        )
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Artifact::try_from).collect()
    }

    async fn get_children(&self, parent_id: Uuid) -> DomainResult<Vec<Artifact>> {
        self.list(ArtifactFilter {
            parent_id: Some(parent_id),
            ..Default::default()
        })
        .await
    }
}

#[derive(sqlx::FromRow)]
struct ArtifactRow {
    id: String,
    owner_id: String,
    name: Option<String>,
    description: Option<String>,
    requirement_text: String,
    model_identifier: String,
    status: String,
    entry_location: Option<String>,
    source_code: Option<String>,
    readme: Option<String>,
    dependency_manifest: Option<String>,
    quality_score: Option<f64>,
    generation_duration_secs: Option<i64>,
    is_running: bool,
    deployed_port: Option<i64>,
    endpoint_urls: Option<String>,
    deployed_at: Option<String>,
    call_count: i64,
    error_count: i64,
    avg_latency_ms: Option<f64>,
    refinement_count: i64,
    parent_artifact_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ArtifactRow> for Artifact {
    type Error = DomainError;

    fn try_from(row: ArtifactRow) -> Result<Self, Self::Error> {
        let id = parse_uuid(&row.id)?;
        let owner_id = parse_uuid(&row.owner_id)?;

        let status = ArtifactStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid status: {}", row.status))
        })?;

        let parent_artifact_id = row
            .parent_artifact_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?;

        let endpoint_urls: Vec<String> = row
            .endpoint_urls
            .filter(|s| !s.is_empty())
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| DomainError::SerializationError(e.to_string()))?
            .unwrap_or_default();

        let deployed_port = row
            .deployed_port
            .map(|p| {
                u16::try_from(p).map_err(|_| {
                    DomainError::SerializationError(format!("Invalid port: {p}"))
                })
            })
            .transpose()?;

        Ok(Artifact {
            id,
            owner_id,
            name: row.name.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            requirement_text: row.requirement_text,
            model_identifier: row.model_identifier,
            status,
            entry_location: row.entry_location,
            source_code: row.source_code,
            readme: row.readme,
            dependency_manifest: row.dependency_manifest,
            quality_score: row.quality_score,
            generation_duration_secs: row.generation_duration_secs,
            is_running: row.is_running,
            deployed_port,
            endpoint_urls,
            deployed_at: parse_optional_timestamp(row.deployed_at)?,
            call_count: row.call_count,
            error_count: row.error_count,
            avg_latency_ms: row.avg_latency_ms,
            refinement_count: row.refinement_count,
            parent_artifact_id,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(s).map_err(|e| DomainError::SerializationError(e.to_string()))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| DomainError::SerializationError(e.to_string()))
}

fn parse_optional_timestamp(s: Option<String>) -> Result<Option<DateTime<Utc>>, DomainError> {
    s.as_deref().map(parse_timestamp).transpose()
}
