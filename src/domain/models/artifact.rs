//! Artifact domain model.
//!
//! An artifact is one generated, potentially-deployable unit of code.
//! Each row records a single generation attempt and its deployment state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Status of an artifact in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Generation pipeline is running (or queued for intake)
    Generating,
    /// Generated source is being validated
    Testing,
    /// Generation succeeded; artifact can be deployed
    Ready,
    /// Artifact is running as a supervised process
    Deployed,
    /// Generation failed or the task was declared stuck
    Failed,
    /// Retired; kept for lineage history only
    Archived,
}

impl Default for ArtifactStatus {
    fn default() -> Self {
        Self::Generating
    }
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Testing => "testing",
            Self::Ready => "ready",
            Self::Deployed => "deployed",
            Self::Failed => "failed",
            Self::Archived => "archived",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "generating" => Some(Self::Generating),
            "testing" => Some(Self::Testing),
            "ready" => Some(Self::Ready),
            "deployed" => Some(Self::Deployed),
            "failed" => Some(Self::Failed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Archived)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<ArtifactStatus> {
        match self {
            Self::Generating => vec![Self::Testing, Self::Ready, Self::Failed],
            Self::Testing => vec![Self::Ready, Self::Failed],
            Self::Ready => vec![Self::Deployed, Self::Archived],
            Self::Deployed => vec![Self::Ready, Self::Archived],
            Self::Failed => vec![],
            Self::Archived => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

/// Deliverability verdict reported by the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverabilityVerdict {
    /// Pipeline considers the artifact fully deliverable
    Deliverable,
    /// Usable but the pipeline flagged it for another refinement round
    NeedsRefinement,
    /// Anything else the pipeline reported
    Undeliverable,
}

impl DeliverabilityVerdict {
    /// Map the verdict to a stored quality score.
    pub fn quality_score(&self) -> f64 {
        match self {
            Self::Deliverable => 85.0,
            Self::NeedsRefinement => 70.0,
            Self::Undeliverable => 60.0,
        }
    }

    /// Parse a free-form assessment string from the pipeline.
    ///
    /// NEEDS_REFINEMENT is matched before DELIVERABLE so that strings like
    /// "NOT_DELIVERABLE" do not accidentally rank as deliverable.
    pub fn from_assessment(s: &str) -> Self {
        let upper = s.to_uppercase();
        if upper.contains("NEEDS_REFINEMENT") {
            Self::NeedsRefinement
        } else if upper.contains("NOT_DELIVERABLE") || upper.contains("UNDELIVERABLE") {
            Self::Undeliverable
        } else if upper.contains("DELIVERABLE") {
            Self::Deliverable
        } else {
            Self::Undeliverable
        }
    }
}

/// One generation/deployment lifecycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique identifier, assigned at creation
    pub id: Uuid,
    /// Requesting tenant
    pub owner_id: Uuid,
    /// Short display name
    pub name: String,
    /// Free-form description; failure reasons are appended here
    pub description: String,
    /// Natural-language input that produced this artifact
    pub requirement_text: String,
    /// Generation backend/model that was requested
    pub model_identifier: String,
    /// Current lifecycle status
    pub status: ArtifactStatus,
    /// Filesystem location of generated source, set once on success
    pub entry_location: Option<String>,
    /// Generated source text
    pub source_code: Option<String>,
    /// Generated README
    pub readme: Option<String>,
    /// Generated dependency manifest
    pub dependency_manifest: Option<String>,
    /// Score derived from the pipeline's deliverability verdict
    pub quality_score: Option<f64>,
    /// Wall-clock generation time in seconds
    pub generation_duration_secs: Option<i64>,
    /// Whether a supervised process currently serves this artifact
    pub is_running: bool,
    /// Port held while deployed
    pub deployed_port: Option<u16>,
    /// Conventional endpoint URLs exposed while deployed
    pub endpoint_urls: Vec<String>,
    /// When the current deployment started
    pub deployed_at: Option<DateTime<Utc>>,
    /// Accumulated invocation count (written by telemetry ingestion)
    pub call_count: i64,
    /// Accumulated error count (written by telemetry ingestion)
    pub error_count: i64,
    /// Rolling average latency (written by telemetry ingestion)
    pub avg_latency_ms: Option<f64>,
    /// How many refinement children this artifact has spawned
    pub refinement_count: i64,
    /// Set when this artifact was created by auto-refinement
    pub parent_artifact_id: Option<Uuid>,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When last updated
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    /// Create a new artifact record in the Generating state.
    pub fn new(
        owner_id: Uuid,
        requirement_text: impl Into<String>,
        model_identifier: impl Into<String>,
    ) -> Self {
        let requirement_text = requirement_text.into();
        let name = generate_name(&requirement_text);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            description: String::new(),
            requirement_text,
            model_identifier: model_identifier.into(),
            status: ArtifactStatus::default(),
            entry_location: None,
            source_code: None,
            readme: None,
            dependency_manifest: None,
            quality_score: None,
            generation_duration_secs: None,
            is_running: false,
            deployed_port: None,
            endpoint_urls: Vec::new(),
            deployed_at: None,
            call_count: 0,
            error_count: 0,
            avg_latency_ms: None,
            refinement_count: 0,
            parent_artifact_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set an explicit display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Link this artifact to the one it refines.
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_artifact_id = Some(parent_id);
        self
    }

    /// Check if can transition to the given status.
    pub fn can_transition_to(&self, new_status: ArtifactStatus) -> bool {
        self.status.can_transition_to(new_status)
    }

    /// Transition to a new status, bumping the update timestamp.
    pub fn transition_to(&mut self, new_status: ArtifactStatus) -> DomainResult<()> {
        if !self.can_transition_to(new_status) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }
        self.status = new_status;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Check if the artifact is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Generate a short display name from the requirement text.
/// Takes the first line, truncated at ~60 chars on a word boundary.
fn generate_name(requirement: &str) -> String {
    let first_line = requirement.lines().next().unwrap_or(requirement).trim();
    if first_line.is_empty() {
        return "untitled artifact".to_string();
    }
    let max_len = 60;
    if first_line.len() <= max_len {
        return first_line.to_string();
    }
    match first_line[..max_len].rfind(' ') {
        Some(pos) => format!("{}...", &first_line[..pos]),
        None => format!("{}...", &first_line[..max_len]),
    }
}
