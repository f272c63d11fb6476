//! Ports (capability interfaces) to external collaborators.

pub mod artifact_repository;
pub mod notifier;
pub mod owner_repository;
pub mod pipeline;
pub mod telemetry_repository;

pub use artifact_repository::{ArtifactFilter, ArtifactRepository};
pub use notifier::{Notification, NotificationKind, Notifier};
pub use owner_repository::OwnerRepository;
pub use pipeline::{GenerationPipeline, PipelineError, PipelineOutput, PipelineRequest};
pub use telemetry_repository::TelemetryRepository;
