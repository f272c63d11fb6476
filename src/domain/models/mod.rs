//! Domain models for the hatchery orchestrator.

pub mod artifact;
pub mod config;
pub mod owner;
pub mod telemetry;

pub use artifact::{Artifact, ArtifactStatus, DeliverabilityVerdict};
pub use config::{
    Config, DaemonConfig, DatabaseConfig, DeployConfig, GenerationConfig, LoggingConfig,
    MonitorConfig, NotifyConfig,
};
pub use owner::Owner;
pub use telemetry::{Invocation, InvocationOutcome, MetricsWindow, QualityMetrics};
