//! Hatchery - Artifact Lifecycle Orchestrator
//!
//! Hatchery turns asynchronous code-generation results into running,
//! supervised network services, keeps them healthy, and automatically
//! regenerates them when they degrade.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture
//! principles:
//!
//! - **Domain Layer** (`domain`): models, state machine, and ports
//! - **Service Layer** (`services`): generation orchestration, process
//!   lifecycle management, quality monitoring, and the control loop
//! - **Adapters** (`adapters`): SQLite persistence, pipeline clients,
//!   and notification channels
//! - **Infrastructure** (`infrastructure`): configuration loading and
//!   OS process plumbing
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Artifact, ArtifactStatus, Config, DeliverabilityVerdict, Invocation, InvocationOutcome,
    MetricsWindow, Owner, QualityMetrics,
};
pub use domain::ports::{
    ArtifactFilter, ArtifactRepository, GenerationPipeline, Notification, NotificationKind,
    Notifier, OwnerRepository, PipelineError, PipelineOutput, PipelineRequest,
    TelemetryRepository,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::{ConfigError, ConfigLoader};
pub use services::{
    ControlLoop, Deployment, DeploymentManager, GenerationOrchestrator, GenerationRequest,
    GenerationStatus, QualityMonitor,
};
