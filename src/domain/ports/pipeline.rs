//! Port for the external code-generation pipeline.
//!
//! The pipeline is an opaque, potentially slow collaborator. This core
//! assumes nothing about its internal staging: one request shape in, one
//! output shape (or error) out.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::models::DeliverabilityVerdict;

/// Errors surfaced by a pipeline invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline invocation failed: {0}")]
    Invocation(String),

    #[error("pipeline returned empty source")]
    EmptyOutput,

    #[error("pipeline I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One generation request.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Natural-language requirement, possibly augmented by the quality
    /// monitor with a failure diagnosis
    pub requirement: String,
    /// Model identifier to generate with
    pub model: String,
    /// Directory the pipeline must write the artifact into
    pub output_dir: PathBuf,
}

/// The happy-path return shape of a pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Full generated source text
    pub source_code: String,
    /// Path of the runnable entry file the pipeline wrote
    pub entry_file: PathBuf,
    /// Dependency manifest content
    pub dependency_manifest: String,
    /// Generated README content
    pub readme: String,
    /// The pipeline's own quality verdict
    pub verdict: DeliverabilityVerdict,
}

/// Capability interface for invoking the generation pipeline.
#[async_trait]
pub trait GenerationPipeline: Send + Sync {
    async fn invoke(&self, request: PipelineRequest) -> Result<PipelineOutput, PipelineError>;
}
