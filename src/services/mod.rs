//! Service layer: lifecycle orchestration logic.

pub mod control_loop;
pub mod deployment_manager;
pub mod entry;
pub mod generation_orchestrator;
pub mod progress;
pub mod quality_monitor;

pub use control_loop::{ControlLoop, LoopHandle, LoopStatus};
pub use deployment_manager::{Deployment, DeploymentManager, PortAllocator};
pub use entry::{detect_entry_symbol, resolve_entry_file, resolve_entry_point, EntryPoint};
pub use generation_orchestrator::{GenerationOrchestrator, GenerationRequest, GenerationStatus};
pub use progress::{estimate, GenerationStage, ProgressEstimate};
pub use quality_monitor::QualityMonitor;
