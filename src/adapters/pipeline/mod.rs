//! Generation pipeline adapters.

pub mod http;
pub mod mock;

pub use http::{HttpPipeline, HttpPipelineConfig};
pub use mock::StubPipeline;
