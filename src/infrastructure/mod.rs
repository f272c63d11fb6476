//! Infrastructure: configuration loading and OS process plumbing.

pub mod config;
pub mod proc;

pub use config::{ConfigError, ConfigLoader};
