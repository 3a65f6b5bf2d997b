//! Parallel processing orchestration

pub mod orchestrator;

pub use orchestrator::{run, PipelineSummary};
