//! # Composition Engine
//!
//! Discovers videos, plans one job per video and mode, and runs the jobs
//! concurrently, collecting every result into a [`BatchReport`].

pub mod engine;
pub mod job;

// Re-exports for convenience
pub use engine::{discover_videos, CompositionEngine, InputTarget};
pub use job::{output_path, BatchReport, JobFailure, JobOutcome, JobSpec};
