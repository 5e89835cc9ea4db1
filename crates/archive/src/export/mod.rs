//! Export orchestration
//!
//! Runs every configured query, deduplicates threads within the run and
//! across runs, and archives each new thread exactly once.

mod orchestrator;
mod stats;

pub use orchestrator::{ExportReport, Exporter};
pub use stats::ExportStats;
