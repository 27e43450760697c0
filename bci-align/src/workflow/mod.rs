//! Alignment workflow
//!
//! - `pipeline`: stage orchestration and output commit
//! - `statistics`: run summaries
//! - `storage`: CSV tables and all-or-nothing staging

pub mod pipeline;
pub mod statistics;
pub mod storage;

pub use pipeline::{IndexOutcome, Pipeline, PipelineConfig};
pub use statistics::{IndexStats, RunSummary, ScanStats, SplitSummary};
pub use storage::{OutputStage, Table};
