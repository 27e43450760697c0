//! bci-align library interface
//!
//! Exposes the alignment stages and the pipeline for the binary and for
//! integration testing.

pub mod config;
pub mod error;
pub mod services;
pub mod types;
pub mod workflow;

pub use crate::error::{AlignError, AlignResult};
pub use crate::workflow::{Pipeline, PipelineConfig, RunSummary};
