//! # BCI Common Library
//!
//! Shared code for the multi-modal alignment tools including:
//! - Modality identifiers and their canonical names
//! - The discovered file record model
//! - Configuration loading and resolution
//! - Common error types

pub mod config;
pub mod error;
pub mod modality;
pub mod records;

pub use error::{Error, Result};
pub use modality::Modality;
pub use records::FileRecord;
