//! Error types for bci-align
//!
//! Only fatal conditions are errors: configuration problems detected before a
//! run, failure to enumerate a resolved root, and failure to write outputs.
//! Files without a subject and misaligned trials are ordinary outcomes and are
//! reported in the output tables instead.

use thiserror::Error;

use crate::services::ScanError;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum AlignError {
    /// Discovery failed
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    /// Configuration, I/O or table error from the common layer
    #[error(transparent)]
    Common(#[from] bci_common::Error),

    /// Partition audit found an index in both or neither output
    #[error("Alignment accounting violated: {0}")]
    Accounting(String),
}

impl AlignError {
    /// True for problems that are fixed by changing configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            AlignError::Scan(ScanError::NoRoots(_))
                | AlignError::Common(bci_common::Error::Config(_))
        )
    }
}

/// Result type for pipeline operations
pub type AlignResult<T> = Result<T, AlignError>;
