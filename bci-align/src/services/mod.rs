//! Service modules for the alignment workflow
//!
//! Stages in data-flow order:
//! - `file_scanner`: modality tree discovery
//! - `key_extractor`: subject / trial label inference
//! - `grouper`: (subject, modality) grouping
//! - `trial_indexer`: positional trial-index assignment
//! - `aligner`: cross-modality intersection
//! - `classifier`: clean/dropped materialization
//!
//! Diagnostics and downstream helpers: `alignment_report`,
//! `label_consistency`, `splitter`.

pub mod aligner;
pub mod alignment_report;
pub mod classifier;
pub mod file_scanner;
pub mod grouper;
pub mod key_extractor;
pub mod label_consistency;
pub mod splitter;
pub mod trial_indexer;

pub use aligner::{align, align_map, AlignedIndex, Alignment, SubjectIndices};
pub use alignment_report::{missing_keys_table, summarize, AlignmentReport, KeySummary};
pub use classifier::{audit_partition, classify, resolve_required, Classification};
pub use file_scanner::{Discovery, FileScanner, ScanError};
pub use grouper::{group, SubjectGroups};
pub use key_extractor::KeyExtractor;
pub use label_consistency::{check_rows, LabelMismatch};
pub use splitter::{split_clean_index, SplitOutput, SplitPlan, SplitSet};
pub use trial_indexer::{assign_indices, TrialIndexMap};
