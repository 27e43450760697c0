//! Run statistics
//!
//! **Purpose:** counts sufficient to audit data loss without opening the
//! output tables, printed at the end of every run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bci_common::Modality;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::DropReason;

/// **Discovery / manifest statistics**
///
/// Display: "N files (general: a, semantic: b, ...)"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Files per modality
    pub files_per_modality: BTreeMap<Modality, usize>,
    /// Files with no subject guess
    pub missing_subject: usize,
    /// Files with no trial guess
    pub missing_trial: usize,
    /// (subject, trial label) keys present in every reported modality
    pub complete_keys: usize,
    /// Keys missing at least one reported modality
    pub incomplete_keys: usize,
}

impl ScanStats {
    pub fn total_files(&self) -> usize {
        self.files_per_modality.values().sum()
    }

    pub fn display_string(&self) -> String {
        let per_modality = self
            .files_per_modality
            .iter()
            .map(|(m, n)| format!("{}: {}", m, n))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} files ({})", self.total_files(), per_modality)
    }
}

/// **Alignment statistics**
///
/// Display: "N clean rows across S subjects, D dropped"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Modalities every clean row covers
    pub required_modalities: Vec<Modality>,
    /// Subjects with at least one grouped file
    pub subjects_grouped: usize,
    /// Files excluded from grouping for lack of a subject
    pub unkeyed_files: usize,
    pub clean_rows: usize,
    pub dropped_rows: usize,
    pub dropped_by_reason: BTreeMap<DropReason, usize>,
    /// Clean rows per subject, subjects with none omitted
    pub clean_per_subject: BTreeMap<String, usize>,
    /// Clean rows whose trial labels disagree across modalities
    pub label_mismatches: usize,
}

impl IndexStats {
    pub fn display_string(&self) -> String {
        format!(
            "{} clean rows across {} subjects, {} dropped",
            self.clean_rows,
            self.clean_per_subject.len(),
            self.dropped_rows
        )
    }
}

/// Summary of one scan/index run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexStats>,
    /// Tables written by the run
    pub outputs: Vec<PathBuf>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            scan: None,
            index: None,
            outputs: Vec::new(),
        }
    }

    /// Human-readable report, one line per fact
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if let Some(scan) = &self.scan {
            lines.push(format!("Discovered {}", scan.display_string()));
            lines.push(format!("Missing subject guesses: {}", scan.missing_subject));
            lines.push(format!("Missing trial guesses: {}", scan.missing_trial));
            lines.push(format!(
                "Complete (subject, trial) keys across all modalities: {}",
                scan.complete_keys
            ));
            lines.push(format!(
                "Keys missing at least one modality: {}",
                scan.incomplete_keys
            ));
        }

        if let Some(index) = &self.index {
            let required = index
                .required_modalities
                .iter()
                .map(Modality::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("Required modalities: {}", required));
            lines.push(format!(
                "Files without subject (not aligned): {}",
                index.unkeyed_files
            ));
            lines.push(format!("Aligned: {}", index.display_string()));
            for (reason, count) in &index.dropped_by_reason {
                lines.push(format!("  dropped {}: {}", reason, count));
            }
            let subjects = index
                .clean_per_subject
                .iter()
                .map(|(s, n)| format!("{}={}", s, n))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("Trials per subject (clean): {}", subjects));
            if index.label_mismatches > 0 {
                lines.push(format!(
                    "WARNING: {} clean rows pair files with disagreeing trial labels",
                    index.label_mismatches
                ));
            }
        }

        for path in &self.outputs {
            lines.push(format!("Wrote {}", path.display()));
        }

        lines
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a split run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    /// Rows per split name, in plan order
    pub rows_per_split: Vec<(String, usize)>,
    pub outputs: Vec<PathBuf>,
}

impl SplitSummary {
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .rows_per_split
            .iter()
            .map(|(name, rows)| format!("{}: {} rows", name, rows))
            .collect();
        lines.extend(self.outputs.iter().map(|p| format!("Wrote {}", p.display())));
        lines
    }
}
