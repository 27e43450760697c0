//! Advisory cross-check of positional alignment against trial labels
//!
//! Positional alignment cannot notice when one modality skipped a trial that
//! another kept. Where files of a clean row carry a trial label, the numeric
//! parts are compared; disagreement is reported but never changes the clean
//! or dropped classification, since label vocabularies legitimately differ.

use std::collections::BTreeMap;

use bci_common::Modality;
use serde::Serialize;

use super::key_extractor::guess_trial;
use crate::types::{AlignedRow, TrialIndex};

/// A clean row whose files carry conflicting trial numbers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelMismatch {
    pub subject: String,
    pub trial_index: TrialIndex,
    pub labels: BTreeMap<Modality, String>,
}

/// Numeric part of a normalized label (`word-23` → `23`)
fn label_number(label: &str) -> Option<&str> {
    label.rsplit_once('-').map(|(_, n)| n)
}

/// Compare label numbers across the files of each clean row
pub fn check_rows(rows: &[AlignedRow]) -> Vec<LabelMismatch> {
    let mut mismatches = Vec::new();

    for row in rows {
        let labels: BTreeMap<Modality, String> = row
            .files
            .iter()
            .filter_map(|(&m, f)| guess_trial(&f.path.replace('\\', "/")).map(|l| (m, l)))
            .collect();

        if labels.len() < 2 {
            continue;
        }

        let mut numbers = labels.values().filter_map(|l| label_number(l));
        let first = numbers.next();
        if numbers.any(|n| Some(n) != first) {
            tracing::debug!(
                subject = %row.subject,
                trial_index = row.trial_index,
                labels = ?labels,
                "Trial labels disagree at aligned index"
            );
            mismatches.push(LabelMismatch {
                subject: row.subject.clone(),
                trial_index: row.trial_index,
                labels,
            });
        }
    }

    if !mismatches.is_empty() {
        tracing::warn!(
            "{} clean rows pair files whose trial labels disagree; positional order may differ between modalities",
            mismatches.len()
        );
    }

    mismatches
}
