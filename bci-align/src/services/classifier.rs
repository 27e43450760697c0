//! Clean/dropped materialization
//!
//! Shapes the aligner's decisions into the two output tables. No decisions are
//! made here; the only checks are that the required modality set is usable and
//! that every observed (subject, index) pair was accounted for exactly once.

use std::collections::{BTreeMap, BTreeSet};

use bci_common::{Error, Modality, Result};

use super::aligner::align_map;
use super::trial_indexer::TrialIndexMap;
use crate::error::{AlignError, AlignResult};
use crate::types::{AlignedRow, DropReason, DroppedRow, RequiredModalities, TrialIndex};
use crate::workflow::storage::Table;

/// Final partition of every observed trial index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub required: RequiredModalities,
    pub clean: Vec<AlignedRow>,
    pub dropped: Vec<DroppedRow>,
}

impl Classification {
    /// Dropped row counts per reason
    pub fn dropped_by_reason(&self) -> BTreeMap<DropReason, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.dropped {
            *counts.entry(row.reason).or_insert(0) += 1;
        }
        counts
    }

    /// Clean row counts per subject
    pub fn clean_per_subject(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.clean {
            *counts.entry(row.subject.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// `subject, trial_idx, <modality>_path...` in modality column order
    pub fn clean_table(&self) -> Table {
        let mut headers = vec!["subject".to_string(), "trial_idx".to_string()];
        headers.extend(self.required.iter().map(|m| m.path_column()));

        let mut table = Table::new(headers);
        table.rows = self
            .clean
            .iter()
            .map(|row| {
                let mut cells = vec![row.subject.clone(), row.trial_index.to_string()];
                cells.extend(
                    self.required
                        .iter()
                        .map(|m| row.path(m).unwrap_or_default().to_string()),
                );
                cells
            })
            .collect();
        table
    }

    /// `subject, trial_idx, reason`
    pub fn dropped_table(&self) -> Table {
        let mut table = Table::new(["subject", "trial_idx", "reason"]);
        table.rows = self
            .dropped
            .iter()
            .map(|row| {
                vec![
                    row.subject.clone(),
                    row.trial_index.to_string(),
                    row.reason.to_string(),
                ]
            })
            .collect();
        table
    }
}

/// Pick the required modality set for a run
///
/// An explicit list wins; otherwise every modality with grouped files is
/// required. Either way an empty result is a configuration error.
pub fn resolve_required(
    configured: Option<&[Modality]>,
    discovered: &[Modality],
) -> Result<RequiredModalities> {
    match configured {
        Some(list) if list.is_empty() => Err(Error::Config(
            "required_modalities is configured but empty".to_string(),
        )),
        Some(list) => RequiredModalities::new(list.iter().copied()),
        None => RequiredModalities::new(discovered.iter().copied()).map_err(|_| {
            Error::Config("No modality has any file with an inferred subject".to_string())
        }),
    }
}

/// Align the index map and check the partition before returning it
pub fn classify(map: &TrialIndexMap, required: RequiredModalities) -> AlignResult<Classification> {
    let (clean, dropped) = align_map(map, &required);
    let classification = Classification {
        required,
        clean,
        dropped,
    };
    audit_partition(map, &classification)?;
    Ok(classification)
}

/// Every observed (subject, index) must appear in exactly one output
pub fn audit_partition(map: &TrialIndexMap, classification: &Classification) -> AlignResult<()> {
    let mut observed: BTreeSet<(String, TrialIndex)> = BTreeSet::new();
    for subject in map.subjects() {
        for indices in map.subject_indices(subject).values() {
            observed.extend(indices.iter().map(|&i| (subject.clone(), i)));
        }
    }

    let mut seen: BTreeSet<(String, TrialIndex)> = BTreeSet::new();
    let outputs = classification
        .clean
        .iter()
        .map(|r| (r.subject.clone(), r.trial_index))
        .chain(
            classification
                .dropped
                .iter()
                .map(|r| (r.subject.clone(), r.trial_index)),
        );
    for key in outputs {
        if !seen.insert(key.clone()) {
            return Err(AlignError::Accounting(format!(
                "{} index {} classified more than once",
                key.0, key.1
            )));
        }
    }

    if let Some((subject, index)) = observed.symmetric_difference(&seen).next() {
        return Err(AlignError::Accounting(format!(
            "{} index {} observed and classified sets differ",
            subject, index
        )));
    }

    Ok(())
}
