//! Advisory alignment summary by inferred (subject, trial label)
//!
//! Shows which modalities produced a file for each label-based key. This is
//! diagnostic only: labels differ between modality trees, so the aligner never
//! reads it. Keys with a missing subject or label are kept as their own rows.

use std::collections::BTreeMap;

use bci_common::Modality;

use crate::types::ManifestRow;
use crate::workflow::storage::{manifest_table, Table};

/// Presence counts of one (subject, trial label) key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySummary {
    pub subject: Option<String>,
    pub trial: Option<String>,
    pub counts: BTreeMap<Modality, usize>,
}

impl KeySummary {
    pub fn has(&self, modality: Modality) -> bool {
        self.counts.get(&modality).copied().unwrap_or(0) > 0
    }

    pub fn total_files(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Summary rows plus completeness counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentReport {
    pub modalities: Vec<Modality>,
    pub keys: Vec<KeySummary>,
}

impl AlignmentReport {
    /// Keys with at least one file in every reported modality
    pub fn complete_keys(&self) -> usize {
        self.keys
            .iter()
            .filter(|k| self.modalities.iter().all(|&m| k.has(m)))
            .count()
    }

    /// Keys missing at least one reported modality
    pub fn incomplete_keys(&self) -> usize {
        self.keys.len() - self.complete_keys()
    }

    /// `subject, trial, has_<modality>..., total_files_for_key`
    pub fn to_table(&self) -> Table {
        let mut headers = vec!["subject".to_string(), "trial".to_string()];
        headers.extend(self.modalities.iter().map(|m| m.presence_column()));
        headers.push("total_files_for_key".to_string());

        let mut table = Table::new(headers);
        table.rows = self
            .keys
            .iter()
            .map(|key| {
                let mut cells = vec![
                    key.subject.clone().unwrap_or_default(),
                    key.trial.clone().unwrap_or_default(),
                ];
                cells.extend(
                    self.modalities
                        .iter()
                        .map(|&m| if key.has(m) { "1" } else { "0" }.to_string()),
                );
                cells.push(key.total_files().to_string());
                cells
            })
            .collect();
        table
    }
}

/// Group rows by inferred key and count files per modality
///
/// Keys are sorted with a missing component ordered before any value. The
/// total counts every file of the key, including modalities not reported.
pub fn summarize(rows: &[ManifestRow], modalities: &[Modality]) -> AlignmentReport {
    let mut by_key: BTreeMap<(Option<String>, Option<String>), BTreeMap<Modality, usize>> =
        BTreeMap::new();

    for row in rows {
        let key = (row.subject_guess.clone(), row.trial_guess.clone());
        *by_key
            .entry(key)
            .or_default()
            .entry(row.file.modality)
            .or_insert(0) += 1;
    }

    let mut reported = modalities.to_vec();
    reported.sort();
    reported.dedup();

    AlignmentReport {
        modalities: reported,
        keys: by_key
            .into_iter()
            .map(|((subject, trial), counts)| KeySummary {
                subject,
                trial,
                counts,
            })
            .collect(),
    }
}

/// Rows lacking a subject or a trial label, in manifest shape
pub fn missing_keys_table(rows: &[ManifestRow]) -> Table {
    manifest_table(rows.iter().filter(|r| !r.key().is_complete()))
}
