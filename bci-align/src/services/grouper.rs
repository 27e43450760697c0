//! Subject/modality grouping
//!
//! Files are grouped by (normalized subject, modality). Files without an
//! inferred subject can never take part in alignment; they are set aside so
//! they can be listed in the missing-keys report.

use std::collections::BTreeMap;

use bci_common::{FileRecord, Modality};

use crate::types::ManifestRow;

/// Files grouped per subject, then per modality
///
/// Within a group, files keep the order the caller supplied them in. The
/// trial-index assigner imposes the canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectGroups {
    pub groups: BTreeMap<String, BTreeMap<Modality, Vec<FileRecord>>>,
    /// Rows excluded because no subject could be inferred
    pub unkeyed: Vec<ManifestRow>,
}

impl SubjectGroups {
    /// Number of grouped files across all subjects and modalities
    pub fn grouped_files(&self) -> usize {
        self.groups
            .values()
            .flat_map(|by_modality| by_modality.values())
            .map(Vec::len)
            .sum()
    }

    /// Modalities with at least one grouped file, in column order
    pub fn modalities(&self) -> Vec<Modality> {
        let mut present: Vec<Modality> = self
            .groups
            .values()
            .flat_map(|by_modality| by_modality.keys().copied())
            .collect();
        present.sort();
        present.dedup();
        present
    }

    pub fn subjects(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }
}

/// Group rows by (subject, modality)
///
/// Every row with a subject lands in exactly one group. Empty subject strings
/// are treated as absent.
pub fn group(rows: Vec<ManifestRow>) -> SubjectGroups {
    let mut result = SubjectGroups::default();

    for row in rows {
        match row.subject_guess.as_deref().filter(|s| !s.is_empty()) {
            Some(subject) => {
                let subject = subject.to_string();
                result
                    .groups
                    .entry(subject)
                    .or_default()
                    .entry(row.file.modality)
                    .or_default()
                    .push(row.file);
            }
            None => result.unkeyed.push(row),
        }
    }

    tracing::debug!(
        subjects = result.groups.len(),
        grouped = result.grouped_files(),
        unkeyed = result.unkeyed.len(),
        "Grouped files by subject and modality"
    );

    result
}
