//! Positional trial-index assignment
//!
//! **Positional alignment assumption:** within one subject, the Nth file of
//! modality A (in sorted order) is taken to be the same trial as the Nth file
//! of modality B. Explicit trial labels are not used because their vocabulary
//! differs between modality trees. This is correct only when every modality's
//! recording pipeline names its files consistently per trial; if one modality
//! skipped a failed trial that another kept, every later index of that subject
//! pairs unrelated recordings and nothing here can detect it. The advisory
//! label cross-check in `label_consistency` is the only signal for that case.
//!
//! **Sort key:** filename (case-insensitive), then full path (case-insensitive),
//! then the exact path bytes, ascending. The last component makes the order
//! total, so the result never depends on discovery order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use bci_common::{FileRecord, Modality};

use super::grouper::SubjectGroups;
use crate::types::TrialIndex;

/// Trial-indexed files: subject → modality → files in canonical order
///
/// The file at position `i` of a sequence has trial index `i + 1`, so indices
/// are dense and contiguous by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialIndexMap {
    subjects: BTreeMap<String, BTreeMap<Modality, Vec<FileRecord>>>,
}

impl TrialIndexMap {
    /// Order every group and assign indices
    pub fn build(groups: SubjectGroups) -> Self {
        let subjects = groups
            .groups
            .into_iter()
            .map(|(subject, by_modality)| {
                let ordered = by_modality
                    .into_iter()
                    .map(|(modality, files)| (modality, assign(files)))
                    .collect();
                (subject, ordered)
            })
            .collect();

        Self { subjects }
    }

    /// Subjects in lexicographic order
    pub fn subjects(&self) -> impl Iterator<Item = &String> {
        self.subjects.keys()
    }

    /// Modalities present for a subject
    pub fn modalities(&self, subject: &str) -> BTreeSet<Modality> {
        self.subjects
            .get(subject)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// File at a given index
    pub fn get(&self, subject: &str, modality: Modality, index: TrialIndex) -> Option<&FileRecord> {
        let position = usize::try_from(index).ok()?.checked_sub(1)?;
        self.subjects.get(subject)?.get(&modality)?.get(position)
    }

    /// Number of indexed files for (subject, modality)
    pub fn len(&self, subject: &str, modality: Modality) -> usize {
        self.subjects
            .get(subject)
            .and_then(|m| m.get(&modality))
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Index set of (subject, modality): `{1..=K}` or empty
    pub fn indices(&self, subject: &str, modality: Modality) -> BTreeSet<TrialIndex> {
        (1..=self.len(subject, modality) as TrialIndex).collect()
    }

    /// Per-modality index sets for a subject
    pub fn subject_indices(&self, subject: &str) -> BTreeMap<Modality, BTreeSet<TrialIndex>> {
        self.modalities(subject)
            .into_iter()
            .map(|m| (m, self.indices(subject, m)))
            .collect()
    }

    /// Index sets for every subject, the input shape of the aligner
    pub fn all_indices(&self) -> BTreeMap<String, BTreeMap<Modality, BTreeSet<TrialIndex>>> {
        self.subjects()
            .map(|s| (s.clone(), self.subject_indices(s)))
            .collect()
    }

    /// Iterate (index, file) for one group
    pub fn entries(
        &self,
        subject: &str,
        modality: Modality,
    ) -> impl Iterator<Item = (TrialIndex, &FileRecord)> {
        self.subjects
            .get(subject)
            .and_then(|m| m.get(&modality))
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(i, f)| (i as TrialIndex + 1, f))
    }
}

/// Canonical order of a group, as an ordered index → file mapping
pub fn assign_indices(files: Vec<FileRecord>) -> BTreeMap<TrialIndex, FileRecord> {
    assign(files)
        .into_iter()
        .enumerate()
        .map(|(i, f)| (i as TrialIndex + 1, f))
        .collect()
}

fn assign(mut files: Vec<FileRecord>) -> Vec<FileRecord> {
    files.sort_by(compare_records);
    files
}

/// Composite sort key: filename, then path (both case-insensitive), then exact path
pub fn compare_records(a: &FileRecord, b: &FileRecord) -> Ordering {
    a.filename
        .to_lowercase()
        .cmp(&b.filename.to_lowercase())
        .then_with(|| a.path.to_lowercase().cmp(&b.path.to_lowercase()))
        .then_with(|| a.path.cmp(&b.path))
        .then_with(|| a.size_bytes.cmp(&b.size_bytes))
}
