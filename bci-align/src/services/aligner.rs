//! Cross-modality alignment
//!
//! Decides, per subject, which positional trial indices are present in every
//! required modality. Every index observed for a subject in any modality ends
//! up in exactly one of the clean or dropped outputs; nothing here fails.
//!
//! **Algorithm (per subject):**
//! 1. If a required modality has no files for the subject, every observed
//!    index is dropped as `subject_missing_modality`.
//! 2. Otherwise intersect the index sets of the required modalities.
//! 3. Empty intersection: every observed index is dropped as
//!    `no_common_trial_idx`.
//! 4. Otherwise each common index becomes a clean row and every other observed
//!    index is dropped as `missing_one_or_more_modalities`.
//!
//! Outputs are ordered by subject (lexicographic), then trial index.

use std::collections::{BTreeMap, BTreeSet};

use bci_common::Modality;

use super::trial_indexer::TrialIndexMap;
use crate::types::{AlignedRow, DropReason, DroppedRow, RequiredModalities, TrialIndex};

/// Per-subject index sets, keyed by modality
pub type SubjectIndices = BTreeMap<String, BTreeMap<Modality, BTreeSet<TrialIndex>>>;

/// A (subject, index) pair admitted to the clean set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AlignedIndex {
    pub subject: String,
    pub trial_index: TrialIndex,
}

/// Alignment decision for every observed (subject, index) pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    pub clean: Vec<AlignedIndex>,
    pub dropped: Vec<DroppedRow>,
}

/// Classify every observed index of every subject
pub fn align(indices: &SubjectIndices, required: &RequiredModalities) -> Alignment {
    let mut alignment = Alignment::default();

    for (subject, by_modality) in indices {
        let observed: BTreeSet<TrialIndex> = by_modality.values().flatten().copied().collect();

        let missing: Vec<Modality> = required
            .iter()
            .filter(|m| by_modality.get(m).map_or(true, BTreeSet::is_empty))
            .collect();

        if !missing.is_empty() {
            tracing::debug!(
                subject = %subject,
                missing = ?missing,
                dropped = observed.len(),
                "Subject lacks required modalities"
            );
            drop_all(&mut alignment, subject, &observed, DropReason::SubjectMissingModality);
            continue;
        }

        let common = intersect(by_modality, required);

        if common.is_empty() {
            tracing::debug!(
                subject = %subject,
                dropped = observed.len(),
                "No trial index common to all required modalities"
            );
            drop_all(&mut alignment, subject, &observed, DropReason::NoCommonTrialIdx);
            continue;
        }

        for &trial_index in &observed {
            if common.contains(&trial_index) {
                alignment.clean.push(AlignedIndex {
                    subject: subject.clone(),
                    trial_index,
                });
            } else {
                alignment.dropped.push(DroppedRow {
                    subject: subject.clone(),
                    trial_index,
                    reason: DropReason::MissingOneOrMoreModalities,
                });
            }
        }

        tracing::debug!(
            subject = %subject,
            clean = common.len(),
            partial = observed.len() - common.len(),
            "Subject aligned"
        );
    }

    alignment
}

/// Align a trial-index map and resolve the files of each clean row
pub fn align_map(map: &TrialIndexMap, required: &RequiredModalities) -> (Vec<AlignedRow>, Vec<DroppedRow>) {
    let alignment = align(&map.all_indices(), required);
    let mut dropped = alignment.dropped;
    let mut clean = Vec::with_capacity(alignment.clean.len());

    for AlignedIndex {
        subject,
        trial_index,
    } in alignment.clean
    {
        let files: BTreeMap<Modality, _> = required
            .iter()
            .filter_map(|m| map.get(&subject, m, trial_index).map(|f| (m, f.clone())))
            .collect();

        if files.len() == required.len() {
            clean.push(AlignedRow {
                subject,
                trial_index,
                files,
            });
        } else {
            // Unreachable with dense indices; kept so the row is still accounted for
            tracing::warn!(
                subject = %subject,
                trial_index,
                "Common index without a file for every required modality"
            );
            dropped.push(DroppedRow {
                subject,
                trial_index,
                reason: DropReason::MissingOneOrMoreModalities,
            });
        }
    }

    dropped.sort_by(|a, b| {
        a.subject
            .cmp(&b.subject)
            .then(a.trial_index.cmp(&b.trial_index))
    });

    (clean, dropped)
}

fn intersect(
    by_modality: &BTreeMap<Modality, BTreeSet<TrialIndex>>,
    required: &RequiredModalities,
) -> BTreeSet<TrialIndex> {
    let mut common: Option<BTreeSet<TrialIndex>> = None;
    for modality in required.iter() {
        let indices = by_modality.get(&modality).cloned().unwrap_or_default();
        common = Some(match common {
            None => indices,
            Some(acc) => acc.intersection(&indices).copied().collect(),
        });
    }
    common.unwrap_or_default()
}

fn drop_all(
    alignment: &mut Alignment,
    subject: &str,
    observed: &BTreeSet<TrialIndex>,
    reason: DropReason,
) {
    alignment
        .dropped
        .extend(observed.iter().map(|&trial_index| DroppedRow {
            subject: subject.to_string(),
            trial_index,
            reason,
        }));
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Modality; 4] = Modality::ALL;

    fn required_all() -> RequiredModalities {
        RequiredModalities::new(ALL).unwrap()
    }

    fn subject(counts: &[(Modality, TrialIndex)]) -> BTreeMap<Modality, BTreeSet<TrialIndex>> {
        counts
            .iter()
            .map(|&(m, k)| (m, (1..=k).collect()))
            .collect()
    }

    fn reasons(alignment: &Alignment, reason: DropReason) -> usize {
        alignment.dropped.iter().filter(|d| d.reason == reason).count()
    }

    #[test]
    fn test_all_modalities_complete() {
        let mut indices = SubjectIndices::new();
        indices.insert(
            "sub-01".to_string(),
            subject(&ALL.map(|m| (m, 10))),
        );

        let alignment = align(&indices, &required_all());
        assert_eq!(alignment.clean.len(), 10);
        assert!(alignment.dropped.is_empty());
        assert_eq!(alignment.clean[0].trial_index, 1);
        assert_eq!(alignment.clean[9].trial_index, 10);
    }

    #[test]
    fn test_subject_missing_modality_drops_everything() {
        let mut indices = SubjectIndices::new();
        indices.insert(
            "sub-03".to_string(),
            subject(&[
                (Modality::Acoustic, 5),
                (Modality::Articulatory, 5),
                (Modality::General, 4),
            ]),
        );

        let alignment = align(&indices, &required_all());
        assert!(alignment.clean.is_empty());
        assert_eq!(alignment.dropped.len(), 5);
        assert_eq!(reasons(&alignment, DropReason::SubjectMissingModality), 5);
        let dropped_indices: Vec<TrialIndex> =
            alignment.dropped.iter().map(|d| d.trial_index).collect();
        assert_eq!(dropped_indices, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_partial_indices_dropped_as_missing_modalities() {
        let mut indices = SubjectIndices::new();
        indices.insert(
            "sub-02".to_string(),
            subject(&[
                (Modality::Acoustic, 6),
                (Modality::Articulatory, 4),
                (Modality::General, 5),
                (Modality::Semantic, 4),
            ]),
        );

        let alignment = align(&indices, &required_all());
        assert_eq!(alignment.clean.len(), 4);
        assert_eq!(reasons(&alignment, DropReason::MissingOneOrMoreModalities), 2);
        assert_eq!(
            alignment
                .dropped
                .iter()
                .map(|d| d.trial_index)
                .collect::<Vec<_>>(),
            vec![5, 6]
        );
    }

    #[test]
    fn test_no_common_index() {
        // Index sets that do not start at 1 cannot come from the assigner, but
        // the aligner accepts arbitrary sets
        let mut by_modality = BTreeMap::new();
        by_modality.insert(Modality::General, BTreeSet::from([1, 2]));
        by_modality.insert(Modality::Acoustic, BTreeSet::from([3]));
        let mut indices = SubjectIndices::new();
        indices.insert("sub-04".to_string(), by_modality);

        let required = RequiredModalities::new([Modality::General, Modality::Acoustic]).unwrap();
        let alignment = align(&indices, &required);
        assert!(alignment.clean.is_empty());
        assert_eq!(reasons(&alignment, DropReason::NoCommonTrialIdx), 3);
    }

    #[test]
    fn test_empty_index_set_counts_as_missing_modality() {
        let mut by_modality = BTreeMap::new();
        by_modality.insert(Modality::General, BTreeSet::from([1]));
        by_modality.insert(Modality::Acoustic, BTreeSet::new());
        let mut indices = SubjectIndices::new();
        indices.insert("sub-05".to_string(), by_modality);

        let required = RequiredModalities::new([Modality::General, Modality::Acoustic]).unwrap();
        let alignment = align(&indices, &required);
        assert_eq!(reasons(&alignment, DropReason::SubjectMissingModality), 1);
    }

    #[test]
    fn test_non_required_modality_indices_are_accounted_for() {
        let mut indices = SubjectIndices::new();
        indices.insert(
            "sub-06".to_string(),
            subject(&[(Modality::General, 2), (Modality::Semantic, 3)]),
        );

        let required = RequiredModalities::new([Modality::General]).unwrap();
        let alignment = align(&indices, &required);
        assert_eq!(alignment.clean.len(), 2);
        assert_eq!(alignment.dropped.len(), 1);
        assert_eq!(alignment.dropped[0].trial_index, 3);
    }

    #[test]
    fn test_subjects_ordered_lexicographically() {
        let mut indices = SubjectIndices::new();
        for name in ["sub-10", "sub-02", "s01"] {
            indices.insert(name.to_string(), subject(&ALL.map(|m| (m, 1))));
        }

        let alignment = align(&indices, &required_all());
        let order: Vec<&str> = alignment.clean.iter().map(|c| c.subject.as_str()).collect();
        assert_eq!(order, vec!["s01", "sub-02", "sub-10"]);
    }
}
