//! Core types shared by the alignment stages
//!
//! Everything here is derived per run and held in memory only; nothing is
//! mutated after the stage that builds it.

use bci_common::{Error, FileRecord, Modality, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Dense positional trial index, starting at 1 within a (subject, modality) group
pub type TrialIndex = u32;

/// Identifiers inferred from a file path
///
/// Both fields are advisory. Absence is a normal outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InferredKey {
    pub subject: Option<String>,
    pub trial_label: Option<String>,
}

impl InferredKey {
    pub fn is_complete(&self) -> bool {
        self.subject.is_some() && self.trial_label.is_some()
    }
}

/// A discovered file together with its inferred key
///
/// One row of `manifest.csv`; a manifest written by one run can seed the
/// indexing stage of another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub file: FileRecord,
    pub subject_guess: Option<String>,
    pub trial_guess: Option<String>,
}

impl ManifestRow {
    pub fn new(file: FileRecord, key: InferredKey) -> Self {
        Self {
            file,
            subject_guess: key.subject,
            trial_guess: key.trial_label,
        }
    }

    pub fn key(&self) -> InferredKey {
        InferredKey {
            subject: self.subject_guess.clone(),
            trial_label: self.trial_guess.clone(),
        }
    }
}

/// Non-empty set of modalities every clean row must cover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredModalities(BTreeSet<Modality>);

impl RequiredModalities {
    /// Reject an empty set before any alignment runs
    pub fn new(modalities: impl IntoIterator<Item = Modality>) -> Result<Self> {
        let set: BTreeSet<Modality> = modalities.into_iter().collect();
        if set.is_empty() {
            return Err(Error::Config(
                "At least one required modality must be configured".to_string(),
            ));
        }
        Ok(Self(set))
    }

    /// Modalities in column order
    pub fn iter(&self) -> impl Iterator<Item = Modality> + '_ {
        self.0.iter().copied()
    }

    pub fn as_set(&self) -> &BTreeSet<Modality> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Why a (subject, trial index) pair was excluded from the clean set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// At least one required modality has no files for this subject
    SubjectMissingModality,
    /// The required modalities share no trial index for this subject
    NoCommonTrialIdx,
    /// The index exists in some modalities but not all required ones
    MissingOneOrMoreModalities,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::SubjectMissingModality => "subject_missing_modality",
            DropReason::NoCommonTrialIdx => "no_common_trial_idx",
            DropReason::MissingOneOrMoreModalities => "missing_one_or_more_modalities",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully aligned trial: one file per required modality at the same index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRow {
    pub subject: String,
    pub trial_index: TrialIndex,
    pub files: BTreeMap<Modality, FileRecord>,
}

impl AlignedRow {
    pub fn path(&self, modality: Modality) -> Option<&str> {
        self.files.get(&modality).map(|f| f.path.as_str())
    }
}

/// A trial index excluded from the clean set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRow {
    pub subject: String,
    #[serde(rename = "trial_idx")]
    pub trial_index: TrialIndex,
    pub reason: DropReason,
}
