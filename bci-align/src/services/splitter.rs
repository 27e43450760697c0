//! Subject-range train/val/test partitioning
//!
//! A pure filter over clean index rows by subject membership. Splitting by
//! subject keeps every trial of one participant in the same set.

use std::collections::BTreeSet;

use bci_common::config::SplitRange;
use bci_common::{Error, Result};

use crate::workflow::storage::Table;

/// One named set of subjects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSet {
    pub name: String,
    pub subjects: BTreeSet<String>,
}

/// Named, disjoint subject sets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    sets: Vec<SplitSet>,
}

impl SplitPlan {
    /// Build a plan, rejecting subjects assigned to more than one set
    pub fn new(sets: Vec<SplitSet>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for set in &sets {
            if !is_safe_name(&set.name) {
                return Err(Error::Config(format!(
                    "Split name {:?} must be non-empty and contain only letters, digits, '-' or '_'",
                    set.name
                )));
            }
            for subject in &set.subjects {
                if !seen.insert(subject.as_str()) {
                    return Err(Error::Config(format!(
                        "Subject {} assigned to more than one split",
                        subject
                    )));
                }
            }
        }
        Ok(Self { sets })
    }

    /// Plan from configured subject ranges
    pub fn from_ranges(ranges: &[SplitRange]) -> Result<Self> {
        Self::new(
            ranges
                .iter()
                .map(|r| SplitSet {
                    name: r.name.clone(),
                    subjects: r.subjects().into_iter().collect(),
                })
                .collect(),
        )
    }

    pub fn sets(&self) -> &[SplitSet] {
        &self.sets
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Rows of one split, with the clean index header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutput {
    pub name: String,
    pub table: Table,
}

/// Partition a clean index table by its `subject` column
///
/// Every set of the plan yields an output, possibly empty; rows whose subject
/// belongs to no set are left out of all of them.
pub fn split_clean_index(clean: &Table, plan: &SplitPlan) -> Result<Vec<SplitOutput>> {
    let subject_col = clean
        .column("subject")
        .ok_or_else(|| Error::InvalidInput("Clean index has no 'subject' column".to_string()))?;

    Ok(plan
        .sets()
        .iter()
        .map(|set| {
            let mut table = Table::new(clean.headers.iter().cloned());
            table.rows = clean
                .rows
                .iter()
                .filter(|row| {
                    row.get(subject_col)
                        .is_some_and(|s| set.subjects.contains(s))
                })
                .cloned()
                .collect();
            SplitOutput {
                name: set.name.clone(),
                table,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_table() -> Table {
        let mut table = Table::new(["subject", "trial_idx", "general_path"]);
        for (subject, idx) in [("sub-01", 1), ("sub-01", 2), ("sub-12", 1), ("sub-20", 1)] {
            table
                .push(vec![
                    subject.to_string(),
                    idx.to_string(),
                    format!("g/{}/{}.wav", subject, idx),
                ])
                .unwrap();
        }
        table
    }

    #[test]
    fn test_default_ranges() {
        let plan = SplitPlan::from_ranges(&[
            SplitRange::new("train", 1, 11),
            SplitRange::new("val", 12, 13),
            SplitRange::new("test", 14, 15),
        ])
        .unwrap();

        let outputs = split_clean_index(&clean_table(), &plan).unwrap();
        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].name, "train");
        assert_eq!(outputs[0].table.len(), 2);
        assert_eq!(outputs[1].table.len(), 1);
        assert!(outputs[2].table.is_empty());
        assert_eq!(outputs[2].table.headers, clean_table().headers);
    }

    #[test]
    fn test_overlapping_sets_rejected() {
        let result = SplitPlan::from_ranges(&[
            SplitRange::new("train", 1, 3),
            SplitRange::new("val", 3, 4),
        ]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unsafe_name_rejected() {
        let result = SplitPlan::from_ranges(&[SplitRange::new("../train", 1, 3)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_subject_column() {
        let table = Table::new(["trial_idx"]);
        let plan = SplitPlan::from_ranges(&[SplitRange::new("train", 1, 1)]).unwrap();
        assert!(matches!(
            split_clean_index(&table, &plan),
            Err(Error::InvalidInput(_))
        ));
    }
}
