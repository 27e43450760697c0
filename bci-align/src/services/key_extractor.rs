//! Subject and trial identifier inference from file paths
//!
//! File names across modality trees share no reliable key, so identifiers are
//! recovered by pattern matching. Rules are tried in order and the first match
//! wins. The result is advisory: a missing subject keeps the file out of
//! alignment, and the trial label is only ever used for diagnostics.
//!
//! **Subject rules** (case-insensitive, anywhere in the path):
//! 1. `sub` + optional `-`/`_`/space + 2-3 digits (`sub-01`, `Sub_07`, `sub012`)
//! 2. `s` + 2-3 digits (`s04`)
//!
//! **Trial rules:**
//! 1. `word|trial|utt|item` + optional separator + digits (`word-23`, `trial_045`)
//! 2. `w|t` + optional separator + digits (`w23`, `t45`)

use bci_common::FileRecord;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;

use crate::types::{InferredKey, ManifestRow};

static SUBJECT_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[r"(?i)sub[-_ ]?[0-9]{2,3}", r"(?i)s[0-9]{2,3}"])
});

static LENIENT_SUBJECT_RULE: Lazy<Regex> =
    Lazy::new(|| compile(&[r"(?i)sub[-_ ]?[0-9]{1,3}"]).remove(0));

static TRIAL_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)(word|trial|utt|item)[-_ ]?([0-9]+)",
        r"(?i)(w|t)[-_ ]?([0-9]+)",
    ])
});

static SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| compile(&[r"[-_ ]+"]).remove(0));

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| match Regex::new(p) {
            Ok(re) => re,
            Err(e) => panic!("invalid built-in pattern {:?}: {}", p, e),
        })
        .collect()
}

/// Path-based identifier extractor
#[derive(Debug, Clone, Default)]
pub struct KeyExtractor {
    lenient_subject_fallback: bool,
}

impl KeyExtractor {
    /// Extractor using only the primary rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Also try `sub` + a single digit when no primary subject rule matches
    pub fn with_lenient_subject_fallback(mut self, enabled: bool) -> Self {
        self.lenient_subject_fallback = enabled;
        self
    }

    /// Infer subject and trial label from a path string
    ///
    /// Pure: the same path always yields the same key. Forward and backward
    /// slashes are treated alike.
    pub fn extract(&self, path: &str) -> InferredKey {
        let normalized = path.replace('\\', "/");

        let subject = guess_subject(&normalized).or_else(|| {
            if self.lenient_subject_fallback {
                LENIENT_SUBJECT_RULE
                    .find(&normalized)
                    .map(|m| normalize_subject(m.as_str()))
            } else {
                None
            }
        });

        InferredKey {
            subject,
            trial_label: guess_trial(&normalized),
        }
    }

    /// Extract keys for every file, in parallel, preserving input order
    pub fn extract_all(&self, files: Vec<FileRecord>) -> Vec<ManifestRow> {
        files
            .into_par_iter()
            .map(|file| {
                let key = self.extract(&file.path);
                ManifestRow::new(file, key)
            })
            .collect()
    }

    /// Retry the lenient subject rule on rows that carry no subject
    ///
    /// Lets a manifest written without the fallback be indexed with it.
    /// Returns the number of rows that gained a subject.
    pub fn fill_missing_subjects(&self, rows: &mut [ManifestRow]) -> usize {
        if !self.lenient_subject_fallback {
            return 0;
        }
        let mut filled = 0;
        for row in rows.iter_mut().filter(|r| r.subject_guess.is_none()) {
            if let Some(subject) = self.extract(&row.file.path).subject {
                row.subject_guess = Some(subject);
                filled += 1;
            }
        }
        filled
    }
}

/// First subject rule match, normalized
pub fn guess_subject(path: &str) -> Option<String> {
    SUBJECT_RULES
        .iter()
        .find_map(|re| re.find(path))
        .map(|m| normalize_subject(m.as_str()))
}

/// First trial rule match, as `{word}-{number}`
pub fn guess_trial(path: &str) -> Option<String> {
    TRIAL_RULES.iter().find_map(|re| {
        re.captures(path).map(|caps| {
            let word = caps[1].to_lowercase();
            let digits = caps[2].trim_start_matches('0');
            let number = if digits.is_empty() { "0" } else { digits };
            format!("{}-{}", word, number)
        })
    })
}

/// Lower-case and collapse separator runs into one hyphen (`Sub_07` → `sub-07`)
fn normalize_subject(raw: &str) -> String {
    SEPARATOR_RUN
        .replace_all(&raw.to_lowercase(), "-")
        .into_owned()
}
