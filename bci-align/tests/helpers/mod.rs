//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use bci_align::services::key_extractor::{guess_subject, guess_trial};
use bci_align::types::{InferredKey, ManifestRow};
use bci_common::config::RootEntry;
use bci_common::{FileRecord, Modality};
use tempfile::TempDir;

/// Temp directory whose own path carries no subject or trial pattern
pub fn neutral_tempdir() -> TempDir {
    loop {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_string_lossy().replace('\\', "/");
        if guess_subject(&path).is_none() && guess_trial(&path).is_none() {
            return dir;
        }
    }
}

/// Create `count` files named `{stem}{n:0width}{ext}` below `<root>/<modality>/<subject>`
pub fn write_trials(
    root: &Path,
    modality: Modality,
    subject: &str,
    stem: &str,
    width: usize,
    ext: &str,
    count: usize,
) {
    let dir = root.join(modality.as_str()).join(subject);
    std::fs::create_dir_all(&dir).unwrap();
    for n in 1..=count {
        let name = format!("{}{:0width$}{}", stem, n, ext, width = width);
        std::fs::write(dir.join(name), b"data").unwrap();
    }
}

/// One root per modality below `root`
pub fn modality_roots(root: &Path) -> Vec<RootEntry> {
    Modality::ALL
        .iter()
        .map(|&modality| RootEntry {
            modality,
            path: root.join(modality.as_str()),
        })
        .collect()
}

/// Build the reference dataset
///
/// - sub-01: 10 general, 10 semantic, 12 acoustic, 10 articulatory trials
/// - sub-03: 5 general, 5 semantic, 5 acoustic, no articulatory
/// - one general file without subject or trial (`notes.txt`)
pub fn reference_tree(root: &Path) -> PathBuf {
    let data = root.join("raw");
    write_trials(&data, Modality::General, "sub-01", "word_", 3, ".wav", 10);
    write_trials(&data, Modality::Semantic, "sub-01", "item_", 2, ".txt", 10);
    write_trials(&data, Modality::Acoustic, "sub-01", "word-", 2, ".wav", 12);
    write_trials(&data, Modality::Articulatory, "sub-01", "word_", 3, ".npy", 10);

    write_trials(&data, Modality::General, "sub-03", "word_", 3, ".wav", 5);
    write_trials(&data, Modality::Semantic, "sub-03", "item_", 2, ".txt", 5);
    write_trials(&data, Modality::Acoustic, "sub-03", "word-", 2, ".wav", 5);
    std::fs::create_dir_all(data.join("articulatory")).unwrap();

    std::fs::write(data.join("general").join("notes.txt"), b"n/a").unwrap();
    std::fs::write(data.join("general").join(".DS_Store"), b"").unwrap();
    data
}

/// In-memory manifest row keyed from its path
pub fn manifest_row(modality: Modality, path: &str) -> ManifestRow {
    ManifestRow::new(
        FileRecord::from_path(modality, Path::new(path), 1),
        InferredKey {
            subject: guess_subject(path),
            trial_label: guess_trial(path),
        },
    )
}

/// Read a CSV file as (header, rows)
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}
