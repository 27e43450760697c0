//! Modality tree scanner
//!
//! Recursive file discovery under each configured modality root, producing one
//! [`FileRecord`] per regular file. A symlink is listed when its target is a
//! regular file; directory symlinks are not descended.
//!
//! Two-phase implementation:
//! - Phase 1: Sequential directory traversal
//! - Phase 2: Parallel metadata lookup building the records
//!
//! Roots that are not directories are skipped. Once a root has been resolved, any
//! failure to enumerate it aborts the scan: a partial listing would silently
//! shift every positional trial index after the missing file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bci_common::config::RootEntry;
use bci_common::{FileRecord, Modality};
use rayon::prelude::*;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// None of the configured roots exist
    #[error("No modality root directories found (checked: {0})")]
    NoRoots(String),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory traversal failed below a resolved root
    #[error("Failed to enumerate {root}: {message}")]
    Walk { root: PathBuf, message: String },

    /// Cannot read file metadata
    #[error("File access error {0}: {1}")]
    FileAccess(PathBuf, String),
}

/// Result of scanning every configured root
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Records in traversal order (roots in configuration order)
    pub files: Vec<FileRecord>,
    /// Count of files per modality
    pub per_modality: BTreeMap<Modality, usize>,
    /// Roots that existed and were scanned
    pub roots_scanned: Vec<RootEntry>,
    /// Roots that were skipped because they are not directories
    pub roots_skipped: Vec<RootEntry>,
}

/// Modality tree scanner
pub struct FileScanner {
    /// Entry names skipped during traversal; matched against the whole name
    ignore_patterns: Vec<String>,
}

impl FileScanner {
    /// Create new scanner with default ignore patterns
    ///
    /// Ignores system and tooling entries like .DS_Store, Thumbs.db, .git,
    /// __pycache__ and notebook checkpoints.
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
                "__pycache__".to_string(),
                ".ipynb_checkpoints".to_string(),
            ],
        }
    }

    /// Scan every root, skipping the ones that are not directories
    pub fn scan_roots(&self, roots: &[RootEntry]) -> Result<Discovery, ScanError> {
        let mut discovery = Discovery::default();

        for root in roots {
            if !root.path.is_dir() {
                tracing::warn!(
                    modality = %root.modality,
                    "Modality root not found or not a directory, skipping: {}",
                    root.path.display()
                );
                discovery.roots_skipped.push(root.clone());
                continue;
            }

            let files = self.scan(root.modality, &root.path)?;
            tracing::info!(
                modality = %root.modality,
                "Scanned {}: {} files",
                root.path.display(),
                files.len()
            );

            *discovery.per_modality.entry(root.modality).or_insert(0) += files.len();
            discovery.files.extend(files);
            discovery.roots_scanned.push(root.clone());
        }

        if discovery.roots_scanned.is_empty() {
            let checked = roots
                .iter()
                .map(|r| r.path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ScanError::NoRoots(checked));
        }

        Ok(discovery)
    }

    /// Scan a single modality root
    pub fn scan(&self, modality: Modality, root_path: &Path) -> Result<Vec<FileRecord>, ScanError> {
        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        // Phase 1: Sequential directory traversal
        let mut candidate_files = Vec::new();

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        for entry in walker {
            let entry = entry.map_err(|e| ScanError::Walk {
                root: root_path.to_path_buf(),
                message: e.to_string(),
            })?;
            let file_type = entry.file_type();
            if file_type.is_file()
                || (file_type.is_symlink() && symlink_targets_file(entry.path()))
            {
                candidate_files.push(entry.into_path());
            }
        }

        tracing::debug!(
            modality = %modality,
            "Phase 1 complete: {} candidate files discovered",
            candidate_files.len()
        );

        // Phase 2: Parallel metadata lookup
        let records: Vec<FileRecord> = candidate_files
            .par_iter()
            .map(|path| {
                let size = file_size(path)?;
                Ok(FileRecord::from_path(modality, path, size))
            })
            .collect::<Result<_, ScanError>>()?;

        tracing::debug!(
            modality = %modality,
            "Phase 2 complete: {} records built",
            records.len()
        );

        Ok(records)
    }

    /// Check if entry should be processed
    ///
    /// Only exact names are ignored: `word-2.github.wav` is a data file.
    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        // The root itself is never filtered by name
        if entry.depth() == 0 {
            return true;
        }
        let file_name = entry.file_name().to_string_lossy();
        !self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name == pattern.as_str())
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Follow a symlink found during traversal
///
/// Directory symlinks are reported and skipped. A dangling link is skipped
/// with a warning, as it has no file to list.
fn symlink_targets_file(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(target) if target.is_file() => true,
        Ok(_) => {
            tracing::debug!("Not following directory symlink: {}", path.display());
            false
        }
        Err(e) => {
            tracing::warn!("Skipping dangling symlink {}: {}", path.display(), e);
            false
        }
    }
}

fn file_size(path: &Path) -> Result<u64, ScanError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ScanError::FileAccess(path.to_path_buf(), e.to_string()))?;
    Ok(metadata.len())
}
