//! Pipeline orchestrator
//!
//! Runs discovery and alignment stages and commits their tables.
//!
//! # Architecture
//! - **Scan**: discovery → identifier extraction → manifest, alignment report,
//!   missing-keys report
//! - **Index**: manifest rows → grouping → trial-index assignment → alignment →
//!   classification → clean index, dropped rows
//! - **All**: scan + index with a single commit
//! - **Split**: clean index → per-set tables
//!
//! # Error Handling
//! Every table of a run is staged before any is committed, so a failing run
//! leaves the previous outputs as they were. Files without a subject or trial
//! and incomplete trials are outcomes, not errors.
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(config);
//! let summary = pipeline.run_all()?;
//! ```

use std::path::{Path, PathBuf};

use bci_common::config::{RootEntry, SplitRange, TomlConfig};
use bci_common::Modality;
use tracing::{debug, info};

use super::statistics::{IndexStats, RunSummary, ScanStats, SplitSummary};
use super::storage::{manifest_table, read_clean_index, read_manifest, OutputStage};
use crate::error::AlignResult;
use crate::services::{
    check_rows, classify, group, missing_keys_table, resolve_required, split_clean_index,
    summarize, Classification, FileScanner, KeyExtractor, SplitPlan, TrialIndexMap,
};
use crate::types::ManifestRow;

/// Manifest of every discovered file
pub const MANIFEST_FILE: &str = "manifest.csv";
/// Presence summary per (subject, trial label)
pub const ALIGNMENT_REPORT_FILE: &str = "alignment_report.csv";
/// Files lacking a subject or trial label
pub const MISSING_KEYS_FILE: &str = "missing_keys.csv";
/// Aligned trials, one path column per required modality
pub const CLEAN_INDEX_FILE: &str = "clean_index.csv";
/// Trial indices excluded from the clean index, with reason
pub const DROPPED_FILE: &str = "dropped_incomplete.csv";

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Modality roots in scan order
    pub roots: Vec<RootEntry>,
    /// Directory receiving manifests and indices
    pub output_dir: PathBuf,
    /// Explicit required modality set; `None` requires every grouped modality
    pub required_modalities: Option<Vec<Modality>>,
    /// Accept single-digit subject numbers (`sub7`)
    pub lenient_subject_fallback: bool,
    /// Run the advisory trial-label cross-check on clean rows
    pub check_label_consistency: bool,
    /// Directory receiving split tables
    pub splits_dir: PathBuf,
    pub split_ranges: Vec<SplitRange>,
}

impl From<&TomlConfig> for PipelineConfig {
    fn from(toml: &TomlConfig) -> Self {
        Self {
            roots: toml.effective_roots(),
            output_dir: toml.effective_output_dir(),
            required_modalities: toml.required_modalities.clone(),
            lenient_subject_fallback: toml.extraction.lenient_subject_fallback,
            check_label_consistency: toml.alignment.check_label_consistency,
            splits_dir: toml.splits.output_dir.clone(),
            split_ranges: toml.splits.sets.clone(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&TomlConfig::default())
    }
}

/// Outputs of the index stage, before staging
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub classification: Classification,
    pub stats: IndexStats,
}

/// Pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    scanner: FileScanner,
    extractor: KeyExtractor,
}

impl Pipeline {
    /// Create new pipeline with configuration
    pub fn new(config: PipelineConfig) -> Self {
        let extractor =
            KeyExtractor::new().with_lenient_subject_fallback(config.lenient_subject_fallback);
        Self {
            config,
            scanner: FileScanner::new(),
            extractor,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discover files under every root and infer their keys
    ///
    /// Returns the manifest rows in traversal order and the modalities whose
    /// roots were scanned.
    pub fn discover(&self) -> AlignResult<(Vec<ManifestRow>, Vec<Modality>)> {
        let discovery = self.scanner.scan_roots(&self.config.roots)?;

        let mut scanned: Vec<Modality> =
            discovery.roots_scanned.iter().map(|r| r.modality).collect();
        scanned.sort();
        scanned.dedup();

        let rows = self.extractor.extract_all(discovery.files);
        info!("Discovered {} files across {} modalities", rows.len(), scanned.len());
        Ok((rows, scanned))
    }

    /// Classify manifest rows into clean and dropped trials
    ///
    /// Pure: no file is read or written. With the lenient subject fallback
    /// enabled, rows without a subject get a second extraction attempt first.
    pub fn index_rows(&self, mut rows: Vec<ManifestRow>) -> AlignResult<IndexOutcome> {
        let filled = self.extractor.fill_missing_subjects(&mut rows);
        if filled > 0 {
            info!("Lenient subject fallback assigned {} manifest rows", filled);
        }

        let groups = group(rows);
        let unkeyed_files = groups.unkeyed.len();
        let subjects_grouped = groups.groups.len();
        let present = groups.modalities();

        // Fail on an unusable modality set before anything is aligned
        let required = resolve_required(self.config.required_modalities.as_deref(), &present)?;
        debug!(
            required = ?required.iter().collect::<Vec<_>>(),
            "Resolved required modalities"
        );

        let map = TrialIndexMap::build(groups);
        let classification = classify(&map, required)?;

        let label_mismatches = if self.config.check_label_consistency {
            check_rows(&classification.clean).len()
        } else {
            0
        };

        let clean_per_subject = classification.clean_per_subject();
        for (subject, count) in &clean_per_subject {
            debug!(subject = %subject, "{} clean trials", count);
        }

        let stats = IndexStats {
            required_modalities: classification.required.iter().collect(),
            subjects_grouped,
            unkeyed_files,
            clean_rows: classification.clean.len(),
            dropped_rows: classification.dropped.len(),
            dropped_by_reason: classification.dropped_by_reason(),
            clean_per_subject,
            label_mismatches,
        };
        info!("Aligned {}", stats.display_string());

        Ok(IndexOutcome {
            classification,
            stats,
        })
    }

    /// Stage manifest and diagnostic reports
    fn stage_scan(
        &self,
        stage: &mut OutputStage,
        rows: &[ManifestRow],
        scanned: &[Modality],
    ) -> AlignResult<ScanStats> {
        let reported = self
            .config
            .required_modalities
            .clone()
            .unwrap_or_else(|| scanned.to_vec());
        let report = summarize(rows, &reported);

        let mut stats = ScanStats {
            complete_keys: report.complete_keys(),
            incomplete_keys: report.incomplete_keys(),
            ..Default::default()
        };
        for row in rows {
            *stats.files_per_modality.entry(row.file.modality).or_insert(0) += 1;
            if row.subject_guess.is_none() {
                stats.missing_subject += 1;
            }
            if row.trial_guess.is_none() {
                stats.missing_trial += 1;
            }
        }

        stage.stage(MANIFEST_FILE, &manifest_table(rows))?;
        stage.stage(ALIGNMENT_REPORT_FILE, &report.to_table())?;
        stage.stage(MISSING_KEYS_FILE, &missing_keys_table(rows))?;
        Ok(stats)
    }

    /// Stage clean index and dropped rows; both are always written
    fn stage_index(&self, stage: &mut OutputStage, outcome: &IndexOutcome) -> AlignResult<()> {
        stage.stage(CLEAN_INDEX_FILE, &outcome.classification.clean_table())?;
        stage.stage(DROPPED_FILE, &outcome.classification.dropped_table())?;
        Ok(())
    }

    /// Discovery through diagnostic reports
    pub fn run_scan(&self) -> AlignResult<RunSummary> {
        let mut summary = RunSummary::new();
        let (rows, scanned) = self.discover()?;

        let mut stage = OutputStage::new(&self.config.output_dir)?;
        summary.scan = Some(self.stage_scan(&mut stage, &rows, &scanned)?);
        summary.outputs = stage.commit()?;
        Ok(summary)
    }

    /// Alignment of a previously written manifest
    pub fn run_index(&self, manifest: &Path) -> AlignResult<RunSummary> {
        let mut summary = RunSummary::new();
        let rows = read_manifest(manifest)?;
        info!("Indexing {} manifest rows from {}", rows.len(), manifest.display());

        let outcome = self.index_rows(rows)?;
        let mut stage = OutputStage::new(&self.config.output_dir)?;
        self.stage_index(&mut stage, &outcome)?;
        summary.index = Some(outcome.stats);
        summary.outputs = stage.commit()?;
        Ok(summary)
    }

    /// Scan and index with one commit
    pub fn run_all(&self) -> AlignResult<RunSummary> {
        let mut summary = RunSummary::new();
        let (rows, scanned) = self.discover()?;

        let mut stage = OutputStage::new(&self.config.output_dir)?;
        summary.scan = Some(self.stage_scan(&mut stage, &rows, &scanned)?);

        let outcome = self.index_rows(rows)?;
        self.stage_index(&mut stage, &outcome)?;
        summary.index = Some(outcome.stats);

        summary.outputs = stage.commit()?;
        Ok(summary)
    }

    /// Write one table per configured split set
    ///
    /// Sets without rows are skipped, not written.
    pub fn run_split(&self, clean_index: &Path) -> AlignResult<SplitSummary> {
        let plan = SplitPlan::from_ranges(&self.config.split_ranges)?;
        let clean = read_clean_index(clean_index)?;
        let outputs = split_clean_index(&clean, &plan)?;

        let mut summary = SplitSummary::default();
        let mut stage = OutputStage::new(&self.config.splits_dir)?;
        for output in outputs {
            if output.table.is_empty() {
                info!("Split '{}' has no rows, skipping", output.name);
                continue;
            }
            stage.stage(&format!("{}.csv", output.name), &output.table)?;
            summary
                .rows_per_split
                .push((output.name.clone(), output.table.len()));
        }
        summary.outputs = stage.commit()?;
        Ok(summary)
    }
}
