// Table storage for manifests, reports and the clean index
//
// Every table of a run is staged to a temp file inside the output directory and
// only renamed over its final name once all tables were written. A run that
// fails before commit leaves earlier outputs untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use bci_common::{Error, FileRecord, Modality, Result};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::types::ManifestRow;

/// Column names of `manifest.csv` and `missing_keys.csv`
pub const MANIFEST_COLUMNS: [&str; 7] = [
    "modality",
    "rel_path",
    "filename",
    "ext",
    "size_bytes",
    "subject_guess",
    "trial_guess",
];

/// In-memory table: header plus string cells, `None` written as an empty cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; the cell count must match the header
    pub fn push(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(Error::Internal(format!(
                "Row has {} cells, table has {} columns",
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a named column
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Write header and rows as CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Flat row shape of `manifest.csv`
#[derive(Debug, Clone, Deserialize)]
struct ManifestCsvRow {
    modality: Modality,
    rel_path: String,
    filename: String,
    ext: String,
    size_bytes: u64,
    subject_guess: Option<String>,
    trial_guess: Option<String>,
}

impl From<ManifestCsvRow> for ManifestRow {
    fn from(row: ManifestCsvRow) -> Self {
        ManifestRow {
            file: FileRecord {
                modality: row.modality,
                path: row.rel_path,
                filename: row.filename,
                extension: row.ext,
                size_bytes: row.size_bytes,
            },
            subject_guess: row.subject_guess.filter(|s| !s.is_empty()),
            trial_guess: row.trial_guess.filter(|s| !s.is_empty()),
        }
    }
}

/// Cells of one manifest row in [`MANIFEST_COLUMNS`] order
pub fn manifest_cells(row: &ManifestRow) -> Vec<String> {
    vec![
        row.file.modality.to_string(),
        row.file.path.clone(),
        row.file.filename.clone(),
        row.file.extension.clone(),
        row.file.size_bytes.to_string(),
        row.subject_guess.clone().unwrap_or_default(),
        row.trial_guess.clone().unwrap_or_default(),
    ]
}

/// Build a manifest-shaped table from rows
pub fn manifest_table<'a>(rows: impl IntoIterator<Item = &'a ManifestRow>) -> Table {
    let mut table = Table::new(MANIFEST_COLUMNS);
    table.rows = rows.into_iter().map(manifest_cells).collect();
    table
}

/// Load a manifest written by a previous run
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<ManifestCsvRow>() {
        rows.push(record?.into());
    }
    debug!("Read {} manifest rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Load a clean index (or any CSV table) with its header
pub fn read_clean_index(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(Table { headers, rows })
}

/// Tables staged for an all-or-nothing commit into one directory
pub struct OutputStage {
    dir: PathBuf,
    staged: Vec<(PathBuf, NamedTempFile)>,
}

impl OutputStage {
    /// Prepare staging in `dir`, creating it if needed
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            staged: Vec::new(),
        })
    }

    /// Write a table to a temp file; returns the path it will be committed to
    pub fn stage(&mut self, file_name: &str, table: &Table) -> Result<PathBuf> {
        let target = self.dir.join(file_name);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        table.write_csv(tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;

        debug!(
            rows = table.len(),
            "Staged {} ({})",
            file_name,
            tmp.path().display()
        );
        self.staged.push((target.clone(), tmp));
        Ok(target)
    }

    /// Number of staged tables
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Rename every staged table over its final name
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.staged.len());
        for (target, tmp) in self.staged {
            tmp.persist(&target).map_err(|e| e.error)?;
            info!("Wrote {}", target.display());
            written.push(target);
        }
        Ok(written)
    }
}
