//! Discovered file records

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Modality;

/// One file found under a modality root
///
/// Created once during discovery and never mutated afterwards. `path` always
/// uses forward slashes regardless of the platform it was discovered on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub modality: Modality,
    #[serde(rename = "rel_path")]
    pub path: String,
    pub filename: String,
    #[serde(rename = "ext")]
    pub extension: String,
    pub size_bytes: u64,
}

impl FileRecord {
    /// Build a record from a path, deriving filename and extension
    ///
    /// The extension is lower-cased and keeps its leading dot (`.wav`); it is
    /// empty for files without a suffix.
    pub fn from_path(modality: Modality, path: &Path, size_bytes: u64) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        Self {
            modality,
            path: path.to_string_lossy().replace('\\', "/"),
            filename,
            extension,
            size_bytes,
        }
    }
}
