//! Configuration loading and resolution
//!
//! Configuration comes from a single TOML file plus command-line overrides.
//! The config file itself is located with the following priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `BCI_ALIGN_CONFIG`
//! 3. `bci-align.toml` in the working directory
//! 4. `<user config dir>/bci-align/config.toml`
//!
//! A missing config file is not an error: the tool logs a warning and runs with
//! compiled defaults. A config file that exists but cannot be parsed is.

use crate::{Error, Modality, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BCI_ALIGN_CONFIG";

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "bci-align.toml";

/// Complete file configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory receiving the manifest, reports and index tables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Modalities every clean row must cover
    ///
    /// When absent, every modality that produced at least one grouped file is
    /// required. An explicitly empty list is rejected before alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_modalities: Option<Vec<Modality>>,

    /// Modality root directories to scan
    #[serde(default)]
    pub roots: Vec<RootEntry>,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub alignment: AlignmentConfig,

    #[serde(default)]
    pub splits: SplitsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One modality root directory
///
/// Several entries may name the same modality; their files are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootEntry {
    pub modality: Modality,
    pub path: PathBuf,
}

/// Identifier extraction switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Retry subject inference with `sub` followed by a single digit
    #[serde(default)]
    pub lenient_subject_fallback: bool,
}

/// Alignment switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Compare advisory trial labels across the files of each clean row
    #[serde(default = "default_true")]
    pub check_label_consistency: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            check_label_consistency: true,
        }
    }
}

/// Subject split configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitsConfig {
    #[serde(default = "default_splits_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_split_sets")]
    pub sets: Vec<SplitRange>,
}

impl Default for SplitsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_splits_dir(),
            sets: default_split_sets(),
        }
    }
}

/// Contiguous range of numbered subjects assigned to one split
///
/// `{ name = "val", first = 12, last = 13 }` selects `sub-12` and `sub-13`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRange {
    pub name: String,
    #[serde(default = "default_subject_prefix")]
    pub prefix: String,
    pub first: u32,
    pub last: u32,
    #[serde(default = "default_subject_width")]
    pub width: usize,
}

impl SplitRange {
    pub fn new(name: &str, first: u32, last: u32) -> Self {
        Self {
            name: name.to_string(),
            prefix: default_subject_prefix(),
            first,
            last,
            width: default_subject_width(),
        }
    }

    /// Normalized subject identifiers covered by this range
    pub fn subjects(&self) -> Vec<String> {
        (self.first..=self.last)
            .map(|n| format!("{}{:0width$}", self.prefix, n, width = self.width))
            .collect()
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_splits_dir() -> PathBuf {
    PathBuf::from("splits")
}

fn default_subject_prefix() -> String {
    "sub-".to_string()
}

fn default_subject_width() -> usize {
    2
}

fn default_split_sets() -> Vec<SplitRange> {
    vec![
        SplitRange::new("train", 1, 11),
        SplitRange::new("val", 12, 13),
        SplitRange::new("test", 14, 15),
    ]
}

/// Compiled defaults used when no config file supplies a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub output_dir: PathBuf,
    pub roots: Vec<RootEntry>,
}

impl CompiledDefaults {
    pub fn new() -> Self {
        let raw = PathBuf::from("data").join("raw");
        let roots = [
            (Modality::General, "general"),
            (Modality::Semantic, "semantic"),
            (Modality::Acoustic, "acoustic"),
            (Modality::Articulatory, "articulatory"),
        ]
        .into_iter()
        .map(|(modality, dir)| RootEntry {
            modality,
            path: raw.join(dir),
        })
        .collect();

        Self {
            output_dir: PathBuf::from("manifests"),
            roots,
        }
    }
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self::new()
    }
}

impl TomlConfig {
    /// Roots from the file, or the compiled defaults when none are listed
    pub fn effective_roots(&self) -> Vec<RootEntry> {
        if self.roots.is_empty() {
            CompiledDefaults::new().roots
        } else {
            self.roots.clone()
        }
    }

    /// Output directory from the file, or the compiled default
    pub fn effective_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| CompiledDefaults::new().output_dir)
    }

    /// Reject split plans that assign one subject to two sets
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut names: HashSet<&str> = HashSet::new();
        for set in &self.splits.sets {
            if !names.insert(set.name.as_str()) {
                return Err(Error::Config(format!("Duplicate split name: {}", set.name)));
            }
            if set.first > set.last {
                return Err(Error::Config(format!(
                    "Split '{}' has first ({}) greater than last ({})",
                    set.name, set.first, set.last
                )));
            }
            for subject in set.subjects() {
                if !seen.insert(subject.clone()) {
                    return Err(Error::Config(format!(
                        "Subject {} assigned to more than one split",
                        subject
                    )));
                }
            }
        }

        if matches!(&self.required_modalities, Some(list) if list.is_empty()) {
            return Err(Error::Config(
                "required_modalities is present but empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Config file resolution following the documented priority order
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Locate the config file to load, if any
    ///
    /// Explicit paths (CLI or environment) are returned even when the file does
    /// not exist so the caller can report them; implicit locations are only
    /// returned when present.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|d| d.join("bci-align").join("config.toml"))
            .filter(|p| p.exists())
    }

    /// Load the resolved config, falling back to defaults when it is missing
    ///
    /// Nothing is logged here; callers report the returned source once their
    /// subscriber is installed.
    pub fn load(&self) -> Result<(TomlConfig, ConfigSource)> {
        match self.resolve() {
            Some(path) if path.exists() => {
                let config = load_toml_config(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            Some(path) => Ok((TomlConfig::default(), ConfigSource::Missing(path))),
            None => Ok((TomlConfig::default(), ConfigSource::Defaults)),
        }
    }
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// An explicit path (CLI or environment) that does not exist
    Missing(PathBuf),
    /// No file found in any default location
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::File(path) => Some(path.as_path()),
            ConfigSource::Missing(_) | ConfigSource::Defaults => None,
        }
    }

    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            ),
            ConfigSource::Defaults => warn!("No config file found, using compiled defaults"),
        }
    }
}

/// Parse and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, content)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}
