//! Configuration resolution for bci-align
//!
//! **Priority:** CLI → ENV → TOML → compiled defaults
//!
//! The TOML layer and file lookup live in `bci_common::config`; this module
//! applies command-line overrides on top and produces the [`PipelineConfig`].

use std::path::PathBuf;

use bci_common::config::{RootEntry, TomlConfig};
use bci_common::{Error, Modality, Result};
use tracing::info;

use crate::workflow::PipelineConfig;

/// Values given on the command line (or through their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output_dir: Option<PathBuf>,
    /// Replaces every configured root when non-empty
    pub roots: Vec<RootEntry>,
    /// Replaces the configured required set when non-empty
    pub required: Vec<Modality>,
}

/// Parse a `modality=path` root argument
pub fn parse_root_arg(arg: &str) -> Result<RootEntry> {
    let (modality, path) = arg.split_once('=').ok_or_else(|| {
        Error::InvalidInput(format!("Expected MODALITY=PATH, got {:?}", arg))
    })?;
    if path.trim().is_empty() {
        return Err(Error::InvalidInput(format!("Empty path in root {:?}", arg)));
    }
    Ok(RootEntry {
        modality: modality.trim().parse()?,
        path: PathBuf::from(path.trim()),
    })
}

/// Merge file configuration with command-line overrides
pub fn resolve_pipeline_config(toml: &TomlConfig, cli: &CliOverrides) -> Result<PipelineConfig> {
    toml.validate()?;
    let mut config = PipelineConfig::from(toml);

    if let Some(dir) = &cli.output_dir {
        info!("Output directory from command line/environment: {}", dir.display());
        config.output_dir = dir.clone();
    }

    if !cli.roots.is_empty() {
        info!("Using {} modality roots from command line", cli.roots.len());
        config.roots = cli.roots.clone();
    }

    if !cli.required.is_empty() {
        let mut required = cli.required.clone();
        required.sort();
        required.dedup();
        config.required_modalities = Some(required);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root_arg() {
        let root = parse_root_arg("Semantics=/data/sem").unwrap();
        assert_eq!(root.modality, Modality::Semantic);
        assert_eq!(root.path, PathBuf::from("/data/sem"));

        assert!(parse_root_arg("general").is_err());
        assert!(parse_root_arg("general=").is_err());
        assert!(parse_root_arg("eeg=/data/eeg").is_err());
    }

    #[test]
    fn test_path_may_contain_equals() {
        let root = parse_root_arg("acoustic=runs/a=b").unwrap();
        assert_eq!(root.path, PathBuf::from("runs/a=b"));
    }
}
