//! bci-align - Multi-modal trial alignment
//!
//! Discovers files in per-modality data trees, infers subject and trial
//! identifiers, and builds a clean index of trials present in every required
//! modality. Incomplete trials are listed with the reason they were dropped.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bci_common::config::{write_toml_config, CompiledDefaults, ConfigResolver, TomlConfig};
use bci_common::Modality;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bci_align::config::{parse_root_arg, resolve_pipeline_config, CliOverrides};
use bci_align::workflow::pipeline::{CLEAN_INDEX_FILE, MANIFEST_FILE};
use bci_align::workflow::{Pipeline, RunSummary};

/// Command-line arguments for bci-align
#[derive(Parser, Debug)]
#[command(name = "bci-align")]
#[command(about = "Align multi-modal experiment recordings by subject and trial")]
#[command(version)]
struct Args {
    /// Config file (overrides BCI_ALIGN_CONFIG and default locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory receiving manifests and indices
    #[arg(short, long, global = true, env = "BCI_ALIGN_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover files and write the manifest and diagnostic reports
    Scan {
        /// Modality root as MODALITY=PATH; replaces configured roots
        #[arg(long = "root", value_parser = parse_root_arg)]
        roots: Vec<bci_common::config::RootEntry>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Align a manifest into the clean index and dropped rows
    Index {
        /// Manifest to index (default: <output-dir>/manifest.csv)
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Required modality; replaces the configured set
        #[arg(long = "require")]
        required: Vec<Modality>,

        #[arg(long)]
        json: bool,
    },

    /// Scan and index in one run
    Run {
        #[arg(long = "root", value_parser = parse_root_arg)]
        roots: Vec<bci_common::config::RootEntry>,

        #[arg(long = "require")]
        required: Vec<Modality>,

        #[arg(long)]
        json: bool,
    },

    /// Partition the clean index into subject splits
    Split {
        /// Clean index to split (default: <output-dir>/clean_index.csv)
        #[arg(long)]
        clean_index: Option<PathBuf>,

        /// Directory receiving one CSV per split
        #[arg(long)]
        splits_dir: Option<PathBuf>,
    },

    /// Write a config file populated with the defaults
    InitConfig {
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("bci_align={level},bci_common={level}", level = level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?
        );
    } else {
        for line in summary.lines() {
            println!("{}", line);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { path, force } = &args.command {
        init_logging("info", args.verbose);
        return init_config(path, *force);
    }

    // Loading stays silent; the source is logged once the subscriber exists
    let (toml, config_source) = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;

    init_logging(&toml.logging.level, args.verbose);
    info!("Starting bci-align {}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    let mut overrides = CliOverrides {
        output_dir: args.output_dir.clone(),
        ..Default::default()
    };
    match &args.command {
        Command::Scan { roots, .. } => overrides.roots = roots.clone(),
        Command::Index { required, .. } => overrides.required = required.clone(),
        Command::Run {
            roots, required, ..
        } => {
            overrides.roots = roots.clone();
            overrides.required = required.clone();
        }
        Command::Split { .. } | Command::InitConfig { .. } => {}
    }

    let mut config =
        resolve_pipeline_config(&toml, &overrides).context("Invalid configuration")?;
    if let Command::Split {
        splits_dir: Some(dir),
        ..
    } = &args.command
    {
        config.splits_dir = dir.clone();
    }
    let output_dir = config.output_dir.clone();
    let pipeline = Pipeline::new(config);

    match args.command {
        Command::Scan { json, .. } => {
            let summary = pipeline.run_scan().context("Scan failed")?;
            print_summary(&summary, json)?;
        }
        Command::Index { manifest, json, .. } => {
            let manifest = manifest.unwrap_or_else(|| output_dir.join(MANIFEST_FILE));
            if !manifest.exists() {
                bail!(
                    "Manifest {} not found; run `bci-align scan` first",
                    manifest.display()
                );
            }
            let summary = pipeline
                .run_index(&manifest)
                .with_context(|| format!("Indexing {} failed", manifest.display()))?;
            print_summary(&summary, json)?;
        }
        Command::Run { json, .. } => {
            let summary = pipeline.run_all().context("Alignment run failed")?;
            print_summary(&summary, json)?;
        }
        Command::Split { clean_index, .. } => {
            let clean_index = clean_index.unwrap_or_else(|| output_dir.join(CLEAN_INDEX_FILE));
            let summary = pipeline
                .run_split(&clean_index)
                .with_context(|| format!("Splitting {} failed", clean_index.display()))?;
            for line in summary.lines() {
                println!("{}", line);
            }
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

/// Write the compiled defaults as an editable config file
fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let defaults = CompiledDefaults::new();
    let config = TomlConfig {
        output_dir: Some(defaults.output_dir),
        roots: defaults.roots,
        ..Default::default()
    };
    write_toml_config(&config, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote default configuration to {}", path.display());
    Ok(())
}
