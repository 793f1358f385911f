use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

mod completeness;
mod config;
mod error;
mod logging;
mod mapping;
mod metrics;
mod output;
mod walker;

use crate::config::{CompletionPolicy, Config, MissingValuePolicy};
use crate::mapping::MappingTable;

#[derive(Parser)]
#[command(name = "brachy_redcap")]
#[command(about = "Aggregate TG43/TG186 dose metrics into a REDCap upload table")]
struct Cli {
    /// Directory holding the PT#### patient folders
    #[arg(required_unless_present = "config")]
    root: Option<PathBuf>,

    /// JSON configuration file (replaces the options below)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lowest record id to include
    #[arg(long, default_value = "1")]
    min_id: u32,

    /// Highest record id to include
    #[arg(long, default_value = "9999")]
    max_id: u32,

    /// Record ids to leave out, comma separated
    #[arg(short, long, value_delimiter = ',')]
    exclude: Vec<u32>,

    /// How the missing marker is read: zero or nan
    #[arg(long, default_value = "zero")]
    missing_values: MissingValuePolicy,

    /// Completion status policy: all-complete, strict or any-present
    #[arg(long, default_value = "any-present")]
    completion: CompletionPolicy,

    /// String prepended to every record id
    #[arg(long, default_value = "")]
    record_id_prefix: String,

    /// REDCap event name written on every row
    #[arg(long, default_value = config::DEFAULT_EVENT_NAME)]
    event_name: String,

    /// Token the dose calculator writes for a missing value
    #[arg(long, default_value = config::DEFAULT_MISSING_MARKER)]
    missing_marker: String,

    /// Directory for the table and log (defaults to the root directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        if let Some(path) = &self.config {
            return Config::from_file(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()));
        }

        let root = self.root.context("a root directory is required")?;
        let config = Config {
            min_id: self.min_id,
            max_id: self.max_id,
            exclude: self.exclude.into_iter().collect(),
            missing_values: self.missing_values,
            completion: self.completion,
            record_id_prefix: self.record_id_prefix,
            event_name: self.event_name,
            missing_marker: self.missing_marker,
            output_dir: self.output_dir,
            ..Config::new(root)
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    let config = cli.into_config()?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    std::fs::create_dir_all(config.output_dir())
        .with_context(|| format!("failed to create {}", config.output_dir().display()))?;
    let log_path = logging::init(config.output_dir(), &timestamp, verbose)?;

    info!(
        "Starting REDCap export of {} (missing values: {}, completion: {})",
        config.root_dir.display(),
        config.missing_values,
        config.completion
    );

    let mappings = MappingTable::builtin();
    let table = logging::report_failure(output::assemble(&config, &mappings))?;
    if table.is_empty() {
        warn!("No patient folders matched; the table will contain only the header row");
    }
    let table_path = logging::report_failure(output::save_table(&table, &config, &timestamp))?;

    info!("Export complete: {} patients written to {}", table.len(), table_path.display());
    info!("Log file saved to {}", log_path.display());

    Ok(())
}
