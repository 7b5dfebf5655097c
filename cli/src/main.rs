use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use placement_core::loader::Format;
use placement_core::{EngineConfig, PlacementEngine};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "placement")]
#[command(about = "Query placement records: statistics, retrieval and search", long_about = None)]
struct Cli {
    /// Data file (.csv, .xlsx or .xls)
    #[arg(long, env = "PLACEMENT_DATA", global = true)]
    data: Option<PathBuf>,
    /// Directory to pick the first data file from when --data is not given
    #[arg(long, default_value = "data", global = true)]
    data_dir: PathBuf,
    /// Engine configuration as JSON
    #[arg(long, env = "PLACEMENT_CONFIG", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List data files found under --data-dir
    Files,
    /// Dataset-wide placement statistics
    Stats,
    /// Statistics for one academic program (substring match on Class)
    Program { name: String },
    /// Best-matching row for free text
    Query {
        text: String,
        /// Relevance floor; defaults to the configured retrieval floor
        #[arg(long)]
        floor: Option<f32>,
    },
    /// Rows whose company contains NAME
    Company { name: String },
    /// Rows whose role contains NAME
    Role { name: String },
    /// Row with the highest parsed package
    Highest,
    /// Plain-text summary handed to the language model
    Summary,
    /// Full analysis prompt for a question
    Prompt { question: String },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    let Cli { data, data_dir, config, command } = cli;
    let open = || -> Result<PlacementEngine> {
        let path = match &data {
            Some(p) => p.clone(),
            None => discover_files(&data_dir)
                .into_iter()
                .next()
                .with_context(|| format!("no .csv/.xlsx/.xls files under {}", data_dir.display()))?,
        };
        Ok(PlacementEngine::open(&path, load_config(config.as_deref())?)?)
    };

    match command {
        Commands::Files => {
            for file in discover_files(&data_dir) {
                println!("{}", file.display());
            }
            Ok(())
        }
        Commands::Stats => print_json(&open()?.snapshot()),
        Commands::Program { name } => match open()?.program_stats(&name) {
            Some(stats) => print_json(&stats),
            None => bail!("no data found for program {name}"),
        },
        Commands::Query { text, floor } => {
            let engine = open()?;
            let floor = floor.unwrap_or(engine.config().retrieval_floor);
            print_json(&engine.query_with_floor(&text, floor))
        }
        Commands::Company { name } => print_json(&open()?.search_by_company(&name)),
        Commands::Role { name } => print_json(&open()?.search_by_role(&name)),
        Commands::Highest => print_json(&open()?.highest_package()),
        Commands::Summary => {
            print!("{}", open()?.data_summary());
            Ok(())
        }
        Commands::Prompt { question } => {
            print!("{}", open()?.analysis_prompt(&question));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else { return Ok(EngineConfig::default()) };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Supported data files under `dir`, sorted by path.
fn discover_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && Format::from_path(p).is_ok())
        .collect();
    files.sort();
    tracing::debug!(dir = %dir.display(), found = files.len(), "discovered data files");
    files
}
