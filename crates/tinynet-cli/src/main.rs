//! TinyNet CLI - load relational rows into an entity graph and query it

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{completions, nodes, query, stats};
use config::NetFile;
use tinynet_core::{IngestStats, Row, TinyNet};

#[derive(Parser)]
#[command(name = "tinynet")]
#[command(author, version, about = "In-memory entity graph over flattened relational rows")]
pub struct Cli {
    /// Net definition: settings, entity descriptors and named queries (TOML)
    #[arg(short, long, env = "TINYNET_CONFIG", default_value = "tinynet.toml", global = true)]
    pub config: PathBuf,

    /// Row files to ingest, in order (JSON array of objects)
    #[arg(short, long, global = true)]
    pub rows: Vec<PathBuf>,

    /// Output format: table, json
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show node counts per entity type
    Stats,
    /// List the entities of one type
    Nodes(nodes::NodesArgs),
    /// Evaluate a named query
    Query(query::QueryArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Loaded net plus the definition it was built from
pub struct AppContext {
    pub file: NetFile,
    pub net: TinyNet,
    pub ingested: IngestStats,
}

impl AppContext {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        tracing::debug!("Loading net definition from {:?}", cli.config);
        let file = NetFile::load(&cli.config)?;

        let mut rows: Vec<Row> = Vec::new();
        for path in &cli.rows {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read rows from {:?}", path))?;
            let batch: Vec<Row> = serde_json::from_str(&raw)
                .with_context(|| format!("Rows in {:?} must be a JSON array of objects", path))?;
            tracing::debug!("Read {} rows from {:?}", batch.len(), path);
            rows.extend(batch);
        }

        let mut net = TinyNet::with_config(file.net.clone());
        let ingested = net.ingest(&rows, &file.entities)?;
        tracing::info!("Loaded {} nodes from {} rows", net.len(), ingested.rows);

        Ok(Self {
            file,
            net,
            ingested,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting tinynet CLI");

    if let Commands::Completions(args) = &cli.command {
        return completions::run(args);
    }

    let mut ctx = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Stats => stats::run(&cli, &ctx)?,
        Commands::Nodes(args) => nodes::run(args, &cli, &ctx)?,
        Commands::Query(args) => query::run(args, &cli, &mut ctx)?,
        Commands::Completions(_) => {}
    }

    Ok(())
}
