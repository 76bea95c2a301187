//! The courseweave command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::DataArgs;

#[derive(Parser)]
#[command(
    name = "courseweave",
    version,
    about = "Data-quality pipeline for course catalogs and prerequisite graphs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize, validate and analyze a dataset, then write reports
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Completion log JSON (defaults to completions.json in --data, if present)
        #[arg(long)]
        completions: Option<PathBuf>,

        /// Output directory (defaults to output_dir from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, markdown, all (comma-separated)
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Normalize and validate a dataset without running the analyses
    Validate {
        #[command(flatten)]
        data: DataArgs,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and sample dataset
    Init,
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courseweave=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            data,
            completions,
            output,
            format,
            config,
        } => commands::run::execute(data, completions, output, format, config).await,
        Commands::Validate { data, config } => commands::validate::execute(data, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
