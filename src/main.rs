//! ragchain CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use ragchain::{
    commands::{
        cmd_ask, cmd_chat, cmd_ingest, cmd_init, cmd_search, print_ingest_stats,
        print_init_summary, print_search_result, IngestOptions,
    },
    config::Config,
    error::Result,
    progress::LogWriterFactory,
};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ragchain")]
#[command(version, about = "Chunk a document, embed it, and answer questions grounded in it", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Chunk and embed a URL or file into a store snapshot
    Ingest {
        /// URL or file path
        source: String,

        /// Snapshot file to write
        #[arg(short, long, default_value = "chunks.json")]
        output: PathBuf,

        /// Tokens per chunk (overrides chunk.window_size)
        #[arg(long)]
        window: Option<usize>,

        /// Tokens shared by neighboring chunks (overrides chunk.overlap_size)
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Print the chunk that best matches a query
    Search {
        /// The search query
        query: String,

        /// Store snapshot to search
        #[arg(short, long, default_value = "chunks.json")]
        store: PathBuf,
    },

    /// Answer a question from a store snapshot
    Ask {
        /// The question
        query: String,

        /// Store snapshot to answer from
        #[arg(short, long, default_value = "chunks.json")]
        store: PathBuf,
    },

    /// Ask questions interactively about a snapshot, file or URL
    Chat {
        /// Store snapshot (.json), file path or URL
        source: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            let path = cmd_init(base_dir_for(cli.config.as_deref()), force)?;
            if cli.json {
                println!("{}", serde_json::json!({ "config": path }));
            } else {
                print_init_summary(&path);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "ragchain", &mut std::io::stdout());
        }

        Commands::Ingest {
            source,
            output,
            window,
            overlap,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let options = IngestOptions {
                source,
                output,
                window_size: window,
                overlap_size: overlap,
            };
            let stats = cmd_ingest(&config, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_ingest_stats(&stats);
            }
        }

        Commands::Search { query, store } => {
            let config = load_config(cli.config.as_deref())?;
            let result = cmd_search(&config, &query, &store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_search_result(&result);
            }
        }

        Commands::Ask { query, store } => {
            let config = load_config(cli.config.as_deref())?;

            if cli.json {
                let result = cmd_ask(&config, &query, &store, &mut std::io::sink()).await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                cmd_ask(&config, &query, &store, &mut std::io::stdout()).await?;
            }
        }

        Commands::Chat { source } => {
            let config = load_config(cli.config.as_deref())?;
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            let stats = cmd_chat(&config, &source, input, &mut std::io::stdout()).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
        }
    }

    Ok(())
}

/// Resolve `--config` to a base directory: a `.toml` path means its parent,
/// anything else is taken as the directory itself
fn base_dir_for(config: Option<&Path>) -> Option<PathBuf> {
    config.map(|path| {
        if path.extension().is_some_and(|e| e == "toml") {
            path.parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::default_base_dir)
        } else {
            path.to_path_buf()
        }
    })
}

/// An explicit `.toml` file must exist; otherwise fall back to defaults
/// when the base directory has no config yet
fn load_config(config: Option<&Path>) -> Result<Config> {
    match config {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => Config::load(path),
        other => Config::load_from(base_dir_for(other)),
    }
}
