//! Ingest command implementation

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::RetrievalPipeline;
use crate::progress::add_spinner;
use serde::Serialize;
use std::path::PathBuf;

/// Options for building a store snapshot
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// URL or file path to ingest
    pub source: String,
    /// Snapshot file to write
    pub output: PathBuf,
    /// Override `chunk.window_size`
    pub window_size: Option<usize>,
    /// Override `chunk.overlap_size`
    pub overlap_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestStats {
    pub source: String,
    pub output: PathBuf,
    pub chunks: usize,
    pub dimension: Option<usize>,
    pub window_size: usize,
    pub overlap_size: usize,
}

/// Chunk and embed a source, then save the store snapshot
pub async fn cmd_ingest(config: &Config, options: IngestOptions) -> Result<IngestStats> {
    let mut config = config.clone();
    if let Some(window_size) = options.window_size {
        config.chunk.window_size = window_size;
    }
    if let Some(overlap_size) = options.overlap_size {
        config.chunk.overlap_size = overlap_size;
    }

    let pipeline = RetrievalPipeline::from_config(&config)?;

    let spinner = add_spinner(format!("Ingesting {}", options.source));
    let result = pipeline.ingest(&options.source).await;
    spinner.finish_and_clear();
    let store = result?;

    store.save(&options.output)?;

    Ok(IngestStats {
        source: options.source,
        output: options.output,
        chunks: store.len(),
        dimension: store.dimension(),
        window_size: config.chunk.window_size,
        overlap_size: config.chunk.overlap_size,
    })
}

pub fn print_ingest_stats(stats: &IngestStats) {
    println!("✓ Ingested {}", stats.source);
    println!("  Chunks:    {}", stats.chunks);
    if let Some(dimension) = stats.dimension {
        println!("  Dimension: {}", dimension);
    }
    println!(
        "  Window:    {} tokens ({} overlap)",
        stats.window_size, stats.overlap_size
    );
    println!("  Saved to:  {}", stats.output.display());
}
