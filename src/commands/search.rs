//! Search command implementation

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{Retrieval, RetrievalPipeline};
use crate::store::VectorStore;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub best_match: Option<Retrieval>,
}

/// Find the chunk of a saved store that best matches `query`
pub async fn cmd_search(config: &Config, query: &str, store_path: &Path) -> Result<SearchResult> {
    let store = VectorStore::load(store_path)?;
    let pipeline = RetrievalPipeline::from_config(config)?;
    let best_match = pipeline.retrieve(query, &store).await?;

    Ok(SearchResult {
        query: query.to_string(),
        best_match,
    })
}

pub fn print_search_result(result: &SearchResult) {
    println!("\n🔍 Query: {}\n", result.query);
    match &result.best_match {
        Some(found) => {
            println!("[score: {:.3}] chunk {}", found.score, found.chunk_id);
            println!("   {}\n", found.text.replace('\n', " "));
        }
        None => println!("No chunk is similar enough to the query.\n"),
    }
}
