use crate::error::Error;
use tracing::{info, warn};

/// Receives pipeline progress at ingestion and query boundaries.
///
/// Every method has an empty default, so observers only implement what
/// they care about.
pub trait PipelineObserver: Send + Sync {
    fn ingest_started(&self, _source: &str) {}

    /// `outcome` carries the number of stored chunks on success
    fn ingest_finished(&self, _source: &str, _outcome: Result<usize, &Error>) {}

    fn query_started(&self, _query: &str) {}

    /// `outcome` carries the score of the selected chunk, if any. For an
    /// answer this fires when its stream ends, not when it is returned.
    fn query_finished(&self, _query: &str, _outcome: Result<Option<f64>, &Error>) {}
}

/// Default observer that emits `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn ingest_started(&self, source: &str) {
        info!("Ingesting {}", source);
    }

    fn ingest_finished(&self, source: &str, outcome: Result<usize, &Error>) {
        match outcome {
            Ok(chunks) => info!("Ingested {} chunks from {}", chunks, source),
            Err(e) => warn!("Ingestion of {} failed: {}", source, e),
        }
    }

    fn query_started(&self, query: &str) {
        info!("Query: {}", query);
    }

    fn query_finished(&self, query: &str, outcome: Result<Option<f64>, &Error>) {
        match outcome {
            Ok(Some(score)) => info!("Finished '{}' (best chunk scored {:.4})", query, score),
            Ok(None) => info!("Finished '{}' without a relevant chunk", query),
            Err(e) => warn!("Query '{}' failed: {}", query, e),
        }
    }
}

/// Observer that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}
