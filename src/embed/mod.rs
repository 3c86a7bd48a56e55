//! Embedding generation
//!
//! This module provides an abstraction over embedding models with:
//! - A trait for different embedding backends
//! - HTTP embedding backend
//! - Batch processing that respects backend batch limits

mod http_backend;

pub use http_backend::*;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::debug;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; the result has one vector per text, in order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>>;

    /// Embed a single text with an optional image reference (URL or path)
    async fn embed_with_image(&self, text: &str, image: Option<&str>) -> Result<Vec<f64>> {
        if image.is_some() {
            return Err(Error::Embedding(format!(
                "Model '{}' does not support image inputs",
                self.model_name()
            )));
        }
        embed_one(self, text).await
    }

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let embedder = HttpEmbedder::new(config)?;
    Ok(Box::new(embedder))
}

/// Embed a single text, e.g. a user query
pub async fn embed_one<E: Embedder + ?Sized>(embedder: &E, text: &str) -> Result<Vec<f64>> {
    embedder
        .embed(vec![text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))
}

/// Embed texts in sequential batches of at most `batch_size`.
///
/// Each batch must come back with exactly one vector per text; the first
/// failing batch aborts the whole run.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f64>>> {
    if batch_size == 0 {
        return Err(Error::Config("Embedding batch size must be positive".to_string()));
    }

    let mut all_embeddings = Vec::with_capacity(texts.len());
    let total_batches = texts.len().div_ceil(batch_size);

    for (i, chunk) in texts.chunks(batch_size).enumerate() {
        debug!("Embedding batch {} of {}", i + 1, total_batches);
        let embeddings = embedder.embed(chunk.to_vec()).await?;
        if embeddings.len() != chunk.len() {
            return Err(Error::Embedding(format!(
                "Backend returned {} embeddings for a batch of {} texts",
                embeddings.len(),
                chunk.len()
            )));
        }
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records batch sizes and returns `[index, len]` vectors
    struct RecordingEmbedder {
        batches: Mutex<Vec<usize>>,
        drop_last: bool,
    }

    impl RecordingEmbedder {
        fn new() -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
                drop_last: false,
            }
        }
    }

    #[async_trait]
    impl Embedder for RecordingEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>> {
            self.batches.lock().unwrap().push(texts.len());
            let mut out: Vec<Vec<f64>> = texts
                .iter()
                .map(|t| vec![t.len() as f64, 1.0])
                .collect();
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_batch_splitting() {
        let texts: Vec<String> = (0..10).map(|i| format!("text {}", i)).collect();
        let chunks: Vec<_> = texts.chunks(3).collect();

        assert_eq!(chunks.len(), 4); // 3 + 3 + 3 + 1
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(chunks[3].len(), 1);
    }

    #[tokio::test]
    async fn test_embed_in_batches_respects_limit_and_order() {
        let embedder = RecordingEmbedder::new();
        let texts: Vec<String> = (0..45).map(|i| "x".repeat(i + 1)).collect();

        let vectors = embed_in_batches(&embedder, texts, 20).await.unwrap();

        assert_eq!(*embedder.batches.lock().unwrap(), vec![20, 20, 5]);
        assert_eq!(vectors.len(), 45);
        for (i, v) in vectors.iter().enumerate() {
            assert_eq!(v[0], (i + 1) as f64);
        }
    }

    #[tokio::test]
    async fn test_embed_in_batches_rejects_short_batch() {
        let embedder = RecordingEmbedder {
            batches: Mutex::new(Vec::new()),
            drop_last: true,
        };
        let texts = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            embed_in_batches(&embedder, texts, 20).await,
            Err(Error::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_in_batches_empty_input() {
        let embedder = RecordingEmbedder::new();
        let vectors = embed_in_batches(&embedder, Vec::new(), 20).await.unwrap();
        assert!(vectors.is_empty());
        assert!(embedder.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_image_embedding_is_unsupported() {
        let embedder = RecordingEmbedder::new();
        assert!(matches!(
            embedder
                .embed_with_image("caption", Some("https://example.com/cat.png"))
                .await,
            Err(Error::Embedding(_))
        ));
        let v = embedder.embed_with_image("caption", None).await.unwrap();
        assert_eq!(v, vec![7.0, 1.0]);
    }
}
