use super::{convert, ContentType, Fetcher, HttpFetcher};
use crate::config::FetchConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Turns a source reference into plain text ready for chunking
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, source: &str) -> Result<String>;
}

/// Loads http(s) URLs through a [`Fetcher`] and everything else from disk
pub struct SourceLoader {
    fetcher: Arc<dyn Fetcher>,
    start_marker: Option<String>,
    end_marker: Option<String>,
}

impl SourceLoader {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self::with_fetcher(Arc::new(HttpFetcher::new(config)?), config))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>, config: &FetchConfig) -> Self {
        Self {
            fetcher,
            start_marker: non_empty(config.start_marker.as_deref()),
            end_marker: non_empty(config.end_marker.as_deref()),
        }
    }

    async fn load_raw(&self, source: &str) -> Result<(String, ContentType)> {
        if is_remote(source) {
            let doc = self.fetcher.fetch_document(source).await?;
            return Ok((doc.body, doc.content_type));
        }

        let path = Path::new(source);
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", source, e)))?;
        Ok((content, ContentType::from_extension(path)))
    }
}

#[async_trait]
impl DocumentLoader for SourceLoader {
    async fn load(&self, source: &str) -> Result<String> {
        let (raw, content_type) = self.load_raw(source).await?;
        let text = convert(&raw, content_type)?;
        debug!(
            "Loaded {} ({:?}, {} chars of text)",
            source,
            content_type,
            text.len()
        );
        Ok(trim_to_markers(
            &text,
            self.start_marker.as_deref(),
            self.end_marker.as_deref(),
        ))
    }
}

fn non_empty(marker: Option<&str>) -> Option<String> {
    marker.filter(|m| !m.is_empty()).map(str::to_string)
}

/// Whether a source names an http(s) resource rather than a file
pub fn is_remote(source: &str) -> bool {
    Url::parse(source)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Keep the text after the first `start` marker (later occurrences of the
/// marker are removed) and before the first `end` marker.
///
/// A start marker that never occurs leaves nothing; an end marker that never
/// occurs leaves the text unchanged.
pub fn trim_to_markers(text: &str, start: Option<&str>, end: Option<&str>) -> String {
    let mut text = match start {
        Some(marker) => text.split(marker).skip(1).collect::<String>(),
        None => text.to_string(),
    };

    if let Some(marker) = end {
        if let Some(pos) = text.find(marker) {
            text.truncate(pos);
        }
    }

    text
}
