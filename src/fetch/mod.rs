//! Document fetching and text extraction
//!
//! This module handles:
//! - HTTP fetching of remote documents
//! - Content type detection
//! - HTML and Markdown conversion to plain text
//! - Loading a source (URL or file path) as plain text

mod convert;
mod loader;

pub use convert::*;
pub use loader::*;

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Content types we can convert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Markdown,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from a path's extension
    pub fn from_extension(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some("html") | Some("htm") | Some("xhtml") => ContentType::Html,
            Some("md") | Some("markdown") | Some("mdx") => ContentType::Markdown,
            Some("txt") | Some("text") => ContentType::PlainText,
            Some(_) => mime_guess::from_path(path)
                .first_raw()
                .map(Self::from_mime)
                .unwrap_or(ContentType::Unknown),
            None => ContentType::Unknown,
        }
    }

    /// Detect content type from a MIME type or `Content-Type` header value
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_lowercase();
        if mime.contains("text/html") || mime.contains("application/xhtml") {
            ContentType::Html
        } else if mime.contains("text/markdown") || mime.contains("text/x-markdown") {
            ContentType::Markdown
        } else if mime.starts_with("text/") {
            ContentType::PlainText
        } else {
            ContentType::Unknown
        }
    }

    /// Detect from an optional MIME type, falling back to the path.
    ///
    /// A generic `text/plain` header does not override a more specific
    /// extension (servers often send Markdown as `text/plain`).
    pub fn detect(path: Option<&Path>, mime: Option<&str>) -> Self {
        let from_mime = mime.map(Self::from_mime).unwrap_or(ContentType::Unknown);
        if matches!(from_mime, ContentType::Html | ContentType::Markdown) {
            return from_mime;
        }

        match path.map(Self::from_extension) {
            Some(ContentType::Unknown) | None => from_mime,
            Some(detected) => detected,
        }
    }
}

/// A fetched remote document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: String,
    pub body: String,
    pub content_type: ContentType,
}

/// Trait for document fetchers
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a document along with its detected content type
    async fn fetch_document(&self, url: &str) -> Result<FetchedDocument>;

    /// Fetch a document's raw body
    async fn fetch(&self, url: &str) -> Result<String> {
        Ok(self.fetch_document(url).await?.body)
    }
}

/// Fetcher backed by a `reqwest` client
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Fetch(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_document(&self, url: &str) -> Result<FetchedDocument> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::Fetch(format!("Invalid URL {}: {}", url, e)))?;
        debug!("Fetching: {}", url);

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {}: {}", status, url)));
        }

        let header = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to read body of {}: {}", url, e)))?;

        let content_type = ContentType::detect(Some(Path::new(parsed.path())), header.as_deref());
        debug!("Fetched {} bytes ({:?}) from {}", body.len(), content_type, url);

        Ok(FetchedDocument {
            url: url.to_string(),
            body,
            content_type,
        })
    }
}
