//! Text chunking into overlapping token windows
//!
//! Text is tokenized on whitespace and cut into windows of `window_size`
//! tokens that advance by `window_size - overlap_size` tokens, so that
//! consecutive chunks share exactly `overlap_size` tokens. Chunks are the
//! window's tokens joined with single spaces; original spacing inside a
//! chunk is not preserved.

use crate::config::ChunkConfig;
use crate::error::{Error, Result};

/// A validated chunker
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    /// Create a chunker, rejecting configurations whose stride is below one
    pub fn new(config: ChunkConfig) -> Result<Self> {
        stride(config.window_size, config.overlap_size)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// Split text into overlapping chunks
    pub fn split(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        windows(&tokens, self.config.window_size, self.stride())
    }

    fn stride(&self) -> usize {
        self.config.window_size - self.config.overlap_size
    }
}

/// Split text into chunks of `window_size` whitespace tokens where
/// consecutive chunks overlap by `overlap_size` tokens.
///
/// Fails with [`Error::InvalidChunkConfig`] when `overlap_size >= window_size`.
/// Empty or all-whitespace text yields no chunks.
pub fn split(text: &str, window_size: usize, overlap_size: usize) -> Result<Vec<String>> {
    let stride = stride(window_size, overlap_size)?;
    let tokens: Vec<&str> = text.split_whitespace().collect();
    Ok(windows(&tokens, window_size, stride))
}

fn stride(window_size: usize, overlap_size: usize) -> Result<usize> {
    match window_size.checked_sub(overlap_size) {
        Some(stride) if stride >= 1 => Ok(stride),
        _ => Err(Error::InvalidChunkConfig {
            window_size,
            overlap_size,
        }),
    }
}

fn windows(tokens: &[&str], window_size: usize, stride: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < tokens.len() {
        let end = (start + window_size).min(tokens.len());
        chunks.push(tokens[start..end].join(" "));

        // The window already covers the tail; another step would only
        // repeat tokens of this chunk.
        if end == tokens.len() {
            break;
        }
        start += stride;
    }

    chunks
}
