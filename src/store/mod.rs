//! In-memory vector store
//!
//! This module provides:
//! - An ordered collection of embedded chunks
//! - Snapshot serialization as a flat JSON list
//! - Snapshot file load/save
//!
//! The store is built once during ingestion and only read while answering
//! queries, so searches take `&VectorStore`.

mod record;

use crate::error::{Error, Result};
use record::ChunkRecord;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use tracing::{debug, info};

/// A chunk of source text with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Insertion index within the store, starting at 0
    pub id: usize,
    /// The chunk text
    pub text: String,
    /// Free-form metadata; defaults to the chunk text
    pub metadata: String,
    /// Embedding vector
    pub vector: Vec<f64>,
}

/// Ordered collection of embedded chunks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStore {
    chunks: Vec<Chunk>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk; its id is the number of chunks already stored
    pub fn add(&mut self, text: String, vector: Vec<f64>, metadata: Option<String>) -> &Chunk {
        let id = self.chunks.len();
        let metadata = metadata.unwrap_or_else(|| text.clone());
        self.chunks.push(Chunk {
            id,
            text,
            metadata,
            vector,
        });
        &self.chunks[id]
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterate chunks in store order
    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Look up a chunk by id
    pub fn get(&self, id: usize) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == id)
    }

    /// Dimension of the first vector, if any
    pub fn dimension(&self) -> Option<usize> {
        self.chunks.first().map(|c| c.vector.len())
    }

    /// Serialize as a flat JSON list of `{id, chunk, vector, metadata}`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Rebuild a store from [`VectorStore::serialize`] output
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Serialization(format!("Malformed store snapshot: {}", e)))
    }

    /// Write the snapshot to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.serialize()?)?;
        info!("Saved {} chunks to {:?}", self.len(), path);
        Ok(())
    }

    /// Load a snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading store snapshot from {:?}", path);
        let bytes = std::fs::read(path)?;
        let store = Self::deserialize(&bytes)?;
        info!("Loaded {} chunks from {:?}", store.len(), path);
        Ok(store)
    }
}

impl<'a> IntoIterator for &'a VectorStore {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

impl Serialize for VectorStore {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.chunks.iter().map(ChunkRecord::from_chunk))
    }
}

impl<'de> Deserialize<'de> for VectorStore {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records = Vec::<ChunkRecord>::deserialize(deserializer)?;
        let chunks = records
            .into_iter()
            .enumerate()
            .map(|(position, record)| record.into_chunk(position))
            .collect();
        Ok(Self { chunks })
    }
}
