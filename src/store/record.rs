//! On-disk record format for store snapshots

use super::Chunk;
use serde::{Deserialize, Serialize};

/// One entry of the flat snapshot list.
///
/// `id` and `metadata` are optional on read so snapshots written without
/// them still load; they are always written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct ChunkRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<usize>,
    pub chunk: String,
    pub vector: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl ChunkRecord {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            id: Some(chunk.id),
            chunk: chunk.text.clone(),
            vector: chunk.vector.clone(),
            metadata: Some(chunk.metadata.clone()),
        }
    }

    /// Fill in missing fields: id falls back to list position, metadata to
    /// the chunk text
    pub fn into_chunk(self, position: usize) -> Chunk {
        let metadata = self.metadata.unwrap_or_else(|| self.chunk.clone());
        Chunk {
            id: self.id.unwrap_or(position),
            text: self.chunk,
            metadata,
            vector: self.vector,
        }
    }
}
