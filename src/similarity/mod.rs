//! Cosine similarity and single best-match retrieval
//!
//! Two behaviors here are kept on purpose and covered by tests:
//! - vectors of different lengths are compared as if the shorter one were
//!   zero-padded, instead of being rejected;
//! - [`best_match`] only selects a chunk whose similarity is strictly above
//!   [`SIMILARITY_FLOOR`], so a store whose every chunk scores `<= 0.0`
//!   yields no match at all.

use crate::error::{Error, Result};
use crate::store::{Chunk, VectorStore};
use serde::Serialize;

/// Starting value of the running maximum in [`best_match`]. A candidate
/// must score strictly above it to be selected.
pub const SIMILARITY_FLOOR: f64 = 0.0;

/// A chunk together with its similarity to the query
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoredChunk<'a> {
    pub score: f64,
    #[serde(serialize_with = "serialize_chunk")]
    pub chunk: &'a Chunk,
}

fn serialize_chunk<S>(chunk: &&Chunk, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeStruct;
    let mut state = serializer.serialize_struct("Chunk", 3)?;
    state.serialize_field("id", &chunk.id)?;
    state.serialize_field("chunk", &chunk.text)?;
    state.serialize_field("metadata", &chunk.metadata)?;
    state.end()
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// With mismatched lengths the dot product covers the shared prefix while
/// each magnitude still counts all of that vector's coordinates. Fails with
/// [`Error::ZeroMagnitudeVector`] when either vector has zero magnitude,
/// which includes empty vectors. The result is not clamped.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64> {
    let shared = a.len().min(b.len());

    let dot: f64 = a[..shared]
        .iter()
        .zip(&b[..shared])
        .map(|(x, y)| x * y)
        .sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum();
    let norm_b: f64 = b.iter().map(|y| y * y).sum();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(Error::ZeroMagnitudeVector);
    }

    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Find the chunk most similar to `query`.
///
/// Scans in store order; ties keep the earlier chunk. Returns `None` for an
/// empty store and for a store where no chunk scores above
/// [`SIMILARITY_FLOOR`]. A zero-magnitude vector anywhere aborts the scan.
pub fn best_match<'a>(store: &'a VectorStore, query: &[f64]) -> Result<Option<ScoredChunk<'a>>> {
    let mut best: Option<ScoredChunk<'a>> = None;
    let mut max_similarity = SIMILARITY_FLOOR;

    for chunk in store {
        let similarity = cosine_similarity(&chunk.vector, query)?;
        if similarity > max_similarity {
            max_similarity = similarity;
            best = Some(ScoredChunk {
                score: similarity,
                chunk,
            });
        }
    }

    Ok(best)
}

/// Text of the chunk most similar to `query`, see [`best_match`]
pub fn search<'a>(store: &'a VectorStore, query: &[f64]) -> Result<Option<&'a str>> {
    Ok(best_match(store, query)?.map(|m| m.chunk.text.as_str()))
}
