//! ragchain: retrieval-augmented answering over a single chunked document
//!
//! A source (URL or file) is converted to plain text, split into
//! overlapping whitespace-token windows, embedded, and kept in an in-memory
//! [`store::VectorStore`] that can be saved as a JSON snapshot. Questions are
//! answered by embedding the query, picking the single most similar chunk,
//! and streaming a model answer grounded in that chunk.

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod fetch;
pub mod generate;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod similarity;
pub mod store;
