//! Scrivener Storage Layer
//!
//! Everything that touches the filesystem or the similarity index.
//!
//! # Architecture
//!
//! - [`loader`]: reads OCR documents from a directory
//! - [`chunking`]: splits documents into fragments
//! - [`embedding`]: local deterministic embedding model
//! - [`vector_index`]: HNSW nearest-neighbour search
//! - [`index`]: the fragment index that ties these together
//! - [`snapshot`]: SQLite persistence for built indexes
//!
//! # Examples
//!
//! ```no_run
//! use scrivener_store::{DocumentIndex, DocumentLoader, HashingEmbeddingModel, IndexConfig};
//! use std::path::Path;
//!
//! let documents = DocumentLoader::default().load(Path::new("data/ocr-sample")).unwrap();
//! let embedder = HashingEmbeddingModel::default();
//! let index = DocumentIndex::build(&documents, &embedder, &IndexConfig::default()).unwrap();
//! index.persist(Path::new("./storage")).unwrap();
//! ```

#![warn(missing_docs)]

pub mod chunking;
pub mod embedding;
pub mod index;
pub mod loader;
pub mod snapshot;
pub mod vector_index;

use thiserror::Error;

pub use chunking::{ChunkStrategy, TextChunker};
pub use embedding::{EmbeddingError, HashingEmbeddingModel, DEFAULT_HASHING_DIMENSION};
pub use index::{DocumentIndex, IndexConfig, IndexMode, ScoredFragment};
pub use loader::{DocumentLoader, LoaderConfig};
pub use vector_index::VectorIndexError;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error while writing a snapshot
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or empty input
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted snapshot is unreadable or incompatible
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// Embedding model failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index failure
    #[error("Vector index error: {0}")]
    VectorIndex(#[from] VectorIndexError),
}
