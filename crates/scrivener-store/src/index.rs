//! Fragment index: build, retrieve, persist and load
//!
//! The index owns the fragments cut from the loaded documents, their
//! embeddings, and an HNSW graph over those embeddings. It is built once per
//! corpus (or restored from a snapshot) and read-only afterwards.

use crate::chunking::{ChunkStrategy, TextChunker};
use crate::snapshot::{self, SnapshotHeader, SNAPSHOT_FORMAT_VERSION};
use crate::vector_index::VectorIndex;
use crate::StoreError;
use scrivener_domain::traits::EmbeddingModel;
use scrivener_domain::{DocumentRecord, Fragment, FragmentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Indexes up to this size are ranked by exact scan instead of HNSW
const EXACT_SCAN_LIMIT: usize = 2_048;

/// Whether a run builds a fresh index or restores the persisted one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Build from the documents and persist the snapshot
    #[default]
    Build,
    /// Load the snapshot written by an earlier build
    Load,
}

/// Configuration for index construction and storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Build or load
    #[serde(default)]
    pub mode: IndexMode,

    /// Directory holding the persisted snapshot
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// How documents are split into fragments
    #[serde(default)]
    pub chunk_strategy: ChunkStrategy,

    /// Maximum fragment size (characters)
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// HNSW search breadth for large indexes
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./storage")
}

fn default_max_chunk_size() -> usize {
    1_024
}

fn default_ef_search() -> usize {
    64
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            mode: IndexMode::default(),
            storage_dir: default_storage_dir(),
            chunk_strategy: ChunkStrategy::default(),
            max_chunk_size: default_max_chunk_size(),
            ef_search: default_ef_search(),
        }
    }
}

impl IndexConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_size == 0 {
            return Err("max_chunk_size must be greater than 0".to_string());
        }
        if self.ef_search == 0 {
            return Err("ef_search must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// A fragment returned by retrieval with its cosine similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredFragment {
    /// The retrieved fragment
    pub fragment: Fragment,
    /// Cosine similarity to the query, higher is closer
    pub score: f32,
}

/// Retrievable index over document fragments
pub struct DocumentIndex {
    fragments: Vec<Fragment>,
    embeddings: Vec<Vec<f32>>,
    positions: HashMap<FragmentId, usize>,
    vectors: VectorIndex,
    embedding_model: String,
    dimension: usize,
    ef_search: usize,
}

impl DocumentIndex {
    /// Build an index from scratch
    ///
    /// Every document is chunked, each fragment with any alphanumeric content
    /// is embedded, and the vectors are inserted in document order.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no document yields an indexable fragment
    /// - [`StoreError::Embedding`] if the embedding model fails
    pub fn build<E>(
        documents: &[DocumentRecord],
        embedder: &E,
        config: &IndexConfig,
    ) -> Result<Self, StoreError>
    where
        E: EmbeddingModel + ?Sized,
        E::Error: Display,
    {
        let mut entries = Vec::new();
        for fragment in Self::split_documents(documents, config) {
            let embedding = embedder
                .embed(&fragment.text)
                .map_err(|e| StoreError::Embedding(e.to_string()))?;
            entries.push((fragment, embedding));
        }

        let index = Self::from_embedded(entries, embedder.model_name(), embedder.dimension(), config)?;
        info!(
            "Built index with {} fragments from {} documents using {}",
            index.len(),
            documents.len(),
            index.embedding_model
        );
        Ok(index)
    }

    /// Cut documents into the fragments an index is built from
    ///
    /// Fragments without alphanumeric content are dropped; ordinals keep
    /// their position in the source document.
    pub fn split_documents(documents: &[DocumentRecord], config: &IndexConfig) -> Vec<Fragment> {
        let chunker = TextChunker::new(config.chunk_strategy, config.max_chunk_size);

        let mut fragments = Vec::new();
        for document in documents {
            let chunks = chunker.chunk(&document.raw_text);
            debug!(
                "Split {} into {} fragments",
                document.source_path.display(),
                chunks.len()
            );

            for (ordinal, text) in chunks.into_iter().enumerate() {
                if !text.chars().any(char::is_alphanumeric) {
                    continue;
                }
                fragments.push(Fragment {
                    id: FragmentId::new(),
                    document_id: document.id,
                    ordinal,
                    text,
                    source_path: document.source_path.clone(),
                });
            }
        }
        fragments
    }

    /// Assemble an index from fragments embedded by the caller
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if `entries` is empty
    /// - [`StoreError::VectorIndex`] if an embedding has the wrong dimension
    pub fn from_embedded(
        entries: Vec<(Fragment, Vec<f32>)>,
        embedding_model: &str,
        dimension: usize,
        config: &IndexConfig,
    ) -> Result<Self, StoreError> {
        if entries.is_empty() {
            return Err(StoreError::NotFound(
                "documents contain no indexable text".to_string(),
            ));
        }
        Self::from_entries(entries, embedding_model.to_string(), dimension, config.ef_search)
    }

    fn from_entries(
        entries: Vec<(Fragment, Vec<f32>)>,
        embedding_model: String,
        dimension: usize,
        ef_search: usize,
    ) -> Result<Self, StoreError> {
        let mut vectors = VectorIndex::new(dimension, entries.len());
        let mut fragments = Vec::with_capacity(entries.len());
        let mut embeddings = Vec::with_capacity(entries.len());
        let mut positions = HashMap::with_capacity(entries.len());

        for (position, (fragment, embedding)) in entries.into_iter().enumerate() {
            vectors.add(fragment.id, &embedding)?;
            positions.insert(fragment.id, position);
            fragments.push(fragment);
            embeddings.push(embedding);
        }

        Ok(Self {
            fragments,
            embeddings,
            positions,
            vectors,
            embedding_model,
            dimension,
            ef_search,
        })
    }

    /// Retrieve the `k` fragments most similar to `query_embedding`
    ///
    /// Results are ordered by descending similarity; equal scores keep
    /// insertion order, so the ranking is reproducible across a persist/load
    /// round trip.
    pub fn retrieve(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredFragment>, StoreError> {
        if query_embedding.len() != self.dimension {
            return Err(crate::vector_index::VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query_embedding.len(),
            }
            .into());
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates: Vec<usize> = if self.len() <= EXACT_SCAN_LIMIT {
            (0..self.len()).collect()
        } else {
            self.vectors
                .search(query_embedding, k, self.ef_search)?
                .into_iter()
                .filter_map(|(id, _)| self.positions.get(&id).copied())
                .collect()
        };

        let mut scored: Vec<(usize, f32)> = candidates
            .into_iter()
            .map(|pos| {
                let score = crate::embedding::cosine_similarity(query_embedding, &self.embeddings[pos]);
                (pos, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| ScoredFragment {
                fragment: self.fragments[pos].clone(),
                score,
            })
            .collect())
    }

    /// Persist the index into `dir`, replacing any previous snapshot
    pub fn persist(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        let header = SnapshotHeader {
            format_version: SNAPSHOT_FORMAT_VERSION,
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension,
        };
        let entries: Vec<(Fragment, Vec<f32>)> = self
            .fragments
            .iter()
            .cloned()
            .zip(self.embeddings.iter().cloned())
            .collect();

        let path = snapshot::write_snapshot(dir, &header, &entries)?;
        info!("Persisted index ({} fragments) to {}", self.len(), path.display());
        Ok(path)
    }

    /// Load the snapshot in `dir`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptIndex`] if the snapshot is missing,
    /// unreadable, written by another format version, or produced by an
    /// embedding model other than `embedder`.
    pub fn load<E>(dir: &Path, embedder: &E, config: &IndexConfig) -> Result<Self, StoreError>
    where
        E: EmbeddingModel + ?Sized,
    {
        let (header, entries) = snapshot::read_snapshot(dir)?;

        if header.embedding_model != embedder.model_name() || header.dimension != embedder.dimension() {
            return Err(StoreError::CorruptIndex(format!(
                "snapshot was built with {} ({} dims) but the active embedding model is {} ({} dims)",
                header.embedding_model,
                header.dimension,
                embedder.model_name(),
                embedder.dimension()
            )));
        }
        if entries.is_empty() {
            return Err(StoreError::CorruptIndex("snapshot holds no fragments".to_string()));
        }

        let index = Self::from_entries(entries, header.embedding_model, header.dimension, config.ef_search)?;
        info!("Loaded index with {} fragments from {}", index.len(), dir.display());
        Ok(index)
    }

    /// Fragments in insertion order
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Embedding model the index was built with
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of fragments
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the index holds no fragments
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
