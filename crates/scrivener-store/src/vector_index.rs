//! HNSW vector index for fragment retrieval
//!
//! Thin wrapper around `hnsw_rs` that maps internal HNSW ids back to
//! [`FragmentId`]s and reports cosine similarity instead of distance.
//!
//! # HNSW Parameters
//!
//! - **M**: Number of bi-directional links per node (default: 16)
//!   Higher M = better accuracy but more memory
//! - **efConstruction**: Size of dynamic candidate list during construction (default: 200)
//!   Higher efConstruction = better index quality but slower build
//! - **efSearch**: Size of dynamic candidate list during search, passed per query
//!   Higher efSearch = better recall but slower queries

use hnsw_rs::prelude::*;
use scrivener_domain::FragmentId;
use std::collections::HashMap;
use thiserror::Error;

const DEFAULT_M: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 200;
const MAX_LAYERS: usize = 16;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorIndexError {
    /// Invalid embedding dimension
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },
}

/// A wrapper around HNSW for vector similarity search
///
/// Stores `(fragment_id, embedding)` pairs. The index is append-only; a
/// changed corpus means building a new one.
///
/// # Examples
///
/// ```no_run
/// use scrivener_store::vector_index::VectorIndex;
/// use scrivener_domain::FragmentId;
///
/// let mut index = VectorIndex::new(384, 100);
/// let id = FragmentId::new();
/// let embedding = vec![0.1; 384];
/// index.add(id, &embedding).unwrap();
///
/// let results = index.search(&embedding, 5, 64).unwrap();
/// ```
pub struct VectorIndex {
    dimension: usize,
    hnsw: Hnsw<'static, f32, DistCosine>,
    id_map: HashMap<usize, FragmentId>,
    next_id: usize,
}

impl VectorIndex {
    /// Create a new vector index
    ///
    /// # Parameters
    ///
    /// - `dimension`: Embedding vector dimension
    /// - `capacity`: Expected number of vectors, used to size the graph
    pub fn new(dimension: usize, capacity: usize) -> Self {
        let max_elements = capacity.max(1);
        let nb_layer = MAX_LAYERS.min(((max_elements as f32).ln().trunc() as usize).max(1));

        let hnsw = Hnsw::<'static, f32, DistCosine>::new(
            DEFAULT_M,
            max_elements,
            nb_layer,
            DEFAULT_EF_CONSTRUCTION,
            DistCosine {},
        );

        Self {
            dimension,
            hnsw,
            id_map: HashMap::new(),
            next_id: 0,
        }
    }

    /// Add a fragment embedding to the index
    pub fn add(&mut self, fragment_id: FragmentId, embedding: &[f32]) -> Result<(), VectorIndexError> {
        if embedding.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let internal_id = self.next_id;
        self.next_id += 1;
        self.id_map.insert(internal_id, fragment_id);

        let embedding_vec = embedding.to_vec();
        self.hnsw.insert((&embedding_vec, internal_id));

        Ok(())
    }

    /// Search for the k nearest neighbors to the given embedding
    ///
    /// Returns `(FragmentId, similarity)` pairs sorted by similarity, highest
    /// first.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<(FragmentId, f32)>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let results = self.hnsw.search(query, k, ef_search.max(k));

        // HNSW reports cosine distance; similarity is 1 - distance
        let mut mapped: Vec<(FragmentId, f32)> = results
            .into_iter()
            .filter_map(|neighbour| {
                self.id_map
                    .get(&neighbour.d_id)
                    .map(|&id| (id, 1.0 - neighbour.distance))
            })
            .collect();
        mapped.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(mapped)
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.id_map.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
