//! Flat inner-product vector collection.
//!
//! Stores L2-normalized embeddings in a row-major `f32` matrix alongside the
//! chunks they were computed from; row `i` always corresponds to chunk `i`.
//! Search is exact brute force, which meets the recall requirements without
//! an approximate structure.

use crate::core::Chunk;
use crate::error::{IndexError, Result};
use tracing::warn;

/// An append-only (vectors, chunks) pair.
///
/// # Examples
///
/// ```
/// use code_cognitio::index::VectorCollection;
///
/// let collection = VectorCollection::new(384);
/// assert!(collection.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct VectorCollection {
    dimension: usize,
    /// Row-major matrix of shape `(len, dimension)`.
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl VectorCollection {
    /// Creates an empty collection for embeddings of the given dimension.
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            chunks: Vec::new(),
        }
    }

    /// Rebuilds a collection from persisted parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix shape does not match the chunk count.
    pub fn from_parts(dimension: usize, vectors: Vec<f32>, chunks: Vec<Chunk>) -> Result<Self> {
        if dimension == 0 || vectors.len() != dimension * chunks.len() {
            return Err(IndexError::DimensionMismatch {
                expected: dimension * chunks.len(),
                found: vectors.len(),
            }
            .into());
        }
        Ok(Self {
            dimension,
            vectors,
            chunks,
        })
    }

    /// Returns the embedding dimension.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns the number of rows (= chunks).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true when the collection holds no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Appends one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding has the wrong dimension.
    pub fn add(&mut self, embedding: &[f32], chunk: Chunk) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                found: embedding.len(),
            }
            .into());
        }
        self.vectors.extend_from_slice(embedding);
        self.chunks.push(chunk);
        Ok(())
    }

    /// Returns the chunk at a row index.
    #[must_use]
    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Returns all chunks in insertion order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Returns the raw row-major matrix.
    #[must_use]
    pub fn vectors(&self) -> &[f32] {
        &self.vectors
    }

    /// Returns one row of the matrix.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimension)?;
        self.vectors.get(start..start + self.dimension)
    }

    /// Exact k-nearest-neighbor search by inner product.
    ///
    /// Returns up to `k` `(row, score)` pairs sorted by descending score.
    /// Over unit-norm vectors the inner product equals cosine similarity.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if query.len() != self.dimension {
            warn!(
                expected = self.dimension,
                found = query.len(),
                "query dimension mismatch, returning no results"
            );
            return Vec::new();
        }
        if k == 0 || self.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(i, row)| {
                let dot: f32 = row.iter().zip(query.iter()).map(|(a, b)| a * b).sum();
                (i, dot)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}
