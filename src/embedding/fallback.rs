//! Hash-based fallback embedder.
//!
//! Stands in for the semantic model when the `fastembed-embeddings` feature
//! is off: every token is hashed with FNV-1a and scattered into a handful of
//! signed buckets by a small xorshift generator, so texts sharing vocabulary
//! land near each other. Word bigrams add phrase sensitivity and repeated
//! terms are log-damped so a token wall cannot dominate a vector. The output
//! honors the same contract as the real model: fixed dimension, unit L2
//! norm, deterministic for a given input.

use crate::Result;
use crate::embedding::Embedder;

/// FNV-1a offset basis (64-bit).
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
/// FNV-1a prime (64-bit).
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Buckets touched per unigram feature.
const UNIGRAM_TAPS: u32 = 4;
/// Buckets touched per bigram feature.
const BIGRAM_TAPS: u32 = 2;
/// Relative weight of bigram features.
const BIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic lexical embedder.
///
/// Similarity is driven by token and adjacent-pair overlap, not semantics;
/// it exists so index builds, persistence, and search stay exercisable
/// without a model download.
///
/// # Examples
///
/// ```
/// use code_cognitio::embedding::{Embedder, FallbackEmbedder, DEFAULT_DIMENSIONS};
///
/// let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
/// let embedding = embedder.embed("fn main() {}").unwrap();
/// assert_eq!(embedding.len(), DEFAULT_DIMENSIONS);
/// ```
pub struct FallbackEmbedder {
    dimensions: usize,
}

impl FallbackEmbedder {
    /// Creates a fallback embedder producing vectors of the given dimension.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return vector;
        }

        // Unigrams, log-damped so `retry retry retry` is barely stronger
        // than `retry`.
        let mut counts: std::collections::BTreeMap<&str, usize> =
            std::collections::BTreeMap::new();
        for &token in &tokens {
            *counts.entry(token).or_default() += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        for (token, count) in counts {
            let weight = 1.0 + (count as f32).ln();
            self.scatter(token.as_bytes(), UNIGRAM_TAPS, weight, &mut vector);
        }

        // Adjacent pairs capture a little word order.
        for pair in tokens.windows(2) {
            let feature = [pair[0].as_bytes(), b"\x1f", pair[1].as_bytes()].concat();
            self.scatter(&feature, BIGRAM_TAPS, BIGRAM_WEIGHT, &mut vector);
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    /// Adds `taps` signed contributions for one feature, indices and signs
    /// drawn from an xorshift stream seeded by the feature's FNV-1a hash.
    fn scatter(&self, feature: &[u8], taps: u32, weight: f32, vector: &mut [f32]) {
        let mut state = fnv1a(feature);
        if state == 0 {
            state = FNV_OFFSET;
        }
        for _ in 0..taps {
            let drawn = xorshift(&mut state);
            #[allow(clippy::cast_possible_truncation)]
            let index = (drawn as usize) % self.dimensions;
            let sign = if drawn >> 63 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign * weight;
        }
    }
}

/// 64-bit FNV-1a over a byte slice.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// xorshift64 step; the state is never zero.
fn xorshift(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

impl Embedder for FallbackEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn identifier(&self) -> &str {
        "hash-fallback"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate_embedding(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        use rayon::prelude::*;

        Ok(texts
            .par_iter()
            .map(|text| self.generate_embedding(text))
            .collect())
    }
}
