//! Embedding cache (C1): wraps the black-box text-embedding function
//! with a bounded LRU cache. The cache never returns stale data on an
//! embed error — a failed lookup is simply not inserted.

use lru::LruCache;
use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use thiserror::Error;

use crate::MODEL_DIM;

#[derive(Debug, Error, Clone)]
pub enum EncodeError {
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),
}

impl From<EncodeError> for llm_governance_common::AppError {
    fn from(e: EncodeError) -> Self {
        llm_governance_common::AppError::EncoderUnavailable(e.to_string())
    }
}

/// The embedding function is consumed as a black box: `text -> fixed-dim
/// float vector`. Production deployments provide a real model here;
/// `HashEmbedder` is the deterministic stand-in used when none is
/// configured, so the rest of the pipeline (cache, projection,
/// normalization, drift) is fully exercisable without a loaded model.
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<[f32; MODEL_DIM], EncodeError>;
}

/// Deterministic fallback embedder: seeds a PRNG from the SHA-256 of
/// the input text and draws a unit-ish float vector from it. Not
/// semantically meaningful, but stable for a given text — which is
/// all the rest of the pipeline requires.
#[derive(Debug, Default)]
pub struct HashEmbedder;

impl EmbeddingModel for HashEmbedder {
    fn embed(&self, text: &str) -> Result<[f32; MODEL_DIM], EncodeError> {
        let digest = Sha256::digest(text.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        let mut rng = ChaCha8Rng::from_seed(seed);
        let mut out = [0f32; MODEL_DIM];
        for v in out.iter_mut() {
            // Map a u32 to roughly [-1, 1).
            let bits = rng.next_u32();
            *v = (bits as f32 / u32::MAX as f32) * 2.0 - 1.0;
        }
        Ok(out)
    }
}

/// Bounded LRU cache over embed(text), capacity 10,000, keyed by exact
/// text. Safe for concurrent readers via a fine-grained mutex.
pub struct EmbeddingCache<M: EmbeddingModel> {
    model: M,
    cache: Mutex<LruCache<String, [f32; MODEL_DIM]>>,
}

const DEFAULT_CAPACITY: usize = 10_000;

impl<M: EmbeddingModel> EmbeddingCache<M> {
    pub fn new(model: M) -> Self {
        Self::with_capacity(model, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(model: M, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            model,
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Embed `text`, serving from cache on hit. On embed failure the
    /// cache is left untouched and the error surfaces to the caller —
    /// callers should map this to `ENCODER_UNAVAILABLE`.
    pub fn embed(&self, text: &str) -> Result<[f32; MODEL_DIM], EncodeError> {
        if let Some(hit) = self.cache.lock().get(text).copied() {
            return Ok(hit);
        }
        let embedding = self.model.embed(text)?;
        self.cache.lock().put(text.to_string(), embedding);
        Ok(embedding)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_is_byte_identical() {
        let embedder = HashEmbedder;
        let a = embedder.embed("read database").unwrap();
        let b = embedder.embed("read database").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cache_hits_avoid_recompute_and_match_direct_embed() {
        let cache = EmbeddingCache::new(HashEmbedder);
        let direct = HashEmbedder.embed("read database").unwrap();
        let first = cache.embed("read database").unwrap();
        let second = cache.embed("read database").unwrap();
        assert_eq!(first, direct);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }
}
