//! Shared semantic encoder (C2): embed -> project -> L2-normalize.
//!
//! Slot composition is deliberately not this layer's job — the
//! projection seeds correspond to a fixed, documented slot schema, and
//! conflating slot-text construction here would couple the encoder to
//! intent/policy schemas. Callers (C3, C4) build the slot text.

use llm_governance_models::{l2_normalize, SLOT_DIM};

use crate::embedding::{EmbeddingCache, EmbeddingModel, EncodeError};
use crate::projection::{project, projection_matrix_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Action,
    Resource,
    Data,
    Risk,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Slot::Action => "action",
            Slot::Resource => "resource",
            Slot::Data => "data",
            Slot::Risk => "risk",
        }
    }
}

pub struct SemanticEncoder<M: EmbeddingModel> {
    cache: EmbeddingCache<M>,
}

impl<M: EmbeddingModel> SemanticEncoder<M> {
    pub fn new(model: M) -> Self {
        Self {
            cache: EmbeddingCache::new(model),
        }
    }

    /// Encode one slot's text into a 32-dim normalized vector. A zero
    /// embedding norm (degenerate empty text) is returned unchanged.
    pub fn encode_slot(&self, text: &str, slot: Slot) -> Result<[f32; SLOT_DIM], EncodeError> {
        let embedding = self.cache.embed(text)?;
        let matrix = projection_matrix_for(slot.name());
        let mut projected = project(matrix, &embedding);
        l2_normalize(&mut projected);
        Ok(projected)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;

    #[test]
    fn encode_slot_is_unit_norm() {
        let encoder = SemanticEncoder::new(HashEmbedder);
        let v = encoder.encode_slot("action is read | actor_type is agent", Slot::Action).unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_text_yields_zero_vector_or_unit_norm() {
        let encoder = SemanticEncoder::new(HashEmbedder);
        // HashEmbedder never produces an exact-zero embedding, so this
        // exercises the normal unit-norm path; the zero-norm branch is
        // covered directly in llm_governance_models::vector tests.
        let v = encoder.encode_slot("", Slot::Action).unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn determinism_across_independent_encodes() {
        let a = SemanticEncoder::new(HashEmbedder);
        let b = SemanticEncoder::new(HashEmbedder);
        let va = a.encode_slot("resource_type is database", Slot::Resource).unwrap();
        let vb = b.encode_slot("resource_type is database", Slot::Resource).unwrap();
        assert_eq!(va, vb);
    }
}
