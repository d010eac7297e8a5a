use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::vector::{SLOT_DIM, SLOT_ORDER};

/// Maximum anchors kept per layer; rows beyond `counts[layer]` are
/// zero-padding.
pub const MAX_ANCHORS: usize = 16;

/// The policy-side tensor: four layers of up to 16 unit-norm 32-value
/// anchors each, plus the real (non-padding) anchor count per layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleVector {
    pub layers: HashMap<String, [[f32; SLOT_DIM]; MAX_ANCHORS]>,
    pub counts: HashMap<String, usize>,
}

impl RuleVector {
    pub fn empty() -> Self {
        let mut layers = HashMap::new();
        let mut counts = HashMap::new();
        for slot in SLOT_ORDER {
            layers.insert(slot.to_string(), [[0f32; SLOT_DIM]; MAX_ANCHORS]);
            counts.insert(slot.to_string(), 0);
        }
        Self { layers, counts }
    }

    /// Max cosine similarity between `query` and the real anchors of
    /// `layer`. Returns 0.0 if the layer has no anchors (padding rows
    /// are all-zero and contribute nothing) — the only case where 0.0
    /// is a meaningful answer rather than a clamp, since a layer with
    /// anchors may legitimately have every one negatively correlated
    /// with `query`.
    pub fn max_cosine(&self, layer: &str, query: &[f32]) -> f32 {
        let anchors = match self.layers.get(layer) {
            Some(a) => a,
            None => return 0.0,
        };
        let count = self.counts.get(layer).copied().unwrap_or(0).min(MAX_ANCHORS);
        if count == 0 {
            return 0.0;
        }
        anchors
            .iter()
            .take(count)
            .map(|anchor| dot32(anchor, query))
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

fn dot32(a: &[f32; SLOT_DIM], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// On-disk/wire projection of a `RuleVector` (the `AnchorPayload`
/// entity): same shape, flattened for storage in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorPayload {
    pub tenant_id: String,
    pub policy_id: String,
    pub action_anchors: Vec<[f32; SLOT_DIM]>,
    pub action_count: usize,
    pub resource_anchors: Vec<[f32; SLOT_DIM]>,
    pub resource_count: usize,
    pub data_anchors: Vec<[f32; SLOT_DIM]>,
    pub data_count: usize,
    pub risk_anchors: Vec<[f32; SLOT_DIM]>,
    pub risk_count: usize,
    /// Must always equal the policy row's `updated_at` for the payload
    /// and row to be considered in sync.
    pub synced_at: chrono::DateTime<chrono::Utc>,
}

impl AnchorPayload {
    pub fn from_rule_vector(
        tenant_id: &str,
        policy_id: &str,
        rv: &RuleVector,
        synced_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let layer_vec = |name: &str| rv.layers.get(name).map(|l| l.to_vec()).unwrap_or_default();
        let count = |name: &str| rv.counts.get(name).copied().unwrap_or(0);
        Self {
            tenant_id: tenant_id.to_string(),
            policy_id: policy_id.to_string(),
            action_anchors: layer_vec("action"),
            action_count: count("action"),
            resource_anchors: layer_vec("resource"),
            resource_count: count("resource"),
            data_anchors: layer_vec("data"),
            data_count: count("data"),
            risk_anchors: layer_vec("risk"),
            risk_count: count("risk"),
            synced_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rule_vector_has_zero_counts() {
        let rv = RuleVector::empty();
        for slot in SLOT_ORDER {
            assert_eq!(rv.counts[slot], 0);
            assert_eq!(rv.max_cosine(slot, &[1.0; SLOT_DIM]), 0.0);
        }
    }
}
