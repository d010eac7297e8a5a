//! Policy encoder (C4): canonical PolicyBoundary -> RuleVector.
//!
//! Policies enumerate explicit acceptable values per layer; each token
//! is encoded independently against that layer's slot name, so
//! matching at decision time reduces to max-cosine against same-slot
//! anchors.

use llm_governance_models::{RuleVector, MAX_ANCHORS, PolicyBoundary, SLOT_DIM, SLOT_ORDER};

use crate::embedding::{EmbeddingModel, EncodeError};
use crate::encoder::{SemanticEncoder, Slot};

fn slot_for(name: &str) -> Slot {
    match name {
        "action" => Slot::Action,
        "resource" => Slot::Resource,
        "data" => Slot::Data,
        "risk" => Slot::Risk,
        other => panic!("unknown semantic slot: {other}"),
    }
}

pub struct PolicyEncoder<M: EmbeddingModel> {
    encoder: SemanticEncoder<M>,
}

impl<M: EmbeddingModel> PolicyEncoder<M> {
    pub fn new(model: M) -> Self {
        Self {
            encoder: SemanticEncoder::new(model),
        }
    }

    pub fn encode(&self, boundary: &PolicyBoundary) -> Result<RuleVector, EncodeError> {
        let mut rv = RuleVector::empty();

        for &layer_name in SLOT_ORDER.iter() {
            let tokens = boundary.constraints.layer(layer_name);
            let capped = &tokens[..tokens.len().min(MAX_ANCHORS)];

            let mut anchors = [[0f32; SLOT_DIM]; MAX_ANCHORS];
            for (i, token) in capped.iter().enumerate() {
                anchors[i] = self.encoder.encode_slot(token, slot_for(layer_name))?;
            }

            rv.layers.insert(layer_name.to_string(), anchors);
            rv.counts.insert(layer_name.to_string(), capped.len());
        }

        Ok(rv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use chrono::Utc;
    use llm_governance_models::{ConstraintGroups, PolicyScope};

    fn sample_boundary() -> PolicyBoundary {
        let now = Utc::now();
        PolicyBoundary {
            id: "pol-1".into(),
            tenant_id: "tenant-a".into(),
            name: "default".into(),
            status: "active".into(),
            policy_type: "allowlist".into(),
            schema_version: "v2".into(),
            layer: Some("L4".into()),
            scope: PolicyScope { tenant_id: "tenant-a".into() },
            rules: serde_json::json!({}),
            constraints: ConstraintGroups {
                action: vec!["read".into(), "list".into()],
                resource: vec!["database".into()],
                data: vec![],
                risk: vec!["required".into()],
            },
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn counts_match_token_lists_and_cap_at_sixteen() {
        let encoder = PolicyEncoder::new(HashEmbedder);
        let rv = encoder.encode(&sample_boundary()).unwrap();
        assert_eq!(rv.counts["action"], 2);
        assert_eq!(rv.counts["resource"], 1);
        assert_eq!(rv.counts["data"], 0);
        assert_eq!(rv.counts["risk"], 1);
    }

    #[test]
    fn anchors_beyond_count_are_zero_padding() {
        let encoder = PolicyEncoder::new(HashEmbedder);
        let rv = encoder.encode(&sample_boundary()).unwrap();
        let data_layer = &rv.layers["data"];
        assert!(data_layer.iter().all(|row| row.iter().all(|v| *v == 0.0)));
    }

    #[test]
    fn real_anchors_are_unit_norm() {
        let encoder = PolicyEncoder::new(HashEmbedder);
        let rv = encoder.encode(&sample_boundary()).unwrap();
        for row in rv.layers["action"].iter().take(rv.counts["action"]) {
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn more_than_sixteen_tokens_are_capped() {
        let mut boundary = sample_boundary();
        boundary.constraints.action = (0..20).map(|i| format!("token-{i}")).collect();
        let encoder = PolicyEncoder::new(HashEmbedder);
        let rv = encoder.encode(&boundary).unwrap();
        assert_eq!(rv.counts["action"], MAX_ANCHORS);
    }
}
