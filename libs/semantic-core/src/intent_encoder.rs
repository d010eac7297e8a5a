//! Intent encoder (C3): canonical IntentEvent -> 128-dim IntentVector.
//!
//! Slot-text construction is part of the wire protocol — two
//! implementations that build different slot strings for the same
//! canonical intent would silently diverge on drift and policy
//! matching, so the format here must stay byte-for-byte identical to
//! the contract in the component design.

use llm_governance_models::{IntentEvent, IntentVector};

use crate::embedding::{EmbeddingModel, EncodeError};
use crate::encoder::{SemanticEncoder, Slot};

const UNKNOWN: &str = "unknown";

fn or_unknown(s: &str) -> &str {
    if s.is_empty() {
        UNKNOWN
    } else {
        s
    }
}

pub struct IntentEncoder<M: EmbeddingModel> {
    encoder: SemanticEncoder<M>,
}

impl<M: EmbeddingModel> IntentEncoder<M> {
    pub fn new(model: M) -> Self {
        Self {
            encoder: SemanticEncoder::new(model),
        }
    }

    pub fn encode(&self, event: &IntentEvent) -> Result<IntentVector, EncodeError> {
        let action_text = action_slot_text(event);
        let resource_text = resource_slot_text(event);
        let data_text = data_slot_text(event);
        let risk_text = risk_slot_text(event);

        let action = self.encoder.encode_slot(&action_text, Slot::Action)?;
        let resource = self.encoder.encode_slot(&resource_text, Slot::Resource)?;
        let data = self.encoder.encode_slot(&data_text, Slot::Data)?;
        let risk = self.encoder.encode_slot(&risk_text, Slot::Risk)?;

        Ok(IntentVector::from_slots(action, resource, data, risk))
    }
}

fn action_slot_text(event: &IntentEvent) -> String {
    let mut text = format!(
        "action is {} | actor_type is {}",
        or_unknown(&event.action.verb),
        or_unknown(&event.action.actor_type)
    );
    if let Some(tool_name) = &event.action.tool_name {
        text.push_str(&format!(" | tool_name is {}", or_unknown(tool_name)));
    }
    text
}

fn resource_slot_text(event: &IntentEvent) -> String {
    let mut text = format!(
        "resource_type is {} | resource_location is {}",
        or_unknown(&event.resource.resource_type),
        or_unknown(&event.resource.location)
    );
    if let Some(name) = &event.resource.name {
        text.push_str(&format!(" | name is {}", or_unknown(name)));
    }
    text
}

fn data_slot_text(event: &IntentEvent) -> String {
    let sens_joined = if event.data.sensitivity.is_empty() {
        UNKNOWN.to_string()
    } else {
        event.data.sensitivity.join(",")
    };
    format!(
        "sensitivity is {} | pii is {} | volume is {}",
        sens_joined,
        event.data.pii,
        or_unknown(&event.data.volume)
    )
}

fn risk_slot_text(event: &IntentEvent) -> String {
    format!(
        "authn is {} | authz is {}",
        or_unknown(&event.risk.authn),
        or_unknown(&event.risk.authz)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use llm_governance_models::{ActionSlot, DataSlot, Identity, ResourceSlot, RiskSlot};
    use uuid::Uuid;

    fn sample_event() -> IntentEvent {
        IntentEvent {
            id: Uuid::new_v4(),
            tenant_id: "tenant-a".into(),
            timestamp: 1_700_000_000,
            op: "tool_call".into(),
            t: "db.read".into(),
            identity: Identity { agent_id: "agent-1".into() },
            action: ActionSlot {
                verb: "read".into(),
                actor_type: "agent".into(),
                tool_name: None,
            },
            resource: ResourceSlot {
                resource_type: "database".into(),
                location: "prod-us-east".into(),
                name: None,
            },
            data: DataSlot {
                sensitivity: vec!["internal".into()],
                pii: false,
                volume: "single".into(),
            },
            risk: RiskSlot {
                authn: "required".into(),
                authz: "scoped".into(),
            },
        }
    }

    #[test]
    fn slot_text_uses_unknown_for_missing_fields() {
        let mut event = sample_event();
        event.action.verb = String::new();
        assert!(action_slot_text(&event).starts_with("action is unknown"));
    }

    #[test]
    fn encode_produces_128_values_with_unit_slots() {
        let encoder = IntentEncoder::new(HashEmbedder);
        let v = encoder.encode(&sample_event()).unwrap();
        assert_eq!(v.0.len(), 128);
        for slot_idx in 0..4 {
            let norm: f32 = v.slot(slot_idx).iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6, "slot {slot_idx} norm {norm}");
        }
    }

    #[test]
    fn identical_intents_encode_byte_identical() {
        let encoder = IntentEncoder::new(HashEmbedder);
        let event = sample_event();
        let a = encoder.encode(&event).unwrap();
        let b = encoder.encode(&event).unwrap();
        assert_eq!(a, b);
    }
}
