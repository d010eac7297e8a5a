use serde::{Deserialize, Serialize};

/// Output shape of the external canonicalization classifier:
/// `(field, raw) -> (canonical, confidence, source)`. The classifier
/// itself is an out-of-scope collaborator; this is just its contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalField {
    pub canonical: String,
    pub confidence: f32,
    pub source: CanonicalizationSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalizationSource {
    BertHigh,
    BertMedium,
    Passthrough,
    Error,
}

/// One append-only record of a canonicalization decision, mirroring the
/// JSONL audit trail the original system kept alongside enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalizationLogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub request_id: String,
    pub field: String,
    pub raw_input: String,
    pub prediction: CanonicalField,
    pub enforcement_outcome: Option<String>,
}
