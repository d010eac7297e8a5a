//! Canonicalization boundary (external collaborator, interface only).
//!
//! The real classifier that maps a raw free-text field to its
//! canonical form is out of scope here; this crate only defines the
//! seam and a deterministic passthrough stand-in, the same pattern
//! used for [`crate::embedding::EmbeddingModel`].

use llm_governance_models::{CanonicalField, CanonicalizationLogEntry, CanonicalizationSource};
use uuid::Uuid;

pub trait Canonicalizer: Send + Sync {
    fn canonicalize(&self, field: &str, raw: &str) -> CanonicalField;
}

/// Stand-in for the real classifier: returns the input unchanged with
/// full confidence. Used where no trained canonicalizer is wired in.
pub struct PassthroughCanonicalizer;

impl Canonicalizer for PassthroughCanonicalizer {
    fn canonicalize(&self, _field: &str, raw: &str) -> CanonicalField {
        CanonicalField {
            canonical: raw.to_string(),
            confidence: 1.0,
            source: CanonicalizationSource::Passthrough,
        }
    }
}

/// Emit one structured log line per canonicalization prediction. The
/// original service wrote these to a rotating JSONL file; here the
/// same fields go through `tracing`, which already gives structured
/// JSON output via the configured subscriber.
pub fn log_prediction(request_id: Uuid, field: &str, raw_input: &str, prediction: &CanonicalField, enforcement_outcome: Option<&str>) {
    let entry = CanonicalizationLogEntry {
        timestamp: chrono::Utc::now(),
        request_id: request_id.to_string(),
        field: field.to_string(),
        raw_input: raw_input.to_string(),
        prediction: prediction.clone(),
        enforcement_outcome: enforcement_outcome.map(str::to_string),
    };

    tracing::info!(
        request_id = %entry.request_id,
        field = %entry.field,
        raw_input = %entry.raw_input,
        canonical = %entry.prediction.canonical,
        confidence = entry.prediction.confidence,
        source = ?entry.prediction.source,
        enforcement_outcome = ?entry.enforcement_outcome,
        "canonicalization prediction"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_returns_input_unchanged_with_full_confidence() {
        let field = PassthroughCanonicalizer.canonicalize("action", "read_file");
        assert_eq!(field.canonical, "read_file");
        assert_eq!(field.confidence, 1.0);
        assert_eq!(field.source, CanonicalizationSource::Passthrough);
    }
}
