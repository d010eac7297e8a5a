use serde::{Deserialize, Serialize};

/// Append-only audit of every enforcement. Inserting the same
/// `call_id` twice is idempotent (upsert semantics; the later write's
/// payload wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforceCall {
    pub call_id: String,
    pub agent_id: String,
    pub ts_ms: i64,
    pub decision: String,
    pub op: Option<String>,
    pub t: Option<String>,
    pub enforcement_result: serde_json::Value,
    pub intent_event: serde_json::Value,
    pub is_dry_run: bool,
}

/// Paginated projection for `GET /telemetry/calls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSummary {
    pub call_id: String,
    pub agent_id: String,
    pub ts_ms: i64,
    pub decision: String,
    pub op: Option<String>,
    pub t: Option<String>,
    pub is_dry_run: bool,
}

impl From<&EnforceCall> for CallSummary {
    fn from(c: &EnforceCall) -> Self {
        Self {
            call_id: c.call_id.clone(),
            agent_id: c.agent_id.clone(),
            ts_ms: c.ts_ms,
            decision: c.decision.clone(),
            op: c.op.clone(),
            t: c.t.clone(),
            is_dry_run: c.is_dry_run,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallDetail {
    pub call: CallSummary,
    pub enforcement_result: serde_json::Value,
    pub intent_event: serde_json::Value,
}
