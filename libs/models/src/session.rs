use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-agent rolling state. `initial_vector` is write-once;
/// `cumulative_drift >= 0`; `call_count >= action_history.len()`
/// (equal unless pruned); `last_seen_at >= created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSession {
    pub agent_id: String,
    pub action_history: Vec<ActionHistoryEntry>,
    pub call_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub initial_vector: Option<[f32; crate::vector::VECTOR_DIM]>,
    pub cumulative_drift: f64,
    pub last_vector: Option<[f32; crate::vector::VECTOR_DIM]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionHistoryEntry {
    pub request_id: String,
    pub action: String,
    pub decision: String,
    pub ts: DateTime<Utc>,
}

/// Idle timeout for session expiry: 30 minutes.
pub const SESSION_IDLE_TIMEOUT_SECS: i64 = 30 * 60;
/// Absolute age ceiling for session expiry: 24 hours.
pub const SESSION_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Paginated projection of an `AgentSession` for telemetry reads,
/// matching the richer of the two original duplicate session summary
/// shapes (the one carrying layer/timing/decision detail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub agent_id: String,
    pub call_count: i64,
    pub cumulative_drift: f64,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub last_decision: Option<String>,
}
