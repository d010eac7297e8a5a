use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The unit of enforcement: one agent action scored against installed
/// policies. Constructed once per request from the external transport
/// and never mutated after encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentEvent {
    pub id: Uuid,
    pub tenant_id: String,
    /// Unix seconds. Monotonicity within a session is not required.
    pub timestamp: i64,
    pub op: String,
    /// Free-text tool/action label.
    pub t: String,
    pub identity: Identity,
    pub action: ActionSlot,
    pub resource: ResourceSlot,
    pub data: DataSlot,
    pub risk: RiskSlot,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Identity {
    /// Stable per logical agent; may be empty, in which case no
    /// session/drift state is maintained for this call.
    pub agent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSlot {
    pub verb: String,
    pub actor_type: String,
    pub tool_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSlot {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub location: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSlot {
    pub sensitivity: Vec<String>,
    pub pii: bool,
    pub volume: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSlot {
    pub authn: String,
    pub authz: String,
}

/// Convenience constant used for the "field is unknown" placeholder
/// that the intent encoder substitutes for missing fields.
pub const UNKNOWN: &str = "unknown";

/// Request-scoped metadata the orchestrator attaches; not part of the
/// wire-level IntentEvent but threaded through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub dry_run: bool,
}

impl RequestContext {
    pub fn new(dry_run: bool) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            received_at: Utc::now(),
            dry_run,
        }
    }
}
