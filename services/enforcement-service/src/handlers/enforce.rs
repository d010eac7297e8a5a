//! Enforcement orchestrator (C7): the per-request pipeline that
//! encodes an intent, maintains the caller's baseline/drift, invokes
//! the remote decision service, and persists the outcome.

use actix_web::{post, web, HttpResponse, Responder};
use chrono::Utc;
use llm_governance_common::{AppError, Result};
use llm_governance_models::{ActionSlot, DataSlot, EnforcementResponse, Identity, IntentEvent, RequestContext, ResourceSlot, RiskSlot};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct EnforceRequestBody {
    /// The unit-of-enforcement id, stable across a replay of the same
    /// call — distinct from the orchestrator-minted `request_id` below.
    /// `enforce_calls` upserts by this id, so callers that retry a
    /// dropped response must resend the same value to dedupe.
    pub id: Uuid,
    #[validate(length(min = 1))]
    pub op: String,
    #[validate(length(min = 1))]
    pub t: String,
    #[serde(default)]
    pub identity: Identity,
    pub action: ActionSlot,
    pub resource: ResourceSlot,
    pub data: DataSlot,
    pub risk: RiskSlot,
    #[serde(default)]
    pub dry_run: bool,
}

#[post("/tenants/{tenant_id}/enforce")]
pub async fn enforce(state: web::Data<AppState>, path: web::Path<String>, req: web::Json<EnforceRequestBody>) -> Result<impl Responder> {
    req.validate().map_err(|e| AppError::Validation(format!("{e}")))?;

    let tenant_id = path.into_inner();

    // 1. Fresh request id for this call's correlation/history key.
    let ctx = RequestContext::new(req.dry_run);
    let request_id = ctx.request_id.to_string();

    // 2. agent_id may legitimately be empty; that's a valid caller,
    // just one with no session/drift tracking.
    let agent_id = req.identity.agent_id.clone();

    let event = IntentEvent {
        id: req.id,
        tenant_id: tenant_id.clone(),
        timestamp: Utc::now().timestamp(),
        op: req.op.clone(),
        t: req.t.clone(),
        identity: req.identity.clone(),
        action: req.action.clone(),
        resource: req.resource.clone(),
        data: req.data.clone(),
        risk: req.risk.clone(),
    };

    // 3. Encode intent -> 128-dim vector. A real encoder failure
    // reaches the caller as ENCODER_UNAVAILABLE.
    let current_vector = state.intent_encoder.encode(&event)?;

    let has_agent = !agent_id.is_empty();

    // 4. Establish the session row before baseline/drift touch it.
    if has_agent {
        fail_soft(
            state.session_store.write_call(&agent_id, &request_id, &event.op, "pending").await,
            "write_call",
            &agent_id,
        );
    }

    // 5. First non-empty call for an agent sets its own baseline.
    if has_agent {
        fail_soft(
            state.session_store.initialize_session_vector(&agent_id, &current_vector).await,
            "initialize_session_vector",
            &agent_id,
        );
    }

    // 6. Drift against the (possibly just-set) baseline; zero for
    // agents with no identity to track.
    let drift = if has_agent {
        state
            .session_store
            .compute_and_update_drift(&agent_id, &current_vector)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(agent_id = %agent_id, error = %e, op = "compute_and_update_drift", "session store operation failed, returning default");
                0.0
            })
    } else {
        0.0
    };

    // 7. Remote decision. Transport failures surface as BAD_GATEWAY.
    let outcome = state
        .decision_client
        .enforce(&event, &current_vector, &request_id, drift, &agent_id, req.dry_run)
        .await?;

    // 8. Prefer the remote's named decision; both paths are already
    // resolved inside the client.
    let decision_name = outcome.decision.to_string();

    // 9. Rewrite the pending history entry with the final decision.
    if has_agent {
        fail_soft(
            state.session_store.update_call_decision(&agent_id, &request_id, &decision_name).await,
            "update_call_decision",
            &agent_id,
        );
    }

    // 10. Append to the durable call log regardless of session state.
    let enforcement_result = serde_json::json!({
        "decision": decision_name,
        "modified_params": outcome.modified_params,
        "drift_score": drift,
        "drift_triggered": outcome.drift_triggered,
        "slice_similarities": outcome.slice_similarities,
        "evidence": outcome.evidence,
    });
    let intent_event_json = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);

    fail_soft(
        state
            .session_store
            .insert_call(
                &event.id.to_string(),
                &agent_id,
                Utc::now().timestamp_millis(),
                &decision_name,
                Some(&event.op),
                Some(&event.t),
                &enforcement_result,
                &intent_event_json,
                req.dry_run,
            )
            .await,
        "insert_call",
        &agent_id,
    );

    // 11. Return the response.
    let response = EnforcementResponse {
        decision: outcome.decision,
        modified_params: outcome.modified_params,
        drift_score: drift,
        drift_triggered: outcome.drift_triggered,
        slice_similarities: outcome.slice_similarities,
        evidence: outcome.evidence,
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Session/call-store operations never propagate errors past this
/// boundary: log with structured context and move on.
fn fail_soft<T>(result: std::result::Result<T, sqlx::Error>, op: &str, agent_id: &str) {
    if let Err(e) = result {
        tracing::error!(agent_id = %agent_id, op, error = %e, "session store operation failed, swallowing per fail-soft policy");
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(enforce);
}
