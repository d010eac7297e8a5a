//! Telemetry read API (C9): paginated projections over the session
//! store and pass-through wrappers over the decision service's own
//! query endpoints. No business logic beyond filter composition and
//! JSON shaping; absent-by-id reads are 404, never a fail-soft empty
//! value — that distinction is reserved for store outages.

use actix_web::{delete, get, web, HttpResponse, Responder};
use llm_governance_common::{clamp_limit, AppError};
use llm_governance_models::{CallDetail, CallSummary, EnforceCall, SessionSummary};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CallsQuery {
    pub agent_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[get("/telemetry/sessions")]
pub async fn list_sessions(state: web::Data<AppState>, query: web::Query<PageQuery>) -> Result<impl Responder, AppError> {
    let limit = clamp_limit(query.limit, 50, 200);
    let offset = query.offset.unwrap_or(0);

    let sessions = state
        .session_store
        .list_sessions(limit as i64, offset as i64)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, op = "list_sessions", "session store operation failed, returning empty page");
            Vec::new()
        });

    let summaries: Vec<SessionSummary> = sessions.iter().map(to_summary).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

#[get("/telemetry/sessions/{agent_id}")]
pub async fn get_session(state: web::Data<AppState>, path: web::Path<String>) -> Result<impl Responder, AppError> {
    let agent_id = path.into_inner();

    let session = state
        .session_store
        .get_session(&agent_id)
        .await
        .map_err(|e| AppError::Internal(format!("session store unavailable: {e}")))?
        .ok_or_else(|| AppError::NotFound(format!("agent {agent_id} has no session")))?;

    Ok(HttpResponse::Ok().json(session))
}

#[get("/telemetry/calls")]
pub async fn list_calls(state: web::Data<AppState>, query: web::Query<CallsQuery>) -> Result<impl Responder, AppError> {
    let limit = clamp_limit(query.limit, 50, 200);
    let offset = query.offset.unwrap_or(0);

    let rows = state
        .session_store
        .list_calls(query.agent_id.as_deref(), limit as i64, offset as i64)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, op = "list_calls", "session store operation failed, returning empty page");
            Vec::new()
        });

    let summaries: Vec<CallSummary> = rows.into_iter().map(|r| CallSummary::from(&EnforceCall::from(r))).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

#[get("/telemetry/calls/{call_id}")]
pub async fn get_call(state: web::Data<AppState>, path: web::Path<String>) -> Result<impl Responder, AppError> {
    let call_id = path.into_inner();

    let row = state
        .session_store
        .get_call(&call_id)
        .await
        .map_err(|e| AppError::Internal(format!("session store unavailable: {e}")))?
        .ok_or_else(|| AppError::NotFound(format!("call {call_id} not found")))?;

    let call = EnforceCall::from(row);
    let detail = CallDetail {
        call: CallSummary::from(&call),
        enforcement_result: call.enforcement_result,
        intent_event: call.intent_event,
    };

    Ok(HttpResponse::Ok().json(detail))
}

#[delete("/telemetry/calls")]
pub async fn delete_calls(state: web::Data<AppState>, query: web::Query<CallsQuery>) -> Result<impl Responder, AppError> {
    let deleted = state
        .session_store
        .delete_calls(query.agent_id.as_deref())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, op = "delete_calls", "session store operation failed, reporting zero deletions");
            0
        });

    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted_count": deleted })))
}

/// Pass-through projection of the remote decision service's own
/// session index; not backed by local state at all.
#[get("/telemetry/remote/sessions")]
pub async fn query_remote_sessions(state: web::Data<AppState>, query: web::Query<RemoteSessionsQuery>) -> Result<impl Responder, AppError> {
    let outcome = state
        .decision_client
        .query_sessions(
            query.agent_id.clone(),
            query.tenant_id.clone(),
            query.decision,
            query.layer.clone(),
            query.start_time_ms,
            query.end_time_ms,
            clamp_limit(query.limit, 50, 200),
            query.offset.unwrap_or(0),
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "session_ids": outcome.session_ids,
        "total": outcome.total,
    })))
}

#[get("/telemetry/remote/sessions/{session_id}")]
pub async fn get_remote_session(state: web::Data<AppState>, path: web::Path<String>) -> Result<impl Responder, AppError> {
    let session_id = path.into_inner();

    let detail = state
        .decision_client
        .get_session(&session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("remote session {session_id} not found")))?;

    Ok(HttpResponse::Ok().json(detail))
}

#[derive(Debug, Deserialize)]
pub struct RemoteSessionsQuery {
    pub agent_id: Option<String>,
    pub tenant_id: Option<String>,
    pub decision: Option<i32>,
    pub layer: Option<String>,
    pub start_time_ms: Option<i64>,
    pub end_time_ms: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn to_summary(session: &llm_governance_models::AgentSession) -> SessionSummary {
    SessionSummary {
        agent_id: session.agent_id.clone(),
        call_count: session.call_count,
        cumulative_drift: session.cumulative_drift,
        created_at: session.created_at,
        last_seen_at: session.last_seen_at,
        last_decision: session.action_history.last().map(|e| e.decision.clone()),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_sessions)
        .service(get_session)
        .service(list_calls)
        .service(get_call)
        .service(delete_calls)
        .service(query_remote_sessions)
        .service(get_remote_session);
}
