use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::Utc;
use llm_governance_common::{AppError, ApiResponse, Result};
use llm_governance_models::{AnchorPayload, ConstraintGroups, PolicyBoundary, PolicyScope};
use llm_governance_semantic::Canonicalizer;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RawConstraints {
    #[serde(default)]
    pub action: Vec<String>,
    #[serde(default)]
    pub resource: Vec<String>,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub risk: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePolicyRequest {
    #[validate(length(min = 1, max = 255))]
    pub id: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(rename = "type")]
    pub policy_type: String,
    pub schema_version: String,
    pub layer: Option<String>,
    #[serde(default)]
    pub rules: serde_json::Value,
    pub constraints: RawConstraints,
    pub notes: Option<String>,
}

fn default_status() -> String {
    "active".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePolicyRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub status: String,
    #[serde(rename = "type")]
    pub policy_type: String,
    pub schema_version: String,
    pub layer: Option<String>,
    #[serde(default)]
    pub rules: serde_json::Value,
    pub constraints: RawConstraints,
    pub notes: Option<String>,
}

/// Canonicalize each raw constraint token against the external
/// classifier boundary and log every prediction.
fn canonicalize_constraints(request_id: Uuid, canonicalizer: &dyn Canonicalizer, raw: &RawConstraints) -> ConstraintGroups {
    let canonicalize_layer = |layer: &str, tokens: &[String]| -> Vec<String> {
        tokens
            .iter()
            .map(|token| {
                let prediction = canonicalizer.canonicalize(layer, token);
                llm_governance_semantic::canonicalizer::log_prediction(request_id, layer, token, &prediction, None);
                prediction.canonical
            })
            .collect()
    };

    ConstraintGroups {
        action: canonicalize_layer("action", &raw.action),
        resource: canonicalize_layer("resource", &raw.resource),
        data: canonicalize_layer("data", &raw.data),
        risk: canonicalize_layer("risk", &raw.risk),
    }
}

/// Policy listing has no pagination parameters in this API; it caps
/// at the same ceiling the original endpoint enforced.
const MAX_POLICIES_PER_LIST: usize = 100;

#[get("/tenants/{tenant_id}/policies")]
pub async fn list_policies(state: web::Data<AppState>, path: web::Path<String>) -> Result<impl Responder> {
    let tenant_id = path.into_inner();
    let mut policies = state.policy_store.list(&tenant_id).await.map_err(store_err)?;
    policies.truncate(MAX_POLICIES_PER_LIST);
    Ok(HttpResponse::Ok().json(ApiResponse::success(policies)))
}

#[get("/tenants/{tenant_id}/policies/{policy_id}")]
pub async fn get_policy(state: web::Data<AppState>, path: web::Path<(String, String)>) -> Result<impl Responder> {
    let (tenant_id, policy_id) = path.into_inner();
    let policy = state
        .policy_store
        .get(&tenant_id, &policy_id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| AppError::NotFound(format!("policy {policy_id} not found")))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(policy)))
}

#[post("/tenants/{tenant_id}/policies")]
pub async fn create_policy(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<CreatePolicyRequest>,
) -> Result<impl Responder> {
    req.validate().map_err(|e| AppError::Validation(format!("{e}")))?;

    let tenant_id = path.into_inner();
    let request_id = Uuid::new_v4();
    let now = Utc::now();

    let constraints = canonicalize_constraints(request_id, state.canonicalizer.as_ref(), &req.constraints);

    let boundary = PolicyBoundary {
        id: req.id.clone(),
        tenant_id: tenant_id.clone(),
        name: req.name.clone(),
        status: req.status.clone(),
        policy_type: req.policy_type.clone(),
        schema_version: req.schema_version.clone(),
        layer: req.layer.clone(),
        scope: PolicyScope { tenant_id: tenant_id.clone() },
        rules: req.rules.clone(),
        constraints,
        notes: req.notes.clone(),
        created_at: now,
        updated_at: now,
    };

    // 1. Insert the relational row first; a duplicate id fails fast.
    state.policy_store.create(&boundary).await.map_err(|e| match e {
        llm_governance_database::PolicyStoreError::AlreadyExists => AppError::Conflict(format!("policy {} already exists", boundary.id)),
        other => store_err(other),
    })?;

    // 2. Encode (C4) and upsert the anchor payload; compensate the
    // relational insert on any failure in this half.
    let encode_and_upsert = async {
        let rule_vector = state.policy_encoder.encode(&boundary)?;
        let payload = AnchorPayload::from_rule_vector(&tenant_id, &boundary.id, &rule_vector, now);
        state.vector_index.upsert(&payload).await?;
        Ok::<(), AppError>(())
    };

    if let Err(e) = run_encode_and_upsert(encode_and_upsert).await {
        tracing::error!(tenant_id = %tenant_id, policy_id = %boundary.id, error = %e, "anchor payload upsert failed, compensating create");
        let _ = state.policy_store.delete(&tenant_id, &boundary.id).await;
        return Err(e);
    }

    Ok(HttpResponse::Created().json(ApiResponse::success(boundary)))
}

#[put("/tenants/{tenant_id}/policies/{policy_id}")]
pub async fn update_policy(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    req: web::Json<UpdatePolicyRequest>,
) -> Result<impl Responder> {
    req.validate().map_err(|e| AppError::Validation(format!("{e}")))?;

    let (tenant_id, policy_id) = path.into_inner();
    let request_id = Uuid::new_v4();
    let now = Utc::now();

    let existing = state
        .policy_store
        .get(&tenant_id, &policy_id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| AppError::NotFound(format!("policy {policy_id} not found")))?;

    let constraints = canonicalize_constraints(request_id, state.canonicalizer.as_ref(), &req.constraints);

    let boundary = PolicyBoundary {
        id: policy_id.clone(),
        tenant_id: tenant_id.clone(),
        name: req.name.clone(),
        status: req.status.clone(),
        policy_type: req.policy_type.clone(),
        schema_version: req.schema_version.clone(),
        layer: req.layer.clone(),
        scope: PolicyScope { tenant_id: tenant_id.clone() },
        rules: req.rules.clone(),
        constraints,
        notes: req.notes.clone(),
        created_at: existing.created_at,
        updated_at: now,
    };

    state.policy_store.update(&boundary).await.map_err(|e| match e {
        llm_governance_database::PolicyStoreError::NotFound => AppError::NotFound(format!("policy {policy_id} not found")),
        other => store_err(other),
    })?;

    let encode_and_upsert = async {
        let rule_vector = state.policy_encoder.encode(&boundary)?;
        let payload = AnchorPayload::from_rule_vector(&tenant_id, &boundary.id, &rule_vector, now);
        state.vector_index.upsert(&payload).await?;
        Ok::<(), AppError>(())
    };

    // On failure the prior relational row is already overwritten, but
    // we do not roll it back here: the update path retains whatever
    // landed and surfaces the incompleteness rather than compensating,
    // per the write discipline for updates (vs. the compensating
    // delete used on create).
    if let Err(e) = run_encode_and_upsert(encode_and_upsert).await {
        tracing::error!(tenant_id = %tenant_id, policy_id = %policy_id, error = %e, "anchor payload upsert failed after relational update");
        return Err(AppError::Internal(format!("policy row updated but anchor payload sync failed: {e}")));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(boundary)))
}

#[delete("/tenants/{tenant_id}/policies/{policy_id}")]
pub async fn delete_policy(state: web::Data<AppState>, path: web::Path<(String, String)>) -> Result<impl Responder> {
    let (tenant_id, policy_id) = path.into_inner();

    // 1. Confirm the row exists.
    state
        .policy_store
        .get(&tenant_id, &policy_id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| AppError::NotFound(format!("policy {policy_id} not found")))?;

    // 2. Remote authority must agree before any local state changes.
    let removed = state.decision_client.remove_policy(&tenant_id, &policy_id).await?;
    if !removed {
        return Err(AppError::BadGateway(format!("decision service refused to remove policy {policy_id}")));
    }

    // 3. Delete the relational row. If this fails now, remote state is
    // already gone and an operator must reconcile.
    let deleted = state.policy_store.delete(&tenant_id, &policy_id).await.map_err(|e| {
        tracing::error!(tenant_id = %tenant_id, policy_id = %policy_id, error = %e, "operator-action-required: remote policy removed but local row delete failed");
        store_err(e)
    })?;

    if !deleted {
        return Err(AppError::NotFound(format!("policy {policy_id} not found")));
    }

    // 4. Best-effort vector-index cleanup; never surfaced to the caller.
    if let Err(e) = state.vector_index.delete(&tenant_id, &policy_id).await {
        tracing::warn!(tenant_id = %tenant_id, policy_id = %policy_id, error = %e, "failed to delete anchor payload");
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "deleted": policy_id }))))
}

#[delete("/tenants/{tenant_id}/policies")]
pub async fn clear_tenant_policies(state: web::Data<AppState>, path: web::Path<String>) -> Result<impl Responder> {
    let tenant_id = path.into_inner();

    let outcome = state.decision_client.remove_agent_rules(&tenant_id).await?;
    if !outcome.success {
        return Err(AppError::BadGateway(format!("decision service refused to clear rules for tenant {tenant_id}")));
    }

    let deleted = state.policy_store.delete_all(&tenant_id).await.map_err(store_err)?;

    if let Err(e) = state.vector_index.clear_tenant(&tenant_id).await {
        tracing::warn!(tenant_id = %tenant_id, error = %e, "failed to drop vector-index collection");
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "deleted_count": deleted }))))
}

async fn run_encode_and_upsert<F>(fut: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    fut.await
}

fn store_err(e: llm_governance_database::PolicyStoreError) -> AppError {
    match e {
        llm_governance_database::PolicyStoreError::AlreadyExists => AppError::Conflict("policy already exists".to_string()),
        llm_governance_database::PolicyStoreError::NotFound => AppError::NotFound("policy not found".to_string()),
        llm_governance_database::PolicyStoreError::Database(err) => AppError::Database(err),
        llm_governance_database::PolicyStoreError::Serialization(err) => AppError::Internal(format!("policy serialization error: {err}")),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_policies)
        .service(get_policy)
        .service(create_policy)
        .service(update_policy)
        .service(delete_policy)
        .service(clear_tenant_policies);
}
