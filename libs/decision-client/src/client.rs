//! Wraps the generated tonic client: lazy process-wide connection pool,
//! insecure transport for loopback, TLS otherwise, a 5-second default
//! timeout, and translation of wire types into our own models.

use std::collections::HashMap;
use std::time::Duration;

use llm_governance_common::AppError;
use llm_governance_models::{Decision, IntentEvent, IntentVector};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::Request;

use crate::proto::decision_service_client::DecisionServiceClient;
use crate::proto::{
    EnforceRequest, GetSessionRequest, QuerySessionsRequest, RemoveAgentRulesRequest, RemovePolicyRequest,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct EnforceOutcome {
    pub decision: Decision,
    pub modified_params: HashMap<String, serde_json::Value>,
    pub drift_triggered: bool,
    pub slice_similarities: HashMap<String, f32>,
    pub evidence: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct RemoveAgentRulesOutcome {
    pub success: bool,
    pub removed_count: u64,
}

#[derive(Debug, Clone)]
pub struct SessionQueryOutcome {
    pub session_ids: Vec<String>,
    pub total: u64,
}

pub struct DecisionClient {
    inner: DecisionServiceClient<Channel>,
}

impl DecisionClient {
    /// Loopback addresses connect over plaintext; anything else
    /// negotiates TLS. The channel is lazy: no connection attempt
    /// happens until the first RPC.
    pub fn connect_lazy(url: &str) -> Result<Self, AppError> {
        let is_loopback = url.contains("localhost") || url.contains("127.0.0.1");

        let mut endpoint = Endpoint::from_shared(url.to_string())
            .map_err(|e| AppError::Internal(format!("invalid decision-service url: {e}")))?
            .timeout(DEFAULT_TIMEOUT);

        if !is_loopback {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|e| AppError::Internal(format!("tls configuration failed: {e}")))?;
        }

        let channel = endpoint.connect_lazy();
        Ok(Self {
            inner: DecisionServiceClient::new(channel),
        })
    }

    pub async fn enforce(
        &self,
        event: &IntentEvent,
        vector: &IntentVector,
        request_id: &str,
        drift: f64,
        agent_id: &str,
        dry_run: bool,
    ) -> Result<EnforceOutcome, AppError> {
        let intent_event_json = serde_json::to_string(event).unwrap_or_default();

        let request = EnforceRequest {
            request_id: request_id.to_string(),
            tenant_id: event.tenant_id.clone(),
            agent_id: agent_id.to_string(),
            op: event.op.clone(),
            t: event.t.clone(),
            vector: vector.0.to_vec(),
            drift,
            dry_run,
            intent_event_json,
        };

        let reply = self
            .inner
            .clone()
            .enforce(Request::new(request))
            .await
            .map_err(AppError::from)?
            .into_inner();

        let decision = match reply.decision_name {
            Some(name) => name.parse().unwrap_or(Decision::from_code(reply.decision)),
            None => Decision::from_code(reply.decision),
        };

        let modified_params = reply
            .modified_params
            .into_iter()
            .map(|(k, v)| (k.clone(), serde_json::from_str(&v).unwrap_or(serde_json::Value::String(v))))
            .collect();

        let evidence = serde_json::from_str(&reply.evidence_json).unwrap_or(serde_json::Value::Null);

        Ok(EnforceOutcome {
            decision,
            modified_params,
            drift_triggered: reply.drift_triggered,
            slice_similarities: reply.slice_similarities,
            evidence,
        })
    }

    /// Returns the remote `success` flag; `false` means the caller
    /// must abort the delete with BAD_GATEWAY and leave local state
    /// untouched.
    pub async fn remove_policy(&self, tenant_id: &str, policy_id: &str) -> Result<bool, AppError> {
        let reply = self
            .inner
            .clone()
            .remove_policy(Request::new(RemovePolicyRequest {
                tenant_id: tenant_id.to_string(),
                policy_id: policy_id.to_string(),
            }))
            .await
            .map_err(AppError::from)?
            .into_inner();

        Ok(reply.success)
    }

    pub async fn remove_agent_rules(&self, tenant_id: &str) -> Result<RemoveAgentRulesOutcome, AppError> {
        let reply = self
            .inner
            .clone()
            .remove_agent_rules(Request::new(RemoveAgentRulesRequest {
                tenant_id: tenant_id.to_string(),
            }))
            .await
            .map_err(AppError::from)?
            .into_inner();

        Ok(RemoveAgentRulesOutcome {
            success: reply.success,
            removed_count: reply.removed_count,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn query_sessions(
        &self,
        agent_id: Option<String>,
        tenant_id: Option<String>,
        decision: Option<i32>,
        layer: Option<String>,
        start_time_ms: Option<i64>,
        end_time_ms: Option<i64>,
        limit: u32,
        offset: u32,
    ) -> Result<SessionQueryOutcome, AppError> {
        let reply = self
            .inner
            .clone()
            .query_sessions(Request::new(QuerySessionsRequest {
                agent_id,
                tenant_id,
                decision,
                layer,
                start_time_ms,
                end_time_ms,
                limit,
                offset,
            }))
            .await
            .map_err(AppError::from)?
            .into_inner();

        Ok(SessionQueryOutcome {
            session_ids: reply.session_ids,
            total: reply.total,
        })
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<serde_json::Value>, AppError> {
        let reply = self
            .inner
            .clone()
            .get_session(Request::new(GetSessionRequest {
                session_id: session_id.to_string(),
            }))
            .await
            .map_err(AppError::from)?
            .into_inner();

        if reply.session_id.is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&reply.detail_json).unwrap_or(serde_json::Value::Null)))
    }
}
