use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A versioned policy record. `(tenant_id, id)` is unique;
/// `scope.tenant_id == tenant_id`; `updated_at >= created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBoundary {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub status: String,
    #[serde(rename = "type")]
    pub policy_type: String,
    pub schema_version: String,
    pub layer: Option<String>,
    pub scope: PolicyScope,
    pub rules: serde_json::Value,
    pub constraints: ConstraintGroups,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyScope {
    pub tenant_id: String,
}

/// The four constraint groups mirroring the four intent slots. Each
/// group carries 0..N canonical tokens, already produced by the
/// external canonicalizer and capped at K=16 by the policy encoder.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConstraintGroups {
    #[serde(default)]
    pub action: Vec<String>,
    #[serde(default)]
    pub resource: Vec<String>,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub risk: Vec<String>,
}

impl ConstraintGroups {
    pub fn layer(&self, name: &str) -> &[String] {
        match name {
            "action" => &self.action,
            "resource" => &self.resource,
            "data" => &self.data,
            "risk" => &self.risk,
            _ => &[],
        }
    }
}

/// Row shape of the `policies_v2` relational table.
#[derive(Debug, Clone, FromRow)]
pub struct PolicyRow {
    pub tenant_id: String,
    pub policy_id: String,
    pub name: String,
    pub status: String,
    pub policy_type: String,
    pub schema_version: String,
    pub layer: Option<String>,
    pub scope_json: String,
    pub rules_json: String,
    pub constraints_json: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PolicyRow {
    pub fn into_boundary(self) -> Result<PolicyBoundary, serde_json::Error> {
        Ok(PolicyBoundary {
            id: self.policy_id,
            tenant_id: self.tenant_id,
            name: self.name,
            status: self.status,
            policy_type: self.policy_type,
            schema_version: self.schema_version,
            layer: self.layer,
            scope: serde_json::from_str(&self.scope_json)?,
            rules: serde_json::from_str(&self.rules_json)?,
            constraints: serde_json::from_str(&self.constraints_json)?,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    pub fn from_boundary(b: &PolicyBoundary) -> Result<Self, serde_json::Error> {
        Ok(Self {
            tenant_id: b.tenant_id.clone(),
            policy_id: b.id.clone(),
            name: b.name.clone(),
            status: b.status.clone(),
            policy_type: b.policy_type.clone(),
            schema_version: b.schema_version.clone(),
            layer: b.layer.clone(),
            scope_json: serde_json::to_string(&b.scope)?,
            rules_json: serde_json::to_string(&b.rules)?,
            constraints_json: serde_json::to_string(&b.constraints)?,
            notes: b.notes.clone(),
            created_at: b.created_at,
            updated_at: b.updated_at,
        })
    }
}
