//! Per-tenant vector-index storage for policy anchors.
//!
//! This is deliberately not a similarity-search surface: the anchor
//! comparison itself (`RuleVector::max_cosine`) runs in-process against
//! anchors already loaded into memory. The index exists purely to
//! persist and retrieve `AnchorPayload` rows out-of-band from the
//! relational store, one collection per tenant, the way the prior
//! embedded-vector-store client did.

use llm_governance_models::anchor::MAX_ANCHORS;
use llm_governance_models::{AnchorPayload, SLOT_DIM, SLOT_ORDER};
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use uuid::Uuid;

/// Four layers, each padded to MAX_ANCHORS anchors of SLOT_DIM values:
/// the flat width of the vector every point is stored under.
const ANCHOR_VECTOR_DIM: u64 = (SLOT_ORDER.len() * MAX_ANCHORS * SLOT_DIM) as u64;

#[derive(Debug, thiserror::Error)]
pub enum VectorIndexError {
    #[error("vector index request failed: {0}")]
    Client(#[from] qdrant_client::QdrantError),
}

impl From<VectorIndexError> for llm_governance_common::AppError {
    fn from(e: VectorIndexError) -> Self {
        llm_governance_common::AppError::Internal(format!("vector index: {e}"))
    }
}

pub struct VectorIndex {
    client: Qdrant,
}

impl VectorIndex {
    pub fn connect(url: &str) -> Result<Self, VectorIndexError> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self { client })
    }

    fn collection_name(tenant_id: &str) -> String {
        format!("policy_anchors_{tenant_id}")
    }

    /// Point ids must be a u64 or UUID in qdrant; derive a stable UUID
    /// from `policy_id` so repeated upserts address the same point.
    fn point_id(policy_id: &str) -> PointId {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, policy_id.as_bytes()).to_string().into()
    }

    async fn ensure_collection(&self, tenant_id: &str) -> Result<(), VectorIndexError> {
        let name = Self::collection_name(tenant_id);
        let exists = self.client.collection_exists(&name).await?;
        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&name)
                        .vectors_config(VectorParamsBuilder::new(ANCHOR_VECTOR_DIM, Distance::Cosine)),
                )
                .await?;
        }
        Ok(())
    }

    pub async fn upsert(&self, payload: &AnchorPayload) -> Result<(), VectorIndexError> {
        self.ensure_collection(&payload.tenant_id).await?;

        let vector = flatten_anchors(payload);
        let payload_json = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
        let payload_map = qdrant_client::Payload::try_from(payload_json).unwrap_or_default();

        let point = PointStruct::new(Self::point_id(&payload.policy_id), vector, payload_map);

        self.client
            .upsert_points(UpsertPointsBuilder::new(Self::collection_name(&payload.tenant_id), vec![point]))
            .await?;

        Ok(())
    }

    pub async fn delete(&self, tenant_id: &str, policy_id: &str) -> Result<(), VectorIndexError> {
        let exists = self.client.collection_exists(Self::collection_name(tenant_id)).await?;
        if !exists {
            return Ok(());
        }

        self.client
            .delete_points(qdrant_client::qdrant::DeletePointsBuilder::new(Self::collection_name(tenant_id)).points(
                qdrant_client::qdrant::PointsIdsList {
                    ids: vec![Self::point_id(policy_id)],
                },
            ))
            .await?;

        Ok(())
    }

    /// Drop the whole per-tenant collection, used when every policy for
    /// a tenant is removed at once.
    pub async fn clear_tenant(&self, tenant_id: &str) -> Result<(), VectorIndexError> {
        let name = Self::collection_name(tenant_id);
        if self.client.collection_exists(&name).await? {
            self.client.delete_collection(name).await?;
        }
        Ok(())
    }
}

fn flatten_anchors(payload: &AnchorPayload) -> Vec<f32> {
    let mut out = Vec::with_capacity(ANCHOR_VECTOR_DIM as usize);
    for anchors in [&payload.action_anchors, &payload.resource_anchors, &payload.data_anchors, &payload.risk_anchors] {
        for i in 0..MAX_ANCHORS {
            match anchors.get(i) {
                Some(values) => out.extend_from_slice(values),
                None => out.extend(std::iter::repeat(0f32).take(SLOT_DIM)),
            }
        }
    }
    out
}
