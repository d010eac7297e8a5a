//! Relational persistence for policy boundaries (C6, relational half).
//!
//! Mirrors the create/update/delete discipline of the prior SQLite
//! implementation this was distilled from: create rejects a duplicate
//! `(tenant_id, policy_id)`, update rejects a missing one, and both
//! deletes report the affected row count so the caller can decide
//! whether a remote vector-index delete is still owed.

use llm_governance_models::{PolicyBoundary, PolicyRow};
use sqlx::SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum PolicyStoreError {
    #[error("policy already exists")]
    AlreadyExists,
    #[error("policy not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub struct PolicyStore {
    pool: SqlitePool,
}

impl PolicyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, tenant_id: &str, policy_id: &str) -> Result<Option<PolicyBoundary>, PolicyStoreError> {
        let row: Option<PolicyRow> = sqlx::query_as("SELECT * FROM policies_v2 WHERE tenant_id = ? AND policy_id = ?")
            .bind(tenant_id)
            .bind(policy_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(r.into_boundary()?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, tenant_id: &str) -> Result<Vec<PolicyBoundary>, PolicyStoreError> {
        let rows: Vec<PolicyRow> = sqlx::query_as("SELECT * FROM policies_v2 WHERE tenant_id = ? ORDER BY updated_at DESC")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_boundary().map_err(Into::into)).collect()
    }

    pub async fn create(&self, boundary: &PolicyBoundary) -> Result<(), PolicyStoreError> {
        let existing: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM policies_v2 WHERE tenant_id = ? AND policy_id = ?")
            .bind(&boundary.tenant_id)
            .bind(&boundary.id)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            return Err(PolicyStoreError::AlreadyExists);
        }

        let row = PolicyRow::from_boundary(boundary)?;

        sqlx::query(
            r#"
            INSERT INTO policies_v2 (
                tenant_id, policy_id, name, status, policy_type, schema_version,
                layer, scope_json, rules_json, constraints_json, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.tenant_id)
        .bind(row.policy_id)
        .bind(row.name)
        .bind(row.status)
        .bind(row.policy_type)
        .bind(row.schema_version)
        .bind(row.layer)
        .bind(row.scope_json)
        .bind(row.rules_json)
        .bind(row.constraints_json)
        .bind(row.notes)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update(&self, boundary: &PolicyBoundary) -> Result<(), PolicyStoreError> {
        let row = PolicyRow::from_boundary(boundary)?;

        let result = sqlx::query(
            r#"
            UPDATE policies_v2
            SET name = ?, status = ?, policy_type = ?, schema_version = ?, layer = ?,
                scope_json = ?, rules_json = ?, constraints_json = ?, notes = ?, updated_at = ?
            WHERE tenant_id = ? AND policy_id = ?
            "#,
        )
        .bind(row.name)
        .bind(row.status)
        .bind(row.policy_type)
        .bind(row.schema_version)
        .bind(row.layer)
        .bind(row.scope_json)
        .bind(row.rules_json)
        .bind(row.constraints_json)
        .bind(row.notes)
        .bind(row.updated_at)
        .bind(row.tenant_id)
        .bind(row.policy_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PolicyStoreError::NotFound);
        }

        Ok(())
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete(&self, tenant_id: &str, policy_id: &str) -> Result<bool, PolicyStoreError> {
        let result = sqlx::query("DELETE FROM policies_v2 WHERE tenant_id = ? AND policy_id = ?")
            .bind(tenant_id)
            .bind(policy_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every policy row for `tenant_id`. Returns the number of
    /// rows deleted.
    pub async fn delete_all(&self, tenant_id: &str) -> Result<u64, PolicyStoreError> {
        let result = sqlx::query("DELETE FROM policies_v2 WHERE tenant_id = ?")
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use llm_governance_models::{ConstraintGroups, PolicyScope};

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    fn sample_boundary(tenant_id: &str, id: &str) -> PolicyBoundary {
        let now = Utc::now();
        PolicyBoundary {
            id: id.to_string(),
            tenant_id: tenant_id.to_string(),
            name: "default-boundary".to_string(),
            status: "active".to_string(),
            policy_type: "loose".to_string(),
            schema_version: "1.0".to_string(),
            layer: None,
            scope: PolicyScope { tenant_id: tenant_id.to_string() },
            rules: serde_json::json!({}),
            constraints: ConstraintGroups::default(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = PolicyStore::new(test_pool().await);
        let boundary = sample_boundary("tenant-a", "policy-1");
        store.create(&boundary).await.unwrap();

        let fetched = store.get("tenant-a", "policy-1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "default-boundary");
    }

    #[tokio::test]
    async fn create_rejects_duplicate() {
        let store = PolicyStore::new(test_pool().await);
        let boundary = sample_boundary("tenant-a", "policy-1");
        store.create(&boundary).await.unwrap();

        let err = store.create(&boundary).await.unwrap_err();
        assert!(matches!(err, PolicyStoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn update_rejects_missing() {
        let store = PolicyStore::new(test_pool().await);
        let boundary = sample_boundary("tenant-a", "policy-1");
        let err = store.update(&boundary).await.unwrap_err();
        assert!(matches!(err, PolicyStoreError::NotFound));
    }

    #[tokio::test]
    async fn list_is_scoped_to_tenant() {
        let store = PolicyStore::new(test_pool().await);
        store.create(&sample_boundary("tenant-a", "policy-1")).await.unwrap();
        store.create(&sample_boundary("tenant-b", "policy-2")).await.unwrap();

        let tenant_a = store.list("tenant-a").await.unwrap();
        assert_eq!(tenant_a.len(), 1);
        assert_eq!(tenant_a[0].id, "policy-1");
    }

    #[tokio::test]
    async fn delete_all_removes_every_tenant_row() {
        let store = PolicyStore::new(test_pool().await);
        store.create(&sample_boundary("tenant-a", "policy-1")).await.unwrap();
        store.create(&sample_boundary("tenant-a", "policy-2")).await.unwrap();

        let deleted = store.delete_all("tenant-a").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.list("tenant-a").await.unwrap().is_empty());
    }
}
