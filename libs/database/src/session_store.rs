//! Session/drift store (C5): durable per-agent baseline, rolling
//! history, and cumulative drift.
//!
//! Every method here returns a real `sqlx::Result` — this crate does
//! not decide fail-soft policy. `spec.md` assigns that to "the
//! boundary of the orchestrator": callers that are on the enforcement
//! hot path swallow errors and substitute the documented no-op value;
//! callers serving operator reads (telemetry) propagate errors as-is
//! so an outage is visible instead of silently looking like an empty
//! page.

use chrono::{DateTime, Utc};
use llm_governance_models::{ActionHistoryEntry, AgentSession, IntentVector, SESSION_IDLE_TIMEOUT_SECS, SESSION_MAX_AGE_SECS};
use sqlx::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    agent_id: String,
    action_history: String,
    call_count: i64,
    created_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    initial_vector: Option<Vec<u8>>,
    cumulative_drift: f64,
    last_vector: Option<Vec<u8>>,
}

impl SessionRow {
    fn into_session(self) -> Result<AgentSession, serde_json::Error> {
        Ok(AgentSession {
            agent_id: self.agent_id,
            action_history: serde_json::from_str(&self.action_history)?,
            call_count: self.call_count,
            created_at: self.created_at,
            last_seen_at: self.last_seen_at,
            initial_vector: self.initial_vector.and_then(|b| IntentVector::from_le_bytes(&b)).map(|v| v.0),
            cumulative_drift: self.cumulative_drift,
            last_vector: self.last_vector.and_then(|b| IntentVector::from_le_bytes(&b)).map(|v| v.0),
        })
    }
}

#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert the session row, appending one entry to `action_history`.
    /// Sets `created_at`/`call_count=1` on first call; increments
    /// `call_count`/`last_seen_at` thereafter. Never touches
    /// `initial_vector` or `cumulative_drift`.
    ///
    /// Runs under `BEGIN IMMEDIATE`: the read of the current history
    /// and the row establishment below happen on one write-locked
    /// connection, so concurrent first-callers for the same brand-new
    /// `agent_id` serialize instead of racing a `SELECT -> None`
    /// snapshot into two competing `INSERT`s. The row establishment
    /// itself is a single `ON CONFLICT` upsert rather than an
    /// `INSERT`-or-`UPDATE` branch, so `call_count` always advances by
    /// exactly one per call even if two writers interleave here.
    pub async fn write_call(&self, agent_id: &str, request_id: &str, action: &str, decision: &str) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let outcome = async {
            let existing: Option<(String,)> =
                sqlx::query_as("SELECT action_history FROM agent_sessions WHERE agent_id = ?")
                    .bind(agent_id)
                    .fetch_optional(&mut *conn)
                    .await?;

            let entry = ActionHistoryEntry {
                request_id: request_id.to_string(),
                action: action.to_string(),
                decision: decision.to_string(),
                ts: now,
            };

            let mut history: Vec<ActionHistoryEntry> = existing
                .as_ref()
                .map(|(h,)| serde_json::from_str(h).unwrap_or_default())
                .unwrap_or_default();
            history.push(entry);
            let history_json = serde_json::to_string(&history).unwrap_or_else(|_| "[]".to_string());

            sqlx::query(
                "INSERT INTO agent_sessions (agent_id, action_history, call_count, created_at, last_seen_at, cumulative_drift) \
                 VALUES (?, ?, 1, ?, ?, 0) \
                 ON CONFLICT(agent_id) DO UPDATE SET \
                   action_history = excluded.action_history, \
                   call_count = agent_sessions.call_count + 1, \
                   last_seen_at = excluded.last_seen_at",
            )
            .bind(agent_id)
            .bind(history_json)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await?;

            Ok::<(), sqlx::Error>(())
        }
        .await;

        match outcome {
            Ok(()) => sqlx::query("COMMIT").execute(&mut *conn).await.map(|_| ()),
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    /// Set `initial_vector` only if it is currently null. A single
    /// conditional UPDATE makes this race-safe under concurrent
    /// first-callers: exactly one writer's row-affecting UPDATE
    /// succeeds in flipping the value from NULL, every later attempt
    /// is a silent no-op.
    pub async fn initialize_session_vector(&self, agent_id: &str, vector: &IntentVector) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE agent_sessions SET initial_vector = ? WHERE agent_id = ? AND initial_vector IS NULL")
            .bind(vector.to_le_bytes())
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Read `initial_vector`; if null, return 0.0 without mutation.
    /// Otherwise compute `drift = max(0, 1 - dot(initial, current))`,
    /// atomically accumulate it, update `last_vector`/`last_seen_at`,
    /// and return the per-call drift (not the running total).
    pub async fn compute_and_update_drift(&self, agent_id: &str, current: &IntentVector) -> Result<f64, sqlx::Error> {
        let row: Option<(Option<Vec<u8>>,)> = sqlx::query_as("SELECT initial_vector FROM agent_sessions WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;

        let initial_bytes = match row.and_then(|(v,)| v) {
            Some(bytes) => bytes,
            None => return Ok(0.0),
        };

        let initial = match IntentVector::from_le_bytes(&initial_bytes) {
            Some(v) => v,
            None => return Ok(0.0),
        };

        let drift = IntentVector::drift(&initial, current);
        let now = Utc::now();

        sqlx::query(
            "UPDATE agent_sessions SET cumulative_drift = cumulative_drift + ?, last_vector = ?, last_seen_at = ? WHERE agent_id = ?",
        )
        .bind(drift)
        .bind(current.to_le_bytes())
        .bind(now)
        .bind(agent_id)
        .execute(&self.pool)
        .await?;

        Ok(drift)
    }

    /// Rewrite the last history entry matching `request_id` in place.
    /// Never appends. No-op if `request_id` is absent.
    pub async fn update_call_decision(&self, agent_id: &str, request_id: &str, decision: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String,)> = sqlx::query_as("SELECT action_history FROM agent_sessions WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some((history_json,)) = row else {
            return Ok(());
        };

        let mut history: Vec<ActionHistoryEntry> = serde_json::from_str(&history_json).unwrap_or_default();
        let found = history
            .iter_mut()
            .rev()
            .find(|entry| entry.request_id == request_id);

        let Some(entry) = found else {
            return Ok(());
        };
        entry.decision = decision.to_string();

        let history_json = serde_json::to_string(&history).unwrap_or(history_json);
        sqlx::query("UPDATE agent_sessions SET action_history = ? WHERE agent_id = ?")
            .bind(history_json)
            .bind(agent_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }

    pub async fn get_session(&self, agent_id: &str) -> Result<Option<AgentSession>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as("SELECT * FROM agent_sessions WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(r.into_session().map_err(|e| sqlx::Error::Decode(Box::new(e)))?)),
            None => Ok(None),
        }
    }

    pub async fn list_sessions(&self, limit: i64, offset: i64) -> Result<Vec<AgentSession>, sqlx::Error> {
        let cap = limit.min(200);
        let rows: Vec<SessionRow> = sqlx::query_as("SELECT * FROM agent_sessions ORDER BY last_seen_at DESC LIMIT ? OFFSET ?")
            .bind(cap)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| r.into_session().map_err(|e| sqlx::Error::Decode(Box::new(e))))
            .collect()
    }

    /// Idempotent upsert by `call_id`: later writes win.
    pub async fn insert_call(
        &self,
        call_id: &str,
        agent_id: &str,
        ts_ms: i64,
        decision: &str,
        op: Option<&str>,
        t: Option<&str>,
        enforcement_result: &serde_json::Value,
        intent_event: &serde_json::Value,
        is_dry_run: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO enforce_calls (call_id, agent_id, ts_ms, decision, op, t, enforcement_result, intent_event, is_dry_run)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(call_id) DO UPDATE SET
                agent_id = excluded.agent_id,
                ts_ms = excluded.ts_ms,
                decision = excluded.decision,
                op = excluded.op,
                t = excluded.t,
                enforcement_result = excluded.enforcement_result,
                intent_event = excluded.intent_event,
                is_dry_run = excluded.is_dry_run
            "#,
        )
        .bind(call_id)
        .bind(agent_id)
        .bind(ts_ms)
        .bind(decision)
        .bind(op)
        .bind(t)
        .bind(serde_json::to_string(enforcement_result).unwrap_or_default())
        .bind(serde_json::to_string(intent_event).unwrap_or_default())
        .bind(is_dry_run)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_call(&self, call_id: &str) -> Result<Option<CallRow>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM enforce_calls WHERE call_id = ?")
            .bind(call_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_calls(&self, agent_id: Option<&str>, limit: i64, offset: i64) -> Result<Vec<CallRow>, sqlx::Error> {
        let cap = limit.min(200);
        match agent_id {
            Some(agent) => {
                sqlx::query_as("SELECT * FROM enforce_calls WHERE agent_id = ? ORDER BY ts_ms DESC LIMIT ? OFFSET ?")
                    .bind(agent)
                    .bind(cap)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query_as("SELECT * FROM enforce_calls ORDER BY ts_ms DESC LIMIT ? OFFSET ?")
                    .bind(cap)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
        }
    }

    pub async fn delete_calls(&self, agent_id: Option<&str>) -> Result<u64, sqlx::Error> {
        let result = match agent_id {
            Some(agent) => {
                sqlx::query("DELETE FROM enforce_calls WHERE agent_id = ?")
                    .bind(agent)
                    .execute(&self.pool)
                    .await?
            }
            None => sqlx::query("DELETE FROM enforce_calls").execute(&self.pool).await?,
        };
        Ok(result.rows_affected())
    }

    /// Delete sessions stale by idle timeout (30 min) or absolute max
    /// age (24 h). Returns the number of rows deleted.
    pub async fn cleanup_expired(&self) -> Result<u64, sqlx::Error> {
        let now = Utc::now();
        let idle_cutoff = now - chrono::Duration::seconds(SESSION_IDLE_TIMEOUT_SECS);
        let age_cutoff = now - chrono::Duration::seconds(SESSION_MAX_AGE_SECS);

        let result = sqlx::query("DELETE FROM agent_sessions WHERE last_seen_at < ? OR created_at < ?")
            .bind(idle_cutoff)
            .bind(age_cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CallRow {
    pub call_id: String,
    pub agent_id: String,
    pub ts_ms: i64,
    pub decision: String,
    pub op: Option<String>,
    pub t: Option<String>,
    pub enforcement_result: String,
    pub intent_event: String,
    pub is_dry_run: bool,
}

impl CallRow {
    pub fn enforcement_result_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.enforcement_result).unwrap_or(serde_json::Value::Null)
    }

    pub fn intent_event_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.intent_event).unwrap_or(serde_json::Value::Null)
    }
}

impl From<CallRow> for llm_governance_models::EnforceCall {
    fn from(row: CallRow) -> Self {
        Self {
            enforcement_result: row.enforcement_result_json(),
            intent_event: row.intent_event_json(),
            call_id: row.call_id,
            agent_id: row.agent_id,
            ts_ms: row.ts_ms,
            decision: row.decision,
            op: row.op,
            t: row.t,
            is_dry_run: row.is_dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_governance_models::IntentVector;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn first_call_establishes_session_with_zero_history_gap() {
        let store = SessionStore::new(test_pool().await);
        store.write_call("agent-1", "req-1", "read", "pending").await.unwrap();
        let session = store.get_session("agent-1").await.unwrap().unwrap();
        assert_eq!(session.call_count, 1);
        assert_eq!(session.action_history.len(), 1);
        assert!(session.initial_vector.is_none());
    }

    #[tokio::test]
    async fn initialize_session_vector_is_write_once() {
        let store = SessionStore::new(test_pool().await);
        store.write_call("agent-1", "req-1", "read", "pending").await.unwrap();

        let v1 = IntentVector::from_slots([1.0; 32], [0.0; 32], [0.0; 32], [0.0; 32]);
        let v2 = IntentVector::from_slots([0.0; 32], [1.0; 32], [0.0; 32], [0.0; 32]);

        store.initialize_session_vector("agent-1", &v1).await.unwrap();
        store.initialize_session_vector("agent-1", &v2).await.unwrap();

        let session = store.get_session("agent-1").await.unwrap().unwrap();
        assert_eq!(session.initial_vector.unwrap(), v1.0);
    }

    #[tokio::test]
    async fn drift_is_zero_before_baseline_is_set() {
        let store = SessionStore::new(test_pool().await);
        store.write_call("agent-1", "req-1", "read", "pending").await.unwrap();
        let v = IntentVector::from_slots([1.0; 32], [0.0; 32], [0.0; 32], [0.0; 32]);
        let drift = store.compute_and_update_drift("agent-1", &v).await.unwrap();
        assert_eq!(drift, 0.0);
    }

    #[tokio::test]
    async fn drift_formula_matches_one_minus_dot() {
        let store = SessionStore::new(test_pool().await);
        store.write_call("agent-1", "req-1", "read", "pending").await.unwrap();

        let baseline = IntentVector::from_slots([1.0; 32], [0.0; 32], [0.0; 32], [0.0; 32]);
        store.initialize_session_vector("agent-1", &baseline).await.unwrap();

        let other = IntentVector::from_slots([0.0; 32], [1.0; 32], [0.0; 32], [0.0; 32]);
        let drift = store.compute_and_update_drift("agent-1", &other).await.unwrap();
        assert!((drift - 1.0).abs() < 1e-6);

        let session = store.get_session("agent-1").await.unwrap().unwrap();
        assert!((session.cumulative_drift - drift).abs() < 1e-6);
    }

    #[tokio::test]
    async fn update_call_decision_rewrites_last_matching_entry_only() {
        let store = SessionStore::new(test_pool().await);
        store.write_call("agent-1", "req-1", "read", "pending").await.unwrap();
        store.write_call("agent-1", "req-2", "delete", "pending").await.unwrap();

        store.update_call_decision("agent-1", "req-1", "ALLOW").await.unwrap();

        let session = store.get_session("agent-1").await.unwrap().unwrap();
        assert_eq!(session.action_history[0].decision, "ALLOW");
        assert_eq!(session.action_history[1].decision, "pending");
        assert_eq!(session.action_history.len(), 2);
    }

    #[tokio::test]
    async fn update_call_decision_is_noop_for_unknown_request() {
        let store = SessionStore::new(test_pool().await);
        store.write_call("agent-1", "req-1", "read", "pending").await.unwrap();
        store.update_call_decision("agent-1", "nonexistent", "ALLOW").await.unwrap();
        let session = store.get_session("agent-1").await.unwrap().unwrap();
        assert_eq!(session.action_history[0].decision, "pending");
    }

    #[tokio::test]
    async fn insert_call_is_idempotent_upsert() {
        let store = SessionStore::new(test_pool().await);
        store
            .insert_call("call-1", "agent-1", 1000, "ALLOW", Some("tool_call"), Some("read"), &serde_json::json!({"a": 1}), &serde_json::json!({}), false)
            .await
            .unwrap();
        store
            .insert_call("call-1", "agent-1", 1000, "DENY", Some("tool_call"), Some("read"), &serde_json::json!({"a": 2}), &serde_json::json!({}), false)
            .await
            .unwrap();

        let calls = store.list_calls(Some("agent-1"), 10, 0).await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].decision, "DENY");
    }

    /// S6: N concurrent first calls for the same brand-new `agent_id`
    /// must not lose any history entry or under-count `call_count`.
    /// Needs real file-backed concurrency (distinct pooled
    /// connections), not the single-connection `sqlite::memory:` pool
    /// the other tests share.
    #[tokio::test]
    async fn concurrent_first_calls_for_same_agent_do_not_lose_entries() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("concurrent.db");
        let pool = crate::pool::create_pool(&format!("sqlite://{}", db_path.display())).await.unwrap();
        let store = SessionStore::new(pool);

        const N: usize = 64;
        let mut tasks = Vec::with_capacity(N);
        for i in 0..N {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.write_call("agent-concurrent", &format!("req-{i}"), "read", "pending").await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let session = store.get_session("agent-concurrent").await.unwrap().unwrap();
        assert_eq!(session.call_count, N as i64);
        assert_eq!(session.action_history.len(), N);
    }

    #[tokio::test]
    async fn cleanup_expired_removes_stale_and_old_sessions() {
        let store = SessionStore::new(test_pool().await);
        store.write_call("agent-1", "req-1", "read", "pending").await.unwrap();

        let stale_cutoff = Utc::now() - chrono::Duration::seconds(SESSION_IDLE_TIMEOUT_SECS + 60);
        sqlx::query("UPDATE agent_sessions SET last_seen_at = ?, created_at = ? WHERE agent_id = 'agent-1'")
            .bind(stale_cutoff)
            .bind(stale_cutoff)
            .execute(&store.pool)
            .await
            .unwrap();

        let deleted = store.cleanup_expired().await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_session("agent-1").await.unwrap().is_none());
    }
}
