use sqlx::SqlitePool;

/// Create the three tables named in the persisted-state layout if they
/// do not already exist. Idempotent; safe to call on every startup.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS policies_v2 (
            tenant_id        TEXT NOT NULL,
            policy_id        TEXT NOT NULL,
            name             TEXT NOT NULL,
            status           TEXT NOT NULL,
            policy_type      TEXT NOT NULL,
            schema_version   TEXT NOT NULL,
            layer            TEXT,
            scope_json       TEXT NOT NULL,
            rules_json       TEXT NOT NULL,
            constraints_json TEXT NOT NULL,
            notes            TEXT,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL,
            PRIMARY KEY (tenant_id, policy_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_policies_v2_tenant ON policies_v2(tenant_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agent_sessions (
            agent_id        TEXT PRIMARY KEY,
            action_history  TEXT NOT NULL DEFAULT '[]',
            call_count      INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            last_seen_at    TEXT NOT NULL,
            initial_vector  BLOB,
            cumulative_drift REAL NOT NULL DEFAULT 0,
            last_vector     BLOB
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enforce_calls (
            call_id            TEXT PRIMARY KEY,
            agent_id           TEXT NOT NULL,
            ts_ms              INTEGER NOT NULL,
            decision           TEXT NOT NULL,
            op                 TEXT,
            t                  TEXT,
            enforcement_result TEXT NOT NULL,
            intent_event       TEXT NOT NULL,
            is_dry_run         INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_enforce_calls_agent ON enforce_calls(agent_id)")
        .execute(pool)
        .await?;

    Ok(())
}
