use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::schema;

/// Open (creating if needed) the embedded relational store in WAL
/// mode — readers never block writers — and ensure the schema exists.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    schema::ensure_schema(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_pool_opens_file_backed_store_in_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("enforcement.db");
        let url = format!("sqlite://{}", db_path.display());

        let pool = create_pool(&url).await.unwrap();

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode").fetch_one(&pool).await.unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        // Schema creation is idempotent: reopening the same file must
        // not error even though the tables already exist.
        pool.close().await;
        create_pool(&url).await.unwrap();

        assert!(db_path.exists());
    }
}
