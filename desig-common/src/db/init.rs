//! Database initialization
//!
//! Startup sequence:
//! 1. Create parent directory and database file if missing
//! 2. CREATE TABLE IF NOT EXISTS for every owned table
//! 3. Automatic schema sync (adds missing columns to tables created upstream)
//! 4. Versioned migrations for the candidate table

use crate::config::StoreLayout;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How long a connection waits for another writer before failing with SQLITE_BUSY
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path, layout: &StoreLayout) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Options are applied to every pooled connection, unlike a one-off PRAGMA.
    // WAL allows concurrent readers with one writer; the busy timeout makes a
    // second allocator wait for the write lock instead of failing.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    prepare_schema(&pool, layout).await?;

    Ok(pool)
}

/// Create, sync and migrate all tables on an already open pool
///
/// Idempotent - safe to call on every startup.
pub async fn prepare_schema(pool: &SqlitePool, layout: &StoreLayout) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_designation_locks_table(pool).await?;
    create_candidates_table(pool, layout).await?;

    crate::db::table_schemas::sync_all_table_schemas(pool, layout).await?;
    crate::db::migrations::run_migrations(pool, layout).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            table_name TEXT NOT NULL,
            version INTEGER NOT NULL,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (table_name, version)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores deployment-wide key-value pairs (designation base, seed suffix).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the designation_locks table
///
/// One row per base. Every allocation transaction writes its row first, which
/// takes the database write lock before the latest designation is read.
async fn create_designation_locks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS designation_locks (
            base TEXT PRIMARY KEY,
            holder TEXT NOT NULL,
            acquired_at TIMESTAMP NOT NULL,
            allocations INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the candidate table for the given layout
///
/// Upstream detection may already own this table; in that case only the
/// designation column is added later by schema sync.
pub async fn create_candidates_table(pool: &SqlitePool, layout: &StoreLayout) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            detection_time TEXT NOT NULL,
            ra_deg REAL,
            dec_deg REAL,
            {column} TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        table = layout.table,
        column = layout.column,
    );

    sqlx::query(&sql).execute(pool).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SqlitePool {
        // Single connection: every connection to :memory: is a separate database
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_prepare_schema_creates_tables() {
        let pool = setup_test_db().await;
        prepare_schema(&pool, &StoreLayout::default()).await.unwrap();

        for table in ["schema_version", "settings", "designation_locks", "candidates"] {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert!(exists, "table {} not created", table);
        }
    }

    #[tokio::test]
    async fn test_prepare_schema_is_idempotent() {
        let pool = setup_test_db().await;
        let layout = StoreLayout::default();

        prepare_schema(&pool, &layout).await.unwrap();
        prepare_schema(&pool, &layout).await.unwrap();

        let columns: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info('candidates')")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(columns, 6);
    }

    #[tokio::test]
    async fn test_custom_layout() {
        let pool = setup_test_db().await;
        let layout = StoreLayout {
            table: "sources".to_string(),
            column: "objectid".to_string(),
        };
        prepare_schema(&pool, &layout).await.unwrap();

        let has_column: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('sources') WHERE name = 'objectid'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(has_column, 1);
    }
}
