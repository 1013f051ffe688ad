//! Candidate table schema migrations
//!
//! Versioned, per-table migrations so a candidate table created by an older
//! release (or by the upstream detection process) is upgraded in place.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases upgraded by them must stay valid
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Idempotent** - every statement must be safe to run twice

use crate::config::StoreLayout;
use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version of the candidate table
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version of a table
///
/// Returns 0 if no migration was ever recorded for it
pub async fn get_schema_version(pool: &SqlitePool, table: &str) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar(
        "SELECT version FROM schema_version WHERE table_name = ? ORDER BY version DESC LIMIT 1",
    )
    .bind(table)
    .fetch_optional(pool)
    .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, table: &str, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (table_name, version) VALUES (?, ?)")
        .bind(table)
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations for the candidate table
pub async fn run_migrations(pool: &SqlitePool, layout: &StoreLayout) -> Result<()> {
    let current_version = get_schema_version(pool, &layout.table).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!(
            "Schema of '{}' is up to date (v{})",
            layout.table, current_version
        );
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Schema of '{}' (v{}) is newer than code version (v{})",
            layout.table, current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Migrating '{}': v{} -> v{}",
        layout.table, current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool, layout).await?;
        set_schema_version(pool, &layout.table, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool, layout).await?;
        set_schema_version(pool, &layout.table, 2).await?;
        info!("✓ Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: UNIQUE index on the designation column
///
/// NULLs are exempt, so unnamed candidates are unaffected. Fails if the
/// table already holds duplicate designations; that is data corruption and
/// must be repaired by hand.
async fn migrate_v1(pool: &SqlitePool, layout: &StoreLayout) -> Result<()> {
    let duplicates: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM (SELECT {col} FROM {table} WHERE {col} IS NOT NULL GROUP BY {col} HAVING COUNT(*) > 1)",
        table = layout.table,
        col = layout.column,
    ))
    .fetch_one(pool)
    .await?;

    if duplicates > 0 {
        return Err(Error::Consistency(format!(
            "{} designations in '{}' are used more than once",
            duplicates, layout.table
        )));
    }

    sqlx::query(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_{col}_unique ON {table}({col})",
        table = layout.table,
        col = layout.column,
    ))
    .execute(pool)
    .await?;

    info!(
        "Migration v1: unique index on {}.{}",
        layout.table, layout.column
    );
    Ok(())
}

/// Migration v2: index matching the latest-designation lookup order
async fn migrate_v2(pool: &SqlitePool, layout: &StoreLayout) -> Result<()> {
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_{col}_latest ON {table}(length({col}) DESC, {col} DESC)",
        table = layout.table,
        col = layout.column,
    ))
    .execute(pool)
    .await?;

    info!(
        "Migration v2: latest-designation index on {}.{}",
        layout.table, layout.column
    );
    Ok(())
}
