//! Settings database access
//!
//! Key-value store for deployment-wide values. The designation base and
//! seed suffix are recorded on first use; a later process configured with
//! different values is refused, since mixing bases in one store would break
//! the latest-designation lookup.

use crate::config::NamerConfig;
use crate::{Error, Result};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

pub const SETTING_BASE: &str = "designation_base";
pub const SETTING_SEED_SUFFIX: &str = "designation_seed_suffix";

/// Generic setting getter
///
/// Returns None when the key is missing or its value is NULL.
pub async fn get_setting<T: FromStr>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match value.flatten() {
        Some(s) => s.parse::<T>().map(Some).map_err(|_| {
            Error::Config(format!("Failed to parse setting '{}' value: {}", key, s))
        }),
        None => Ok(None),
    }
}

/// Generic setting setter (insert or update)
pub async fn set_setting<T: ToString>(pool: &SqlitePool, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Record base and seed on first run, refuse a mismatch afterwards
pub async fn ensure_deployment_settings(pool: &SqlitePool, config: &NamerConfig) -> Result<()> {
    ensure_fixed_setting(pool, SETTING_BASE, &config.base).await?;
    ensure_fixed_setting(pool, SETTING_SEED_SUFFIX, &config.seed_suffix).await?;
    Ok(())
}

async fn ensure_fixed_setting(pool: &SqlitePool, key: &str, expected: &str) -> Result<()> {
    match get_setting::<String>(pool, key).await? {
        Some(stored) if stored == expected => Ok(()),
        Some(stored) => Err(Error::Config(format!(
            "Store was initialized with {} '{}', refusing to run with '{}'",
            key, stored, expected
        ))),
        None => {
            info!("Recording {} = '{}'", key, expected);
            set_setting(pool, key, expected).await
        }
    }
}
