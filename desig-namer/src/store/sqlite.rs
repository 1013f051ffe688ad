//! SQLite-backed designation store
//!
//! Allocation runs inside one write transaction per batch. The transaction
//! writes the `designation_locks` row for its base before reading anything,
//! so SQLite hands it the database write lock up front. A second allocator,
//! in this process or another, blocks on the busy timeout until the first
//! commits or rolls back, and then reads a snapshot that includes every
//! designation the first one issued.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use desig_common::db::CandidateRecord;
use desig_common::time::parse_timestamp;
use desig_common::{Error, Result, StoreLayout};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use super::DesignationStore;

/// Handle on the candidate table of one database
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    layout: StoreLayout,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, layout: StoreLayout) -> Self {
        Self { pool, layout }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Open a serialized allocation transaction for `base`
    ///
    /// `holder` identifies the caller in the lock row.
    pub async fn begin_allocation(&self, base: &str, holder: &str) -> Result<SqliteAllocation> {
        let mut tx = self.pool.begin().await?;

        // First statement is a write: takes the write lock before any read
        sqlx::query(
            r#"
            INSERT INTO designation_locks (base, holder, acquired_at, allocations)
            VALUES (?, ?, ?, 0)
            ON CONFLICT(base) DO UPDATE SET
                holder = excluded.holder,
                acquired_at = excluded.acquired_at
            "#,
        )
        .bind(base)
        .bind(holder)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        debug!(base, holder, "Allocation lock acquired");

        Ok(SqliteAllocation {
            tx,
            layout: self.layout.clone(),
            base: base.to_string(),
        })
    }

    /// Latest designation of a scope, read outside any allocation
    ///
    /// Informational only: another allocator may issue a newer one right after.
    pub async fn latest(&self, base: &str, year: u8) -> Result<Option<String>> {
        query_latest(&self.pool, &self.layout, base, year).await
    }

    /// Insert a new unnamed candidate, returning its id
    pub async fn insert_candidate(
        &self,
        detection_time: &DateTime<Utc>,
        ra_deg: Option<f64>,
        dec_deg: Option<f64>,
    ) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {} (detection_time, ra_deg, dec_deg) VALUES (?, ?, ?)",
            self.layout.table
        );

        let result = sqlx::query(&sql)
            .bind(detection_time.to_rfc3339())
            .bind(ra_deg)
            .bind(dec_deg)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Load one candidate by id
    pub async fn candidate(&self, id: i64) -> Result<Option<CandidateRecord>> {
        let sql = format!(
            "SELECT id, detection_time, ra_deg, dec_deg, {col} AS designation FROM {table} WHERE id = ?",
            table = self.layout.table,
            col = self.layout.column,
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(candidate_from_row).transpose()
    }

    /// Number of allocations recorded against `base` in the lock table
    pub async fn allocation_count(&self, base: &str) -> Result<i64> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT allocations FROM designation_locks WHERE base = ?")
                .bind(base)
                .fetch_optional(&self.pool)
                .await?;

        Ok(count.unwrap_or(0))
    }
}

/// An open allocation transaction
///
/// Dropping it without `commit` rolls back every designation it wrote.
pub struct SqliteAllocation {
    tx: Transaction<'static, Sqlite>,
    layout: StoreLayout,
    base: String,
}

impl SqliteAllocation {
    /// Every unnamed candidate, in id order (upstream insertion order)
    pub async fn pending_candidates(&mut self) -> Result<Vec<CandidateRecord>> {
        let sql = format!(
            "SELECT id, detection_time, ra_deg, dec_deg, {col} AS designation FROM {table} WHERE {col} IS NULL ORDER BY id",
            table = self.layout.table,
            col = self.layout.column,
        );

        let rows = sqlx::query(&sql).fetch_all(&mut *self.tx).await?;
        rows.iter().map(candidate_from_row).collect()
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        debug!(base = %self.base, "Allocation committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        debug!(base = %self.base, "Allocation rolled back");
        Ok(())
    }
}

#[async_trait]
impl DesignationStore for SqliteAllocation {
    async fn find_latest(&mut self, base: &str, year: u8) -> Result<Option<String>> {
        query_latest(&mut *self.tx, &self.layout, base, year).await
    }

    async fn write_designation(&mut self, id: i64, designation: &str) -> Result<()> {
        let sql = format!(
            "UPDATE {table} SET {col} = ? WHERE id = ? AND {col} IS NULL",
            table = self.layout.table,
            col = self.layout.column,
        );

        let result = sqlx::query(&sql)
            .bind(designation)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "Candidate {} does not exist or is already named",
                id
            )));
        }

        sqlx::query("UPDATE designation_locks SET allocations = allocations + 1 WHERE base = ?")
            .bind(&self.base)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }
}

/// Latest designation with the `base + YY` prefix
///
/// Ordered by length first so a grown suffix (`aaaaaa`) outranks the last
/// short one (`zzzzz`).
async fn query_latest<'e, E>(
    executor: E,
    layout: &StoreLayout,
    base: &str,
    year: u8,
) -> Result<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let prefix = format!("{}{:02}", base, year);
    let sql = format!(
        r#"
        SELECT {col} FROM {table}
        WHERE substr({col}, 1, ?) = ?
        ORDER BY length({col}) DESC, {col} DESC
        LIMIT 1
        "#,
        table = layout.table,
        col = layout.column,
    );

    let latest: Option<String> = sqlx::query_scalar(&sql)
        .bind(prefix.len() as i64)
        .bind(&prefix)
        .fetch_optional(executor)
        .await?;

    Ok(latest)
}

fn candidate_from_row(row: &SqliteRow) -> Result<CandidateRecord> {
    let detection_time: String = row.try_get("detection_time")?;

    Ok(CandidateRecord {
        id: row.try_get("id")?,
        detection_time: parse_timestamp(&detection_time)?,
        designation: row.try_get("designation")?,
        ra_deg: row.try_get("ra_deg")?,
        dec_deg: row.try_get("dec_deg")?,
    })
}
