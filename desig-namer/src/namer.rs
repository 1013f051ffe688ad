//! Namer service
//!
//! Ties configuration, the SQLite store and the allocator together. Every
//! batch runs under two locks:
//! 1. an in-process mutex shared by clones of one `Namer`
//! 2. the SQLite write lock taken by `SqliteStore::begin_allocation`,
//!    which also serializes other processes using the same database
//!
//! A fresh `Allocator` is created per batch, so its cache never outlives
//! the locks that make it valid.

use chrono::{DateTime, Utc};
use desig_common::db::{ensure_deployment_settings, CandidateRecord};
use desig_common::time::{now, year_token};
use desig_common::{NamerConfig, Result};
use sqlx::SqlitePool;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::allocator::Allocator;
use crate::batch::{assign_batch, AssignmentStats};
use crate::store::SqliteStore;

/// Sequential designation service for one base
#[derive(Debug, Clone)]
pub struct Namer {
    store: SqliteStore,
    config: NamerConfig,
    /// Identifies this instance in the lock row
    holder: String,
    batch_lock: Arc<Mutex<()>>,
}

impl Namer {
    /// Create a namer on a prepared database
    ///
    /// Validates the configuration and checks it against the deployment
    /// settings recorded in the store (recording them on first use).
    pub async fn connect(pool: SqlitePool, config: NamerConfig) -> Result<Self> {
        config.validate()?;
        ensure_deployment_settings(&pool, &config).await?;

        let holder = Uuid::new_v4().to_string();
        info!(base = %config.base, holder = %holder, "Namer ready");

        Ok(Self {
            store: SqliteStore::new(pool, config.layout()),
            config,
            holder,
            batch_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn config(&self) -> &NamerConfig {
        &self.config
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Assign designations to a caller-supplied batch
    ///
    /// Records must already exist in the candidate table. Either every
    /// unnamed record is named and persisted, or nothing is.
    pub async fn assign(&self, records: &mut [CandidateRecord]) -> Result<AssignmentStats> {
        let _guard = self.batch_lock.lock().await;
        let mut tx = self
            .store
            .begin_allocation(&self.config.base, &self.holder)
            .await?;

        let mut allocator = Allocator::new(self.config.clone());
        let mut staged = records.to_vec();
        let stats = assign_batch(&mut allocator, &mut tx, &mut staged).await?;
        tx.commit().await?;

        // Only publish designations to the caller once they are durable
        records.clone_from_slice(&staged);
        Ok(stats)
    }

    /// Assign designations to every unnamed candidate in the table
    ///
    /// Returns the newly named records in allocation order.
    pub async fn assign_pending(&self) -> Result<Vec<CandidateRecord>> {
        let _guard = self.batch_lock.lock().await;
        let mut tx = self
            .store
            .begin_allocation(&self.config.base, &self.holder)
            .await?;

        let mut records = tx.pending_candidates().await?;
        if records.is_empty() {
            tx.rollback().await?;
            info!("No unnamed candidates");
            return Ok(records);
        }

        let mut allocator = Allocator::new(self.config.clone());
        assign_batch(&mut allocator, &mut tx, &mut records).await?;
        tx.commit().await?;

        Ok(records)
    }

    /// Insert an unnamed candidate (stand-in for the detection process)
    pub async fn insert_candidate(
        &self,
        detection_time: &DateTime<Utc>,
        ra_deg: Option<f64>,
        dec_deg: Option<f64>,
    ) -> Result<i64> {
        self.store
            .insert_candidate(detection_time, ra_deg, dec_deg)
            .await
    }

    /// Latest issued designation for a two-digit year
    pub async fn latest(&self, year: u8) -> Result<Option<String>> {
        self.store.latest(&self.config.base, year).await
    }
}

impl fmt::Display for Namer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sequentially assign names to new sources, e.g {}",
            self.config.seed_designation(year_token(&now()))
        )
    }
}
