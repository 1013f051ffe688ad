//! Persistent store seam
//!
//! The allocator only needs two operations from a store: the latest
//! designation of a year scope, and an update-in-place of one record's
//! designation. Both take `&mut self` so a store can be a live transaction.

use async_trait::async_trait;
use desig_common::Result;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteAllocation, SqliteStore};

#[async_trait]
pub trait DesignationStore: Send {
    /// Latest designation issued under `base` for the two-digit `year`
    ///
    /// "Latest" is allocation order: longest suffix first, then descending
    /// string order. Returns None for an empty scope.
    async fn find_latest(&mut self, base: &str, year: u8) -> Result<Option<String>>;

    /// Set the designation of record `id`
    ///
    /// Fails with `NotFound` if the record is missing or already named.
    async fn write_designation(&mut self, id: i64, designation: &str) -> Result<()>;
}
