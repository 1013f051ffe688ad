//! # Designation Namer
//!
//! Assigns sequential, year-scoped designations (`<base><YY><suffix>`) to
//! newly detected sources.
//!
//! Layers, leaf first:
//! - `codec`: suffix successor (`aaaaz -> aaaba`, `zzzzz -> aaaaaa`)
//! - `designation`: parsing and year extraction
//! - `store`: persistence seam (SQLite transaction, in-memory)
//! - `resolver`: latest designation of a year scope
//! - `allocator`: next designation with a per-batch cache
//! - `batch`: assignment over an ordered batch of candidates
//! - `namer`: service facade serializing batches across tasks and processes

pub mod allocator;
pub mod batch;
pub mod codec;
pub mod designation;
pub mod namer;
pub mod resolver;
pub mod store;

pub use allocator::Allocator;
pub use batch::{assign_batch, AssignmentStats};
pub use codec::{successor, suffix_order};
pub use designation::{extract_year, Designation};
pub use namer::Namer;
pub use resolver::find_latest;
pub use store::{DesignationStore, MemoryStore, SqliteAllocation, SqliteStore};
