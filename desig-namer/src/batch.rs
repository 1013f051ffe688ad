//! Batch assignment driver

use desig_common::db::CandidateRecord;
use desig_common::Result;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::allocator::Allocator;
use crate::store::DesignationStore;

/// Outcome of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentStats {
    /// Records that received a new designation
    pub assigned: usize,
    /// Records that already carried one and were left untouched
    pub already_named: usize,
}

/// Assign designations to every unnamed record, in slice order
///
/// Each new designation is written to the store before it is copied into the
/// record. The first failure aborts the batch: the failing record stays
/// unnamed and the allocator cache is dropped, so a retry resolves from the
/// store again.
pub async fn assign_batch<S>(
    allocator: &mut Allocator,
    store: &mut S,
    records: &mut [CandidateRecord],
) -> Result<AssignmentStats>
where
    S: DesignationStore + ?Sized,
{
    let mut stats = AssignmentStats::default();

    for record in records.iter_mut() {
        if let Some(existing) = &record.designation {
            debug!(id = record.id, designation = %existing, "Candidate already named");
            stats.already_named += 1;
            continue;
        }

        let designation = match allocator
            .next_designation(store, &record.detection_time)
            .await
        {
            Ok(designation) => designation.to_string(),
            Err(e) => {
                allocator.invalidate();
                error!(id = record.id, "Designation allocation failed: {}", e);
                return Err(e);
            }
        };

        if let Err(e) = store.write_designation(record.id, &designation).await {
            allocator.invalidate();
            error!(id = record.id, designation = %designation, "Designation write failed: {}", e);
            return Err(e);
        }

        debug!(id = record.id, designation = %designation, "Assigned designation");
        record.designation = Some(designation);
        stats.assigned += 1;
    }

    info!(
        assigned = stats.assigned,
        already_named = stats.already_named,
        "Batch assignment complete"
    );

    Ok(stats)
}
