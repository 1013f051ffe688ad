//! Database models

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A detected source awaiting (or carrying) a designation
///
/// Created by the upstream detection process. The allocator reads
/// `detection_time` and writes `designation` exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    /// Row id in the candidate table
    pub id: i64,
    pub detection_time: DateTime<Utc>,
    pub designation: Option<String>,
    pub ra_deg: Option<f64>,
    pub dec_deg: Option<f64>,
}

impl CandidateRecord {
    /// Unnamed record without position
    pub fn new(id: i64, detection_time: DateTime<Utc>) -> Self {
        Self {
            id,
            detection_time,
            designation: None,
            ra_deg: None,
            dec_deg: None,
        }
    }

    /// Record that already carries a designation
    pub fn named(id: i64, detection_time: DateTime<Utc>, designation: impl Into<String>) -> Self {
        Self {
            designation: Some(designation.into()),
            ..Self::new(id, detection_time)
        }
    }

    pub fn is_named(&self) -> bool {
        self.designation.is_some()
    }
}
