//! Designation allocator
//!
//! Produces the next designation for a detection time. The last issued
//! designation is cached on the allocator value so a batch only queries the
//! store once per year scope. The cache is only as trustworthy as the lock
//! held around it: callers sharing a store must serialize allocations (see
//! `SqliteStore::begin_allocation`) and use one allocator per locked batch.

use chrono::{DateTime, Utc};
use desig_common::time::year_token;
use desig_common::{Error, NamerConfig, Result};
use tracing::debug;

use crate::designation::Designation;
use crate::resolver::find_latest;
use crate::store::DesignationStore;

/// Allocator with its session cache
#[derive(Debug, Clone)]
pub struct Allocator {
    config: NamerConfig,
    last: Option<Designation>,
}

impl Allocator {
    pub fn new(config: NamerConfig) -> Self {
        Self { config, last: None }
    }

    pub fn config(&self) -> &NamerConfig {
        &self.config
    }

    /// Last designation this allocator issued, if still cached
    pub fn last(&self) -> Option<&Designation> {
        self.last.as_ref()
    }

    /// Drop the cache; the next allocation resolves from the store
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Allocate the next designation for `detection_time`
    ///
    /// Year rollover discards the cache. An empty scope yields the seed
    /// designation. On any error the cache is left empty.
    pub async fn next_designation<S>(
        &mut self,
        store: &mut S,
        detection_time: &DateTime<Utc>,
    ) -> Result<Designation>
    where
        S: DesignationStore + ?Sized,
    {
        let year = year_token(detection_time);
        let base = self.config.base.as_str();

        let cached = self.last.take().filter(|last| last.year() == year);

        let last = match cached {
            Some(last) => last,
            None => match find_latest(year, base, store).await? {
                Some(raw) => Designation::parse(&raw, base)?,
                None => {
                    let seed = Designation::new(base, year, self.config.seed_suffix.as_str());
                    debug!(designation = %seed, "Empty scope, issuing seed designation");
                    self.last = Some(seed.clone());
                    return Ok(seed);
                }
            },
        };

        if last.year() != year {
            return Err(Error::Consistency(format!(
                "Latest designation {} is from year {:02}, expected {:02}",
                last,
                last.year(),
                year
            )));
        }

        let next = last.successor();
        debug!(previous = %last, designation = %next, "Assigning designation");
        self.last = Some(next.clone());
        Ok(next)
    }
}
