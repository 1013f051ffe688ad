//! Last-designation resolver

use desig_common::Result;
use tracing::debug;

use crate::store::DesignationStore;

/// Most recently issued designation for `year` under `base`, if any
pub async fn find_latest<S>(year: u8, base: &str, store: &mut S) -> Result<Option<String>>
where
    S: DesignationStore + ?Sized,
{
    let latest = store.find_latest(base, year).await?;
    debug!(base, year, latest = ?latest, "Resolved latest designation");
    Ok(latest)
}
