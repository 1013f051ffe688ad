//! In-process store for tests and embedding without a database

use async_trait::async_trait;
use desig_common::{Error, Result};
use std::collections::BTreeMap;

use super::DesignationStore;
use crate::codec::suffix_order;

/// Rows keyed by id, each with an optional designation
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: BTreeMap<i64, Option<String>>,
    next_id: i64,
    lookups: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, returning its id
    pub fn insert(&mut self, designation: Option<&str>) -> i64 {
        self.next_id += 1;
        self.rows.insert(self.next_id, designation.map(str::to_string));
        self.next_id
    }

    pub fn designation(&self, id: i64) -> Option<&str> {
        self.rows.get(&id).and_then(|d| d.as_deref())
    }

    /// Number of `find_latest` calls served so far
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    /// All issued designations, in id order
    pub fn designations(&self) -> Vec<String> {
        self.rows.values().flatten().cloned().collect()
    }
}

#[async_trait]
impl DesignationStore for MemoryStore {
    async fn find_latest(&mut self, base: &str, year: u8) -> Result<Option<String>> {
        self.lookups += 1;
        let prefix = format!("{}{:02}", base, year);

        Ok(self
            .rows
            .values()
            .flatten()
            .filter(|d| d.starts_with(&prefix))
            .max_by(|a, b| suffix_order(a, b))
            .cloned())
    }

    async fn write_designation(&mut self, id: i64, designation: &str) -> Result<()> {
        match self.rows.get_mut(&id) {
            Some(slot @ None) => {
                *slot = Some(designation.to_string());
                Ok(())
            }
            Some(Some(existing)) => Err(Error::NotFound(format!(
                "Candidate {} already named {}",
                id, existing
            ))),
            None => Err(Error::NotFound(format!("Candidate {} does not exist", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_latest_scopes_by_year() {
        let mut store = MemoryStore::new();
        store.insert(Some("XY24aaaac"));
        store.insert(Some("XY25aaaaz"));
        store.insert(Some("XY24aaaab"));
        store.insert(None);

        assert_eq!(
            store.find_latest("XY", 24).await.unwrap().as_deref(),
            Some("XY24aaaac")
        );
        assert_eq!(
            store.find_latest("XY", 25).await.unwrap().as_deref(),
            Some("XY25aaaaz")
        );
        assert_eq!(store.find_latest("XY", 26).await.unwrap(), None);
        assert_eq!(store.lookups(), 3);
    }

    #[tokio::test]
    async fn test_find_latest_prefers_longer_suffix() {
        let mut store = MemoryStore::new();
        store.insert(Some("XY24zzzzz"));
        store.insert(Some("XY24aaaaaa"));

        assert_eq!(
            store.find_latest("XY", 24).await.unwrap().as_deref(),
            Some("XY24aaaaaa")
        );
    }

    #[tokio::test]
    async fn test_write_designation_only_once() {
        let mut store = MemoryStore::new();
        let id = store.insert(None);

        store.write_designation(id, "XY24aaaaa").await.unwrap();
        assert_eq!(store.designation(id), Some("XY24aaaaa"));

        assert!(matches!(
            store.write_designation(id, "XY24aaaab").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.write_designation(999, "XY24aaaab").await,
            Err(Error::NotFound(_))
        ));
    }
}
