//! Table Schema Definitions
//!
//! Columns the allocator depends on in tables it may not own.

use crate::config::StoreLayout;
use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Candidate table schema
///
/// The table and designation column names come from configuration.
/// `created_at` is deliberately absent: SQLite cannot add a column whose
/// default is CURRENT_TIMESTAMP, and nothing here reads it.
pub struct CandidatesTableSchema<'a> {
    layout: &'a StoreLayout,
}

impl<'a> CandidatesTableSchema<'a> {
    pub fn new(layout: &'a StoreLayout) -> Self {
        Self { layout }
    }
}

impl TableSchema for CandidatesTableSchema<'_> {
    fn table_name(&self) -> &str {
        &self.layout.table
    }

    fn expected_columns(&self) -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("detection_time", "TEXT").not_null(),
            ColumnDefinition::new("ra_deg", "REAL"),
            ColumnDefinition::new("dec_deg", "REAL"),
            ColumnDefinition::new(self.layout.column.as_str(), "TEXT"),
        ]
    }
}

/// Synchronize all table schemas
///
/// Runs after CREATE TABLE IF NOT EXISTS and before migrations.
pub async fn sync_all_table_schemas(pool: &SqlitePool, layout: &StoreLayout) -> Result<()> {
    let added = SchemaSync::sync_table(pool, &CandidatesTableSchema::new(layout)).await?;
    if added > 0 {
        info!("Schema sync added {} column(s) to '{}'", added, layout.table);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_candidates_schema_uses_configured_column() {
        let layout = StoreLayout {
            table: "sources".to_string(),
            column: "objectid".to_string(),
        };
        let schema = CandidatesTableSchema::new(&layout);

        assert_eq!(schema.table_name(), "sources");
        let columns = schema.expected_columns();
        assert!(columns.iter().any(|c| c.name == "id" && c.primary_key));
        assert!(columns.iter().any(|c| c.name == "detection_time" && c.not_null));
        assert!(columns.iter().any(|c| c.name == "objectid"));
        assert!(!columns.iter().any(|c| c.name == "designation"));
    }

    #[tokio::test]
    async fn test_sync_adds_designation_column_to_upstream_table() {
        let pool = setup_test_db().await;

        // Table as created by the detection process, before naming existed
        sqlx::query(
            r#"
            CREATE TABLE candidates (
                id INTEGER PRIMARY KEY,
                detection_time TEXT NOT NULL,
                ra_deg REAL,
                dec_deg REAL
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let layout = StoreLayout::default();
        sync_all_table_schemas(&pool, &layout).await.unwrap();

        let has_column: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('candidates') WHERE name = 'designation'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(has_column, 1);

        // Second run makes no changes
        let added = SchemaSync::sync_table(&pool, &CandidatesTableSchema::new(&layout))
            .await
            .unwrap();
        assert_eq!(added, 0);
    }
}
