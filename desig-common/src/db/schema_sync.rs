//! Automatic Schema Synchronization
//!
//! The candidate table is usually created by the upstream detection process,
//! not by us. Schema sync compares the columns the allocator needs with what
//! the table actually has and adds the missing ones via ALTER TABLE.
//!
//! What this CAN fix:
//! - Missing nullable columns
//!
//! What this CANNOT fix (logged, left for a manual migration):
//! - Type changes
//! - Constraint changes (SQLite requires table recreation)

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "REAL")
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
}

/// Column as reported by PRAGMA table_info
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub pk: bool,
}

/// Difference between expected and actual schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Expected schema of a table whose name is only known at runtime
pub trait TableSchema {
    fn table_name(&self) -> &str;

    /// Columns the code depends on; extra columns in the database are ignored
    fn expected_columns(&self) -> Vec<ColumnDefinition>;
}

/// Read the actual schema of a table
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Columns of `table_name`, ordered by cid
    ///
    /// `table_name` is spliced into the PRAGMA and must already be validated.
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);

        Ok(columns)
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Compare expected and actual columns
pub struct SchemaDiff;

impl SchemaDiff {
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            let Some(actual_col) = actual
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(&expected_col.name))
            else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
                continue;
            };

            if !Self::types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    expected: expected_col.sql_type.clone(),
                    actual: actual_col.type_name.clone(),
                });
            }

            // INTEGER PRIMARY KEY is implicitly NOT NULL but PRAGMA reports notnull=0
            if expected_col.not_null && !actual_col.not_null && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if expected_col.primary_key && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// SQLite type affinity rules
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act {
            return true;
        }

        let is_int = |t: &str| t.contains("INT");
        let is_text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
        let is_real =
            |t: &str| t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB");

        (is_int(&exp) && is_int(&act))
            || (is_text(&exp) && is_text(&act))
            || (is_real(&exp) && is_real(&act))
    }
}

/// Apply schema drift fixes
pub struct SchemaSync;

impl SchemaSync {
    /// Detect drift for one table and add missing columns
    ///
    /// Returns the number of columns added.
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool, schema: &T) -> Result<usize> {
        let table_name = schema.table_name();

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!(
                "Table '{}' does not exist - should be created by CREATE TABLE IF NOT EXISTS first",
                table_name
            );
            return Ok(0);
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &schema.expected_columns(), &actual);

        if drift.is_empty() {
            info!("✓ Schema up to date for '{}'", table_name);
            return Ok(0);
        }

        let mut added = 0;
        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, &table, &column).await?;
                    added += 1;
                }
                SchemaDrift::TypeMismatch {
                    table,
                    column,
                    expected,
                    actual,
                } => {
                    warn!(
                        "⚠ Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                        table, column, expected, actual
                    );
                }
                SchemaDrift::ConstraintMismatch {
                    table,
                    column,
                    constraint,
                } => {
                    warn!(
                        "⚠ Constraint mismatch in {}.{}: missing '{}'. Manual migration required.",
                        table, column, constraint
                    );
                }
            }
        }

        Ok(added)
    }

    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table, column.name, column.sql_type
        );

        if column.primary_key {
            warn!(
                "⚠ Cannot add PRIMARY KEY column {}.{} via ALTER TABLE; adding it without the constraint",
                table, column.name
            );
        }

        if column.not_null {
            warn!(
                "⚠ Cannot add NOT NULL column {}.{} without DEFAULT; adding it as nullable",
                table, column.name
            );
        }

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => {
                info!("✓ Added column {}.{} ({})", table, column.name, column.sql_type);
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                // Another process starting on the same table got there first
                info!("  Column {}.{} already added by a concurrent startup", table, column.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actual(cid: i32, name: &str, type_name: &str, not_null: bool, pk: bool) -> ActualColumn {
        ActualColumn {
            cid,
            name: name.to_string(),
            type_name: type_name.to_string(),
            not_null,
            pk,
        }
    }

    #[test]
    fn test_compare_reports_missing_column() {
        let expected = vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("designation", "TEXT"),
        ];
        let existing = vec![actual(0, "id", "INTEGER", false, true)];

        let drift = SchemaDiff::compare("candidates", &expected, &existing);
        assert_eq!(drift.len(), 1);
        assert!(matches!(
            &drift[0],
            SchemaDrift::MissingColumn { column, .. } if column.name == "designation"
        ));
    }

    #[test]
    fn test_compare_accepts_affinity_compatible_types() {
        let expected = vec![ColumnDefinition::new("designation", "TEXT")];
        let existing = vec![actual(0, "designation", "VARCHAR(32)", false, false)];

        assert!(SchemaDiff::compare("candidates", &expected, &existing).is_empty());
    }

    #[test]
    fn test_compare_reports_type_mismatch() {
        let expected = vec![ColumnDefinition::new("designation", "TEXT")];
        let existing = vec![actual(0, "designation", "INTEGER", false, false)];

        let drift = SchemaDiff::compare("candidates", &expected, &existing);
        assert!(matches!(&drift[0], SchemaDrift::TypeMismatch { .. }));
    }

    #[test]
    fn test_integer_primary_key_counts_as_not_null() {
        let expected = vec![ColumnDefinition::new("id", "INTEGER").primary_key().not_null()];
        let existing = vec![actual(0, "id", "INTEGER", false, true)];

        assert!(SchemaDiff::compare("candidates", &expected, &existing).is_empty());
    }

    #[tokio::test]
    async fn test_add_column_tolerates_concurrent_add() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE sources (id INTEGER PRIMARY KEY, detection_time TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        // Drift computed before another process adds the column
        let expected = vec![ColumnDefinition::new("objectid", "TEXT")];
        let before = SchemaIntrospector::introspect_table(&pool, "sources").await.unwrap();
        let drift = SchemaDiff::compare("sources", &expected, &before);
        assert_eq!(drift.len(), 1);

        sqlx::query("ALTER TABLE sources ADD COLUMN objectid TEXT")
            .execute(&pool)
            .await
            .unwrap();

        for change in drift {
            if let SchemaDrift::MissingColumn { table, column } = change {
                SchemaSync::add_column(&pool, &table, &column).await.unwrap();
            }
        }

        let after = SchemaIntrospector::introspect_table(&pool, "sources").await.unwrap();
        assert_eq!(after.iter().filter(|c| c.name == "objectid").count(), 1);
    }

    #[tokio::test]
    async fn test_add_column_reports_other_failures() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let column = ColumnDefinition::new("objectid", "TEXT");
        let result = SchemaSync::add_column(&pool, "missing_table", &column).await;
        assert!(matches!(result, Err(crate::Error::Database(_))));
    }
}
