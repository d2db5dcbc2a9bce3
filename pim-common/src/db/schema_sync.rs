//! Automatic Schema Synchronization
//!
//! Declarative schema maintenance: expected columns are defined in code and
//! missing ones are added to the database at startup. The same primitives are
//! used at runtime to add or drop the dynamic score columns that follow the
//! channel and language lifecycle.
//!
//! # Architecture
//!
//! Two-phase initialization:
//! 1. **CREATE TABLE IF NOT EXISTS** - Create missing tables
//! 2. **Auto-Sync** - Add missing columns via ALTER TABLE (this module)
//!
//! Type drift is reported, never repaired.
//!
//! # Usage
//!
//! ```rust,ignore
//! pub struct ProductsTableSchema;
//!
//! impl TableSchema for ProductsTableSchema {
//!     fn table_name() -> &'static str { "products" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", "TEXT").primary_key(),
//!             ColumnDefinition::new("complete_global", "REAL"),  // ADD COLUMN HERE
//!         ]
//!     }
//! }
//!
//! SchemaSync::sync_table::<ProductsTableSchema>(&pool).await?;
//! ```

use crate::{Error, Result};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Expected column of a table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type as written in DDL ("TEXT", "REAL", ...)
    pub sql_type: String,
    pub not_null: bool,
    /// Only honored by CREATE TABLE; ALTER TABLE cannot add a key column
    pub primary_key: bool,
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            default_value: None,
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

    /// DEFAULT expression, as SQL (quote string literals)
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// `name TYPE [NOT NULL] [DEFAULT x]` fragment for ALTER TABLE ADD COLUMN
    fn add_column_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);

        match (&self.default_value, self.not_null) {
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, true) => warn!(
                "  Column {} is NOT NULL without DEFAULT; adding it as nullable",
                self.name
            ),
            (None, false) => {}
        }

        sql
    }
}

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// Defines expected schema for a database table
pub trait TableSchema {
    /// Table name in database
    fn table_name() -> &'static str;

    /// Expected column definitions (order matters for new table creation)
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Turn an arbitrary code (channel code, language code) into a safe column fragment
///
/// Lowercases ASCII letters, keeps digits, maps everything else to `_`.
/// Fails when nothing alphanumeric remains.
pub fn sanitize_identifier(raw: &str) -> Result<String> {
    let sanitized: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if !sanitized.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidIdentifier(raw.to_string()));
    }

    Ok(sanitized)
}

/// Schema introspection - read actual database schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Columns of a table in declaration order
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let rows = sqlx::query(
            r#"SELECT cid, name, type, "notnull", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid"#,
        )
        .bind(table_name)
        .fetch_all(pool)
        .await?;

        let columns = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        Ok(columns)
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Check if a column exists (case-insensitive, as SQLite resolves names)
    pub async fn column_exists(pool: &SqlitePool, table_name: &str, column: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info(?) WHERE lower(name) = lower(?)",
        )
        .bind(table_name)
        .bind(column)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }
}

/// SQLite column affinity, derived from a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl Affinity {
    /// Affinity rules of SQLite, section 3.1 of its datatype documentation
    pub fn of(declared_type: &str) -> Self {
        let t = declared_type.to_ascii_uppercase();

        if t.contains("INT") {
            Self::Integer
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
            Self::Text
        } else if t.is_empty() || t.contains("BLOB") {
            Self::Blob
        } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
            Self::Real
        } else {
            Self::Numeric
        }
    }
}

/// A column whose declared affinity differs from the expected one
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMismatch {
    pub column: String,
    pub expected: String,
    pub actual: String,
}

/// Difference between the expected and the actual columns of one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    pub missing: Vec<ColumnDefinition>,
    pub type_mismatches: Vec<TypeMismatch>,
}

impl SchemaDiff {
    /// Columns are matched by name, case-insensitively
    pub fn between(expected: &[ColumnDefinition], actual: &[ActualColumn]) -> Self {
        let mut diff = Self::default();

        for column in expected {
            let found = actual
                .iter()
                .find(|a| a.name.eq_ignore_ascii_case(&column.name));

            match found {
                None => diff.missing.push(column.clone()),
                Some(a) if Affinity::of(&a.type_name) != Affinity::of(&column.sql_type) => {
                    diff.type_mismatches.push(TypeMismatch {
                        column: column.name.clone(),
                        expected: column.sql_type.clone(),
                        actual: a.type_name.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.type_mismatches.is_empty()
    }
}

/// Schema synchronization - apply schema changes to database
pub struct SchemaSync;

impl SchemaSync {
    /// Add the missing columns of `T`'s table
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
        let table = T::table_name();
        info!("Schema sync: Checking table '{}'", table);

        if !SchemaIntrospector::table_exists(pool, table).await? {
            warn!("  Table '{}' does not exist, skipping sync", table);
            return Ok(());
        }

        let actual = SchemaIntrospector::introspect_table(pool, table).await?;
        let diff = SchemaDiff::between(&T::expected_columns(), &actual);

        if diff.is_empty() {
            info!("  Schema up to date for '{}'", table);
            return Ok(());
        }

        for mismatch in &diff.type_mismatches {
            warn!(
                "  Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                table, mismatch.column, mismatch.expected, mismatch.actual
            );
        }

        for column in &diff.missing {
            Self::add_column(pool, table, column).await?;
        }

        Ok(())
    }

    /// Add a column via ALTER TABLE ADD COLUMN
    ///
    /// Adding a column that already exists is a no-op.
    pub async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        if column.primary_key {
            warn!(
                "  {}.{} cannot become a key via ALTER TABLE; adding a plain column",
                table, column.name
            );
        }

        let sql = format!("ALTER TABLE {} ADD COLUMN {}", table, column.add_column_sql());

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => {
                info!("  Added column: {}.{} ({})", table, column.name, column.sql_type);
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                info!("  Column {}.{} already exists", table, column.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop a column via ALTER TABLE DROP COLUMN (SQLite >= 3.35)
    ///
    /// Dropping a column that does not exist is a no-op.
    pub async fn drop_column(pool: &SqlitePool, table: &str, column: &str) -> Result<()> {
        if !SchemaIntrospector::column_exists(pool, table, column).await? {
            info!("  Column {}.{} not present, nothing to drop", table, column);
            return Ok(());
        }

        sqlx::query(&format!("ALTER TABLE {} DROP COLUMN {}", table, column))
            .execute(pool)
            .await?;

        info!("  Dropped column: {}.{}", table, column);
        Ok(())
    }
}
