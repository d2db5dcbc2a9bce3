//! Table Schema Definitions
//!
//! Columns added after the first release are listed here so databases created
//! by older builds pick them up automatically on startup.

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Products table schema (static columns only; score columns per channel and
/// language are managed at runtime)
pub struct ProductsTableSchema;

impl TableSchema for ProductsTableSchema {
    fn table_name() -> &'static str {
        "products"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "TEXT").primary_key(),
            ColumnDefinition::new("type", "TEXT")
                .not_null()
                .default("'simple'"),
            ColumnDefinition::new("configurable_product_id", "TEXT"),
            ColumnDefinition::new("has_own_channels", "INTEGER")
                .not_null()
                .default("0"),
            ColumnDefinition::new("variant_attributes", "TEXT")
                .not_null()
                .default("'[]'"),
            ColumnDefinition::new("name", "TEXT"),
            ColumnDefinition::new("sku", "TEXT"),
            ColumnDefinition::new("description", "TEXT"),
            // Cached completeness projection
            ColumnDefinition::new("complete", "REAL"),
            ColumnDefinition::new("complete_global", "REAL"),
            ColumnDefinition::new("completeness_updated_at", "INTEGER"),
        ]
    }
}

/// Attribute values table schema
pub struct ProductAttributeValuesTableSchema;

impl TableSchema for ProductAttributeValuesTableSchema {
    fn table_name() -> &'static str {
        "product_attribute_values"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "TEXT").primary_key(),
            ColumnDefinition::new("product_id", "TEXT").not_null(),
            ColumnDefinition::new("attribute_id", "TEXT").not_null(),
            ColumnDefinition::new("product_family_attribute_id", "TEXT"),
            ColumnDefinition::new("scope", "TEXT")
                .not_null()
                .default("'Global'"),
            ColumnDefinition::new("value", "TEXT"),
        ]
    }
}

/// Synchronize all table schemas
///
/// Runs after CREATE TABLE IF NOT EXISTS; adds missing columns only.
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    info!("=== Automatic Schema Synchronization ===");

    SchemaSync::sync_table::<ProductsTableSchema>(pool).await?;
    SchemaSync::sync_table::<ProductAttributeValuesTableSchema>(pool).await?;

    info!("=== Schema Synchronization Complete ===");
    Ok(())
}
