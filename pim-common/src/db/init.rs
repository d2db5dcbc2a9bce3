//! Database initialization
//!
//! Creates the catalog database on first run, then brings an existing one up
//! to date: tables, declarative column sync, default settings.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

use super::settings::{create_settings_table, init_default_settings};

/// Open (creating if needed) the catalog database and initialize its schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets bulk recalculation workers read while one writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create tables, sync columns and seed default settings (idempotent)
///
/// Exposed separately so in-memory pools can be initialized in tests.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    // Phase 1: CREATE TABLE IF NOT EXISTS
    create_settings_table(pool).await?;
    create_channels_table(pool).await?;
    create_products_table(pool).await?;
    create_product_channels_table(pool).await?;
    create_attributes_table(pool).await?;
    create_product_family_attributes_table(pool).await?;
    create_product_attribute_values_table(pool).await?;
    create_product_attribute_value_locales_table(pool).await?;
    create_product_attribute_value_channels_table(pool).await?;

    // Phase 2: Automatic Schema Synchronization
    crate::db::table_schemas::sync_all_table_schemas(pool).await?;

    // Phase 3: Default settings
    init_default_settings(pool).await?;

    Ok(())
}

/// Create the channels table
pub async fn create_channels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS channels (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the products table
///
/// `variant_attributes` is a JSON array of attribute ids a variant overrides.
/// Score columns per channel/language are added at runtime.
pub async fn create_products_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            type TEXT NOT NULL DEFAULT 'simple'
                CHECK (type IN ('simple', 'configurable', 'variant')),
            configurable_product_id TEXT REFERENCES products(id) ON DELETE SET NULL,
            has_own_channels INTEGER NOT NULL DEFAULT 0,
            variant_attributes TEXT NOT NULL DEFAULT '[]',
            name TEXT,
            sku TEXT,
            description TEXT,
            complete REAL,
            complete_global REAL,
            completeness_updated_at INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_products_configurable ON products(configurable_product_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_product_channels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_channels (
            product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
            PRIMARY KEY (product_id, channel_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_attributes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attributes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_product_family_attributes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_family_attributes (
            id TEXT PRIMARY KEY,
            family_id TEXT NOT NULL,
            attribute_id TEXT NOT NULL REFERENCES attributes(id) ON DELETE CASCADE,
            is_required INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_product_attribute_values_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_attribute_values (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            attribute_id TEXT NOT NULL REFERENCES attributes(id) ON DELETE CASCADE,
            product_family_attribute_id TEXT
                REFERENCES product_family_attributes(id) ON DELETE SET NULL,
            scope TEXT NOT NULL DEFAULT 'Global' CHECK (scope IN ('Global', 'Channel')),
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pav_product ON product_attribute_values(product_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_product_attribute_value_locales_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_attribute_value_locales (
            value_id TEXT NOT NULL REFERENCES product_attribute_values(id) ON DELETE CASCADE,
            language_code TEXT NOT NULL,
            value TEXT,
            PRIMARY KEY (value_id, language_code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_product_attribute_value_channels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_attribute_value_channels (
            value_id TEXT NOT NULL REFERENCES product_attribute_values(id) ON DELETE CASCADE,
            channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
            PRIMARY KEY (value_id, channel_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
