//! Key/value settings table
//!
//! Catalog-wide configuration that must be shared by every process touching
//! the database (multilingual switch, language list, required fields) lives
//! here rather than in the TOML file.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// "true" when the catalog stores per-language values
pub const MULTILANG_ACTIVE: &str = "multilang_active";

/// JSON list of `{"locale": ..., "code": ...}` objects, in display order
pub const MULTILANG_LANGUAGES: &str = "multilang_languages";

/// JSON list of `{"name": ..., "multilingual": bool}` objects
pub const COMPLETENESS_REQUIRED_FIELDS: &str = "completeness_required_fields";

/// Parallelism for bulk recalculation; overrides the TOML default when set
pub const COMPLETENESS_MAX_CONCURRENT_JOBS: &str = "completeness_max_concurrent_jobs";

/// Create the settings table
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize default settings
///
/// Existing values are never overwritten; NULL values are reset.
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Multilingual catalog
    ensure_setting(pool, MULTILANG_ACTIVE, "false").await?;
    ensure_setting(pool, MULTILANG_LANGUAGES, "[]").await?;

    // Completeness scoring
    ensure_setting(
        pool,
        COMPLETENESS_REQUIRED_FIELDS,
        r#"[{"name":"name","multilingual":true},{"name":"sku","multilingual":false}]"#,
    )
    .await?;
    ensure_setting(pool, COMPLETENESS_MAX_CONCURRENT_JOBS, "4").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    // INSERT OR IGNORE tolerates concurrent initialization
    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let reset = sqlx::query("UPDATE settings SET value = ? WHERE key = ? AND value IS NULL")
        .bind(default_value)
        .bind(key)
        .execute(pool)
        .await?
        .rows_affected();

    if reset > 0 {
        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Read a setting value, `None` when absent or NULL
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Insert or replace a setting value
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
