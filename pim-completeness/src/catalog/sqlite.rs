//! SQLite catalog
//!
//! Implements every collaborator trait over the shared catalog database. Tables
//! are created by `pim_common::db::init_schema`; per-channel and per-language
//! score columns are added and dropped at runtime through [`SchemaManager`].
//!
//! # Score columns
//! - `complete`, `complete_global`: fixed columns
//! - `complete_channel_<code>`: one per channel
//! - `complete_language_<code>`: one per configured language
//!
//! Codes are sanitized to `[a-z0-9_]` before use in a column name.

use crate::error::{CompletenessError, Result};
use crate::repository::{
    AttributeValueRepository, LanguageProvider, RecordRepository, ResultWriter, SchemaManager,
};
use crate::types::{
    AttributeType, AttributeValue, Channel, CompletenessResult, EntityRef, Language, ParentLink,
    Record, RecordType, RequiredField, Scope, VariantOverrides,
};
use chrono::Utc;
use pim_common::config::TomlConfig;
use pim_common::db::{
    get_setting, init_database, sanitize_identifier, ColumnDefinition, SchemaSync,
    COMPLETENESS_MAX_CONCURRENT_JOBS, COMPLETENESS_REQUIRED_FIELDS, MULTILANG_ACTIVE,
    MULTILANG_LANGUAGES,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, ValueRef};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

const PRODUCTS_TABLE: &str = "products";

/// Score column of a channel
pub fn channel_completeness_column(channel_code: &str) -> Result<String> {
    Ok(format!("complete_channel_{}", sanitize_identifier(channel_code)?))
}

/// Score column of a language
pub fn language_completeness_column(language_code: &str) -> Result<String> {
    Ok(format!("complete_language_{}", sanitize_identifier(language_code)?))
}

/// Column holding the localized copy of a plain field, e.g. `nameEnUs`
///
/// Not sanitized: the name must match the field key scoring looks up, so
/// anything outside `[A-Za-z0-9_]` is rejected instead.
pub fn localized_field_column(field: &str, language: &Language) -> Result<String> {
    let column = format!("{}{}", field, language.suffix());
    let valid = column
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && column.chars().next().is_some_and(|c| !c.is_ascii_digit());

    if !valid {
        return Err(CompletenessError::InvalidData(format!(
            "'{}' cannot be used as a column name",
            column
        )));
    }

    Ok(column)
}

/// Catalog backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open the catalog database named by `config` inside `root_folder`
    ///
    /// Creates the file and its schema on first use.
    pub async fn open(config: &TomlConfig, root_folder: &Path) -> Result<Self> {
        let pool = init_database(&config.database_path(root_folder)).await?;
        Ok(Self::new(pool))
    }

    /// Insert a channel row
    ///
    /// Does not add the score column: pair with
    /// `ChannelFieldLifecycle::on_channel_created`, or use [`Self::create_channel`].
    /// Until the column exists, persisting a product in this channel fails.
    /// Rejects a code whose score column already belongs to another channel
    /// (`Web` and `web`, `web-shop` and `web_shop`).
    pub async fn insert_channel(&self, code: &str, name: &str) -> Result<Channel> {
        let column = channel_completeness_column(code)?;
        if let Some(owner) = self.column_owners(&column, None).await?.into_iter().next() {
            return Err(CompletenessError::InvalidData(format!(
                "channel code '{}' maps to score column {} already used by channel '{}'",
                code, column, owner.code
            )));
        }

        let channel = Channel::new(Uuid::new_v4().to_string(), code, name);

        sqlx::query("INSERT INTO channels (id, code, name) VALUES (?, ?, ?)")
            .bind(&channel.id)
            .bind(&channel.code)
            .bind(&channel.name)
            .execute(&self.pool)
            .await?;

        info!(channel_id = %channel.id, code = %channel.code, "Channel created");
        Ok(channel)
    }

    /// Insert a channel and add its score column
    pub async fn create_channel(&self, code: &str, name: &str) -> Result<Channel> {
        let channel = self.insert_channel(code, name).await?;
        self.ensure_channel_field(&channel).await?;
        Ok(channel)
    }

    /// Remove a channel and its assignments, returning what was removed
    ///
    /// Leaves the score column in place: pair with
    /// `ChannelFieldLifecycle::on_channel_removed`, or use [`Self::remove_channel`].
    pub async fn delete_channel(&self, channel_id: &str) -> Result<Channel> {
        let channel = sqlx::query_as::<_, (String, String, String)>(
            "SELECT id, code, name FROM channels WHERE id = ?",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|(id, code, name)| Channel { id, code, name })
        .ok_or_else(|| CompletenessError::TargetNotFound(format!("channel {}", channel_id)))?;

        sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(channel_id)
            .execute(&self.pool)
            .await?;

        info!(channel_id = %channel.id, code = %channel.code, "Channel deleted");
        Ok(channel)
    }

    /// Delete a channel and drop its score column
    pub async fn remove_channel(&self, channel_id: &str) -> Result<Channel> {
        let channel = self.delete_channel(channel_id).await?;
        self.drop_channel_field(&channel).await?;
        Ok(channel)
    }

    /// Channels whose score column is `column`, other than `except_id`
    async fn column_owners(&self, column: &str, except_id: Option<&str>) -> Result<Vec<Channel>> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT id, code, name FROM channels ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, code, name)| Channel { id, code, name })
            .filter(|c| Some(c.id.as_str()) != except_id)
            .filter(|c| {
                channel_completeness_column(&c.code)
                    .map(|owned| owned.eq_ignore_ascii_case(column))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Bulk parallelism from the settings table, else `default`
    ///
    /// `default` is normally `ScoringConfig::max_concurrent_jobs`.
    pub async fn max_concurrent_jobs(&self, default: usize) -> Result<usize> {
        let Some(raw) = get_setting(&self.pool, COMPLETENESS_MAX_CONCURRENT_JOBS).await? else {
            return Ok(default);
        };

        match raw.trim().parse::<usize>() {
            Ok(jobs) if jobs > 0 => Ok(jobs),
            _ => {
                warn!(value = %raw, default, "Invalid max_concurrent_jobs setting, using default");
                Ok(default)
            }
        }
    }

    /// Channels directly assigned to a product, ordered by code
    async fn channels_of(&self, product_id: &str) -> Result<Vec<Channel>> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT c.id, c.code, c.name
            FROM channels c
            JOIN product_channels pc ON pc.channel_id = c.id
            WHERE pc.product_id = ?
            ORDER BY c.code
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, code, name)| Channel { id, code, name })
            .collect())
    }

    async fn load_parent(&self, parent_id: &str) -> Result<Option<ParentLink>> {
        let type_name: Option<String> =
            sqlx::query_scalar("SELECT type FROM products WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(type_name) = type_name else {
            warn!(parent_id, "Parent product missing, variant scored without it");
            return Ok(None);
        };

        Ok(Some(ParentLink {
            id: parent_id.to_string(),
            record_type: parse_record_type(parent_id, &type_name)?,
            channels: self.channels_of(parent_id).await?,
        }))
    }

    async fn variant_overrides(&self, product_id: &str) -> Result<Vec<VariantOverrides>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT id, variant_attributes
            FROM products
            WHERE configurable_product_id = ? AND type = 'variant'
            ORDER BY id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(variant_id, raw)| {
                let attribute_ids = serde_json::from_str::<Vec<String>>(&raw).unwrap_or_else(|e| {
                    warn!(
                        variant_id = %variant_id,
                        error = %e,
                        "Malformed variant attribute list, treating as empty"
                    );
                    Vec::new()
                });
                VariantOverrides {
                    variant_id,
                    attribute_ids,
                }
            })
            .collect())
    }

    async fn json_setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = get_setting(&self.pool, key).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CompletenessError::InvalidData(format!("setting '{}': {}", key, e)))
    }
}

fn parse_record_type(product_id: &str, raw: &str) -> Result<RecordType> {
    RecordType::parse(raw).ok_or_else(|| {
        CompletenessError::InvalidData(format!("product {} has unknown type '{}'", product_id, raw))
    })
}

/// Every column of a product row as a JSON-like field map
///
/// Columns decode to scalars only (integer, real, text or null). Text holding
/// JSON, such as `"[]"`, stays a string and is judged like any other string,
/// so it counts as populated. Collection values come from list-typed
/// attributes, which are decoded by the emptiness rules.
fn row_fields(row: &SqliteRow) -> BTreeMap<String, Value> {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), column_value(row, column.ordinal())))
        .collect()
}

fn column_value(row: &SqliteRow, index: usize) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return Value::Null,
    }

    row.try_get::<i64, _>(index)
        .map(Value::from)
        .or_else(|_| row.try_get::<f64, _>(index).map(Value::from))
        .or_else(|_| row.try_get::<String, _>(index).map(Value::String))
        .unwrap_or(Value::Null)
}

#[async_trait::async_trait]
impl RecordRepository for SqliteCatalog {
    async fn load_record(&self, record_id: &str) -> Result<Record> {
        // Column set changes with the channel/language lifecycle; never cache
        let row = sqlx::query("SELECT * FROM products WHERE id = ?")
            .persistent(false)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CompletenessError::RecordNotFound(record_id.to_string()))?;

        let type_name: String = row.try_get("type")?;
        let record_type = parse_record_type(record_id, &type_name)?;
        let parent_id: Option<String> = row.try_get("configurable_product_id")?;
        let has_own_channels = row.try_get::<i64, _>("has_own_channels")? != 0;
        let fields = row_fields(&row);

        let parent = match (record_type, parent_id) {
            (RecordType::Variant, Some(parent_id)) => self.load_parent(&parent_id).await?,
            _ => None,
        };

        let variants = if record_type == RecordType::Configurable {
            self.variant_overrides(record_id).await?
        } else {
            Vec::new()
        };

        Ok(Record {
            id: record_id.to_string(),
            record_type,
            parent,
            has_own_channels,
            channels: self.channels_of(record_id).await?,
            variants,
            fields,
        })
    }

    async fn required_fields(&self) -> Result<Vec<RequiredField>> {
        Ok(self
            .json_setting(COMPLETENESS_REQUIRED_FIELDS)
            .await?
            .unwrap_or_default())
    }

    async fn resolve_target(&self, entity: &EntityRef) -> Result<String> {
        match entity {
            EntityRef::Product(id) => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = ?)")
                        .bind(id)
                        .fetch_one(&self.pool)
                        .await?;

                if exists {
                    Ok(id.clone())
                } else {
                    Err(CompletenessError::TargetNotFound(format!("product {}", id)))
                }
            }
            EntityRef::AttributeValue(id) => {
                let product_id: Option<String> = sqlx::query_scalar(
                    "SELECT product_id FROM product_attribute_values WHERE id = ?",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

                product_id.ok_or_else(|| {
                    CompletenessError::TargetNotFound(format!("attribute value {}", id))
                })
            }
        }
    }

    async fn list_record_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar("SELECT id FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}

#[async_trait::async_trait]
impl AttributeValueRepository for SqliteCatalog {
    async fn find_required_attribute_values(&self, record_id: &str) -> Result<Vec<AttributeValue>> {
        let rows = sqlx::query_as::<_, (String, String, String, String, Option<String>)>(
            r#"
            SELECT v.id, v.attribute_id, a.type, v.scope, v.value
            FROM product_attribute_values v
            JOIN attributes a ON a.id = v.attribute_id
            JOIN product_family_attributes pfa ON pfa.id = v.product_family_attribute_id
            WHERE v.product_id = ? AND pfa.is_required = 1
            ORDER BY v.id
            "#,
        )
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut locales: HashMap<String, BTreeMap<String, Option<String>>> = HashMap::new();
        let locale_rows = sqlx::query_as::<_, (String, String, Option<String>)>(
            r#"
            SELECT l.value_id, l.language_code, l.value
            FROM product_attribute_value_locales l
            JOIN product_attribute_values v ON v.id = l.value_id
            WHERE v.product_id = ?
            "#,
        )
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?;
        for (value_id, language_code, value) in locale_rows {
            locales.entry(value_id).or_default().insert(language_code, value);
        }

        let mut channels: HashMap<String, Vec<String>> = HashMap::new();
        let channel_rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT vc.value_id, vc.channel_id
            FROM product_attribute_value_channels vc
            JOIN product_attribute_values v ON v.id = vc.value_id
            WHERE v.product_id = ?
            ORDER BY vc.channel_id
            "#,
        )
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?;
        for (value_id, channel_id) in channel_rows {
            channels.entry(value_id).or_default().push(channel_id);
        }

        let values = rows
            .into_iter()
            .map(|(id, attribute_id, type_name, scope, raw_value)| {
                let scope = Scope::parse(&scope).ok_or_else(|| {
                    CompletenessError::InvalidData(format!(
                        "attribute value {} has unknown scope '{}'",
                        id, scope
                    ))
                })?;
                let attribute_type = AttributeType::parse(&type_name);
                let value_channels = match scope {
                    Scope::Channel => channels.remove(&id).unwrap_or_default(),
                    Scope::Global => Vec::new(),
                };

                Ok(AttributeValue {
                    is_multilingual: attribute_type.is_multilingual(),
                    localized_values: locales.remove(&id).unwrap_or_default(),
                    id,
                    attribute_id,
                    attribute_type,
                    scope,
                    channels: value_channels,
                    raw_value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(record_id, count = values.len(), "Loaded required attribute values");
        Ok(values)
    }
}

#[async_trait::async_trait]
impl LanguageProvider for SqliteCatalog {
    async fn list_languages(&self) -> Result<Vec<Language>> {
        Ok(self
            .json_setting(MULTILANG_LANGUAGES)
            .await?
            .unwrap_or_default())
    }

    async fn is_multilingual_enabled(&self) -> Result<bool> {
        let value = get_setting(&self.pool, MULTILANG_ACTIVE).await?;
        Ok(matches!(value.as_deref().map(str::trim), Some("true") | Some("1")))
    }
}

#[async_trait::async_trait]
impl ResultWriter for SqliteCatalog {
    async fn persist(&self, record_id: &str, result: &CompletenessResult) -> Result<()> {
        let mut assignments = vec![
            "complete = ?".to_string(),
            "complete_global = ?".to_string(),
            "completeness_updated_at = ?".to_string(),
        ];
        let mut scores = Vec::new();

        for (code, score) in &result.channel_completeness {
            assignments.push(format!("{} = ?", channel_completeness_column(code)?));
            scores.push(*score);
        }

        if let Some(languages) = &result.language_completeness {
            for (code, score) in languages {
                assignments.push(format!("{} = ?", language_completeness_column(code)?));
                scores.push(*score);
            }
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            PRODUCTS_TABLE,
            assignments.join(", ")
        );

        let mut query = sqlx::query(&sql)
            .bind(result.complete)
            .bind(result.complete_global)
            .bind(Utc::now().timestamp());
        for score in scores {
            query = query.bind(score);
        }

        let affected = query
            .bind(record_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(CompletenessError::RecordNotFound(record_id.to_string()));
        }

        info!(
            record_id,
            complete = result.complete,
            complete_global = result.complete_global,
            channels = result.channel_completeness.len(),
            "Persisted completeness"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl SchemaManager for SqliteCatalog {
    async fn ensure_channel_field(&self, channel: &Channel) -> Result<()> {
        let column = ColumnDefinition::new(channel_completeness_column(&channel.code)?, "REAL");
        SchemaSync::add_column(&self.pool, PRODUCTS_TABLE, &column).await?;
        Ok(())
    }

    async fn drop_channel_field(&self, channel: &Channel) -> Result<()> {
        let column = channel_completeness_column(&channel.code)?;
        let owners = self.column_owners(&column, Some(&channel.id)).await?;
        if let Some(owner) = owners.first() {
            info!(
                column = %column,
                still_used_by = %owner.code,
                "Score column kept, another channel maps to it"
            );
            return Ok(());
        }

        SchemaSync::drop_column(&self.pool, PRODUCTS_TABLE, &column).await?;
        Ok(())
    }

    /// Adds the language's score column and the localized column of every
    /// multilingual required field
    async fn ensure_language_field(&self, language: &Language) -> Result<()> {
        let column = ColumnDefinition::new(language_completeness_column(&language.code)?, "REAL");
        SchemaSync::add_column(&self.pool, PRODUCTS_TABLE, &column).await?;

        for field in self.required_fields().await? {
            if field.multilingual {
                let column = ColumnDefinition::new(localized_field_column(&field.name, language)?, "TEXT");
                SchemaSync::add_column(&self.pool, PRODUCTS_TABLE, &column).await?;
            }
        }

        Ok(())
    }
}
