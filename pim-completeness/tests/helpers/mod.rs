//! Catalog fixtures for integration tests
//!
//! Every helper writes straight to the tables created by `init_schema`, so the
//! tests exercise the real SQL paths of `SqliteCatalog`.

#![allow(dead_code)]

use pim_common::db::{
    init_schema, set_setting, SchemaIntrospector, MULTILANG_ACTIVE, MULTILANG_LANGUAGES,
};
use pim_completeness::{
    ChannelFieldLifecycle, CompletenessService, Language, SqliteCatalog,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Catalog, service and lifecycle over one in-memory database
pub struct TestCatalog {
    pub catalog: Arc<SqliteCatalog>,
    pub service: CompletenessService,
    pub lifecycle: ChannelFieldLifecycle,
}

impl TestCatalog {
    pub async fn new() -> Self {
        // Single connection: every handle must see the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        Self::from_pool(pool)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        let catalog = Arc::new(SqliteCatalog::new(pool));
        Self {
            service: CompletenessService::from_catalog(catalog.clone()),
            lifecycle: ChannelFieldLifecycle::new(catalog.clone()),
            catalog,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        self.catalog.pool()
    }

    /// Insert a product of the given type
    pub async fn product(&self, id: &str, kind: &str, parent: Option<&str>) {
        sqlx::query("INSERT INTO products (id, type, configurable_product_id) VALUES (?, ?, ?)")
            .bind(id)
            .bind(kind)
            .bind(parent)
            .execute(self.pool())
            .await
            .unwrap();
    }

    /// Insert a simple product with `name` and `sku` populated
    pub async fn complete_product(&self, id: &str) {
        self.product(id, "simple", None).await;
        self.set_field(id, "name", Some("Chair")).await;
        self.set_field(id, "sku", Some(&format!("SKU-{}", id))).await;
    }

    pub async fn set_field(&self, product_id: &str, column: &str, value: Option<&str>) {
        sqlx::query(&format!("UPDATE products SET {} = ? WHERE id = ?", column))
            .bind(value)
            .bind(product_id)
            .execute(self.pool())
            .await
            .unwrap();
    }

    pub async fn set_variant_attributes(&self, product_id: &str, attribute_ids: &[&str]) {
        sqlx::query("UPDATE products SET variant_attributes = ? WHERE id = ?")
            .bind(serde_json::to_string(attribute_ids).unwrap())
            .bind(product_id)
            .execute(self.pool())
            .await
            .unwrap();
    }

    pub async fn set_own_channels(&self, product_id: &str) {
        sqlx::query("UPDATE products SET has_own_channels = 1 WHERE id = ?")
            .bind(product_id)
            .execute(self.pool())
            .await
            .unwrap();
    }

    pub async fn assign_channel(&self, product_id: &str, channel_id: &str) {
        sqlx::query("INSERT INTO product_channels (product_id, channel_id) VALUES (?, ?)")
            .bind(product_id)
            .bind(channel_id)
            .execute(self.pool())
            .await
            .unwrap();
    }

    /// Define an attribute and its family rule; `pfa-<id>` is the rule id
    pub async fn attribute(&self, attribute_id: &str, type_name: &str, required: bool) {
        sqlx::query("INSERT INTO attributes (id, name, type) VALUES (?, ?, ?)")
            .bind(attribute_id)
            .bind(attribute_id)
            .bind(type_name)
            .execute(self.pool())
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO product_family_attributes (id, family_id, attribute_id, is_required) VALUES (?, 'family-1', ?, ?)",
        )
        .bind(format!("pfa-{}", attribute_id))
        .bind(attribute_id)
        .bind(required)
        .execute(self.pool())
        .await
        .unwrap();
    }

    pub async fn value(
        &self,
        value_id: &str,
        product_id: &str,
        attribute_id: &str,
        scope: &str,
        value: Option<&str>,
    ) {
        sqlx::query(
            r#"
            INSERT INTO product_attribute_values
                (id, product_id, attribute_id, product_family_attribute_id, scope, value)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(value_id)
        .bind(product_id)
        .bind(attribute_id)
        .bind(format!("pfa-{}", attribute_id))
        .bind(scope)
        .bind(value)
        .execute(self.pool())
        .await
        .unwrap();
    }

    pub async fn localize(&self, value_id: &str, language_code: &str, value: Option<&str>) {
        sqlx::query(
            "INSERT INTO product_attribute_value_locales (value_id, language_code, value) VALUES (?, ?, ?)",
        )
        .bind(value_id)
        .bind(language_code)
        .bind(value)
        .execute(self.pool())
        .await
        .unwrap();
    }

    pub async fn scope_to_channel(&self, value_id: &str, channel_id: &str) {
        sqlx::query(
            "INSERT INTO product_attribute_value_channels (value_id, channel_id) VALUES (?, ?)",
        )
        .bind(value_id)
        .bind(channel_id)
        .execute(self.pool())
        .await
        .unwrap();
    }

    /// Turn the catalog multilingual and provide language storage
    pub async fn enable_languages(&self, languages: &[Language]) {
        set_setting(self.pool(), MULTILANG_ACTIVE, "true").await.unwrap();
        set_setting(
            self.pool(),
            MULTILANG_LANGUAGES,
            &serde_json::to_string(languages).unwrap(),
        )
        .await
        .unwrap();
        self.lifecycle.on_languages_configured(languages).await.unwrap();
    }

    /// Stored value of a REAL score column
    pub async fn stored_score(&self, product_id: &str, column: &str) -> Option<f64> {
        sqlx::query_scalar(&format!("SELECT {} FROM products WHERE id = ?", column))
            .bind(product_id)
            .fetch_one(self.pool())
            .await
            .unwrap()
    }

    pub async fn has_column(&self, column: &str) -> bool {
        SchemaIntrospector::column_exists(self.pool(), "products", column)
            .await
            .unwrap()
    }
}
