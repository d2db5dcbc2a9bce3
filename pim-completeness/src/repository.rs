//! Collaborator traits
//!
//! Scoring reads through these traits and writes through [`ResultWriter`];
//! [`crate::catalog::SqliteCatalog`] implements all of them. Every trait is
//! object-safe so the service can hold `Arc<dyn ...>` handles.

use crate::error::Result;
use crate::types::{
    AttributeValue, Channel, CompletenessResult, EntityRef, Language, Record, RequiredField,
};

/// Source of the required attribute values of a record
#[async_trait::async_trait]
pub trait AttributeValueRepository: Send + Sync {
    /// Values of the record whose family attribute is marked required
    ///
    /// Channel-scoped values come with their channel ids; multilingual values
    /// with their localized storage.
    async fn find_required_attribute_values(&self, record_id: &str) -> Result<Vec<AttributeValue>>;
}

/// Source of records and catalog-wide record configuration
#[async_trait::async_trait]
pub trait RecordRepository: Send + Sync {
    /// Load a record with parent link, channels and variant overrides resolved
    ///
    /// # Errors
    /// `RecordNotFound` when no record has this id.
    async fn load_record(&self, record_id: &str) -> Result<Record>;

    /// Plain fields every record must populate
    async fn required_fields(&self) -> Result<Vec<RequiredField>>;

    /// Record id to rescore after a change to `entity`
    ///
    /// # Errors
    /// `TargetNotFound` when the entity does not exist or belongs to no record.
    async fn resolve_target(&self, entity: &EntityRef) -> Result<String>;

    /// Every record id, for bulk recalculation
    async fn list_record_ids(&self) -> Result<Vec<String>>;
}

/// Catalog language configuration
#[async_trait::async_trait]
pub trait LanguageProvider: Send + Sync {
    /// Configured languages in display order
    async fn list_languages(&self) -> Result<Vec<Language>>;

    async fn is_multilingual_enabled(&self) -> Result<bool>;
}

/// Sink for composed results
#[async_trait::async_trait]
pub trait ResultWriter: Send + Sync {
    /// Store the result on the record in one write
    async fn persist(&self, record_id: &str, result: &CompletenessResult) -> Result<()>;
}

/// Maintenance of per-channel and per-language score storage
///
/// Called from channel/language lifecycle events, never during scoring.
#[async_trait::async_trait]
pub trait SchemaManager: Send + Sync {
    async fn ensure_channel_field(&self, channel: &Channel) -> Result<()>;

    async fn drop_channel_field(&self, channel: &Channel) -> Result<()>;

    async fn ensure_language_field(&self, language: &Language) -> Result<()>;
}
