//! Core types for completeness scoring
//!
//! Catalog snapshot types (records, attribute values, channels, languages) are
//! produced by the repositories; requirement items and buckets exist only for
//! the duration of one scoring pass; `CompletenessResult` is the only value
//! handed back to persistence.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// Catalog dimensions
// ============================================================================

/// Sales / distribution channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub code: String,
    pub name: String,
}

impl Channel {
    pub fn new(id: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Configured catalog language
///
/// `code` doubles as the storage suffix: the localized copy of field `name`
/// lives under `name` + `code` (e.g. `nameEnUs`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub locale: String,
    pub code: String,
}

impl Language {
    pub fn new(locale: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            code: code.into(),
        }
    }

    /// Storage suffix appended to field names
    pub fn suffix(&self) -> &str {
        &self.code
    }
}

// ============================================================================
// Records
// ============================================================================

/// Kind of catalog record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Simple,
    /// Parent whose variants override some attributes
    Configurable,
    /// Child of a configurable record
    Variant,
}

impl RecordType {
    /// Parse a stored type name, as allowed by the `products.type` check
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "simple" => Some(Self::Simple),
            "configurable" => Some(Self::Configurable),
            "variant" => Some(Self::Variant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Configurable => "configurable",
            Self::Variant => "variant",
        }
    }
}

/// Attribute ids one variant declares its own values for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariantOverrides {
    pub variant_id: String,
    pub attribute_ids: Vec<String>,
}

/// The configurable parent a variant links to
#[derive(Debug, Clone, PartialEq)]
pub struct ParentLink {
    pub id: String,
    pub record_type: RecordType,
    pub channels: Vec<Channel>,
}

/// A record being scored, with the relations scoring needs already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub record_type: RecordType,
    /// Configurable parent (variants only)
    pub parent: Option<ParentLink>,
    /// Whether the record declares its own channel relation instead of inheriting
    pub has_own_channels: bool,
    /// Directly assigned channels
    pub channels: Vec<Channel>,
    /// Variants with their overrides (configurable records only)
    pub variants: Vec<VariantOverrides>,
    /// Field values by storage name (localized copies carry the language suffix)
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            id: id.into(),
            record_type,
            parent: None,
            has_own_channels: false,
            channels: Vec::new(),
            variants: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_channels(mut self, channels: Vec<Channel>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_parent(mut self, parent: ParentLink) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_variant(mut self, variant_id: impl Into<String>, attribute_ids: &[&str]) -> Self {
        self.variants.push(VariantOverrides {
            variant_id: variant_id.into(),
            attribute_ids: attribute_ids.iter().map(|id| id.to_string()).collect(),
        });
        self
    }

    /// Value stored under `name`, if any
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_configurable(&self) -> bool {
        self.record_type == RecordType::Configurable
    }
}

/// Plain (non-attribute) field that must be populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredField {
    pub name: String,
    #[serde(default)]
    pub multilingual: bool,
}

impl RequiredField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multilingual: false,
        }
    }

    pub fn multilingual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multilingual: true,
        }
    }
}

/// Reference to something whose change should trigger a rescoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// A product record, scored directly
    Product(String),
    /// An attribute value; resolves to the product that owns it
    AttributeValue(String),
}

// ============================================================================
// Attributes
// ============================================================================

/// Where a required attribute applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Channel,
}

impl Scope {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Global" | "global" => Some(Self::Global),
            "Channel" | "channel" => Some(Self::Channel),
            _ => None,
        }
    }
}

/// Base kind of an attribute type, without the multilingual flag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Text,
    Textarea,
    Wysiwyg,
    Int,
    Float,
    Bool,
    Enum,
    Array,
    MultiEnum,
    Date,
    Url,
    Other(String),
}

/// Declared attribute type, e.g. `multiEnum` or `textMultiLang`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeType {
    pub kind: AttributeKind,
    pub multilang: bool,
}

impl AttributeType {
    const MULTILANG_SUFFIX: &'static str = "MultiLang";

    pub fn new(kind: AttributeKind, multilang: bool) -> Self {
        Self { kind, multilang }
    }

    /// Parse a stored type name
    pub fn parse(raw: &str) -> Self {
        let (base, multilang) = match raw.strip_suffix(Self::MULTILANG_SUFFIX) {
            Some(base) => (base, true),
            None => (raw, false),
        };

        let kind = match base {
            "text" | "varchar" => AttributeKind::Text,
            "textarea" => AttributeKind::Textarea,
            "wysiwyg" => AttributeKind::Wysiwyg,
            "int" => AttributeKind::Int,
            "float" => AttributeKind::Float,
            "bool" => AttributeKind::Bool,
            "enum" => AttributeKind::Enum,
            "array" => AttributeKind::Array,
            "multiEnum" => AttributeKind::MultiEnum,
            "date" => AttributeKind::Date,
            "url" => AttributeKind::Url,
            other => AttributeKind::Other(other.to_string()),
        };

        Self { kind, multilang }
    }

    /// List-like types store a JSON array that must be decoded before checking
    pub fn is_list_like(&self) -> bool {
        matches!(self.kind, AttributeKind::Array | AttributeKind::MultiEnum)
    }

    pub fn is_multilingual(&self) -> bool {
        self.multilang
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match &self.kind {
            AttributeKind::Text => "text",
            AttributeKind::Textarea => "textarea",
            AttributeKind::Wysiwyg => "wysiwyg",
            AttributeKind::Int => "int",
            AttributeKind::Float => "float",
            AttributeKind::Bool => "bool",
            AttributeKind::Enum => "enum",
            AttributeKind::Array => "array",
            AttributeKind::MultiEnum => "multiEnum",
            AttributeKind::Date => "date",
            AttributeKind::Url => "url",
            AttributeKind::Other(name) => name.as_str(),
        };

        if self.multilang {
            write!(f, "{}{}", base, Self::MULTILANG_SUFFIX)
        } else {
            f.write_str(base)
        }
    }
}

/// A required attribute value assigned to a record
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValue {
    pub id: String,
    pub attribute_id: String,
    pub attribute_type: AttributeType,
    pub scope: Scope,
    pub is_multilingual: bool,
    /// Channel ids (meaningful for `Scope::Channel` only)
    pub channels: Vec<String>,
    /// Plain (non-localized) stored value
    pub raw_value: Option<String>,
    /// Localized stored values by language code
    pub localized_values: BTreeMap<String, Option<String>>,
}

impl AttributeValue {
    /// Global, non-multilingual value
    pub fn global(
        id: impl Into<String>,
        attribute_id: impl Into<String>,
        attribute_type: AttributeType,
        raw_value: Option<&str>,
    ) -> Self {
        let is_multilingual = attribute_type.is_multilingual();
        Self {
            id: id.into(),
            attribute_id: attribute_id.into(),
            attribute_type,
            scope: Scope::Global,
            is_multilingual,
            channels: Vec::new(),
            raw_value: raw_value.map(str::to_string),
            localized_values: BTreeMap::new(),
        }
    }

    /// Channel-scoped value
    pub fn in_channels(mut self, channel_ids: &[&str]) -> Self {
        self.scope = Scope::Channel;
        self.channels = channel_ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_localized(mut self, language_code: impl Into<String>, value: Option<&str>) -> Self {
        self.localized_values
            .insert(language_code.into(), value.map(str::to_string));
        self
    }

    /// Stored value for the given language, or plain storage without one
    pub fn raw(&self, language: Option<&Language>) -> Option<&str> {
        match language {
            None => self.raw_value.as_deref(),
            Some(language) => self
                .localized_values
                .get(language.suffix())
                .and_then(|v| v.as_deref()),
        }
    }
}

/// Everything one scoring pass reads, fetched up front
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSnapshot {
    pub record: Record,
    /// Required attribute values of the record
    pub attribute_values: Vec<AttributeValue>,
    pub required_fields: Vec<RequiredField>,
    /// Configured languages in display order
    pub languages: Vec<Language>,
    pub multilingual_enabled: bool,
}

impl RecordSnapshot {
    /// Languages that produce per-language requirement items
    pub fn active_languages(&self) -> &[Language] {
        if self.multilingual_enabled {
            self.languages.as_slice()
        } else {
            &[]
        }
    }
}

// ============================================================================
// Scoring pass
// ============================================================================

/// Atomic unit of scoring: one (attribute-or-field, language) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementItem {
    /// Attribute value id or field name
    pub id: String,
    pub is_empty: bool,
    pub is_multi_lang: bool,
    /// Channel ids the item applies to (empty for global items and fields)
    pub channels: BTreeSet<String>,
}

impl RequirementItem {
    pub fn field(name: &str, is_empty: bool, is_multi_lang: bool) -> Self {
        Self {
            id: name.to_string(),
            is_empty,
            is_multi_lang,
            channels: BTreeSet::new(),
        }
    }

    pub fn attribute(value: &AttributeValue, is_empty: bool, is_multi_lang: bool) -> Self {
        let channels = match value.scope {
            Scope::Global => BTreeSet::new(),
            Scope::Channel => value.channels.iter().cloned().collect(),
        };

        Self {
            id: value.id.clone(),
            is_empty,
            is_multi_lang,
            channels,
        }
    }
}

/// Requirement items of one record, partitioned by dimension
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementBucket {
    /// Plain required fields (base language only)
    pub fields: Vec<RequirementItem>,
    /// Global-scope attribute items
    pub attrs_global: Vec<RequirementItem>,
    /// Channel-scope attribute items by channel id
    pub attrs_channel: BTreeMap<String, Vec<RequirementItem>>,
    /// Per-language items by language code
    pub multi_lang: BTreeMap<String, Vec<RequirementItem>>,
    /// Every attribute-derived item, flat
    pub local_complete: Vec<RequirementItem>,
}

/// Composed completeness of one record, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessResult {
    /// Every required item of the record
    pub complete: f64,
    /// Global attributes plus fields
    pub complete_global: f64,
    /// Channel attributes plus fields, by channel code
    pub channel_completeness: BTreeMap<String, f64>,
    /// Per-language items by language code; `None` when the catalog is not multilingual
    pub language_completeness: Option<BTreeMap<String, f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_type_parse() {
        let t = AttributeType::parse("multiEnumMultiLang");
        assert_eq!(t.kind, AttributeKind::MultiEnum);
        assert!(t.multilang);
        assert!(t.is_list_like());

        let t = AttributeType::parse("text");
        assert_eq!(t.kind, AttributeKind::Text);
        assert!(!t.is_multilingual());
        assert!(!t.is_list_like());

        let t = AttributeType::parse("asset");
        assert_eq!(t.kind, AttributeKind::Other("asset".to_string()));
    }

    #[test]
    fn test_attribute_type_display() {
        for raw in ["array", "arrayMultiLang", "multiEnum", "textMultiLang", "asset"] {
            assert_eq!(AttributeType::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_record_type_parse() {
        assert_eq!(RecordType::parse("configurable"), Some(RecordType::Configurable));
        assert_eq!(RecordType::parse("variant"), Some(RecordType::Variant));
        assert_eq!(RecordType::parse("configurableProduct"), None);
        for kind in [RecordType::Simple, RecordType::Configurable, RecordType::Variant] {
            assert_eq!(RecordType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RecordType::parse("bundle"), None);
    }

    #[test]
    fn test_raw_value_by_language() {
        let en = Language::new("en_US", "EnUs");
        let de = Language::new("de_DE", "DeDe");
        let value = AttributeValue::global("v1", "a1", AttributeType::parse("textMultiLang"), Some("x"))
            .with_localized("EnUs", Some("hello"));

        assert_eq!(value.raw(None), Some("x"));
        assert_eq!(value.raw(Some(&en)), Some("hello"));
        assert_eq!(value.raw(Some(&de)), None);
        assert!(value.is_multilingual);
    }

    #[test]
    fn test_active_languages_respects_switch() {
        let mut snapshot = RecordSnapshot {
            record: Record::new("p1", RecordType::Simple),
            attribute_values: vec![],
            required_fields: vec![],
            languages: vec![Language::new("en_US", "EnUs")],
            multilingual_enabled: false,
        };
        assert!(snapshot.active_languages().is_empty());

        snapshot.multilingual_enabled = true;
        assert_eq!(snapshot.active_languages().len(), 1);
    }
}
