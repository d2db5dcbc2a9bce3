//! Emptiness evaluation for fields and attribute values
//!
//! Stored values follow the catalog's loose-typing convention: null, `false`,
//! numeric zero, `""`, `"0"` and empty collections all count as not populated.

use crate::types::{AttributeValue, Language, Record};
use serde_json::Value;
use tracing::warn;

/// What is being checked
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// A plain record field, by storage name
    Field(&'a str),
    /// A required attribute value of the record
    Attribute(&'a AttributeValue),
}

/// Decides whether fields and attribute values of one record are populated
pub struct EmptinessEvaluator<'r> {
    record: &'r Record,
}

impl<'r> EmptinessEvaluator<'r> {
    pub fn new(record: &'r Record) -> Self {
        Self { record }
    }

    /// `true` when the subject is not populated in the given language
    ///
    /// Without a language, plain (non-localized) storage is checked.
    pub fn is_empty(&self, subject: Subject<'_>, language: Option<&Language>) -> bool {
        match subject {
            Subject::Field(name) => self.field_is_empty(name, language),
            Subject::Attribute(value) => attribute_is_empty(value, language),
        }
    }

    fn field_is_empty(&self, name: &str, language: Option<&Language>) -> bool {
        let key = storage_key(name, language);
        self.record.field(&key).map_or(true, is_falsy)
    }
}

/// Field name with the language suffix appended
pub fn storage_key(name: &str, language: Option<&Language>) -> String {
    match language {
        Some(language) => format!("{}{}", name, language.suffix()),
        None => name.to_string(),
    }
}

/// Attribute value emptiness after decoding by declared type
///
/// List-like types hold JSON; a value that fails to decode counts as empty.
pub fn attribute_is_empty(value: &AttributeValue, language: Option<&Language>) -> bool {
    let Some(raw) = value.raw(language) else {
        return true;
    };

    if value.attribute_type.is_list_like() {
        match serde_json::from_str::<Value>(raw) {
            Ok(decoded) => is_falsy(&decoded),
            Err(e) => {
                warn!(
                    value_id = %value.id,
                    attribute_type = %value.attribute_type,
                    error = %e,
                    "Malformed list value, treating as empty"
                );
                true
            }
        }
    } else {
        is_falsy_str(raw)
    }
}

/// Loose-typing falsiness of a stored value
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
        Value::String(s) => is_falsy_str(s),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn is_falsy_str(s: &str) -> bool {
    s.is_empty() || s == "0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeType, RecordType};
    use serde_json::json;

    fn en() -> Language {
        Language::new("en_US", "EnUs")
    }

    #[test]
    fn test_falsy_values() {
        for value in [
            json!(null),
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!("0"),
            json!([]),
            json!({}),
        ] {
            assert!(is_falsy(&value), "{} should be falsy", value);
        }

        for value in [
            json!(true),
            json!(1),
            json!(-0.5),
            json!("x"),
            json!("0.0"),
            json!(" "),
            json!([0]),
            json!({"a": null}),
        ] {
            assert!(!is_falsy(&value), "{} should be populated", value);
        }
    }

    #[test]
    fn test_field_checks_suffixed_storage() {
        let record = Record::new("p1", RecordType::Simple)
            .with_field("name", json!("Chair"))
            .with_field("nameEnUs", json!(""));
        let evaluator = EmptinessEvaluator::new(&record);

        assert!(!evaluator.is_empty(Subject::Field("name"), None));
        assert!(evaluator.is_empty(Subject::Field("name"), Some(&en())));
        assert!(evaluator.is_empty(Subject::Field("sku"), None));
    }

    #[test]
    fn test_collection_field() {
        let record = Record::new("p1", RecordType::Simple)
            .with_field("categories", json!([]))
            .with_field("tags", json!(["new"]));
        let evaluator = EmptinessEvaluator::new(&record);

        assert!(evaluator.is_empty(Subject::Field("categories"), None));
        assert!(!evaluator.is_empty(Subject::Field("tags"), None));
    }

    #[test]
    fn test_list_attribute_is_decoded() {
        let record = Record::new("p1", RecordType::Simple);
        let evaluator = EmptinessEvaluator::new(&record);

        let empty = AttributeValue::global("v1", "a1", AttributeType::parse("multiEnum"), Some("[]"));
        let filled =
            AttributeValue::global("v2", "a2", AttributeType::parse("array"), Some(r#"["red"]"#));
        let null = AttributeValue::global("v3", "a3", AttributeType::parse("array"), Some("null"));

        assert!(evaluator.is_empty(Subject::Attribute(&empty), None));
        assert!(!evaluator.is_empty(Subject::Attribute(&filled), None));
        assert!(evaluator.is_empty(Subject::Attribute(&null), None));
    }

    #[test]
    fn test_malformed_list_is_empty() {
        let value =
            AttributeValue::global("v1", "a1", AttributeType::parse("array"), Some("[\"red\""));
        assert!(attribute_is_empty(&value, None));
    }

    #[test]
    fn test_scalar_attribute_compared_directly() {
        let text = AttributeValue::global("v1", "a1", AttributeType::parse("text"), Some("[]"));
        let zero = AttributeValue::global("v2", "a2", AttributeType::parse("int"), Some("0"));
        let missing = AttributeValue::global("v3", "a3", AttributeType::parse("text"), None);

        // "[]" is a populated string for a non-list type
        assert!(!attribute_is_empty(&text, None));
        assert!(attribute_is_empty(&zero, None));
        assert!(attribute_is_empty(&missing, None));
    }

    #[test]
    fn test_localized_attribute() {
        let value = AttributeValue::global(
            "v1",
            "a1",
            AttributeType::parse("arrayMultiLang"),
            Some(r#"["a"]"#),
        )
        .with_localized("EnUs", Some("[]"));

        assert!(!attribute_is_empty(&value, None));
        assert!(attribute_is_empty(&value, Some(&en())));
        assert!(attribute_is_empty(&value, Some(&Language::new("de_DE", "DeDe"))));
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(storage_key("name", None), "name");
        assert_eq!(storage_key("name", Some(&en())), "nameEnUs");
    }
}
