//! Requirement collection
//!
//! Turns one record snapshot into a [`RequirementBucket`]. Pure: everything the
//! pass needs is already in the snapshot.
//!
//! # Routing
//! - Base item of every required attribute value: `attrs_global` (Global
//!   scope) or `attrs_channel[channel_id]` for each of its channels (Channel
//!   scope), and always `local_complete`
//! - Multilingual values repeat that routing once per active language, and
//!   additionally land in `multi_lang[language_code]`
//! - Required fields: base item in `fields`; multilingual fields add one item
//!   per active language to `multi_lang` only

use crate::emptiness::{EmptinessEvaluator, Subject};
use crate::exclusion::exclude;
use crate::types::{
    AttributeValue, Language, RecordSnapshot, RequirementBucket, RequirementItem, Scope,
};
use tracing::debug;

/// Build the requirement buckets of one record
pub fn collect(snapshot: &RecordSnapshot) -> RequirementBucket {
    let record = &snapshot.record;
    let evaluator = EmptinessEvaluator::new(record);
    let languages = snapshot.active_languages();
    let excluded = exclude(record);

    let mut bucket = RequirementBucket::default();
    let mut skipped = 0usize;

    for value in &snapshot.attribute_values {
        if excluded.contains(&value.attribute_id) {
            skipped += 1;
            continue;
        }

        let is_empty = evaluator.is_empty(Subject::Attribute(value), None);
        route_attribute(&mut bucket, RequirementItem::attribute(value, is_empty, false), value);

        if value.is_multilingual {
            for language in languages {
                let is_empty = evaluator.is_empty(Subject::Attribute(value), Some(language));
                let item = RequirementItem::attribute(value, is_empty, true);
                push_language_item(&mut bucket, language, item.clone());
                route_attribute(&mut bucket, item, value);
            }
        }
    }

    for field in &snapshot.required_fields {
        let is_empty = evaluator.is_empty(Subject::Field(&field.name), None);
        bucket
            .fields
            .push(RequirementItem::field(&field.name, is_empty, false));

        if field.multilingual {
            for language in languages {
                let is_empty = evaluator.is_empty(Subject::Field(&field.name), Some(language));
                push_language_item(
                    &mut bucket,
                    language,
                    RequirementItem::field(&field.name, is_empty, true),
                );
            }
        }
    }

    debug!(
        record_id = %record.id,
        excluded = skipped,
        fields = bucket.fields.len(),
        global = bucket.attrs_global.len(),
        channels = bucket.attrs_channel.len(),
        languages = bucket.multi_lang.len(),
        total = bucket.local_complete.len(),
        "Collected requirement items"
    );

    bucket
}

fn route_attribute(bucket: &mut RequirementBucket, item: RequirementItem, value: &AttributeValue) {
    match value.scope {
        Scope::Global => bucket.attrs_global.push(item.clone()),
        Scope::Channel => {
            for channel_id in &item.channels {
                bucket
                    .attrs_channel
                    .entry(channel_id.clone())
                    .or_default()
                    .push(item.clone());
            }
        }
    }
    bucket.local_complete.push(item);
}

fn push_language_item(bucket: &mut RequirementBucket, language: &Language, item: RequirementItem) {
    bucket
        .multi_lang
        .entry(language.code.clone())
        .or_default()
        .push(item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeType, Record, RecordType, RequiredField};
    use serde_json::json;

    fn snapshot(record: Record) -> RecordSnapshot {
        RecordSnapshot {
            record,
            attribute_values: vec![],
            required_fields: vec![],
            languages: vec![
                Language::new("en_US", "EnUs"),
                Language::new("de_DE", "DeDe"),
            ],
            multilingual_enabled: false,
        }
    }

    fn text(id: &str, attribute_id: &str, raw: Option<&str>) -> AttributeValue {
        AttributeValue::global(id, attribute_id, AttributeType::parse("text"), raw)
    }

    #[test]
    fn test_no_requirements_gives_empty_buckets() {
        let bucket = collect(&snapshot(Record::new("p1", RecordType::Simple)));
        assert_eq!(bucket, RequirementBucket::default());
    }

    #[test]
    fn test_scope_routing() {
        let mut snap = snapshot(Record::new("p1", RecordType::Simple));
        snap.attribute_values = vec![
            text("v1", "color", Some("red")),
            text("v2", "price", None).in_channels(&["ch-web", "ch-print"]),
        ];

        let bucket = collect(&snap);

        assert_eq!(bucket.attrs_global.len(), 1);
        assert_eq!(bucket.attrs_global[0].id, "v1");
        assert!(!bucket.attrs_global[0].is_empty);

        assert_eq!(bucket.attrs_channel.len(), 2);
        assert_eq!(bucket.attrs_channel["ch-web"][0].id, "v2");
        assert!(bucket.attrs_channel["ch-print"][0].is_empty);

        // A channel item is never also global
        assert!(bucket.attrs_global.iter().all(|item| item.id != "v2"));
        assert_eq!(bucket.local_complete.len(), 2);
    }

    #[test]
    fn test_multilingual_attribute_per_language() {
        let mut snap = snapshot(Record::new("p1", RecordType::Simple));
        snap.multilingual_enabled = true;
        snap.attribute_values = vec![AttributeValue::global(
            "v1",
            "title",
            AttributeType::parse("textMultiLang"),
            Some("Chair"),
        )
        .with_localized("EnUs", Some("Chair"))];

        let bucket = collect(&snap);

        let language_items: usize = bucket.multi_lang.values().map(Vec::len).sum();
        assert_eq!(language_items, 2);
        assert_eq!(bucket.local_complete.len(), 3);
        assert_eq!(
            bucket.local_complete.iter().filter(|i| !i.is_multi_lang).count(),
            1
        );

        assert!(!bucket.multi_lang["EnUs"][0].is_empty);
        assert!(bucket.multi_lang["DeDe"][0].is_empty);
    }

    #[test]
    fn test_languages_ignored_when_catalog_not_multilingual() {
        let mut snap = snapshot(Record::new("p1", RecordType::Simple));
        snap.attribute_values = vec![AttributeValue::global(
            "v1",
            "title",
            AttributeType::parse("textMultiLang"),
            Some("Chair"),
        )];
        snap.required_fields = vec![RequiredField::multilingual("name")];

        let bucket = collect(&snap);

        assert!(bucket.multi_lang.is_empty());
        assert_eq!(bucket.local_complete.len(), 1);
        assert_eq!(bucket.fields.len(), 1);
    }

    #[test]
    fn test_configurable_exclusion() {
        let record = Record::new("p1", RecordType::Configurable)
            .with_variant("v1", &["size"])
            .with_variant("v2", &["size"]);
        let mut snap = snapshot(record);
        snap.attribute_values = vec![
            text("val-size", "size", None),
            text("val-color", "color", Some("red")),
        ];

        let bucket = collect(&snap);

        assert_eq!(bucket.local_complete.len(), 1);
        assert!(bucket.local_complete.iter().all(|item| item.id != "val-size"));
    }

    #[test]
    fn test_multilingual_field_items_only_in_language_bucket() {
        let record = Record::new("p1", RecordType::Simple)
            .with_field("name", json!("Chair"))
            .with_field("nameEnUs", json!("Chair"))
            .with_field("sku", json!(""));
        let mut snap = snapshot(record);
        snap.multilingual_enabled = true;
        snap.required_fields = vec![RequiredField::multilingual("name"), RequiredField::new("sku")];

        let bucket = collect(&snap);

        assert_eq!(bucket.fields.len(), 2);
        assert!(!bucket.fields[0].is_empty);
        assert!(bucket.fields[1].is_empty);

        assert_eq!(bucket.multi_lang["EnUs"].len(), 1);
        assert!(!bucket.multi_lang["EnUs"][0].is_empty);
        assert!(bucket.multi_lang["DeDe"][0].is_empty);
        assert!(bucket.local_complete.is_empty());
    }
}
