//! Score aggregation
//!
//! Reduces requirement items to percentages and composes the per-dimension
//! scores of one record. Unweighted: every item counts the same.

use crate::channels::resolve_channels;
use crate::collector::collect;
use crate::types::{
    Channel, CompletenessResult, Language, RecordSnapshot, RequirementBucket, RequirementItem,
};
use std::collections::BTreeMap;

/// Score of a record with nothing required
pub const FULL_SCORE: f64 = 100.0;

/// Percentage of populated items, rounded to 2 decimals
///
/// No items means nothing is missing: `100.0`.
pub fn score<'a, I>(items: I) -> f64
where
    I: IntoIterator<Item = &'a RequirementItem>,
{
    let (total, filled) = items.into_iter().fold((0usize, 0usize), |(total, filled), item| {
        (total + 1, filled + usize::from(!item.is_empty))
    });

    if total == 0 {
        return FULL_SCORE;
    }

    round2(100.0 * filled as f64 / total as f64)
}

/// Round half away from zero to 2 decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compose the result for already collected buckets
///
/// `languages` is `None` for a catalog that is not multilingual; language
/// scores are then omitted entirely.
pub fn compose(
    bucket: &RequirementBucket,
    channels: &[Channel],
    languages: Option<&[Language]>,
) -> CompletenessResult {
    let complete = score(bucket.local_complete.iter().chain(&bucket.fields));
    let complete_global = score(bucket.attrs_global.iter().chain(&bucket.fields));

    let channel_completeness = channels
        .iter()
        .map(|channel| {
            let channel_items = bucket
                .attrs_channel
                .get(&channel.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let value = score(channel_items.iter().chain(&bucket.fields));
            (channel.code.clone(), value)
        })
        .collect::<BTreeMap<_, _>>();

    let language_completeness = languages.map(|languages| {
        languages
            .iter()
            .map(|language| {
                let items = bucket
                    .multi_lang
                    .get(&language.code)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                (language.code.clone(), score(items))
            })
            .collect::<BTreeMap<_, _>>()
    });

    CompletenessResult {
        complete,
        complete_global,
        channel_completeness,
        language_completeness,
    }
}

/// Full scoring pass over one snapshot: collect, resolve channels, compose
pub fn calculate(snapshot: &RecordSnapshot) -> CompletenessResult {
    let bucket = collect(snapshot);
    let channels = resolve_channels(&snapshot.record);
    let languages = snapshot
        .multilingual_enabled
        .then_some(snapshot.languages.as_slice());

    compose(&bucket, &channels, languages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeType, AttributeValue, Record, RecordType, RequiredField};
    use serde_json::json;

    fn item(id: &str, is_empty: bool) -> RequirementItem {
        RequirementItem::field(id, is_empty, false)
    }

    fn snapshot(record: Record) -> RecordSnapshot {
        RecordSnapshot {
            record,
            attribute_values: vec![],
            required_fields: vec![],
            languages: vec![],
            multilingual_enabled: false,
        }
    }

    #[test]
    fn test_score_of_nothing_is_full() {
        let none: [RequirementItem; 0] = [];
        assert_eq!(score(&none), 100.0);
    }

    #[test]
    fn test_score_rounding() {
        let items = [item("a", false), item("b", false), item("c", true)];
        assert_eq!(score(&items), 66.67);

        let items = [item("a", false), item("b", true), item("c", true)];
        assert_eq!(score(&items), 33.33);

        let items = [item("a", true)];
        assert_eq!(score(&items), 0.0);
    }

    #[test]
    fn test_half_of_required_fields() {
        let record = Record::new("p1", RecordType::Simple)
            .with_field("name", json!("Chair"))
            .with_field("sku", json!("CH-1"))
            .with_field("description", json!(""));
        let mut snap = snapshot(record);
        snap.required_fields = ["name", "sku", "description", "ean"]
            .into_iter()
            .map(RequiredField::new)
            .collect();

        let result = calculate(&snap);

        assert_eq!(result.complete_global, 50.0);
        assert_eq!(result.complete, 50.0);
        assert!(result.channel_completeness.is_empty());
        assert!(result.language_completeness.is_none());
    }

    #[test]
    fn test_no_requirements() {
        let web = Channel::new("ch-web", "web", "Web");
        let snap = snapshot(Record::new("p1", RecordType::Simple).with_channels(vec![web]));

        let result = calculate(&snap);

        assert_eq!(result.complete_global, 100.0);
        assert_eq!(result.complete, 100.0);
        assert_eq!(result.channel_completeness["web"], 100.0);
    }

    #[test]
    fn test_channel_score_uses_channel_attributes_and_fields() {
        let web = Channel::new("ch-web", "web", "Web");
        let print = Channel::new("ch-print", "print", "Print");
        let record = Record::new("p1", RecordType::Simple)
            .with_channels(vec![web, print])
            .with_field("name", json!("Chair"))
            .with_field("sku", json!("CH-1"));
        let mut snap = snapshot(record);
        snap.required_fields = vec![RequiredField::new("name"), RequiredField::new("sku")];
        snap.attribute_values = vec![
            AttributeValue::global("v1", "price", AttributeType::parse("float"), None)
                .in_channels(&["ch-web"]),
            // Empty global attribute must not affect channel scores
            AttributeValue::global("v2", "color", AttributeType::parse("text"), None),
        ];

        let result = calculate(&snap);

        assert_eq!(result.channel_completeness["web"], 66.67);
        assert_eq!(result.channel_completeness["print"], 100.0);
        assert_eq!(result.complete_global, 66.67);
        assert_eq!(result.complete, 50.0);
    }

    #[test]
    fn test_language_scores() {
        let record = Record::new("p1", RecordType::Simple).with_field("nameEnUs", json!("Chair"));
        let mut snap = snapshot(record);
        snap.multilingual_enabled = true;
        snap.languages = vec![
            Language::new("en_US", "EnUs"),
            Language::new("de_DE", "DeDe"),
            Language::new("fr_FR", "FrFr"),
        ];
        snap.required_fields = vec![RequiredField::multilingual("name")];
        snap.attribute_values = vec![AttributeValue::global(
            "v1",
            "title",
            AttributeType::parse("textMultiLang"),
            None,
        )
        .with_localized("DeDe", Some("Stuhl"))];

        let result = calculate(&snap);
        let languages = result.language_completeness.unwrap();

        assert_eq!(languages["EnUs"], 50.0);
        assert_eq!(languages["DeDe"], 50.0);
        assert_eq!(languages["FrFr"], 0.0);
    }

    #[test]
    fn test_language_without_items_scores_full() {
        let mut snap = snapshot(Record::new("p1", RecordType::Simple));
        snap.multilingual_enabled = true;
        snap.languages = vec![Language::new("en_US", "EnUs")];

        let result = calculate(&snap);

        assert_eq!(result.language_completeness.unwrap()["EnUs"], 100.0);
    }

    #[test]
    fn test_calculate_is_idempotent() {
        let record = Record::new("p1", RecordType::Simple).with_field("name", json!("Chair"));
        let mut snap = snapshot(record);
        snap.required_fields = vec![RequiredField::new("name"), RequiredField::new("sku")];

        assert_eq!(calculate(&snap), calculate(&snap));
    }
}
