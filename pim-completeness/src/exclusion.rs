//! Attribute requirements waived for configurable records
//!
//! A configurable parent is not held responsible for an attribute that its
//! variants supply themselves.

use crate::types::Record;
use std::collections::BTreeSet;

/// Attribute ids overridden at variant level
///
/// Union of every variant's override ids, deduplicated. Empty for anything
/// that is not a configurable record.
pub fn exclude(record: &Record) -> BTreeSet<String> {
    if !record.is_configurable() {
        return BTreeSet::new();
    }

    record
        .variants
        .iter()
        .flat_map(|variant| variant.attribute_ids.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordType;

    #[test]
    fn test_union_of_variant_overrides() {
        let record = Record::new("p1", RecordType::Configurable)
            .with_variant("v1", &["color", "size"])
            .with_variant("v2", &["size", "weight"]);

        let excluded = exclude(&record);

        assert_eq!(excluded.len(), 3);
        assert!(excluded.contains("color"));
        assert!(excluded.contains("size"));
        assert!(excluded.contains("weight"));
    }

    #[test]
    fn test_configurable_without_variants() {
        let record = Record::new("p1", RecordType::Configurable);
        assert!(exclude(&record).is_empty());
    }

    #[test]
    fn test_non_configurable_records_exclude_nothing() {
        // Variant lists on other record types are ignored
        let simple = Record::new("p1", RecordType::Simple).with_variant("v1", &["color"]);
        let variant = Record::new("p2", RecordType::Variant).with_variant("v1", &["color"]);

        assert!(exclude(&simple).is_empty());
        assert!(exclude(&variant).is_empty());
    }
}
