//! Effective channel set of a record

use crate::types::{Channel, Record, RecordType};

/// Channels a record is scored against
///
/// A variant linked to a configurable parent inherits the parent's channels
/// unless it declares its own channel relation. Everything else uses its own
/// channels. Never fails; an empty list means no channel scores.
pub fn resolve_channels(record: &Record) -> Vec<Channel> {
    if record.record_type == RecordType::Variant && !record.has_own_channels {
        if let Some(parent) = &record.parent {
            if parent.record_type == RecordType::Configurable {
                return parent.channels.clone();
            }
        }
    }

    record.channels.clone()
}
