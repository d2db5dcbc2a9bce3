//! Completeness service
//!
//! Orchestrates one scoring pass per record: read a snapshot, compute, then
//! write. The write happens only after the whole result is composed; a
//! failed read leaves the stored scores untouched.

use crate::aggregator::calculate;
use crate::error::Result;
use crate::repository::{AttributeValueRepository, LanguageProvider, RecordRepository, ResultWriter};
use crate::types::{CompletenessResult, EntityRef, RecordSnapshot};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a bulk recalculation
#[derive(Debug, Default)]
pub struct BulkReport {
    /// Records scored and persisted
    pub scored: usize,
    /// Records that failed, with the error message
    pub failures: Vec<(String, String)>,
}

impl BulkReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Scores records and stores the results
#[derive(Clone)]
pub struct CompletenessService {
    records: Arc<dyn RecordRepository>,
    attribute_values: Arc<dyn AttributeValueRepository>,
    languages: Arc<dyn LanguageProvider>,
    writer: Arc<dyn ResultWriter>,
}

impl CompletenessService {
    pub fn new(
        records: Arc<dyn RecordRepository>,
        attribute_values: Arc<dyn AttributeValueRepository>,
        languages: Arc<dyn LanguageProvider>,
        writer: Arc<dyn ResultWriter>,
    ) -> Self {
        Self {
            records,
            attribute_values,
            languages,
            writer,
        }
    }

    /// Service over a single backend implementing every collaborator
    pub fn from_catalog<C>(catalog: Arc<C>) -> Self
    where
        C: RecordRepository + AttributeValueRepository + LanguageProvider + ResultWriter + 'static,
    {
        Self::new(catalog.clone(), catalog.clone(), catalog.clone(), catalog)
    }

    /// Read everything one pass needs
    pub async fn load_snapshot(&self, record_id: &str) -> Result<RecordSnapshot> {
        let (record, attribute_values, required_fields, languages, multilingual_enabled) = tokio::try_join!(
            self.records.load_record(record_id),
            self.attribute_values.find_required_attribute_values(record_id),
            self.records.required_fields(),
            self.languages.list_languages(),
            self.languages.is_multilingual_enabled(),
        )?;

        Ok(RecordSnapshot {
            record,
            attribute_values,
            required_fields,
            languages,
            multilingual_enabled,
        })
    }

    /// Compute without persisting
    pub async fn preview(&self, record_id: &str) -> Result<CompletenessResult> {
        let snapshot = self.load_snapshot(record_id).await?;
        Ok(calculate(&snapshot))
    }

    /// Score one record and persist the result
    pub async fn recalculate(&self, record_id: &str) -> Result<CompletenessResult> {
        let result = self.preview(record_id).await?;
        self.writer.persist(record_id, &result).await?;

        debug!(
            record_id,
            complete_global = result.complete_global,
            "Recalculated completeness"
        );
        Ok(result)
    }

    /// Rescore the record affected by a change to `entity`
    pub async fn recalculate_for(&self, entity: &EntityRef) -> Result<CompletenessResult> {
        let record_id = self.records.resolve_target(entity).await?;
        self.recalculate(&record_id).await
    }

    /// Rescore every record, at most `max_concurrent` at a time
    ///
    /// Per-record failures are collected in the report; only failing to list
    /// the records aborts the run.
    pub async fn recalculate_all(&self, max_concurrent: usize) -> Result<BulkReport> {
        let record_ids = self.records.list_record_ids().await?;
        let total = record_ids.len();
        info!(total, max_concurrent, "Starting bulk completeness recalculation");

        let outcomes: Vec<_> = stream::iter(record_ids)
            .map(|record_id| async move {
                let outcome = self.recalculate(&record_id).await;
                (record_id, outcome)
            })
            .buffer_unordered(max_concurrent.max(1))
            .collect()
            .await;

        let mut report = BulkReport::default();
        for (record_id, outcome) in outcomes {
            match outcome {
                Ok(_) => report.scored += 1,
                Err(e) => {
                    warn!(record_id = %record_id, error = %e, "Completeness recalculation failed");
                    report.failures.push((record_id, e.to_string()));
                }
            }
        }

        info!(
            scored = report.scored,
            failed = report.failures.len(),
            "Bulk completeness recalculation finished"
        );
        Ok(report)
    }
}
