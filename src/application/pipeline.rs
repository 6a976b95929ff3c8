//! Run pipeline: dispatch, normalize, persist

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::dispatcher::{DispatchReport, Dispatcher, GroupFailure};
use super::normalizer::normalize_all;
use crate::domain::{ItemFailure, NormalizedRecord, ValuationStore, ValuationUpsert, WorkItem};

/// What a caller gets back from one full run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub requested: usize,
    pub records: Vec<NormalizedRecord>,
    pub stored: usize,
    pub failures: Vec<ItemFailure>,
    pub failed_groups: Vec<GroupFailure>,
    pub unmapped: Vec<WorkItem>,
    pub session_error: Option<String>,
}

pub struct ValuationPipeline {
    dispatcher: Dispatcher,
    store: Arc<dyn ValuationStore>,
}

impl ValuationPipeline {
    pub fn new(dispatcher: Dispatcher, store: Arc<dyn ValuationStore>) -> Self {
        Self { dispatcher, store }
    }

    pub async fn execute(&self, items: &[WorkItem]) -> Result<RunSummary> {
        let report = self.dispatcher.run(items).await?;
        self.persist(items.len(), report).await
    }

    async fn persist(&self, requested: usize, report: DispatchReport) -> Result<RunSummary> {
        let records = normalize_all(&report.records);
        let last_scraped = scrape_timestamp();

        for record in &records {
            let row = ValuationUpsert::from_record(record, last_scraped);
            self.store
                .upsert(&row)
                .await
                .with_context(|| format!("Failed to store valuation for parcel {}", record.parcel_id))?;
        }
        info!(run_id = %report.run_id, stored = records.len(), "Valuations stored");

        Ok(RunSummary {
            run_id: report.run_id,
            requested,
            stored: records.len(),
            records,
            failures: report.failures,
            failed_groups: report.failed_groups,
            unmapped: report.unmapped,
            session_error: report.session_error,
        })
    }
}

/// Local time truncated to whole seconds, matching the `LastScraped` column
fn scrape_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
