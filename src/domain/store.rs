//! Persistence boundary for normalized valuations

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

use super::NormalizedRecord;

/// Timestamp layout of the `LastScraped` column
pub const LAST_SCRAPED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row written through [`ValuationStore::upsert`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationUpsert {
    pub parcel_id: String,
    pub land_value: f64,
    pub building_value: f64,
    pub total_value: f64,
    pub assessment_year: Option<i32>,
    pub last_scraped: NaiveDateTime,
    pub artifact_path: Option<String>,
}

impl ValuationUpsert {
    pub fn from_record(record: &NormalizedRecord, last_scraped: NaiveDateTime) -> Self {
        Self {
            parcel_id: record.parcel_id.clone(),
            land_value: record.land_value,
            building_value: record.building_value,
            total_value: record.total_value,
            assessment_year: record.assessment_year,
            last_scraped,
            artifact_path: record.artifact_path.clone(),
        }
    }

    pub fn last_scraped_text(&self) -> String {
        self.last_scraped.format(LAST_SCRAPED_FORMAT).to_string()
    }
}

/// Valuation table keyed by parcel id; writing an existing id replaces it.
#[async_trait]
pub trait ValuationStore: Send + Sync {
    async fn upsert(&self, row: &ValuationUpsert) -> anyhow::Result<()>;
}
