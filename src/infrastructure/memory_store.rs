//! In-memory valuation store used by the CLI and tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{ValuationStore, ValuationUpsert};

#[derive(Debug, Default)]
pub struct InMemoryValuationStore {
    rows: RwLock<BTreeMap<String, ValuationUpsert>>,
}

impl InMemoryValuationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, parcel_id: &str) -> Option<ValuationUpsert> {
        self.rows.read().await.get(parcel_id).cloned()
    }

    /// All rows ordered by parcel id
    pub async fn all(&self) -> Vec<ValuationUpsert> {
        self.rows.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ValuationStore for InMemoryValuationStore {
    async fn upsert(&self, row: &ValuationUpsert) -> anyhow::Result<()> {
        let replaced = self
            .rows
            .write()
            .await
            .insert(row.parcel_id.clone(), row.clone())
            .is_some();
        debug!("Upserted valuation for {} (replaced: {})", row.parcel_id, replaced);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(parcel_id: &str, total: f64) -> ValuationUpsert {
        ValuationUpsert {
            parcel_id: parcel_id.to_string(),
            land_value: 1.0,
            building_value: 2.0,
            total_value: total,
            assessment_year: Some(2024),
            last_scraped: NaiveDate::from_ymd_opt(2024, 5, 1)
                .and_then(|d| d.and_hms_opt(8, 30, 0))
                .unwrap(),
            artifact_path: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_parcel_id() {
        let store = InMemoryValuationStore::new();
        store.upsert(&row("A", 3.0)).await.unwrap();
        store.upsert(&row("A", 9.0)).await.unwrap();
        store.upsert(&row("B", 1.0)).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("A").await.unwrap().total_value, 9.0);
        assert_eq!(store.get("A").await.unwrap().last_scraped_text(), "2024-05-01 08:30:00");
    }
}
