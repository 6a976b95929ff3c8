//! Per-item extraction outcomes and the per-adapter report built from them

use serde::Serialize;

use super::RawRecord;

/// Result of one item's extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ItemOutcome {
    Extracted {
        parcel_id: String,
        records: Vec<RawRecord>,
    },
    Failed(ItemFailure),
}

impl ItemOutcome {
    pub fn parcel_id(&self) -> &str {
        match self {
            Self::Extracted { parcel_id, .. } => parcel_id,
            Self::Failed(failure) => &failure.parcel_id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A logged, non-fatal failure for a single work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub parcel_id: String,
    pub adapter: String,
    pub reason: String,
    /// Error screenshot, when one could be captured
    pub artifact_path: Option<String>,
}

impl ItemFailure {
    pub fn new(parcel_id: impl Into<String>, adapter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            parcel_id: parcel_id.into(),
            adapter: adapter.into(),
            reason: reason.into(),
            artifact_path: None,
        }
    }

    #[must_use]
    pub fn with_artifact(mut self, artifact_path: Option<String>) -> Self {
        self.artifact_path = artifact_path;
        self
    }
}

/// Everything one adapter produced for its group, in item order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterReport {
    pub adapter: String,
    pub outcomes: Vec<ItemOutcome>,
    /// Set when the browser session died mid-group; later items were not attempted
    pub session_lost: Option<String>,
}

impl AdapterReport {
    pub fn new(adapter: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            outcomes: Vec::new(),
            session_lost: None,
        }
    }

    pub fn push(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn records(&self) -> impl Iterator<Item = &RawRecord> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                ItemOutcome::Extracted { records, .. } => Some(records),
                ItemOutcome::Failed(_) => None,
            })
            .flatten()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            ItemOutcome::Failed(failure) => Some(failure),
            ItemOutcome::Extracted { .. } => None,
        })
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failure()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Split into the flat record list and the failure list.
    pub fn into_parts(self) -> (Vec<RawRecord>, Vec<ItemFailure>) {
        let mut records = Vec::new();
        let mut failures = Vec::new();
        for outcome in self.outcomes {
            match outcome {
                ItemOutcome::Extracted { records: extracted, .. } => records.extend(extracted),
                ItemOutcome::Failed(failure) => failures.push(failure),
            }
        }
        (records, failures)
    }
}
