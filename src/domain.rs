//! Domain module - work items, scraped records and extraction outcomes
//!
//! Everything here is a passive data carrier or a boundary trait. The
//! browser-driving code lives in `adapters`, orchestration in `application`.

pub mod adapter_key;
pub mod outcome;
pub mod records;
pub mod store;
pub mod work_item;

pub use adapter_key::AdapterKey;
pub use outcome::{AdapterReport, ItemFailure, ItemOutcome};
pub use records::{HistoricalRow, NormalizedRecord, ParsedHistoricalRow, RawRecord};
pub use store::{ValuationStore, ValuationUpsert};
pub use work_item::{WorkItem, WorkItemError, parse_work_items};
