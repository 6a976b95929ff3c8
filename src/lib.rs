//! Parcel Valuation Scraper - multi-county assessor site scraping engine
//!
//! Work items (parcel id + county + state) are grouped by site, each group is
//! driven through its site adapter over one shared WebDriver session, and the
//! extracted valuations are normalized and handed to a valuation store.

// Module declarations
pub mod adapters;
pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;

pub use adapters::{AdapterRegistry, AdapterVariant, RegistryEntry, SiteAdapter};
pub use application::{DispatchReport, Dispatcher, RunSummary, SessionManager, ValuationPipeline};
pub use domain::{AdapterKey, NormalizedRecord, RawRecord, WorkItem, parse_work_items};
