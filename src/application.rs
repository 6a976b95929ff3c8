//! Application layer: session lifecycle, dispatch, normalization and the run pipeline

pub mod dispatcher;
pub mod normalizer;
pub mod pipeline;
pub mod session_manager;

pub use dispatcher::{DispatchError, DispatchPlan, DispatchReport, Dispatcher, GroupFailure, WorkGroup, plan_dispatch};
pub use normalizer::{normalize, normalize_all, parse_amount, parse_historical_row, parse_year};
pub use pipeline::{RunSummary, ValuationPipeline};
pub use session_manager::{SessionLease, SessionManager};
