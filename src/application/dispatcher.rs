//! Dispatcher: groups work items by site and drives each group's adapter
//! through the run's single browser session
//!
//! Groups run one after another in registry order. Per-item failures stay
//! inside the adapter's report, a failed entry/gating costs only its group,
//! and a lost session ends the run with whatever was gathered so far.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::session_manager::SessionManager;
use crate::adapters::{AdapterFactory, AdapterRegistry, RegistryEntry, ScrapeContext, SiteAdapterFactory};
use crate::domain::{AdapterKey, AdapterReport, ItemFailure, RawRecord, WorkItem};
use crate::infrastructure::artifacts::ArtifactWriter;
use crate::infrastructure::browser::{BrowserSession, SessionError, WaitSettings};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Could not open a browser session: {0}")]
    SessionStart(#[source] SessionError),
}

/// Work items that share one registry entry, in input order.
#[derive(Debug, Clone)]
pub struct WorkGroup<'r> {
    pub entry: &'r RegistryEntry,
    pub items: Vec<WorkItem>,
}

/// Grouping of a batch against a registry.
#[derive(Debug, Clone, Default)]
pub struct DispatchPlan<'r> {
    /// Non-empty groups in registry order
    pub groups: Vec<WorkGroup<'r>>,
    /// Items no registry entry claims
    pub unmapped: Vec<WorkItem>,
}

/// Group `items` by adapter key. Item order inside a group is preserved,
/// group order follows the registry.
pub fn plan_dispatch<'r>(registry: &'r AdapterRegistry, items: &[WorkItem]) -> DispatchPlan<'r> {
    let mut by_position: BTreeMap<usize, Vec<WorkItem>> = BTreeMap::new();
    let mut unmapped = Vec::new();

    for item in items {
        match registry.position(&item.adapter_key()) {
            Some(position) => by_position.entry(position).or_default().push(item.clone()),
            None => unmapped.push(item.clone()),
        }
    }

    let groups = by_position
        .into_iter()
        .map(|(position, items)| WorkGroup {
            entry: &registry.entries()[position],
            items,
        })
        .collect();

    DispatchPlan { groups, unmapped }
}

/// A group that never reached its item loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFailure {
    pub key: AdapterKey,
    pub adapter: String,
    pub reason: String,
    pub skipped_items: usize,
}

/// Everything one `run` produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub run_id: Uuid,
    /// All extracted records, grouped by adapter in dispatch order
    pub records: Vec<RawRecord>,
    pub failures: Vec<ItemFailure>,
    pub failed_groups: Vec<GroupFailure>,
    pub unmapped: Vec<WorkItem>,
    /// Set when the browser session died and the run stopped early
    pub session_error: Option<String>,
    pub groups_dispatched: usize,
}

impl DispatchReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            ..Self::default()
        }
    }

    fn absorb(&mut self, report: AdapterReport) {
        let (records, failures) = report.into_parts();
        self.records.extend(records);
        self.failures.extend(failures);
    }

    pub fn is_complete(&self) -> bool {
        self.session_error.is_none()
    }
}

pub struct Dispatcher {
    registry: Arc<AdapterRegistry>,
    factory: Arc<dyn AdapterFactory>,
    sessions: SessionManager,
    artifacts: ArtifactWriter,
    waits: WaitSettings,
}

impl Dispatcher {
    pub fn new(registry: Arc<AdapterRegistry>, sessions: SessionManager, artifacts: ArtifactWriter) -> Self {
        Self {
            registry,
            factory: Arc::new(SiteAdapterFactory),
            sessions,
            artifacts,
            waits: WaitSettings::default(),
        }
    }

    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn AdapterFactory>) -> Self {
        self.factory = factory;
        self
    }

    #[must_use]
    pub fn with_waits(mut self, waits: WaitSettings) -> Self {
        self.waits = waits;
        self
    }

    /// Scrape every mappable item. Only a session that cannot be opened at
    /// all is an error; everything else is reported.
    pub async fn run(&self, items: &[WorkItem]) -> Result<DispatchReport, DispatchError> {
        let run_id = Uuid::new_v4();
        let plan = plan_dispatch(&self.registry, items);
        let mut report = DispatchReport::new(run_id);

        if !plan.unmapped.is_empty() {
            let mut unmapped_keys: HashMap<AdapterKey, usize> = HashMap::new();
            for item in &plan.unmapped {
                *unmapped_keys.entry(item.adapter_key()).or_default() += 1;
            }
            warn!(%run_id, unmapped = plan.unmapped.len(), "Skipping items with no registered site: {:?}", unmapped_keys);
        }
        report.unmapped = plan.unmapped;

        info!(
            %run_id,
            items = items.len(),
            groups = plan.groups.len(),
            "Dispatch planned"
        );
        if plan.groups.is_empty() {
            return Ok(report);
        }

        let lease = self.sessions.acquire().await.map_err(DispatchError::SessionStart)?;
        self.drive_groups(lease.session(), &plan.groups, &mut report).await;
        lease.release().await;

        info!(
            %run_id,
            records = report.records.len(),
            failures = report.failures.len(),
            failed_groups = report.failed_groups.len(),
            unmapped = report.unmapped.len(),
            "Dispatch finished"
        );
        Ok(report)
    }

    async fn drive_groups(&self, session: &dyn BrowserSession, groups: &[WorkGroup<'_>], report: &mut DispatchReport) {
        let ctx = ScrapeContext::new(session, &self.artifacts, self.waits);

        for group in groups {
            let key = group.entry.key();
            let adapter = match self.factory.build(group.entry) {
                Ok(adapter) => adapter,
                Err(err) => {
                    error!(%key, "Could not build adapter: {}", err);
                    report.failed_groups.push(GroupFailure {
                        key,
                        adapter: group.entry.adapter_name(),
                        reason: err.to_string(),
                        skipped_items: group.items.len(),
                    });
                    continue;
                }
            };

            info!(%key, adapter = adapter.name(), items = group.items.len(), "Dispatching group");
            report.groups_dispatched += 1;

            match adapter.scrape(&ctx, &group.items).await {
                Ok(adapter_report) => {
                    info!(
                        adapter = adapter.name(),
                        succeeded = adapter_report.succeeded(),
                        failed = adapter_report.failed(),
                        "Group finished"
                    );
                    let session_lost = adapter_report.session_lost.clone();
                    report.absorb(adapter_report);
                    if let Some(reason) = session_lost {
                        error!(adapter = adapter.name(), "Browser session lost, stopping run: {}", reason);
                        report.session_error = Some(reason);
                        return;
                    }
                }
                Err(err) => {
                    error!(adapter = adapter.name(), "Group skipped: {}", err);
                    let fatal = err.is_session_fatal();
                    report.failed_groups.push(GroupFailure {
                        key,
                        adapter: adapter.name().to_string(),
                        reason: err.to_string(),
                        skipped_items: group.items.len(),
                    });
                    if fatal {
                        report.session_error = Some(err.to_string());
                        return;
                    }
                }
            }
        }
    }
}
