//! The site adapter contract
//!
//! An adapter knows one site's navigation and extraction protocol. The
//! shared browser session is lent to it through [`ScrapeContext`] for the
//! duration of one `scrape` call.

use async_trait::async_trait;
use std::path::Path;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::error::{AdapterError, ScrapeError};
use crate::domain::{AdapterReport, ItemFailure, ItemOutcome, RawRecord, WorkItem};
use crate::infrastructure::artifacts::ArtifactWriter;
use crate::infrastructure::browser::wait::resize_to_document;
use crate::infrastructure::browser::{BrowserSession, WaitSettings};

/// What an adapter gets to work with during one `scrape` call.
pub struct ScrapeContext<'a> {
    session: &'a dyn BrowserSession,
    artifacts: &'a ArtifactWriter,
    waits: WaitSettings,
}

impl<'a> ScrapeContext<'a> {
    pub fn new(session: &'a dyn BrowserSession, artifacts: &'a ArtifactWriter, waits: WaitSettings) -> Self {
        Self {
            session,
            artifacts,
            waits,
        }
    }

    pub fn session(&self) -> &'a dyn BrowserSession {
        self.session
    }

    pub fn waits(&self) -> &WaitSettings {
        &self.waits
    }

    /// Fixed pause for pages that keep rendering after the triggering action
    pub async fn settle(&self) {
        if !self.waits.settle.is_zero() {
            sleep(self.waits.settle).await;
        }
    }

    /// Full-page screenshot for a successful extraction; returns the path.
    /// `sequence` distinguishes several records found for one parcel.
    pub async fn capture(&self, parcel_id: &str, sequence: usize) -> Result<String, ScrapeError> {
        let path = self.artifacts.screenshot_path(parcel_id, sequence);
        self.save_screenshot(&path).await
    }

    /// Best-effort `error_<id>.png`; never fails the caller.
    pub async fn capture_error(&self, parcel_id: &str) -> Option<String> {
        let path = self.artifacts.error_screenshot_path(parcel_id);
        match self.save_screenshot(&path).await {
            Ok(saved) => Some(saved),
            Err(err) => {
                warn!(parcel_id, "Could not capture error screenshot: {}", err);
                None
            }
        }
    }

    async fn save_screenshot(&self, path: &Path) -> Result<String, ScrapeError> {
        if let Err(err) = resize_to_document(self.session).await {
            if err.is_session_fatal() {
                return Err(err.into());
            }
            debug!("Window resize before screenshot failed: {}", err);
        }
        let png = self.session.screenshot_png().await?;
        self.artifacts
            .write(path, &png)
            .await
            .map_err(|e| ScrapeError::artifact(path, &e))?;
        Ok(path.display().to_string())
    }
}

/// One site's navigation and extraction protocol.
///
/// Implementors provide the entry point and the per-item extraction;
/// `scrape` sequences entry, gating and the item loop.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Name used in logs and failure reports
    fn name(&self) -> &str;

    /// Navigate the shared session to the site's start page.
    async fn go_to_entry_point(&self, ctx: &ScrapeContext<'_>) -> Result<(), AdapterError>;

    /// Dismiss consent/disclaimer interstitials. Must be safe to call again.
    async fn handle_gating(&self, _ctx: &ScrapeContext<'_>) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Search for one parcel and read its valuations.
    async fn scrape_item(&self, ctx: &ScrapeContext<'_>, item: &WorkItem) -> Result<Vec<RawRecord>, ScrapeError>;

    /// Run every item in order. A failing item is logged, screenshotted
    /// and recorded; the loop only stops early when the session is gone.
    async fn scrape_items(&self, ctx: &ScrapeContext<'_>, items: &[WorkItem]) -> AdapterReport {
        let mut report = AdapterReport::new(self.name());

        for item in items {
            match self.scrape_item(ctx, item).await {
                Ok(records) => {
                    info!(
                        adapter = self.name(),
                        parcel_id = %item.parcel_id,
                        records = records.len(),
                        "Extracted parcel"
                    );
                    report.push(ItemOutcome::Extracted {
                        parcel_id: item.parcel_id.clone(),
                        records,
                    });
                }
                Err(err) if err.is_session_fatal() => {
                    warn!(adapter = self.name(), parcel_id = %item.parcel_id, "Session lost: {}", err);
                    report.push(ItemOutcome::Failed(ItemFailure::new(
                        &item.parcel_id,
                        self.name(),
                        err.to_string(),
                    )));
                    report.session_lost = Some(err.to_string());
                    break;
                }
                Err(err) => {
                    warn!(adapter = self.name(), parcel_id = %item.parcel_id, "Error processing parcel: {}", err);
                    let artifact = ctx.capture_error(&item.parcel_id).await;
                    report.push(ItemOutcome::Failed(
                        ItemFailure::new(&item.parcel_id, self.name(), err.to_string()).with_artifact(artifact),
                    ));
                }
            }
        }

        report
    }

    /// Entry point, gating, then the item loop; each exactly once.
    async fn scrape(&self, ctx: &ScrapeContext<'_>, items: &[WorkItem]) -> Result<AdapterReport, AdapterError> {
        self.go_to_entry_point(ctx).await?;
        self.handle_gating(ctx).await?;
        Ok(self.scrape_items(ctx, items).await)
    }
}
