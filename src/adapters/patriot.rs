//! Patriot Properties assessor sites (frameset layout)
//!
//! The search box lives in frame `middle`, results and the summary page in
//! frame `bottom`. Every item starts from a fresh load at the top-level
//! browsing context and leaves it there again.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::contract::{ScrapeContext, SiteAdapter};
use super::error::{AdapterError, ScrapeError};
use crate::domain::{RawRecord, WorkItem};
use crate::infrastructure::browser::wait::{text_or_empty, until_clickable, until_frame_and_switch, until_present};
use crate::infrastructure::browser::{Key, Locator};

const SEARCH_FRAME: &str = "middle";
const RESULTS_FRAME: &str = "bottom";
const SEARCH_BOX: &str = "SearchParcel";
const SUMMARY_LINK: &str = "//a[contains(@href, 'Summary.asp?AccountNumber')]";
const LAND_VALUE: &str = "//td[normalize-space()='Land Value']/following-sibling::td/font";
const BUILDING_VALUE: &str = "//td[normalize-space()='Building Value']/following-sibling::td/font";
const TOTAL_VALUE: &str = "//td[normalize-space()='Total Value']/following-sibling::td/font/b";
const YEAR: &str = "//td[normalize-space()='Year']/following-sibling::td/font/b";

pub struct PatriotAdapter {
    name: String,
    base_url: Url,
}

impl PatriotAdapter {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
        }
    }

    async fn extract(&self, ctx: &ScrapeContext<'_>, item: &WorkItem) -> Result<RawRecord, ScrapeError> {
        let session = ctx.session();
        let wait = ctx.waits().standard;

        until_frame_and_switch(session, &Locator::name(SEARCH_FRAME), wait).await?;
        let search = until_present(session, &Locator::name(SEARCH_BOX), wait).await?;
        session.clear(&search).await?;
        session.send_keys(&search, &Key::Return.after(&item.parcel_id)).await?;

        session.switch_to_default_content().await?;
        until_frame_and_switch(session, &Locator::name(RESULTS_FRAME), wait).await?;
        let summary = until_clickable(session, &Locator::xpath(SUMMARY_LINK), wait).await?;
        session.click(&summary).await?;

        // The summary replaces the results frame's document
        session.switch_to_default_content().await?;
        until_frame_and_switch(session, &Locator::name(RESULTS_FRAME), wait).await?;
        ctx.settle().await;

        let land = text_or_empty(session, &Locator::xpath(LAND_VALUE)).await?;
        let building = text_or_empty(session, &Locator::xpath(BUILDING_VALUE)).await?;
        let total = text_or_empty(session, &Locator::xpath(TOTAL_VALUE)).await?;
        let year = text_or_empty(session, &Locator::xpath(YEAR)).await?;

        let artifact = ctx.capture(&item.parcel_id, 0).await?;

        Ok(RawRecord::new(&item.parcel_id)
            .land(land)
            .building(building)
            .total(total)
            .year(year)
            .artifact(artifact))
    }
}

#[async_trait]
impl SiteAdapter for PatriotAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn go_to_entry_point(&self, ctx: &ScrapeContext<'_>) -> Result<(), AdapterError> {
        ctx.session()
            .navigate(self.base_url.as_str())
            .await
            .map_err(|e| AdapterError::navigation(self.base_url.as_str(), e))
    }

    async fn scrape_item(&self, ctx: &ScrapeContext<'_>, item: &WorkItem) -> Result<Vec<RawRecord>, ScrapeError> {
        let session = ctx.session();
        session.navigate(self.base_url.as_str()).await?;
        session.switch_to_default_content().await?;

        let extracted = self.extract(ctx, item).await;

        // Leave the top-level context selected whatever happened inside the frames
        if let Err(err) = session.switch_to_default_content().await {
            if err.is_session_fatal() {
                return Err(err.into());
            }
            debug!("Could not reset frame state after {}: {}", item.parcel_id, err);
        }

        extracted.map(|record| vec![record])
    }
}
