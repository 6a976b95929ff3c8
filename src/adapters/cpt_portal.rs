//! CPT property tax portal (several Minnesota counties)
//!
//! Single-page app: results come back as a client-rendered grid, details
//! sit behind an "Appraisal Summary" tab. Disclaimer buttons may or may not
//! show up after any reload.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::contract::{ScrapeContext, SiteAdapter};
use super::error::{AdapterError, ScrapeError};
use crate::domain::{RawRecord, WorkItem};
use crate::infrastructure::browser::wait::{until_clickable, until_present, wait_text_or_empty};
use crate::infrastructure::browser::{Locator, SessionResult, xpath_literal};

const DISCLAIMER_BUTTONS: [&str; 2] = ["affirm", "continueButton"];
const SEARCH_BOX: &str = "parcelBox";
const SEARCH_BUTTON: &str = "parcelButton";
const SUMMARY_TAB: &str = "//div[@role='tab' and contains(., 'Appraisal Summary')]";
const LAND_VALUE: &str = "//mat-cell[contains(@class,'mat-column-landValue')]";
const BUILDING_VALUE: &str = "//mat-cell[contains(@class,'mat-column-buildValue')]";
const TOTAL_VALUE: &str = "//mat-cell[contains(@class,'mat-column-totalValue')]";
const YEAR: &str = "//mat-card-title/span[contains(@class,'darkBlueText')]";

fn parcel_cell(parcel_id: &str) -> Locator {
    Locator::xpath(format!(
        "//div[@col-id=\"parcelNum\" and normalize-space()={}]",
        xpath_literal(parcel_id.trim())
    ))
}

pub struct CptPortalAdapter {
    name: String,
    base_url: Url,
}

impl CptPortalAdapter {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
        }
    }

    /// Click whichever disclaimer buttons are showing.
    async fn dismiss_disclaimers(&self, ctx: &ScrapeContext<'_>) -> SessionResult<()> {
        let session = ctx.session();
        for id in DISCLAIMER_BUTTONS {
            match until_clickable(session, &Locator::id(id), ctx.waits().probe).await {
                Ok(button) => {
                    session.click(&button).await?;
                    debug!("{}: dismissed '{}'", self.name, id);
                }
                Err(err) if err.is_session_fatal() => return Err(err),
                Err(_) => debug!("{}: no '{}' prompt", self.name, id),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SiteAdapter for CptPortalAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn go_to_entry_point(&self, ctx: &ScrapeContext<'_>) -> Result<(), AdapterError> {
        ctx.session()
            .navigate(self.base_url.as_str())
            .await
            .map_err(|e| AdapterError::navigation(self.base_url.as_str(), e))
    }

    async fn handle_gating(&self, ctx: &ScrapeContext<'_>) -> Result<(), AdapterError> {
        self.dismiss_disclaimers(ctx)
            .await
            .map_err(|e| AdapterError::gating(&self.name, e))
    }

    async fn scrape_item(&self, ctx: &ScrapeContext<'_>, item: &WorkItem) -> Result<Vec<RawRecord>, ScrapeError> {
        let session = ctx.session();
        let waits = ctx.waits();

        session.navigate(self.base_url.as_str()).await?;
        self.dismiss_disclaimers(ctx).await?;

        let search = until_present(session, &Locator::id(SEARCH_BOX), waits.standard).await?;
        session.clear(&search).await?;
        session.send_keys(&search, &item.parcel_id).await?;
        let button = until_clickable(session, &Locator::id(SEARCH_BUTTON), waits.standard).await?;
        session.click(&button).await?;

        let row = until_clickable(session, &parcel_cell(&item.parcel_id), waits.extended).await?;
        session.click(&row).await?;
        let tab = until_clickable(session, &Locator::xpath(SUMMARY_TAB), waits.standard).await?;
        session.click(&tab).await?;
        ctx.settle().await;

        let artifact = ctx.capture(&item.parcel_id, 0).await?;

        let land = wait_text_or_empty(session, &Locator::xpath(LAND_VALUE), waits.standard).await?;
        let building = wait_text_or_empty(session, &Locator::xpath(BUILDING_VALUE), waits.standard).await?;
        let total = wait_text_or_empty(session, &Locator::xpath(TOTAL_VALUE), waits.standard).await?;
        let year = wait_text_or_empty(session, &Locator::xpath(YEAR), waits.standard).await?;

        Ok(vec![
            RawRecord::new(&item.parcel_id)
                .land(land)
                .building(building)
                .total(total)
                .year(year)
                .artifact(artifact),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parcel_cell_matches_exact_id() {
        assert_eq!(
            parcel_cell(" 21-0042-000 "),
            Locator::xpath("//div[@col-id=\"parcelNum\" and normalize-space()=\"21-0042-000\"]")
        );
    }
}
