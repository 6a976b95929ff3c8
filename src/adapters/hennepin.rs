//! Hennepin County MN property information search
//!
//! No gate; the search form is reloaded for every parcel.

use async_trait::async_trait;

use super::contract::{ScrapeContext, SiteAdapter};
use super::error::{AdapterError, ScrapeError};
use crate::domain::{RawRecord, WorkItem};
use crate::infrastructure::browser::wait::{required_text, selected_option_text, until_clickable, until_present};
use crate::infrastructure::browser::{Key, Locator};

pub const ENTRY_URL: &str = "https://www16.co.hennepin.mn.us/pins/?articleId=by_pid#by_pid";

const SEARCH_BOX: &str = "pid";
const YEAR_SELECT: &str = "year";
const LAND_VALUE: &str = "/html/body/div[3]/section/div/div[2]/article[4]/div[2]/div[3]/div[2]";
const BUILDING_VALUE: &str = "/html/body/div[3]/section/div/div[2]/article[4]/div[2]/div[4]/div[2]";
const TOTAL_VALUE: &str = "/html/body/div[3]/section/div/div[2]/article[4]/div[2]/div[6]/div[2]";

pub struct HennepinAdapter {
    name: String,
    entry_url: String,
}

impl HennepinAdapter {
    pub fn new(name: impl Into<String>, entry_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            entry_url: entry_url.unwrap_or_else(|| ENTRY_URL.to_string()),
        }
    }
}

#[async_trait]
impl SiteAdapter for HennepinAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn go_to_entry_point(&self, ctx: &ScrapeContext<'_>) -> Result<(), AdapterError> {
        ctx.session()
            .navigate(&self.entry_url)
            .await
            .map_err(|e| AdapterError::navigation(&self.entry_url, e))
    }

    async fn scrape_item(&self, ctx: &ScrapeContext<'_>, item: &WorkItem) -> Result<Vec<RawRecord>, ScrapeError> {
        let session = ctx.session();
        let waits = ctx.waits();

        session.navigate(&self.entry_url).await?;
        let search = until_clickable(session, &Locator::id(SEARCH_BOX), waits.extended).await?;
        session.click(&search).await?;
        session.send_keys(&search, &Key::Enter.after(&item.parcel_id)).await?;

        let land = required_text(session, &Locator::xpath(LAND_VALUE), waits.extended).await?;
        let building = required_text(session, &Locator::xpath(BUILDING_VALUE), waits.standard).await?;
        let total = required_text(session, &Locator::xpath(TOTAL_VALUE), waits.standard).await?;

        let year_select = until_present(session, &Locator::id(YEAR_SELECT), waits.standard).await?;
        let year = selected_option_text(session, &year_select).await?.unwrap_or_default();

        let artifact = ctx.capture(&item.parcel_id, 0).await?;

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
