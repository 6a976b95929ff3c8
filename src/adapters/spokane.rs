//! Spokane County WA SCOUT property information
//!
//! Per-item reload. The building value sits in a collapsed detail row that
//! has to be expanded first.

use async_trait::async_trait;

use super::contract::{ScrapeContext, SiteAdapter};
use super::error::{AdapterError, ScrapeError};
use crate::domain::{RawRecord, WorkItem};
use crate::infrastructure::browser::wait::{required_text, until_clickable};
use crate::infrastructure::browser::Locator;

pub const ENTRY_URL: &str = "https://cp.spokanecounty.org/scout/propertyinformation/";

const SEARCH_BOX: &str = r#"//*[@id="txtSearch"]"#;
const SEARCH_BUTTON: &str = "MainContent_btnSearch";
const GRID: &str = r#"//*[@id="MainContent_AssessedValue_GridView4"]/tbody"#;

fn grid_cell(path: &str) -> Locator {
    Locator::xpath(format!("{GRID}/{path}"))
}

pub struct SpokaneAdapter {
    name: String,
    entry_url: String,
}

impl SpokaneAdapter {
    pub fn new(name: impl Into<String>, entry_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            entry_url: entry_url.unwrap_or_else(|| ENTRY_URL.to_string()),
        }
    }
}

#[async_trait]
impl SiteAdapter for SpokaneAdapter {
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
        let search = until_clickable(session, &Locator::xpath(SEARCH_BOX), waits.extended).await?;
        session.clear(&search).await?;
        session.send_keys(&search, &item.parcel_id).await?;
        let button = until_clickable(session, &Locator::id(SEARCH_BUTTON), waits.standard).await?;
        session.click(&button).await?;

        // First grid row is the most recent assessment
        let year = required_text(session, &grid_cell("tr[1]/td[1]"), waits.extended).await?;
        let land = required_text(session, &grid_cell("tr[1]/td[4]"), waits.standard).await?;
        let total = required_text(session, &grid_cell("tr[1]/td[3]"), waits.standard).await?;

        let expander = until_clickable(session, &grid_cell("tr[1]/td[1]/span"), waits.standard).await?;
        session.click(&expander).await?;
        let building = required_text(session, &grid_cell("tr[2]/td/div/div[1]/div[2]"), waits.standard).await?;

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
