//! GCS web portal (Pierce County WI and other counties on the same software)
//!
//! One disclaimer click per session, then every search happens from the
//! header search box of whatever page is showing.

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use super::contract::{ScrapeContext, SiteAdapter};
use super::error::{AdapterError, ScrapeError};
use crate::domain::{RawRecord, WorkItem};
use crate::infrastructure::browser::wait::{
    required_text, select_by_index, set_value_by_script, until_clickable, until_present,
};
use crate::infrastructure::browser::{Key, Locator};

const ACCEPT_BUTTON: &str = r#"//*[@id="ctl00_cphMainApp_btnEntryPageAccept"]"#;
const SEARCH_BOX: &str = "mtxtParcelNumber";
const ASSESSMENTS_LINK: &str = "LinkButtonAssessments";
const VALUATIONS_NOT_ALLOWED: &str = "LabelViewValuationsNotAllowed";
const TAX_YEAR_SELECT: &str = "ddlTaxYear";
const YEAR_LABEL: &str = "LabelCurrentYearValuationsRE";
const LAND_LABEL: &str = "lblLand";
const IMPROVEMENTS_LABEL: &str = "lblImprovements";
const TOTAL_LABEL: &str = "lblTotal";

pub struct GcsPortalAdapter {
    name: String,
    base_url: Url,
}

impl GcsPortalAdapter {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
        }
    }
}

#[async_trait]
impl SiteAdapter for GcsPortalAdapter {
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
        let session = ctx.session();
        match until_clickable(session, &Locator::xpath(ACCEPT_BUTTON), ctx.waits().probe).await {
            Ok(accept) => {
                session
                    .click(&accept)
                    .await
                    .map_err(|e| AdapterError::gating(&self.name, e))?;
                info!("{}: accepted portal disclaimer", self.name);
                Ok(())
            }
            Err(err) if err.is_session_fatal() => Err(AdapterError::gating(&self.name, err)),
            Err(_) => {
                debug!("{}: no portal disclaimer shown", self.name);
                Ok(())
            }
        }
    }

    async fn scrape_item(&self, ctx: &ScrapeContext<'_>, item: &WorkItem) -> Result<Vec<RawRecord>, ScrapeError> {
        let session = ctx.session();
        let wait = ctx.waits().standard;

        // The parcel box is masked and drops typed characters
        let search = until_present(session, &Locator::id(SEARCH_BOX), wait).await?;
        set_value_by_script(session, &search, &item.parcel_id).await?;
        ctx.settle().await;
        session.send_keys(&search, &Key::Enter.text()).await?;

        let assessments = until_clickable(session, &Locator::id(ASSESSMENTS_LINK), wait).await?;
        session.click(&assessments).await?;

        if !session.find_elements(&Locator::id(VALUATIONS_NOT_ALLOWED)).await?.is_empty() {
            debug!(parcel_id = %item.parcel_id, "Current year not published; selecting previous tax year");
            let select = until_present(session, &Locator::id(TAX_YEAR_SELECT), wait).await?;
            select_by_index(session, &select, 1).await?;
        }

        let year = required_text(session, &Locator::id(YEAR_LABEL), wait).await?;
        let land = required_text(session, &Locator::id(LAND_LABEL), wait).await?;
        let improvements = required_text(session, &Locator::id(IMPROVEMENTS_LABEL), wait).await?;
        let total = required_text(session, &Locator::id(TOTAL_LABEL), wait).await?;

        let artifact = ctx.capture(&item.parcel_id, 0).await?;

        Ok(vec![
            RawRecord::new(&item.parcel_id)
                .land(land)
                .building(improvements)
                .total(total)
                .year(year)
                .artifact(artifact),
        ])
    }
}
