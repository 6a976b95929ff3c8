//! parcelinfo.com (Lake County MN)
//!
//! Entry goes through the county login link and the parcels link. A search
//! returns a results table that may hold several rows for one parcel
//! number; each row becomes its own record, with the assessment year read
//! from that row's details page.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::contract::{ScrapeContext, SiteAdapter};
use super::error::{AdapterError, ScrapeError};
use crate::domain::{RawRecord, WorkItem};
use crate::infrastructure::browser::wait::{required_text, set_attribute_by_script, until_clickable, until_present};
use crate::infrastructure::browser::{Locator, SessionError};

pub const ENTRY_URL: &str = "https://parcelinfo.com/";

const LOGIN_LINK: &str = "//a[@href='processlogin.php?county=Lake']";
const PARCELS_LINK: &str = "//a[@href='http://parcelinfo.com/parcels/']";
const PARCELS_URL: &str = "http://parcelinfo.com/parcels/";
const SEARCH_BOX: &str = "//form[@action='parcelresults1.php']//input[@name='searchvalue' and @type='text']";
const SEARCH_FIELD: &str = "//input[@name='searchfield' and @type='hidden']";
const SEARCH_SUBMIT: &str = "//form[@action='parcelresults1.php']//button[@type='submit']";
const RESULTS_TABLE: &str = "//table[@summary='search results']";
const RESULT_ROWS: &str = "//table[@summary='search results']/tbody/tr[@class='results']";
const YEAR_HEADING: &str = "/html/body/div[2]/h2";
const BACK_TO_SEARCH: &str = "/html/body/div[1]/table[2]/tbody/tr/td[1]/a";

const LAND_COLUMN: usize = 7;
const BUILDING_COLUMN: usize = 8;
const TOTAL_COLUMN: usize = 9;

/// Valuation cells of one results-table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub land: String,
    pub building: String,
    pub total: String,
}

/// Read the valuation columns out of a results page. Rows too short to
/// carry valuations are skipped.
pub fn parse_result_rows(html: &str) -> Vec<ResultRow> {
    let document = Html::parse_document(html);
    let (Ok(row_selector), Ok(cell_selector)) = (
        Selector::parse(r#"table[summary="search results"] tr.results"#),
        Selector::parse("td"),
    ) else {
        return Vec::new();
    };

    document
        .select(&row_selector)
        .filter_map(|row| {
            let cells: Vec<String> = row
                .select(&cell_selector)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect();
            if cells.len() <= TOTAL_COLUMN {
                debug!("Skipping results row with {} cells", cells.len());
                return None;
            }
            Some(ResultRow {
                land: cells[LAND_COLUMN].clone(),
                building: cells[BUILDING_COLUMN].clone(),
                total: cells[TOTAL_COLUMN].clone(),
            })
        })
        .collect()
}

fn details_link(row_number: usize) -> Locator {
    Locator::xpath(format!("({RESULT_ROWS})[{row_number}]/td[1]/a"))
}

pub struct LakeCountyAdapter {
    name: String,
    entry_url: String,
}

impl LakeCountyAdapter {
    pub fn new(name: impl Into<String>, entry_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            entry_url: entry_url.unwrap_or_else(|| ENTRY_URL.to_string()),
        }
    }

    async fn click_through(&self, ctx: &ScrapeContext<'_>, xpath: &str) -> Result<(), SessionError> {
        let link = until_clickable(ctx.session(), &Locator::xpath(xpath), ctx.waits().standard).await?;
        ctx.session().click(&link).await
    }

    /// Submit a parcel-number search and return the parsed result rows.
    async fn search(&self, ctx: &ScrapeContext<'_>, parcel_id: &str) -> Result<Vec<ResultRow>, ScrapeError> {
        let session = ctx.session();
        let wait = ctx.waits().standard;

        if session.find_elements(&Locator::xpath(SEARCH_BOX)).await?.is_empty() {
            debug!("Search form not on page; reopening parcel search");
            session.navigate(PARCELS_URL).await?;
        }

        let search = until_present(session, &Locator::xpath(SEARCH_BOX), wait).await?;
        session.clear(&search).await?;
        session.send_keys(&search, parcel_id).await?;

        let field = until_present(session, &Locator::xpath(SEARCH_FIELD), wait).await?;
        set_attribute_by_script(session, &field, "value", "parcelnumber").await?;

        let submit = until_clickable(session, &Locator::xpath(SEARCH_SUBMIT), wait).await?;
        session.click(&submit).await?;

        until_present(session, &Locator::xpath(RESULTS_TABLE), wait).await?;
        let source = session.page_source().await?;
        Ok(parse_result_rows(&source))
    }

    /// Open one result row's details and push its record. The record is kept
    /// even when returning to the search page fails afterwards.
    async fn read_row(
        &self,
        ctx: &ScrapeContext<'_>,
        parcel_id: &str,
        index: usize,
        row: ResultRow,
        records: &mut Vec<RawRecord>,
    ) -> Result<(), ScrapeError> {
        let session = ctx.session();
        let wait = ctx.waits().standard;

        // Returning to the search page drops the results; search again for later rows
        if index > 0 {
            self.search(ctx, parcel_id).await?;
        }

        let details = until_clickable(session, &details_link(index + 1), wait).await?;
        session.click(&details).await?;
        let year = required_text(session, &Locator::xpath(YEAR_HEADING), wait).await?;
        let artifact = ctx.capture(parcel_id, index).await?;

        records.push(
            RawRecord::new(parcel_id)
                .land(row.land)
                .building(row.building)
                .total(row.total)
                .year(year)
                .artifact(artifact),
        );

        self.click_through(ctx, BACK_TO_SEARCH).await?;
        Ok(())
    }
}

#[async_trait]
impl SiteAdapter for LakeCountyAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn go_to_entry_point(&self, ctx: &ScrapeContext<'_>) -> Result<(), AdapterError> {
        let session = ctx.session();
        session
            .navigate(&self.entry_url)
            .await
            .map_err(|e| AdapterError::navigation(&self.entry_url, e))?;
        self.click_through(ctx, LOGIN_LINK)
            .await
            .map_err(|e| AdapterError::navigation(&self.entry_url, e))?;
        self.click_through(ctx, PARCELS_LINK)
            .await
            .map_err(|e| AdapterError::navigation(PARCELS_URL, e))
    }

    async fn scrape_item(&self, ctx: &ScrapeContext<'_>, item: &WorkItem) -> Result<Vec<RawRecord>, ScrapeError> {
        let rows = self.search(ctx, &item.parcel_id).await?;
        if rows.is_empty() {
            warn!(parcel_id = %item.parcel_id, "{}: search returned no result rows", self.name);
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            match self.read_row(ctx, &item.parcel_id, index, row, &mut records).await {
                Ok(()) => {}
                Err(err) if records.is_empty() || err.is_session_fatal() => return Err(err),
                Err(err) => {
                    warn!(
                        parcel_id = %item.parcel_id,
                        row = index + 1,
                        kept = records.len(),
                        "{}: stopping at failed result row: {}", self.name, err
                    );
                    break;
                }
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
        <table summary="search results">
          <tbody>
            <tr class="header"><th>Parcel</th></tr>
            <tr class="results">
              <td><a href="details.php?id=1">09-0001</a></td><td>SMITH</td><td>1 MAIN ST</td><td>TWO HARBORS</td>
              <td>R</td><td>1.2</td><td>2024</td><td>61,000</td><td>143,500</td><td>204,500</td>
            </tr>
            <tr class="results">
              <td><a href="details.php?id=2">09-0001</a></td><td>SMITH</td><td>1 MAIN ST</td><td>TWO HARBORS</td>
              <td>R</td><td>1.2</td><td>2023</td><td> 58,000 </td><td>139,000</td><td>197,000</td>
            </tr>
            <tr class="results"><td>truncated</td></tr>
          </tbody>
        </table>
        </body></html>"#;

    #[test]
    fn test_parse_result_rows_reads_valuation_columns() {
        let rows = parse_result_rows(RESULTS_PAGE);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            ResultRow {
                land: "61,000".into(),
                building: "143,500".into(),
                total: "204,500".into()
            }
        );
        assert_eq!(rows[1].land, "58,000");
    }

    #[test]
    fn test_parse_result_rows_without_table() {
        assert!(parse_result_rows("<html><body><p>No parcels found</p></body></html>").is_empty());
    }

    #[test]
    fn test_details_link_targets_nth_row() {
        assert_eq!(
            details_link(2),
            Locator::xpath("(//table[@summary='search results']/tbody/tr[@class='results'])[2]/td[1]/a")
        );
    }
}
