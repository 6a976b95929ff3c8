//! Site adapters driven end to end against the scripted browser
use parcel_valuation_lib::adapters::cpt_portal::CptPortalAdapter;
use parcel_valuation_lib::adapters::gcs_portal::GcsPortalAdapter;
use parcel_valuation_lib::adapters::hennepin::{self, HennepinAdapter};
use parcel_valuation_lib::adapters::lake_county::LakeCountyAdapter;
use parcel_valuation_lib::adapters::patriot::PatriotAdapter;
use parcel_valuation_lib::adapters::spokane::SpokaneAdapter;
use parcel_valuation_lib::adapters::{AdapterError, ScrapeContext, SiteAdapter};
use parcel_valuation_lib::domain::{AdapterReport, WorkItem};
use parcel_valuation_lib::infrastructure::browser::{Locator, WaitSettings};
use parcel_valuation_lib::infrastructure::ArtifactWriter;
use parcel_valuation_lib::test_utils::{ScriptedBrowser, ScriptedElement};
use tempfile::TempDir;
use url::Url;

async fn run_adapter(
    adapter: &dyn SiteAdapter,
    browser: &ScriptedBrowser,
    items: &[WorkItem],
) -> (Result<AdapterReport, AdapterError>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = ArtifactWriter::new(dir.path());
    let ctx = ScrapeContext::new(browser, &artifacts, WaitSettings::immediate());
    let result = adapter.scrape(&ctx, items).await;
    (result, dir)
}

fn text(value: &str) -> ScriptedElement {
    ScriptedElement::with_text(value)
}

#[tokio::test]
async fn hennepin_extracts_and_keeps_going_after_a_bad_parcel() {
    let land = "/html/body/div[3]/section/div/div[2]/article[4]/div[2]/div[3]/div[2]";
    let building = "/html/body/div[3]/section/div/div[2]/article[4]/div[2]/div[4]/div[2]";
    let total = "/html/body/div[3]/section/div/div[2]/article[4]/div[2]/div[6]/div[2]";
    let browser = ScriptedBrowser::new()
        .element(Locator::id("pid"), ScriptedElement::new())
        .element(Locator::xpath(land), text("$86,900").missing_for_query("BAD-1"))
        .element(Locator::xpath(building), text("$201,100"))
        .element(Locator::xpath(total), text("$288,000"))
        .element(Locator::id("year"), ScriptedElement::new().with_options(&["2025", "2024"], 0));

    let adapter = HennepinAdapter::new("hennepin(hennepin|mn)", None);
    let items = vec![
        WorkItem::new("BAD-1", "Hennepin", "MN"),
        WorkItem::new("27-029-24-11-0001", "Hennepin", "MN"),
    ];
    let (result, dir) = run_adapter(&adapter, &browser, &items).await;
    let report = result.unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.succeeded(), 1);
    assert!(report.session_lost.is_none());

    let records: Vec<_> = report.records().cloned().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].parcel_id, "27-029-24-11-0001");
    assert_eq!(records[0].land_value.as_deref(), Some("$86,900"));
    assert_eq!(records[0].building_value.as_deref(), Some("$201,100"));
    assert_eq!(records[0].total_value.as_deref(), Some("$288,000"));
    assert_eq!(records[0].assessment_year.as_deref(), Some("2025"));

    assert!(dir.path().join("27-029-24-11-0001.png").exists());
    assert!(dir.path().join("error_BAD-1.png").exists());
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.parcel_id, "BAD-1");
    assert!(failure.artifact_path.is_some());

    // entry point plus one reload per item
    let navigations = browser.navigations();
    assert_eq!(navigations.len(), 3);
    assert!(navigations.iter().all(|url| url == hennepin::ENTRY_URL));
}

#[tokio::test]
async fn gcs_portal_accepts_disclaimer_and_falls_back_to_previous_year() {
    let accept = r#"//*[@id="ctl00_cphMainApp_btnEntryPageAccept"]"#;
    let browser = ScriptedBrowser::new()
        .element(Locator::xpath(accept), ScriptedElement::new())
        .element(Locator::id("mtxtParcelNumber"), ScriptedElement::new())
        .element(Locator::id("LinkButtonAssessments"), ScriptedElement::new())
        .element(Locator::id("LabelViewValuationsNotAllowed"), ScriptedElement::new().only_for_query("032-01240-0000"))
        .element(Locator::id("ddlTaxYear"), ScriptedElement::new().with_options(&["2025", "2024"], 0))
        .element(
            Locator::id("LabelCurrentYearValuationsRE"),
            text("2025").for_query("032-01240-0000", "2024"),
        )
        .element(Locator::id("lblLand"), text("42,500"))
        .element(Locator::id("lblImprovements"), text("180,300"))
        .element(Locator::id("lblTotal"), text("222,800"));

    let adapter = GcsPortalAdapter::new(
        "gcs_portal(pierce|wi)",
        Url::parse("https://internal.co.pierce.wi.us/gcswebportal/").unwrap(),
    );
    let items = vec![
        WorkItem::new("032-01240-0000", "Pierce", "WI"),
        WorkItem::new("032-01241-0000", "Pierce", "WI"),
    ];
    let (result, _dir) = run_adapter(&adapter, &browser, &items).await;
    let report = result.unwrap();

    let years: Vec<_> = report.records().map(|r| r.assessment_year.clone().unwrap()).collect();
    assert_eq!(years, vec!["2024".to_string(), "2025".to_string()]);

    let calls = browser.calls();
    let accepts = calls.iter().filter(|c| c.as_str() == format!("click:xpath={accept}")).count();
    assert_eq!(accepts, 1);
    let selects = calls.iter().filter(|c| c.starts_with("select:id=ddlTaxYear")).count();
    assert_eq!(selects, 1);
}

#[tokio::test]
async fn gcs_portal_without_disclaimer_goes_straight_to_search() {
    let browser = ScriptedBrowser::new()
        .element(Locator::id("mtxtParcelNumber"), ScriptedElement::new())
        .element(Locator::id("LinkButtonAssessments"), ScriptedElement::new())
        .element(Locator::id("LabelCurrentYearValuationsRE"), text("2025"))
        .element(Locator::id("lblLand"), text("42,500"))
        .element(Locator::id("lblImprovements"), text("180,300"))
        .element(Locator::id("lblTotal"), text("222,800"));
    let adapter = GcsPortalAdapter::new(
        "gcs_portal(pierce|wi)",
        Url::parse("https://internal.co.pierce.wi.us/gcswebportal/").unwrap(),
    );
    let items = vec![WorkItem::new("032-01240-0000", "Pierce", "WI")];

    let (result, dir) = run_adapter(&adapter, &browser, &items).await;
    let report = result.unwrap();

    assert_eq!(report.succeeded(), 1);
    let records: Vec<_> = report.records().cloned().collect();
    assert_eq!(records[0].total_value.as_deref(), Some("222,800"));

    // gating again on a page without a gate is a no-op
    let artifacts = ArtifactWriter::new(dir.path());
    let ctx = ScrapeContext::new(&browser, &artifacts, WaitSettings::immediate());
    adapter.handle_gating(&ctx).await.unwrap();
    assert!(!browser.calls().iter().any(|c| c.contains("btnEntryPageAccept")));
}

#[tokio::test]
async fn spokane_reads_grid_and_expanded_building_value() {
    let grid = r#"//*[@id="MainContent_AssessedValue_GridView4"]/tbody"#;
    let browser = ScriptedBrowser::new()
        .element(Locator::xpath(r#"//*[@id="txtSearch"]"#), ScriptedElement::new())
        .element(Locator::id("MainContent_btnSearch"), ScriptedElement::new())
        .element(Locator::xpath(format!("{grid}/tr[1]/td[1]")), text("2025"))
        .element(Locator::xpath(format!("{grid}/tr[1]/td[4]")), text("$95,000"))
        .element(Locator::xpath(format!("{grid}/tr[1]/td[3]")), text("$310,000"))
        .element(Locator::xpath(format!("{grid}/tr[1]/td[1]/span")), ScriptedElement::new())
        .element(Locator::xpath(format!("{grid}/tr[2]/td/div/div[1]/div[2]")), text("$215,000"));

    let adapter = SpokaneAdapter::new("spokane(spokane|wa)", None);
    let items = vec![WorkItem::new("35191.0211", "Spokane", "WA")];
    let (result, dir) = run_adapter(&adapter, &browser, &items).await;
    let report = result.unwrap();

    let record = report.records().next().unwrap().clone();
    assert_eq!(record.land_value.as_deref(), Some("$95,000"));
    assert_eq!(record.building_value.as_deref(), Some("$215,000"));
    assert_eq!(record.total_value.as_deref(), Some("$310,000"));
    assert_eq!(record.assessment_year.as_deref(), Some("2025"));
    assert!(dir.path().join("35191.0211.png").exists());

    let calls = browser.calls();
    assert!(calls.contains(&format!("keys:xpath={}:35191.0211", r#"//*[@id="txtSearch"]"#)));
    assert!(calls.contains(&format!("click:xpath={grid}/tr[1]/td[1]/span")));
}

fn lake_results(rows: &[[&str; 3]]) -> String {
    let body: String = rows
        .iter()
        .map(|[land, building, total]| {
            format!(
                "<tr class=\"results\"><td><a href=\"#\">details</a></td><td>a</td><td>b</td><td>c</td>\
                 <td>d</td><td>e</td><td>f</td><td>{land}</td><td>{building}</td><td>{total}</td></tr>"
            )
        })
        .collect();
    format!("<html><body><table summary=\"search results\"><tbody>{body}</tbody></table></body></html>")
}

#[tokio::test]
async fn lake_county_emits_one_record_per_result_row() {
    let rows = "//table[@summary='search results']/tbody/tr[@class='results']";
    let browser = ScriptedBrowser::new()
        .element(Locator::xpath("//a[@href='processlogin.php?county=Lake']"), ScriptedElement::new())
        .element(Locator::xpath("//a[@href='http://parcelinfo.com/parcels/']"), ScriptedElement::new())
        .element(
            Locator::xpath("//form[@action='parcelresults1.php']//input[@name='searchvalue' and @type='text']"),
            ScriptedElement::new(),
        )
        .element(Locator::xpath("//input[@name='searchfield' and @type='hidden']"), ScriptedElement::new())
        .element(
            Locator::xpath("//form[@action='parcelresults1.php']//button[@type='submit']"),
            ScriptedElement::new(),
        )
        .element(Locator::xpath("//table[@summary='search results']"), ScriptedElement::new())
        .element(Locator::xpath(format!("({rows})[1]/td[1]/a")), ScriptedElement::new())
        .element(Locator::xpath(format!("({rows})[2]/td[1]/a")), ScriptedElement::new())
        .element(Locator::xpath("/html/body/div[2]/h2"), text("2024 Assessment"))
        .element(Locator::xpath("/html/body/div[1]/table[2]/tbody/tr/td[1]/a"), ScriptedElement::new())
        .page_source(lake_results(&[]))
        .page_source_for_query(
            "38-0016-000",
            lake_results(&[["12,000", "88,000", "100,000"], ["3,500", "0", "3,500"]]),
        );

    let adapter = LakeCountyAdapter::new("lake_county(lake|mn)", None);
    let items = vec![
        WorkItem::new("38-0016-000", "Lake", "MN"),
        WorkItem::new("38-9999-000", "Lake", "MN"),
    ];
    let (result, dir) = run_adapter(&adapter, &browser, &items).await;
    let report = result.unwrap();

    // a search without result rows is a success with no records
    assert_eq!(report.failed(), 0);
    assert_eq!(report.succeeded(), 2);

    let records: Vec<_> = report.records().cloned().collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].land_value.as_deref(), Some("12,000"));
    assert_eq!(records[0].total_value.as_deref(), Some("100,000"));
    assert_eq!(records[1].building_value.as_deref(), Some("0"));
    assert_eq!(records[1].assessment_year.as_deref(), Some("2024 Assessment"));
    assert!(dir.path().join("38-0016-000.png").exists());
    assert!(dir.path().join("38-0016-000_1.png").exists());
}

#[tokio::test]
async fn lake_county_keeps_earlier_rows_when_a_later_row_fails() {
    let rows = "//table[@summary='search results']/tbody/tr[@class='results']";
    let browser = ScriptedBrowser::new()
        .element(Locator::xpath("//a[@href='processlogin.php?county=Lake']"), ScriptedElement::new())
        .element(Locator::xpath("//a[@href='http://parcelinfo.com/parcels/']"), ScriptedElement::new())
        .element(
            Locator::xpath("//form[@action='parcelresults1.php']//input[@name='searchvalue' and @type='text']"),
            ScriptedElement::new(),
        )
        .element(Locator::xpath("//input[@name='searchfield' and @type='hidden']"), ScriptedElement::new())
        .element(
            Locator::xpath("//form[@action='parcelresults1.php']//button[@type='submit']"),
            ScriptedElement::new(),
        )
        .element(Locator::xpath("//table[@summary='search results']"), ScriptedElement::new())
        .element(Locator::xpath(format!("({rows})[1]/td[1]/a")), ScriptedElement::new())
        .element(Locator::xpath("/html/body/div[2]/h2"), text("2024 Assessment"))
        .element(Locator::xpath("/html/body/div[1]/table[2]/tbody/tr/td[1]/a"), ScriptedElement::new())
        .page_source(lake_results(&[["12,000", "88,000", "100,000"], ["3,500", "0", "3,500"]]));

    let adapter = LakeCountyAdapter::new("lake_county(lake|mn)", None);
    let items = vec![WorkItem::new("38-0016-000", "Lake", "MN")];
    let (result, dir) = run_adapter(&adapter, &browser, &items).await;
    let report = result.unwrap();

    // the second row's details link never appears
    assert_eq!(report.failed(), 0);
    assert_eq!(report.succeeded(), 1);
    let records: Vec<_> = report.records().cloned().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].land_value.as_deref(), Some("12,000"));
    assert!(dir.path().join("38-0016-000.png").exists());
    assert!(!dir.path().join("38-0016-000_1.png").exists());
    assert!(!dir.path().join("error_38-0016-000.png").exists());
}

#[tokio::test]
async fn patriot_works_through_frames_and_returns_to_top_level() {
    let browser = ScriptedBrowser::new()
        .element_in_frame("middle", Locator::name("SearchParcel"), ScriptedElement::new())
        .element_in_frame(
            "bottom",
            Locator::xpath("//a[contains(@href, 'Summary.asp?AccountNumber')]"),
            ScriptedElement::new(),
        )
        .element_in_frame(
            "bottom",
            Locator::xpath("//td[normalize-space()='Land Value']/following-sibling::td/font"),
            text("$310,400"),
        )
        .element_in_frame(
            "bottom",
            Locator::xpath("//td[normalize-space()='Total Value']/following-sibling::td/font/b"),
            text("$702,100"),
        )
        .element_in_frame(
            "bottom",
            Locator::xpath("//td[normalize-space()='Year']/following-sibling::td/font/b"),
            text("2025"),
        );

    let adapter = PatriotAdapter::new(
        "patriot(salem|ma)",
        Url::parse("https://salem.patriotproperties.com/default.asp").unwrap(),
    );
    let items = vec![WorkItem::new("15-0123-0", "Salem", "MA")];
    let (result, _dir) = run_adapter(&adapter, &browser, &items).await;
    let report = result.unwrap();

    let record = report.records().next().unwrap().clone();
    assert_eq!(record.land_value.as_deref(), Some("$310,400"));
    // building value is missing on this page and reads as empty
    assert_eq!(record.building_value.as_deref(), Some(""));
    assert_eq!(record.total_value.as_deref(), Some("$702,100"));
    assert_eq!(browser.current_frame(), None);
    assert!(browser.calls().contains(&"keys:name=SearchParcel:15-0123-0".to_string()));
}

#[tokio::test]
async fn cpt_portal_dismisses_disclaimers_on_every_load() {
    let browser = ScriptedBrowser::new()
        .element(Locator::id("affirm"), ScriptedElement::new())
        .element(Locator::id("parcelBox"), ScriptedElement::new())
        .element(Locator::id("parcelButton"), ScriptedElement::new())
        .element(
            Locator::xpath(r#"//div[@col-id="parcelNum" and normalize-space()="21-0042-000"]"#),
            ScriptedElement::new(),
        )
        .element(
            Locator::xpath("//div[@role='tab' and contains(., 'Appraisal Summary')]"),
            ScriptedElement::new(),
        )
        .element(Locator::xpath("//mat-cell[contains(@class,'mat-column-landValue')]"), text("$54,600"))
        .element(Locator::xpath("//mat-cell[contains(@class,'mat-column-buildValue')]"), text("$122,900"))
        .element(Locator::xpath("//mat-cell[contains(@class,'mat-column-totalValue')]"), text("$177,500"))
        .element(
            Locator::xpath("//mat-card-title/span[contains(@class,'darkBlueText')]"),
            text("2025 Values"),
        );

    let adapter = CptPortalAdapter::new(
        "cpt_portal(kandiyohi|mn)",
        Url::parse("https://tax.cptmn.us/PTaxPortal/#/parcelSearch/Kandiyohi").unwrap(),
    );
    let items = vec![WorkItem::new("21-0042-000", "Kandiyohi", "MN")];
    let (result, dir) = run_adapter(&adapter, &browser, &items).await;
    let report = result.unwrap();

    let record = report.records().next().unwrap().clone();
    assert_eq!(record.land_value.as_deref(), Some("$54,600"));
    assert_eq!(record.building_value.as_deref(), Some("$122,900"));
    assert_eq!(record.total_value.as_deref(), Some("$177,500"));
    assert_eq!(record.assessment_year.as_deref(), Some("2025 Values"));
    assert!(dir.path().join("21-0042-000.png").exists());

    let affirms = browser.calls().iter().filter(|c| c.as_str() == "click:id=affirm").count();
    assert_eq!(affirms, 2);
}

#[tokio::test]
async fn lost_session_stops_the_item_loop() {
    let land = "/html/body/div[3]/section/div/div[2]/article[4]/div[2]/div[3]/div[2]";
    let browser = ScriptedBrowser::new()
        .element(Locator::id("pid"), ScriptedElement::new())
        .element(Locator::xpath(land), text("$1"))
        .lose_session_on_query("CRASH");

    let adapter = HennepinAdapter::new("hennepin(hennepin|mn)", None);
    let items = vec![
        WorkItem::new("CRASH", "Hennepin", "MN"),
        WorkItem::new("27-029-24-11-0001", "Hennepin", "MN"),
    ];
    let (result, dir) = run_adapter(&adapter, &browser, &items).await;
    let report = result.unwrap();

    assert!(report.session_lost.is_some());
    assert_eq!(report.outcomes.len(), 1);
    assert!(report.outcomes[0].is_failure());
    assert!(!dir.path().join("error_CRASH.png").exists());
}
