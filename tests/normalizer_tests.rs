//! Normalization rules: table-driven cases and properties
use parcel_valuation_lib::application::{normalize, parse_amount, parse_historical_row, parse_year};
use parcel_valuation_lib::domain::{HistoricalRow, RawRecord};
use proptest::prelude::*;
use rstest::rstest;

#[rstest]
#[case("86,900", 86_900.0)]
#[case("61,000", 61_000.0)]
#[case("1,234,567", 1_234_567.0)]
#[case("$288,000", 288_000.0)]
#[case("$ 42,500.75", 42_500.75)]
#[case("  7  ", 7.0)]
#[case("", 0.0)]
#[case("   ", 0.0)]
#[case("N/A", 0.0)]
#[case("$", 0.0)]
fn amount_text_is_normalized(#[case] text: &str, #[case] expected: f64) {
    assert_eq!(parse_amount(Some(text)), expected);
}

#[rstest]
#[case("2023 (estimate)", Some(2023))]
#[case("2024", Some(2024))]
#[case(" 2025 Values", Some(2025))]
#[case("2024 Assessment", Some(2024))]
#[case("+2023", Some(2023))]
#[case("-5", Some(-5))]
#[case("+", None)]
#[case("", None)]
#[case("Tax Year", None)]
#[case("99999999999", None)]
fn year_text_is_normalized(#[case] text: &str, #[case] expected: Option<i32>) {
    assert_eq!(parse_year(Some(text)), expected);
}

#[test]
fn missing_fields_normalize_to_defaults() {
    let normalized = normalize(&RawRecord::new("123"));

    assert_eq!(normalized.parcel_id, "123");
    assert_eq!(normalized.land_value, 0.0);
    assert_eq!(normalized.building_value, 0.0);
    assert_eq!(normalized.total_value, 0.0);
    assert_eq!(normalized.assessment_year, None);
    assert_eq!(normalized.artifact_path, None);
}

#[test]
fn historical_row_parses_typed_columns() {
    let row = HistoricalRow {
        parcel_id: "27-029-24-11-0001".to_string(),
        county: Some("Hennepin".to_string()),
        state: Some("MN".to_string()),
        land_value: Some("86,900".to_string()),
        building_value: Some("".to_string()),
        total_value: Some("$288,000".to_string()),
        assessment_year: Some("2023 (estimate)".to_string()),
        last_scraped: Some("2024-03-01 14:22:05".to_string()),
        property_id: Some("None".to_string()),
        ..HistoricalRow::default()
    };

    let parsed = parse_historical_row(&row);

    assert_eq!(parsed.record.land_value, 86_900.0);
    assert_eq!(parsed.record.building_value, 0.0);
    assert_eq!(parsed.record.total_value, 288_000.0);
    assert_eq!(parsed.record.assessment_year, Some(2023));
    assert_eq!(parsed.county.as_deref(), Some("Hennepin"));
    assert_eq!(
        parsed.last_scraped.map(|t| t.to_string()),
        Some("2024-03-01 14:22:05".to_string())
    );
    assert_eq!(parsed.property_id, None);
}

#[test]
fn malformed_timestamp_is_dropped() {
    let row = HistoricalRow {
        parcel_id: "1".to_string(),
        last_scraped: Some("03/01/2024".to_string()),
        property_id: Some("R-77".to_string()),
        ..HistoricalRow::default()
    };

    let parsed = parse_historical_row(&row);

    assert_eq!(parsed.last_scraped, None);
    assert_eq!(parsed.property_id.as_deref(), Some("R-77"));
}

fn amount_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\$?[0-9]{1,3}(,[0-9]{3}){0,4}(\\.[0-9]{1,2})?",
        "[ $0-9,.a-zA-Z-]{0,16}",
        any::<String>(),
    ]
}

fn year_text() -> impl Strategy<Value = String> {
    prop_oneof!["[0-9]{4}( \\(estimate\\))?", "[0-9a-zA-Z /()]{0,12}", any::<String>()]
}

proptest! {
    #[test]
    fn normalizing_twice_changes_nothing(
        land in amount_text(),
        building in amount_text(),
        total in amount_text(),
        year in year_text(),
    ) {
        let raw = RawRecord::new("P-1").land(land).building(building).total(total).year(year);
        let once = normalize(&raw);
        let twice = normalize(&once.to_raw());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn grouped_integers_parse_exactly(value in 0u64..1_000_000_000_000) {
        let digits = value.to_string();
        let mut grouped = String::new();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        prop_assert_eq!(parse_amount(Some(&grouped)), value as f64);
    }

    #[test]
    fn amounts_are_always_finite(text in any::<String>()) {
        prop_assert!(parse_amount(Some(&text)).is_finite());
    }
}
