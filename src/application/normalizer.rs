//! Normalizer: raw page text to typed valuation fields
//!
//! Pure functions. Normalizing an already-normalized record (rendered back
//! to text) gives the same record.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::store::LAST_SCRAPED_FORMAT;
use crate::domain::{HistoricalRow, NormalizedRecord, ParsedHistoricalRow, RawRecord};

static LEADING_INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("leading integer pattern compiles"));

/// Sentinel the spreadsheet import writes for a missing property id
const NONE_SENTINEL: &str = "None";

pub fn normalize(raw: &RawRecord) -> NormalizedRecord {
    NormalizedRecord {
        parcel_id: raw.parcel_id.clone(),
        land_value: parse_amount(raw.land_value.as_deref()),
        building_value: parse_amount(raw.building_value.as_deref()),
        total_value: parse_amount(raw.total_value.as_deref()),
        assessment_year: parse_year(raw.assessment_year.as_deref()),
        artifact_path: raw.artifact_path.clone(),
    }
}

pub fn normalize_all(raw: &[RawRecord]) -> Vec<NormalizedRecord> {
    raw.iter().map(normalize).collect()
}

/// `"$ 1,234,567"` → `1234567.0`. Missing, empty or unparseable text is `0.0`.
pub fn parse_amount(text: Option<&str>) -> f64 {
    let Some(text) = text else {
        return 0.0;
    };
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('$').unwrap_or(trimmed);
    let cleaned: String = unsigned
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Leading (optionally signed) integer token: `"2023 (estimate)"` → 2023,
/// `"2023/2024"` → 2023, `"+2023"` → 2023.
pub fn parse_year(text: Option<&str>) -> Option<i32> {
    let captures = LEADING_INTEGER.captures(text?)?;
    captures.get(1)?.as_str().parse().ok()
}

/// `LastScraped` column text, `%Y-%m-%d %H:%M:%S`.
pub fn parse_timestamp(text: Option<&str>) -> Option<NaiveDateTime> {
    let text = text?.trim();
    NaiveDateTime::parse_from_str(text, LAST_SCRAPED_FORMAT).ok()
}

/// Typed view of a persisted valuation row.
pub fn parse_historical_row(row: &HistoricalRow) -> ParsedHistoricalRow {
    let raw = RawRecord {
        parcel_id: row.parcel_id.clone(),
        land_value: row.land_value.clone(),
        building_value: row.building_value.clone(),
        total_value: row.total_value.clone(),
        assessment_year: row.assessment_year.clone(),
        artifact_path: row.artifact_path.clone(),
    };

    ParsedHistoricalRow {
        record: normalize(&raw),
        county: row.county.clone(),
        state: row.state.clone(),
        last_scraped: parse_timestamp(row.last_scraped.as_deref()),
        property_id: row
            .property_id
            .clone()
            .filter(|id| id.trim() != NONE_SENTINEL && !id.trim().is_empty()),
        owner: row.owner.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amounts_with_separators_and_currency() {
        assert_eq!(parse_amount(Some("61,000")), 61000.0);
        assert_eq!(parse_amount(Some("$ 1,234,567")), 1_234_567.0);
        assert_eq!(parse_amount(Some(" 1 234.50 ")), 1234.5);
        assert_eq!(parse_amount(Some("")), 0.0);
        assert_eq!(parse_amount(None), 0.0);
        assert_eq!(parse_amount(Some("N/A")), 0.0);
        assert_eq!(parse_amount(Some("NaN")), 0.0);
        assert_eq!(parse_amount(Some("inf")), 0.0);
    }

    #[test]
    fn test_year_leading_token() {
        assert_eq!(parse_year(Some("2023 (estimate)")), Some(2023));
        assert_eq!(parse_year(Some("2023/2024")), Some(2023));
        assert_eq!(parse_year(Some(" 2024 Valuations")), Some(2024));
        assert_eq!(parse_year(Some("")), None);
        assert_eq!(parse_year(Some("Year")), None);
        assert_eq!(parse_year(None), None);
    }

    #[test]
    fn test_historical_row_collapses_none_property_id() {
        let row = HistoricalRow {
            parcel_id: "P1".into(),
            land_value: Some("86,900".into()),
            assessment_year: Some("2022".into()),
            last_scraped: Some("2024-03-05 14:07:09".into()),
            property_id: Some("None".into()),
            ..HistoricalRow::default()
        };

        let parsed = parse_historical_row(&row);
        assert_eq!(parsed.record.land_value, 86900.0);
        assert_eq!(parsed.record.assessment_year, Some(2022));
        assert_eq!(
            parsed.last_scraped.map(|t| t.format(LAST_SCRAPED_FORMAT).to_string()),
            Some("2024-03-05 14:07:09".to_string())
        );
        assert_eq!(parsed.property_id, None);
    }
}
