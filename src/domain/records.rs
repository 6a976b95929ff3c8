//! Raw and normalized valuation records

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// String-typed extraction result for one parcel, exactly as read off the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "ParcelID")]
    pub parcel_id: String,

    #[serde(rename = "LandValue")]
    pub land_value: Option<String>,

    #[serde(rename = "BuildingValue")]
    pub building_value: Option<String>,

    #[serde(rename = "TotalValue")]
    pub total_value: Option<String>,

    #[serde(rename = "AssessmentYear")]
    pub assessment_year: Option<String>,

    #[serde(rename = "ScreenshotPath")]
    pub artifact_path: Option<String>,
}

impl RawRecord {
    pub fn new(parcel_id: impl Into<String>) -> Self {
        Self {
            parcel_id: parcel_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn land(mut self, value: impl Into<String>) -> Self {
        self.land_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn building(mut self, value: impl Into<String>) -> Self {
        self.building_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn total(mut self, value: impl Into<String>) -> Self {
        self.total_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn year(mut self, value: impl Into<String>) -> Self {
        self.assessment_year = Some(value.into());
        self
    }

    #[must_use]
    pub fn artifact(mut self, path: impl Into<String>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }
}

/// Typed record ready for persistence.
///
/// Unparseable or missing amounts are `0.0`; keep the [`RawRecord`] around
/// when "absent" and "zero" must be told apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(rename = "ParcelID")]
    pub parcel_id: String,

    #[serde(rename = "LandValue")]
    pub land_value: f64,

    #[serde(rename = "BuildingValue")]
    pub building_value: f64,

    #[serde(rename = "TotalValue")]
    pub total_value: f64,

    #[serde(rename = "AssessmentYear")]
    pub assessment_year: Option<i32>,

    #[serde(rename = "ScreenshotPath")]
    pub artifact_path: Option<String>,
}

impl NormalizedRecord {
    /// Render the typed values back into a raw record.
    pub fn to_raw(&self) -> RawRecord {
        RawRecord {
            parcel_id: self.parcel_id.clone(),
            land_value: Some(self.land_value.to_string()),
            building_value: Some(self.building_value.to_string()),
            total_value: Some(self.total_value.to_string()),
            assessment_year: self.assessment_year.map(|year| year.to_string()),
            artifact_path: self.artifact_path.clone(),
        }
    }
}

/// A row as it comes back from the valuation table, every column as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRow {
    #[serde(rename = "ParcelID")]
    pub parcel_id: String,

    #[serde(rename = "County", default)]
    pub county: Option<String>,

    #[serde(rename = "State", default)]
    pub state: Option<String>,

    #[serde(rename = "LandValue", default)]
    pub land_value: Option<String>,

    #[serde(rename = "BuildingValue", default)]
    pub building_value: Option<String>,

    #[serde(rename = "TotalValue", default)]
    pub total_value: Option<String>,

    #[serde(rename = "AssessmentYear", default)]
    pub assessment_year: Option<String>,

    #[serde(rename = "LastScraped", default)]
    pub last_scraped: Option<String>,

    #[serde(rename = "PropertyID", default)]
    pub property_id: Option<String>,

    #[serde(rename = "Owner", default)]
    pub owner: Option<String>,

    #[serde(rename = "ScreenshotPath", default)]
    pub artifact_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedHistoricalRow {
    pub record: NormalizedRecord,
    pub county: Option<String>,
    pub state: Option<String>,
    pub last_scraped: Option<NaiveDateTime>,
    pub property_id: Option<String>,
    pub owner: Option<String>,
}
