//! Work items supplied by the import step

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AdapterKey;

/// One parcel awaiting extraction.
///
/// Field names on the wire follow the import sheet columns
/// (`ParcelID`, `County`, `State`, `PropertyID`, `Owner`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(rename = "ParcelID")]
    pub parcel_id: String,

    #[serde(rename = "County", default)]
    pub locality: String,

    #[serde(rename = "State", default)]
    pub region: String,

    #[serde(rename = "PropertyID", default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,

    #[serde(rename = "Owner", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl WorkItem {
    pub fn new(
        parcel_id: impl Into<String>,
        locality: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            parcel_id: parcel_id.into(),
            locality: locality.into(),
            region: region.into(),
            property_id: None,
            owner: None,
        }
    }

    pub fn adapter_key(&self) -> AdapterKey {
        AdapterKey::new(&self.locality, &self.region)
    }

    pub fn validate(&self) -> Result<(), WorkItemError> {
        if self.parcel_id.trim().is_empty() {
            return Err(WorkItemError::MissingParcelId {
                locality: self.locality.clone(),
                region: self.region.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum WorkItemError {
    #[error("Work item for '{locality}, {region}' has an empty ParcelID")]
    MissingParcelId { locality: String, region: String },

    #[error("Invalid work item document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// Parse a JSON array of work items, trimming parcel ids and rejecting
/// entries without one.
pub fn parse_work_items(json: &str) -> Result<Vec<WorkItem>, WorkItemError> {
    let mut items: Vec<WorkItem> = serde_json::from_str(json)?;
    for item in &mut items {
        item.validate()?;
        item.parcel_id = item.parcel_id.trim().to_string();
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uses_sheet_column_names() {
        let json = r#"[
            {"ParcelID": " 27-117-21-32-0016 ", "County": "Hennepin", "State": "MN", "Owner": "SMITH JOHN"},
            {"ParcelID": "009-0001", "County": "Lake", "State": "MN", "PropertyID": "P-77"}
        ]"#;

        let items = parse_work_items(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].parcel_id, "27-117-21-32-0016");
        assert_eq!(items[0].owner.as_deref(), Some("SMITH JOHN"));
        assert_eq!(items[1].property_id.as_deref(), Some("P-77"));
        assert_eq!(items[1].adapter_key().as_str(), "lake|mn");
    }

    #[test]
    fn test_parse_rejects_blank_parcel_id() {
        let json = r#"[{"ParcelID": "   ", "County": "Hennepin", "State": "MN"}]"#;
        let err = parse_work_items(json).unwrap_err();
        assert!(matches!(err, WorkItemError::MissingParcelId { .. }));
    }
}
