//! Adapter registry: which site protocol serves which (locality, region)
//!
//! Loaded once, read-only afterwards. Entry order is dispatch order.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::domain::AdapterKey;

static EMBEDDED_REGISTRY: &str = include_str!("../../config/registry.json");
static BUILTIN: OnceCell<AdapterRegistry> = OnceCell::new();

/// The site protocols this crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterVariant {
    /// GCS web portal: one-time disclaimer, in-page search
    GcsPortal,
    Hennepin,
    Spokane,
    /// parcelinfo.com (Lake County MN)
    LakeCounty,
    /// Patriot Properties frameset sites
    Patriot,
    /// CPT tax portal grid
    CptPortal,
}

impl AdapterVariant {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GcsPortal => "gcs_portal",
            Self::Hennepin => "hennepin",
            Self::Spokane => "spokane",
            Self::LakeCounty => "lake_county",
            Self::Patriot => "patriot",
            Self::CptPortal => "cpt_portal",
        }
    }

    /// Variants that serve many sites and need the site's base URL
    pub const fn requires_base_url(self) -> bool {
        matches!(self, Self::GcsPortal | Self::Patriot | Self::CptPortal)
    }
}

impl fmt::Display for AdapterVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub locality: String,
    pub region: String,
    pub variant: AdapterVariant,
    /// Site start URL; optional for single-site variants (overrides their default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl RegistryEntry {
    pub fn new(locality: impl Into<String>, region: impl Into<String>, variant: AdapterVariant) -> Self {
        Self {
            locality: locality.into(),
            region: region.into(),
            variant,
            base_url: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn key(&self) -> AdapterKey {
        AdapterKey::new(&self.locality, &self.region)
    }

    /// `variant(locality|region)`, used as the adapter's name
    pub fn adapter_name(&self) -> String {
        format!("{}({})", self.variant, self.key())
    }

    /// Parsed base URL, if configured
    pub fn parsed_base_url(&self) -> Option<Result<Url, url::ParseError>> {
        self.base_url.as_deref().map(Url::parse)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryDocument {
    sites: Vec<RegistryEntry>,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read registry {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid registry document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Registry entry has an empty locality or region (variant {variant})")]
    EmptyKey { variant: AdapterVariant },

    #[error("Duplicate registry entry for {key}")]
    DuplicateKey { key: AdapterKey },

    #[error("Registry entry {key} ({variant}) requires a base_url")]
    MissingBaseUrl { key: AdapterKey, variant: AdapterVariant },

    #[error("Registry entry {key} has an invalid base_url '{url}': {reason}")]
    InvalidBaseUrl { key: AdapterKey, url: String, reason: String },
}

/// Immutable mapping from [`AdapterKey`] to a [`RegistryEntry`].
#[derive(Debug, Clone)]
pub struct AdapterRegistry {
    entries: Vec<RegistryEntry>,
    index: HashMap<AdapterKey, usize>,
}

impl AdapterRegistry {
    /// Validate and index entries, keeping their order.
    pub fn from_entries(entries: Vec<RegistryEntry>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            if entry.locality.trim().is_empty() || entry.region.trim().is_empty() {
                return Err(RegistryError::EmptyKey { variant: entry.variant });
            }
            let key = entry.key();
            validate_base_url(entry, &key)?;
            if index.insert(key.clone(), position).is_some() {
                return Err(RegistryError::DuplicateKey { key });
            }
        }

        Ok(Self { entries, index })
    }

    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let document: RegistryDocument = serde_json::from_str(json)?;
        Self::from_entries(document.sites)
    }

    pub async fn load(path: &Path) -> Result<Self, RegistryError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json(&json)?;
        info!("Loaded {} registry entries from {:?}", registry.len(), path);
        Ok(registry)
    }

    /// The registry shipped with the crate, parsed on first use.
    pub fn builtin() -> Result<&'static Self, RegistryError> {
        BUILTIN.get_or_try_init(|| Self::from_json(EMBEDDED_REGISTRY))
    }

    pub fn get(&self, key: &AdapterKey) -> Option<&RegistryEntry> {
        self.index.get(key).map(|&position| &self.entries[position])
    }

    pub fn resolve(&self, locality: &str, region: &str) -> Option<&RegistryEntry> {
        self.get(&AdapterKey::new(locality, region))
    }

    /// Registration position of a key; dispatch runs groups in this order
    pub fn position(&self, key: &AdapterKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_base_url(entry: &RegistryEntry, key: &AdapterKey) -> Result<(), RegistryError> {
    let Some(raw) = entry.base_url.as_deref() else {
        if entry.variant.requires_base_url() {
            return Err(RegistryError::MissingBaseUrl {
                key: key.clone(),
                variant: entry.variant,
            });
        }
        return Ok(());
    };

    let invalid = |reason: String| RegistryError::InvalidBaseUrl {
        key: key.clone(),
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = AdapterRegistry::builtin().unwrap();
        assert!(!registry.is_empty());
        assert_eq!(
            registry.resolve("hennepin", "mn").map(|e| e.variant),
            Some(AdapterVariant::Hennepin)
        );
        assert_eq!(
            registry.resolve("Mille Lacs", "MN").map(|e| e.variant),
            Some(AdapterVariant::CptPortal)
        );
    }

    #[test]
    fn test_builtin_entries_are_valid_for_their_variant() {
        let registry = AdapterRegistry::builtin().unwrap();
        for entry in registry.entries() {
            if entry.variant.requires_base_url() {
                assert!(entry.base_url.is_some(), "{} lacks base_url", entry.key());
            }
        }
    }
}
