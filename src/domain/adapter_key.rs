//! Lookup key derived from a work item's locality and region

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized `locality|region` key.
///
/// Both halves are trimmed, inner whitespace runs collapse to a single
/// space and the result is lowercased, so `" Pope ", "mn"` and
/// `"POPE", "MN"` resolve to the same adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdapterKey(String);

impl AdapterKey {
    pub fn new(locality: &str, region: &str) -> Self {
        Self(format!("{}|{}", fold(locality), fold(region)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Locality half of the key (already folded)
    pub fn locality(&self) -> &str {
        self.0.split_once('|').map_or(self.0.as_str(), |(locality, _)| locality)
    }

    /// Region half of the key (already folded)
    pub fn region(&self) -> &str {
        self.0.split_once('|').map_or("", |(_, region)| region)
    }
}

impl fmt::Display for AdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn fold(part: &str) -> String {
    part.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
