//! Adapter error types
//!
//! `ScrapeError` is per item and never escapes the item loop.
//! `AdapterError` covers entry navigation, gating and construction,
//! and costs the whole group.

use std::path::Path;
use thiserror::Error;

use crate::infrastructure::browser::SessionError;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Unexpected page layout for parcel {parcel_id}: {detail}")]
    UnexpectedLayout { parcel_id: String, detail: String },

    #[error("Failed to save screenshot {path}: {message}")]
    Artifact { path: String, message: String },
}

impl ScrapeError {
    pub fn unexpected_layout(parcel_id: &str, detail: impl Into<String>) -> Self {
        Self::UnexpectedLayout {
            parcel_id: parcel_id.to_string(),
            detail: detail.into(),
        }
    }

    pub fn artifact(path: &Path, err: &std::io::Error) -> Self {
        Self::Artifact {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// True when the browser session is gone and later items cannot run
    pub fn is_session_fatal(&self) -> bool {
        match self {
            Self::Session(err) => err.is_session_fatal(),
            Self::UnexpectedLayout { .. } | Self::Artifact { .. } => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: SessionError,
    },

    #[error("Gating on {adapter} failed: {source}")]
    Gating {
        adapter: String,
        #[source]
        source: SessionError,
    },

    #[error("Adapter configuration error: {message}")]
    Configuration { message: String },
}

impl AdapterError {
    pub fn navigation(url: &str, source: SessionError) -> Self {
        Self::Navigation {
            url: url.to_string(),
            source,
        }
    }

    pub fn gating(adapter: &str, source: SessionError) -> Self {
        Self::Gating {
            adapter: adapter.to_string(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn is_session_fatal(&self) -> bool {
        match self {
            Self::Navigation { source, .. } | Self::Gating { source, .. } => source.is_session_fatal(),
            Self::Configuration { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_follows_session_error() {
        let lost = ScrapeError::from(SessionError::session_lost("driver exited"));
        assert!(lost.is_session_fatal());

        let missing = ScrapeError::from(SessionError::no_such_element("id=lblLand"));
        assert!(!missing.is_session_fatal());

        let gate = AdapterError::gating("gcs_portal(pierce|wi)", SessionError::no_such_element("xpath=//button"));
        assert!(!gate.is_session_fatal());
        assert!(!AdapterError::configuration("missing base url").is_session_fatal());
    }
}
