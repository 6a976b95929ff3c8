//! Browser session error types
//!
//! Distinguishes failures that only affect the current page interaction
//! from failures that mean the automation session itself is gone.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Failed to start browser session: {message}")]
    StartupFailed { message: String },

    #[error("Browser session lost: {message}")]
    SessionLost { message: String },

    #[error("WebDriver request failed: {message}")]
    Transport { message: String },

    #[error("WebDriver HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("WebDriver error {error}: {message}")]
    Protocol { error: String, message: String },

    #[error("No element matches {locator}")]
    NoSuchElement { locator: String },

    #[error("Frame {frame} is not available")]
    NoSuchFrame { frame: String },

    #[error("Timed out after {waited_ms}ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    #[error("Invalid WebDriver response: {message}")]
    InvalidResponse { message: String },
}

/// WebDriver error codes that mean the session cannot be used any more
const FATAL_PROTOCOL_ERRORS: &[&str] = &["invalid session id", "session not created", "no such window"];

impl SessionError {
    pub fn startup_failed(message: impl Into<String>) -> Self {
        Self::StartupFailed { message: message.into() }
    }

    pub fn session_lost(message: impl Into<String>) -> Self {
        Self::SessionLost { message: message.into() }
    }

    pub fn no_such_element(locator: impl ToString) -> Self {
        Self::NoSuchElement { locator: locator.to_string() }
    }

    pub fn timeout(what: impl Into<String>, waited: std::time::Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    /// Build from a W3C `{error, message}` pair, promoting session-ending codes.
    pub fn from_protocol(error: &str, message: &str) -> Self {
        if FATAL_PROTOCOL_ERRORS.contains(&error) {
            return Self::session_lost(format!("{error}: {message}"));
        }
        Self::Protocol {
            error: error.to_string(),
            message: message.to_string(),
        }
    }

    /// True when the session can no longer drive the browser.
    pub fn is_session_fatal(&self) -> bool {
        match self {
            Self::StartupFailed { .. } | Self::SessionLost { .. } => true,
            Self::Transport { .. }
            | Self::Http { .. }
            | Self::Protocol { .. }
            | Self::NoSuchElement { .. }
            | Self::NoSuchFrame { .. }
            | Self::Timeout { .. }
            | Self::InvalidResponse { .. } => false,
        }
    }

    /// True for "not there (yet)" conditions a wait loop may poll through.
    pub fn is_retryable_lookup(&self) -> bool {
        match self {
            Self::NoSuchElement { .. } | Self::NoSuchFrame { .. } => true,
            Self::Protocol { error, .. } => matches!(
                error.as_str(),
                "no such element" | "no such frame" | "stale element reference" | "element not interactable"
            ),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        // A refused connection means the driver process is gone
        if err.is_connect() {
            return Self::session_lost(err.to_string());
        }
        Self::Transport { message: err.to_string() }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_codes_classify_fatality() {
        assert!(SessionError::from_protocol("invalid session id", "gone").is_session_fatal());
        assert!(SessionError::from_protocol("no such window", "closed").is_session_fatal());
        assert!(!SessionError::from_protocol("no such element", "missing").is_session_fatal());
    }

    #[test]
    fn test_lookup_errors_are_retryable() {
        assert!(SessionError::no_such_element("id=pid").is_retryable_lookup());
        assert!(SessionError::from_protocol("stale element reference", "x").is_retryable_lookup());
        assert!(!SessionError::session_lost("driver exited").is_retryable_lookup());
        assert!(!SessionError::timeout("id=pid", std::time::Duration::from_secs(1)).is_retryable_lookup());
    }
}
