//! Infrastructure layer: browser automation, configuration, logging and storage
//!
//! Everything that touches the outside world (WebDriver over HTTP, the
//! filesystem, environment) lives here behind the traits the core uses.

pub mod artifacts;
pub mod browser;
pub mod config;
pub mod logging;
pub mod memory_store;

pub use artifacts::{ArtifactWriter, sanitize_file_name};
pub use browser::{BrowserSession, Locator, SessionError, SessionFactory, WaitPolicy, WaitSettings};
pub use config::{AppConfig, ConfigManager};
pub use logging::{get_log_directory, init_logging_with_config};
pub use memory_store::InMemoryValuationStore;
