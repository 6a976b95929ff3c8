//! Configuration infrastructure
//!
//! Contains configuration loading and management for the scraper.
//!
//! Values are layered, later layers winning:
//! 1. Built-in defaults (`defaults` module)
//! 2. `config.json` in the user config directory
//! 3. `PARCEL_*` environment variables (`PARCEL_WEBDRIVER__ENDPOINT=...`)

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser automation endpoint and startup flags
    pub webdriver: WebDriverConfig,

    /// Wait timeouts and artifact location
    pub scraping: ScrapingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Site registry file; the embedded registry is used when unset
    pub registry_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

/// WebDriver connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// chromedriver / geckodriver URL
    pub endpoint: String,

    pub browser: BrowserKind,

    /// Run without a visible window
    pub headless: bool,

    /// Extra browser command line switches
    pub browser_args: Vec<String>,

    /// Per-command HTTP timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Scraping behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Directory receiving `<parcel>.png` / `error_<parcel>.png`
    pub screenshot_dir: PathBuf,

    /// Regular explicit wait timeout
    pub wait_timeout_seconds: u64,

    /// Explicit wait timeout for slow sites
    pub extended_wait_timeout_seconds: u64,

    /// How long to look for optional disclaimer buttons
    pub probe_timeout_seconds: u64,

    /// Poll interval for explicit waits
    pub poll_interval_ms: u64,

    /// Pause after actions that trigger client-side rendering
    pub settle_delay_ms: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log file name inside the log directory
    pub file_name: String,

    /// Log directory; defaults to `logs/` next to the executable
    pub directory: Option<PathBuf>,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,

    /// Keep only the most recent log file (delete all others)
    pub keep_only_latest: bool,

    /// Module-specific log level filters (e.g., "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::WEBDRIVER_ENDPOINT.to_string(),
            browser: BrowserKind::Chrome,
            headless: defaults::HEADLESS,
            browser_args: defaults::BROWSER_ARGS.iter().map(|s| s.to_string()).collect(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: PathBuf::from(defaults::SCREENSHOT_DIR),
            wait_timeout_seconds: defaults::WAIT_TIMEOUT_SECONDS,
            extended_wait_timeout_seconds: defaults::EXTENDED_WAIT_TIMEOUT_SECONDS,
            probe_timeout_seconds: defaults::PROBE_TIMEOUT_SECONDS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            settle_delay_ms: defaults::SETTLE_DELAY_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            directory: None,
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: defaults::LOG_AUTO_CLEANUP,
            keep_only_latest: defaults::LOG_KEEP_ONLY_LATEST,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("h2".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Configuration manager for the per-user config file
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    /// Configuration manager for an explicit file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Initialize configuration system on first run
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("🎉 First run detected - writing default configuration");
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
        }
        self.load_config()
    }

    /// Load defaults, then the config file (if any), then `PARCEL_*` environment overrides
    pub fn load_config(&self) -> Result<AppConfig> {
        let baseline = config::Config::try_from(&AppConfig::default())
            .context("Failed to build default configuration")?;

        let settings = config::Config::builder()
            .add_source(baseline)
            .add_source(config::File::from(self.config_path.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("webdriver.browser_args"),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {:?}", self.config_path))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Configuration has invalid values")?;
        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Default configuration values
pub mod defaults {
    /// Directory name under the user config directory
    pub const APP_DIR_NAME: &str = "parcel-valuation-scraper";

    /// Configuration file name
    pub const CONFIG_FILE_NAME: &str = "config.json";

    /// Environment variable prefix
    pub const ENV_PREFIX: &str = "PARCEL";

    /// Default chromedriver endpoint
    pub const WEBDRIVER_ENDPOINT: &str = "http://localhost:9515";

    /// Sites render differently headless; run with a window by default
    pub const HEADLESS: bool = false;

    /// Browser switches every session starts with
    pub const BROWSER_ARGS: &[&str] = &["--disable-gpu", "--no-sandbox", "--disable-dev-shm-usage"];

    /// WebDriver HTTP request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;

    /// Default screenshot directory
    pub const SCREENSHOT_DIR: &str = "Screenshots";

    /// Regular explicit wait in seconds
    pub const WAIT_TIMEOUT_SECONDS: u64 = 10;

    /// Explicit wait for slow sites in seconds
    pub const EXTENDED_WAIT_TIMEOUT_SECONDS: u64 = 20;

    /// Optional interstitial probe in seconds
    pub const PROBE_TIMEOUT_SECONDS: u64 = 3;

    /// Explicit wait poll interval in milliseconds
    pub const POLL_INTERVAL_MS: u64 = 250;

    /// Settle pause in milliseconds
    pub const SETTLE_DELAY_MS: u64 = 1000;

    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = true;

    /// Default log file name
    pub const LOG_FILE_NAME: &str = "parcel-scraper.log";

    /// Default maximum log files to keep
    pub const LOG_MAX_FILES: u32 = 5;

    /// Default auto cleanup logs setting
    pub const LOG_AUTO_CLEANUP: bool = true;

    /// Default keep only latest setting
    pub const LOG_KEEP_ONLY_LATEST: bool = false;
}
