//! Parcel valuation scraper CLI
//!
//! Usage:
//!   parcel-valuation-scraper work-items.json
//!   parcel-valuation-scraper work-items.json --registry sites.json --screenshots ./shots
//!
//! Work items are a JSON array of `{ "ParcelID", "County", "State" }` objects.
//! Normalized records are printed to stdout as JSON lines.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use parcel_valuation_lib::adapters::AdapterRegistry;
use parcel_valuation_lib::application::{Dispatcher, SessionManager, ValuationPipeline};
use parcel_valuation_lib::domain::parse_work_items;
use parcel_valuation_lib::infrastructure::browser::WebDriverSessionFactory;
use parcel_valuation_lib::infrastructure::logging::log_system_info;
use parcel_valuation_lib::infrastructure::{
    ArtifactWriter, ConfigManager, InMemoryValuationStore, WaitSettings, init_logging_with_config,
};

#[derive(Parser, Debug)]
#[command(name = "parcel-valuation-scraper")]
#[command(about = "Scrape parcel valuations from county assessor sites")]
struct Args {
    /// JSON file with the work items to scrape
    work_items: PathBuf,

    /// Site registry to use instead of the configured or built-in one
    #[arg(long, short = 'r')]
    registry: Option<PathBuf>,

    /// Directory screenshots are written to
    #[arg(long, short = 's')]
    screenshots: Option<PathBuf>,

    /// Configuration file to use instead of the per-user one
    #[arg(long, env = "PARCEL_CONFIG")]
    config: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = match &args.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let mut config = config_manager.initialize_on_first_run().await?;
    if args.headless {
        config.webdriver.headless = true;
    }
    if let Some(dir) = &args.screenshots {
        config.scraping.screenshot_dir = dir.clone();
    }

    init_logging_with_config(&config.logging)?;
    log_system_info();

    let registry = match args.registry.as_ref().or(config.registry_path.as_ref()) {
        Some(path) => Arc::new(
            AdapterRegistry::load(path)
                .await
                .with_context(|| format!("Failed to load site registry {:?}", path))?,
        ),
        None => Arc::new(AdapterRegistry::builtin()?.clone()),
    };
    info!("📋 Site registry ready with {} entries", registry.len());

    let raw = tokio::fs::read_to_string(&args.work_items)
        .await
        .with_context(|| format!("Failed to read work items from {:?}", args.work_items))?;
    let items = parse_work_items(&raw)?;
    info!("📥 Loaded {} work items", items.len());

    let sessions = SessionManager::new(Arc::new(WebDriverSessionFactory::new(config.webdriver.clone())));
    let dispatcher = Dispatcher::new(
        registry,
        sessions,
        ArtifactWriter::new(config.scraping.screenshot_dir.clone()),
    )
    .with_waits(WaitSettings::from_config(&config.scraping));
    let store = Arc::new(InMemoryValuationStore::new());
    let pipeline = ValuationPipeline::new(dispatcher, store);

    let summary = pipeline.execute(&items).await?;

    for record in &summary.records {
        println!("{}", serde_json::to_string(record)?);
    }
    for failure in &summary.failures {
        eprintln!("failed: {} ({}): {}", failure.parcel_id, failure.adapter, failure.reason);
    }
    for group in &summary.failed_groups {
        eprintln!("skipped {} items for {}: {}", group.skipped_items, group.key, group.reason);
    }
    eprintln!(
        "{} requested, {} records stored, {} failed, {} unmapped",
        summary.requested,
        summary.stored,
        summary.failures.len(),
        summary.unmapped.len()
    );
    if let Some(reason) = &summary.session_error {
        eprintln!("run stopped early, browser session lost: {reason}");
    }

    Ok(())
}
