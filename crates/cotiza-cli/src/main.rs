use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use cotiza_core::{AppConfig, Branch, BrowserDriver, Store};
use cotiza_scraper::{build_browser, build_scraper, ScrapeContext, ScraperOptions, SessionProfile};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cotiza-cli")]
#[command(about = "Search El Salvador storefronts and print normalized listings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape one store and print the results as JSON
    Scrape {
        /// Store slug: siman, curacao, walmart, prismamoda, selectos or vidri
        store: Store,

        /// Search text
        query: String,

        /// Override the configured result cap
        #[arg(long)]
        max_items: Option<usize>,

        /// Override the configured browser driver
        #[arg(long, value_enum)]
        driver: Option<DriverArg>,

        /// Show the browser window (chromium only)
        #[arg(long)]
        headful: bool,
    },
    /// List supported stores and the Walmart branches in use
    Stores,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DriverArg {
    Chromium,
    Http,
}

impl From<DriverArg> for BrowserDriver {
    fn from(arg: DriverArg) -> Self {
        match arg {
            DriverArg::Chromium => BrowserDriver::Chromium,
            DriverArg::Http => BrowserDriver::Http,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut config = cotiza_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let branches = cotiza_core::load_branches_or_default(&config.branches_path)?;

    match cli.command {
        Commands::Scrape {
            store,
            query,
            max_items,
            driver,
            headful,
        } => {
            apply_overrides(&mut config, max_items, driver, headful);
            run_scrape(&config, store, &query, &branches).await?;
        }
        Commands::Stores => print_stores(&branches),
    }

    Ok(())
}

fn apply_overrides(
    config: &mut AppConfig,
    max_items: Option<usize>,
    driver: Option<DriverArg>,
    headful: bool,
) {
    if let Some(max_items) = max_items {
        config.scraper_max_items = max_items.max(1);
    }
    if let Some(driver) = driver {
        config.browser_driver = driver.into();
    }
    if headful {
        config.browser_headless = false;
    }
}

async fn run_scrape(
    config: &AppConfig,
    store: Store,
    query: &str,
    branches: &[Branch],
) -> anyhow::Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("query must not be empty");
    }

    let ctx = ScrapeContext {
        browser: Arc::from(build_browser(config)?),
        profile: SessionProfile::from_config(config),
        options: ScraperOptions::from_config(config),
    };
    let scraper = build_scraper(store, ctx, branches)?;

    tracing::info!(store = %store, query, driver = %config.browser_driver, "scraping");
    let results = scraper.scrape(query).await;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn print_stores(branches: &[Branch]) {
    for store in Store::ALL {
        println!("{:<12} {}", store.slug(), store.display_name());
        if store.is_multi_branch() {
            for branch in branches {
                println!("  {:<20} {:<24} {}", branch.key, branch.display_name(), branch.seller_id);
            }
        }
    }
}
