pub mod browser;
pub mod consolidate;
pub mod error;
pub mod extract;
pub mod price;
pub mod relevance;
pub mod stores;
pub mod text;

pub use browser::{build_browser, Browser, Node, Session, SessionProfile, Viewport};
pub use consolidate::Consolidator;
pub use error::ScraperError;
pub use price::{compare_prices, extract_prices, Prices};
pub use relevance::RelevancePolicy;
pub use stores::{build_scraper, ScrapeContext, ScraperOptions, StoreScraper};
pub use text::{clean_name, normalize_key, Boilerplate};
