use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which browser-automation backend drives store sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserDriver {
    /// Headless Chrome over the `DevTools` protocol. Executes page scripts.
    Chromium,
    /// Plain HTTP fetch plus static HTML parsing. No script execution.
    Http,
}

impl std::fmt::Display for BrowserDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowserDriver::Chromium => write!(f, "chromium"),
            BrowserDriver::Http => write!(f, "http"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub branches_path: PathBuf,
    pub browser_driver: BrowserDriver,
    pub browser_headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub scraper_max_items: usize,
    pub scraper_navigation_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_accept_language: String,
    /// Let Vidrí's DOM search keep category and promotion pages.
    pub scraper_include_categories: bool,
}

impl AppConfig {
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.env == Environment::Development
    }
}
