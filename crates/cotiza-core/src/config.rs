use crate::app_config::{AppConfig, BrowserDriver, Environment};
use crate::ConfigError;

/// Desktop Chrome identity presented to storefronts unless overridden.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_ACCEPT_LANGUAGE: &str = "es-ES,es;q=0.9";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let env = parse_environment(&or_default("COTIZA_ENV", "development"))?;
    let bind_addr = parse_addr("COTIZA_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("COTIZA_LOG_LEVEL", "info");
    let branches_path = PathBuf::from(or_default(
        "COTIZA_BRANCHES_PATH",
        "./config/branches.yaml",
    ));

    let browser_driver = parse_browser_driver(&or_default("COTIZA_BROWSER_DRIVER", "chromium"))?;
    let browser_headless = parse_bool("COTIZA_BROWSER_HEADLESS", "true")?;
    let chrome_executable = lookup("COTIZA_CHROME_EXECUTABLE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);

    let scraper_max_items = parse_usize("COTIZA_SCRAPER_MAX_ITEMS", "20")?;
    if scraper_max_items == 0 {
        return Err(invalid(
            "COTIZA_SCRAPER_MAX_ITEMS",
            "must be at least 1".to_string(),
        ));
    }
    let scraper_navigation_timeout_secs =
        parse_u64("COTIZA_SCRAPER_NAVIGATION_TIMEOUT_SECS", "30")?;
    let scraper_user_agent = or_default("COTIZA_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);
    let scraper_accept_language =
        or_default("COTIZA_SCRAPER_ACCEPT_LANGUAGE", DEFAULT_ACCEPT_LANGUAGE);
    let scraper_include_categories = parse_bool("COTIZA_SCRAPER_INCLUDE_CATEGORIES", "false")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        branches_path,
        browser_driver,
        browser_headless,
        chrome_executable,
        scraper_max_items,
        scraper_navigation_timeout_secs,
        scraper_user_agent,
        scraper_accept_language,
        scraper_include_categories,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "COTIZA_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

/// Parse a driver name into a [`BrowserDriver`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `chromium` or `http`.
pub fn parse_browser_driver(s: &str) -> Result<BrowserDriver, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "chromium" | "chrome" => Ok(BrowserDriver::Chromium),
        "http" => Ok(BrowserDriver::Http),
        other => Err(ConfigError::InvalidEnvVar {
            var: "COTIZA_BROWSER_DRIVER".to_string(),
            reason: format!("expected chromium or http; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
