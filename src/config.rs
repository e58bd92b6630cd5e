//! Application configuration loaded from environment variables.
//!
//! Credentials are optional: without them the tracker serves whatever is in
//! the on-disk cache and every sync attempt short-circuits before any
//! network call.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// File name of the persisted activity collection inside `cache_dir`.
pub const CACHE_FILE_NAME: &str = "swim_activities_cache.json";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// SSO base URL (the `/signin` page lives below it)
    pub sso_url: String,
    /// Connect application base URL (dashboard, ticket exchange, proxy API)
    pub connect_url: String,
    /// Account email
    pub email: Option<String>,
    /// Account password
    pub password: Option<String>,
    /// Directory holding the activity cache file
    pub cache_dir: PathBuf,
    /// Oldest calendar year `load_more` will page back to
    pub min_history_year: i32,
    /// `limit` used for each activity search page
    pub search_page_size: u32,
    /// Connect + read timeout for remote calls
    pub http_timeout: Duration,
    /// Local API port
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            sso_url: "http://127.0.0.1:9/sso".to_string(),
            connect_url: "http://127.0.0.1:9/modern".to_string(),
            email: Some("swimmer@example.com".to_string()),
            password: Some("test_password".to_string()),
            cache_dir: env::temp_dir().join("swim-tracker-test"),
            min_history_year: 2015,
            search_page_size: 100,
            http_timeout: Duration::from_secs(5),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let sso_url = env::var("GARMIN_SSO_URL")
            .unwrap_or_else(|_| "https://sso.garmin.cn/sso".to_string());
        let connect_url = env::var("GARMIN_CONNECT_URL")
            .unwrap_or_else(|_| "https://connect.garmin.cn/modern".to_string());

        for (name, value) in [("GARMIN_SSO_URL", &sso_url), ("GARMIN_CONNECT_URL", &connect_url)] {
            if reqwest::Url::parse(value).is_err() {
                return Err(ConfigError::InvalidUrl(name, value.clone()));
            }
        }

        Ok(Self {
            sso_url: sso_url.trim_end_matches('/').to_string(),
            connect_url: connect_url.trim_end_matches('/').to_string(),
            email: non_empty_var("GARMIN_EMAIL"),
            password: non_empty_var("GARMIN_PASSWORD"),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            min_history_year: parse_var("MIN_HISTORY_YEAR", 2015),
            search_page_size: parse_var("SEARCH_PAGE_SIZE", 100u32).max(1),
            http_timeout: Duration::from_secs(parse_var("HTTP_TIMEOUT_SECS", 30)),
            port: parse_var("PORT", 8080),
        })
    }

    /// Full path of the persisted activity collection.
    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE_NAME)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL in {0}: {1}")]
    InvalidUrl(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("GARMIN_EMAIL", "  swimmer@example.com ");
        env::set_var("GARMIN_PASSWORD", "");
        env::set_var("MIN_HISTORY_YEAR", "2018");
        env::set_var("SEARCH_PAGE_SIZE", "not-a-number");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.email.as_deref(), Some("swimmer@example.com"));
        assert_eq!(config.password, None);
        assert_eq!(config.min_history_year, 2018);
        assert_eq!(config.search_page_size, 100);
        assert!(config.cache_file().ends_with(CACHE_FILE_NAME));
    }
}
