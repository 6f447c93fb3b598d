//! Configuration module for handling environment variables and .env files

use crate::client::{RedditClient, RedditClientError, DEFAULT_API_BASE, DEFAULT_AUTH_URL};
use crate::monitor::MonitorSettings;
use chrono_tz::Tz;
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration derived from environment variables and .env file
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Reddit API credentials
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,

    // Reddit API settings
    pub user_agent: String,
    pub api_base: String,
    pub auth_url: String,

    // OAuth token (if provided directly)
    pub access_token: Option<String>,

    // Monitoring
    pub monitor_delay: Duration,
    pub cache_ttl: Duration,

    // Output
    pub timezone: Tz,
    pub log_level: String,

    /// The .env file `load` read, if any
    pub env_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            user_agent: format!("redwatch/{}", env!("CARGO_PKG_VERSION")),
            api_base: DEFAULT_API_BASE.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            access_token: None,
            monitor_delay: MonitorSettings::DEFAULT_BASE_DELAY,
            cache_ttl: MonitorSettings::DEFAULT_FRESHNESS,
            timezone: chrono_tz::America::Los_Angeles,
            log_level: "info".to_string(),
            env_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file.
    ///
    /// Runs before logging is set up, so nothing is logged here; see [`Self::env_source`].
    pub fn load() -> Result<Self, RedditClientError> {
        // Try to load .env file, but continue even if it doesn't exist
        let env_file = dotenv().ok();

        let mut config = Self::from_lookup(|key| env::var(key).ok())?;
        config.env_file = env_file;
        Ok(config)
    }

    /// Where the environment came from, for logging once the logger is up
    pub fn env_source(&self) -> String {
        match &self.env_file {
            Some(path) => format!("Loaded environment from {}", path.display()),
            None => "No .env file found, using system environment variables only".to_string(),
        }
    }

    /// Build a configuration from any key lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RedditClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.client_id = lookup("REDDIT_CLIENT_ID");
        config.client_secret = lookup("REDDIT_CLIENT_SECRET");
        config.username = lookup("REDDIT_USERNAME");
        config.password = lookup("REDDIT_PASSWORD");
        config.access_token = lookup("REDDIT_ACCESS_TOKEN");

        if let Some(user_agent) = lookup("REDDIT_USER_AGENT") {
            config.user_agent = user_agent;
        }

        if let Some(api_base) = lookup("REDDIT_API_BASE") {
            config.api_base = api_base;
        }

        if let Some(auth_url) = lookup("REDDIT_AUTH_URL") {
            config.auth_url = auth_url;
        }

        if let Some(delay) = lookup("REDWATCH_MONITOR_DELAY_MS") {
            let ms = parse_number("REDWATCH_MONITOR_DELAY_MS", &delay)?;
            config.monitor_delay = Duration::from_millis(ms);
        }

        if let Some(ttl) = lookup("REDWATCH_CACHE_TTL_SECS") {
            let secs = parse_number("REDWATCH_CACHE_TTL_SECS", &ttl)?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Some(tz) = lookup("REDWATCH_TIMEZONE") {
            config.timezone = tz.parse::<Tz>().map_err(|e| {
                RedditClientError::ConfigError(format!("REDWATCH_TIMEZONE '{}': {}", tz, e))
            })?;
        }

        if let Some(level) = lookup("REDWATCH_LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Delay and freshness settings for feed controllers and their monitors
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            base_delay: self.monitor_delay,
            freshness: self.cache_ttl,
        }
    }

    /// Create a RedditClient from this configuration
    pub fn create_client(&self) -> Result<RedditClient, RedditClientError> {
        RedditClient::from_config(self)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, RedditClientError> {
    value.trim().parse::<u64>().map_err(|e| {
        RedditClientError::ConfigError(format!("{} must be a whole number, got '{}': {}", key, value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, RedditClientError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_observed_monitor_behaviour() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(15));
        assert_eq!(config.monitor_delay, Duration::from_millis(1500));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timezone, chrono_tz::America::Los_Angeles);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("REDDIT_CLIENT_ID", "abc"),
            ("REDDIT_ACCESS_TOKEN", "tok"),
            ("REDWATCH_MONITOR_DELAY_MS", "250"),
            ("REDWATCH_CACHE_TTL_SECS", "30"),
            ("REDWATCH_TIMEZONE", "Europe/Berlin"),
        ])
        .unwrap();

        assert_eq!(config.client_id.as_deref(), Some("abc"));
        assert_eq!(config.access_token.as_deref(), Some("tok"));
        let settings = config.monitor_settings();
        assert_eq!(settings.base_delay, Duration::from_millis(250));
        assert_eq!(settings.freshness, Duration::from_secs(30));
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn rejects_bad_numbers_and_zones() {
        assert!(matches!(
            config_from(&[("REDWATCH_MONITOR_DELAY_MS", "soon")]),
            Err(RedditClientError::ConfigError(_))
        ));
        assert!(matches!(
            config_from(&[("REDWATCH_TIMEZONE", "Mars/Olympus")]),
            Err(RedditClientError::ConfigError(_))
        ));
    }

    #[test]
    fn env_source_names_the_file_that_was_read() {
        let mut config = config_from(&[]).unwrap();
        assert!(config.env_file.is_none());
        assert!(config.env_source().starts_with("No .env file found"));

        config.env_file = Some(PathBuf::from("/srv/redwatch/.env"));
        assert_eq!(config.env_source(), "Loaded environment from /srv/redwatch/.env");
    }
}
