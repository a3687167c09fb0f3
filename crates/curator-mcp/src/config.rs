//! Configuration management for the curator MCP server

use serde::Deserialize;

use crate::error::Result;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub trends: TrendsConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Durable store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding profiles, trend snapshots and logs
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "curator.db".to_string()
}

/// Trend aggregation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrendsConfig {
    /// Upper bound on a single source fetch, in seconds
    #[serde(default = "default_source_timeout")]
    pub source_timeout_seconds: u64,
    /// Divides the weighted raw sum before clamping to 0-100
    #[serde(default = "default_normalization_divisor")]
    pub normalization_divisor: f64,
    /// Number of per-date snapshots kept in memory
    #[serde(default = "default_snapshot_cache_capacity")]
    pub snapshot_cache_capacity: u64,
    /// Per-keyword query sources only ask about the first N keywords
    #[serde(default = "default_keyword_query_limit")]
    pub keyword_query_limit: usize,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            source_timeout_seconds: default_source_timeout(),
            normalization_divisor: default_normalization_divisor(),
            snapshot_cache_capacity: default_snapshot_cache_capacity(),
            keyword_query_limit: default_keyword_query_limit(),
        }
    }
}

fn default_source_timeout() -> u64 {
    20
}

fn default_normalization_divisor() -> f64 {
    curator_core::DEFAULT_NORMALIZATION_DIVISOR
}

fn default_snapshot_cache_capacity() -> u64 {
    2
}

fn default_keyword_query_limit() -> usize {
    10
}

/// Signal source credentials. A missing credential disables that source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_reddit_client_id")]
    pub reddit_client_id: Option<String>,
    #[serde(default = "default_reddit_client_secret")]
    pub reddit_client_secret: Option<String>,
    #[serde(default = "default_twitter_bearer_token")]
    pub twitter_bearer_token: Option<String>,
    #[serde(default = "default_youtube_api_key")]
    pub youtube_api_key: Option<String>,
    #[serde(default = "default_hackernews_base_url")]
    pub hackernews_base_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            reddit_client_id: default_reddit_client_id(),
            reddit_client_secret: default_reddit_client_secret(),
            twitter_bearer_token: default_twitter_bearer_token(),
            youtube_api_key: default_youtube_api_key(),
            hackernews_base_url: default_hackernews_base_url(),
        }
    }
}

fn env_credential(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn default_reddit_client_id() -> Option<String> {
    env_credential("REDDIT_CLIENT_ID")
}

fn default_reddit_client_secret() -> Option<String> {
    env_credential("REDDIT_CLIENT_SECRET")
}

fn default_twitter_bearer_token() -> Option<String> {
    env_credential("TWITTER_BEARER_TOKEN")
}

fn default_youtube_api_key() -> Option<String> {
    env_credential("YOUTUBE_API_KEY")
}

fn default_hackernews_base_url() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("database.path", default_database_path())?
            .set_default("trends.source_timeout_seconds", default_source_timeout() as i64)?
            .set_default("trends.normalization_divisor", default_normalization_divisor())?
            .set_default(
                "trends.snapshot_cache_capacity",
                default_snapshot_cache_capacity() as i64,
            )?
            .set_default("trends.keyword_query_limit", default_keyword_query_limit() as i64)?
            .set_default("sources.hackernews_base_url", default_hackernews_base_url())?
            // Load from config files if they exist
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Override with environment variables (CURATOR__TRENDS__SOURCE_TIMEOUT_SECONDS, etc.)
            .add_source(
                config::Environment::with_prefix("CURATOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        config.validate();
        Ok(config)
    }

    /// Clamp values that would break the aggregator.
    pub fn validate(&mut self) {
        if self.trends.snapshot_cache_capacity < 2 {
            tracing::warn!(
                configured = self.trends.snapshot_cache_capacity,
                "Snapshot cache capacity below 2, using 2"
            );
            self.trends.snapshot_cache_capacity = 2;
        }
        let divisor = self.trends.normalization_divisor;
        if divisor <= 0.0 || !divisor.is_finite() {
            tracing::warn!(
                configured = self.trends.normalization_divisor,
                "Normalization divisor must be positive, using default"
            );
            self.trends.normalization_divisor = default_normalization_divisor();
        }
        if self.trends.source_timeout_seconds == 0 {
            self.trends.source_timeout_seconds = default_source_timeout();
        }
    }
}
