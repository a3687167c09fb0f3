//! External signal sources
//!
//! Every source answers one question: for this keyword vocabulary, how
//! intense is each keyword on my platform right now? Units differ per source
//! and are left raw; weighting happens when the snapshot is combined.
//!
//! A source never fails outward. Missing credentials, transport errors,
//! non-2xx responses and malformed payloads all end up as an empty mapping.

mod hackernews;
mod reddit;
mod twitter;
mod youtube;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use curator_core::{CuratorError, CuratorResult, SourceKind};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::config::{SourcesConfig, TrendsConfig};
use crate::error::{CuratorMcpError, Result};

pub use hackernews::HackerNewsSource;
pub use reddit::RedditSource;
pub use twitter::TwitterSource;
pub use youtube::YouTubeSource;

const USER_AGENT: &str = "AI-Curator/0.1";

/// One external feed of keyword intensities.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Name recorded in each trend record's `sources` map
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Keyword -> raw intensity. Empty when the source is unavailable.
    async fn fetch(&self, vocabulary: &[String]) -> HashMap<String, f64>;
}

/// Downgrade a failed fetch to an empty result.
pub(crate) fn or_empty(
    name: &str,
    result: CuratorResult<HashMap<String, f64>>,
) -> HashMap<String, f64> {
    match result {
        Ok(values) => {
            tracing::debug!(source = name, keywords = values.len(), "Source fetched");
            values
        }
        Err(e) => {
            tracing::warn!(source = name, error = %e, "Source unavailable, contributing nothing");
            HashMap::new()
        }
    }
}

pub(crate) fn unavailable(source: &str, reason: impl ToString) -> CuratorError {
    CuratorError::SourceUnavailable {
        name: source.to_string(),
        reason: reason.to_string(),
    }
}

/// Send a request and decode a 2xx JSON body.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    source: &str,
    request: RequestBuilder,
) -> CuratorResult<T> {
    let response = request.send().await.map_err(|e| unavailable(source, e))?;

    if !response.status().is_success() {
        return Err(unavailable(
            source,
            format!("API returned status {}", response.status()),
        ));
    }

    response
        .json()
        .await
        .map_err(|e| CuratorError::Parse(format!("{} response: {}", source, e)))
}

/// Shared HTTP client with the per-source timeout applied.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| CuratorMcpError::Http(format!("Failed to create HTTP client: {}", e)))
}

/// All four production sources. Sources without credentials are still
/// included and simply report nothing.
pub fn default_sources(
    sources: &SourcesConfig,
    trends: &TrendsConfig,
) -> Result<Vec<Arc<dyn SignalSource>>> {
    let client = build_http_client(Duration::from_secs(trends.source_timeout_seconds))?;

    let reddit_credentials = match (&sources.reddit_client_id, &sources.reddit_client_secret) {
        (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
        _ => None,
    };

    let all: Vec<Arc<dyn SignalSource>> = vec![
        Arc::new(RedditSource::new(client.clone(), reddit_credentials)),
        Arc::new(HackerNewsSource::new(
            client.clone(),
            sources.hackernews_base_url.clone(),
        )),
        Arc::new(YouTubeSource::new(
            client.clone(),
            sources.youtube_api_key.clone(),
            trends.keyword_query_limit,
        )),
        Arc::new(TwitterSource::new(
            client,
            sources.twitter_bearer_token.clone(),
            trends.keyword_query_limit,
        )),
    ];

    for source in &all {
        tracing::info!(source = source.name(), kind = ?source.kind(), "Signal source registered");
    }

    Ok(all)
}
