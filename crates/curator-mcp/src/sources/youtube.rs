//! Video signal: recent YouTube search results per keyword

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use curator_core::{CuratorResult, SourceKind};
use reqwest::Client;
use serde::Deserialize;

use super::{fetch_json, or_empty, SignalSource};

const NAME: &str = "youtube";
const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const MAX_RESULTS: u32 = 10;
const LOOKBACK_DAYS: i64 = 7;
/// Each matching video counts as this much intensity.
const VIEW_PROXY: f64 = 100.0;

pub struct YouTubeSource {
    client: Client,
    api_key: Option<String>,
    keyword_limit: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

impl YouTubeSource {
    pub fn new(client: Client, api_key: Option<String>, keyword_limit: usize) -> Self {
        Self {
            client,
            api_key,
            keyword_limit,
        }
    }

    async fn try_fetch(&self, vocabulary: &[String]) -> CuratorResult<HashMap<String, f64>> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!(source = NAME, "No API key configured");
            return Ok(HashMap::new());
        };

        let published_after = (Utc::now() - Duration::days(LOOKBACK_DAYS))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let max_results = MAX_RESULTS.to_string();
        let mut trends = HashMap::new();

        for keyword in vocabulary.iter().take(self.keyword_limit) {
            let request = self.client.get(SEARCH_URL).query(&[
                ("part", "snippet"),
                ("q", keyword.as_str()),
                ("type", "video"),
                ("order", "relevance"),
                ("publishedAfter", published_after.as_str()),
                ("maxResults", max_results.as_str()),
                ("key", api_key.as_str()),
            ]);

            match fetch_json::<SearchResponse>(NAME, request).await {
                Ok(response) => {
                    *trends.entry(keyword.clone()).or_insert(0.0) +=
                        response.items.len() as f64 * VIEW_PROXY;
                }
                Err(e) => {
                    tracing::debug!(keyword = %keyword, error = %e, "Skipping keyword");
                }
            }
        }

        Ok(trends)
    }
}

#[async_trait]
impl SignalSource for YouTubeSource {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Video
    }

    async fn fetch(&self, vocabulary: &[String]) -> HashMap<String, f64> {
        or_empty(NAME, self.try_fetch(vocabulary).await)
    }
}
