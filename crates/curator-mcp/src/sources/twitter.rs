//! Short-form social signal: likes and retweets on recent X/Twitter posts

use std::collections::HashMap;

use async_trait::async_trait;
use curator_core::{CuratorResult, SourceKind};
use reqwest::Client;
use serde::Deserialize;

use super::{fetch_json, or_empty, SignalSource};

const NAME: &str = "twitter";
const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";
const MAX_RESULTS: &str = "10";

pub struct TwitterSource {
    client: Client,
    bearer_token: Option<String>,
    keyword_limit: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<Tweet>>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    public_metrics: PublicMetrics,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    retweet_count: u64,
}

impl SearchResponse {
    /// Likes plus retweets, `None` when the search matched nothing.
    fn engagement(&self) -> Option<f64> {
        let tweets = self.data.as_ref().filter(|t| !t.is_empty())?;
        Some(
            tweets
                .iter()
                .map(|t| (t.public_metrics.like_count + t.public_metrics.retweet_count) as f64)
                .sum(),
        )
    }
}

impl TwitterSource {
    pub fn new(client: Client, bearer_token: Option<String>, keyword_limit: usize) -> Self {
        Self {
            client,
            bearer_token,
            keyword_limit,
        }
    }

    async fn try_fetch(&self, vocabulary: &[String]) -> CuratorResult<HashMap<String, f64>> {
        let Some(token) = &self.bearer_token else {
            tracing::debug!(source = NAME, "No bearer token configured");
            return Ok(HashMap::new());
        };

        let mut trends = HashMap::new();

        for keyword in vocabulary.iter().take(self.keyword_limit) {
            let query = format!("\"{}\" -is:retweet", keyword);
            let request = self.client.get(SEARCH_URL).bearer_auth(token).query(&[
                ("query", query.as_str()),
                ("max_results", MAX_RESULTS),
                ("tweet.fields", "public_metrics"),
            ]);

            match fetch_json::<SearchResponse>(NAME, request).await {
                Ok(response) => {
                    if let Some(engagement) = response.engagement() {
                        *trends.entry(keyword.clone()).or_insert(0.0) += engagement;
                    }
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
impl SignalSource for TwitterSource {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::ShortFormSocial
    }

    async fn fetch(&self, vocabulary: &[String]) -> HashMap<String, f64> {
        or_empty(NAME, self.try_fetch(vocabulary).await)
    }
}
