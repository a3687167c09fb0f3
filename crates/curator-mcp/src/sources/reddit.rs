//! Forum signal: hot posts from AI subreddits

use std::collections::HashMap;

use async_trait::async_trait;
use curator_core::{tally_keywords, CuratorResult, SourceKind};
use reqwest::Client;
use serde::Deserialize;

use super::{fetch_json, or_empty, SignalSource};

const NAME: &str = "reddit";
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const SUBREDDITS: &[&str] = &[
    "MachineLearning",
    "artificial",
    "OpenAI",
    "singularity",
    "technology",
];
const POSTS_PER_SUBREDDIT: u32 = 25;

pub struct RedditSource {
    client: Client,
    /// `(client_id, client_secret)`
    credentials: Option<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    #[serde(default)]
    score: f64,
}

impl RedditSource {
    pub fn new(client: Client, credentials: Option<(String, String)>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    async fn access_token(&self, client_id: &str, client_secret: &str) -> CuratorResult<String> {
        let request = self
            .client
            .post(TOKEN_URL)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")]);

        let token: TokenResponse = fetch_json(NAME, request).await?;
        Ok(token.access_token)
    }

    async fn try_fetch(&self, vocabulary: &[String]) -> CuratorResult<HashMap<String, f64>> {
        let Some((client_id, client_secret)) = &self.credentials else {
            tracing::debug!(source = NAME, "No credentials configured");
            return Ok(HashMap::new());
        };

        let token = self.access_token(client_id, client_secret).await?;
        let mut trends = HashMap::new();

        for subreddit in SUBREDDITS {
            let request = self
                .client
                .get(format!("{}/r/{}/hot", API_BASE, subreddit))
                .bearer_auth(&token)
                .query(&[("limit", POSTS_PER_SUBREDDIT)]);

            // A single subreddit failing only loses that subreddit
            let listing: Listing = match fetch_json(NAME, request).await {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::debug!(subreddit = subreddit, error = %e, "Skipping subreddit");
                    continue;
                }
            };

            for child in listing.data.children {
                tally_keywords(&child.data.title, child.data.score, vocabulary, &mut trends);
            }
        }

        Ok(trends)
    }
}

#[async_trait]
impl SignalSource for RedditSource {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Forum
    }

    async fn fetch(&self, vocabulary: &[String]) -> HashMap<String, f64> {
        or_empty(NAME, self.try_fetch(vocabulary).await)
    }
}
