//! Link-aggregator signal: Hacker News top stories

use std::collections::HashMap;

use async_trait::async_trait;
use curator_core::{tally_keywords, CuratorResult, SourceKind};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;

use super::{fetch_json, or_empty, SignalSource};

const NAME: &str = "hackernews";
const TOP_STORIES: usize = 50;

pub struct HackerNewsSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Story {
    title: Option<String>,
    #[serde(default)]
    score: f64,
}

impl HackerNewsSource {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn story(&self, id: u64) -> Option<Story> {
        let request = self
            .client
            .get(format!("{}/item/{}.json", self.base_url, id));

        // Deleted items come back as JSON null
        match fetch_json::<Option<Story>>(NAME, request).await {
            Ok(story) => story,
            Err(e) => {
                tracing::debug!(story_id = id, error = %e, "Skipping story");
                None
            }
        }
    }

    async fn try_fetch(&self, vocabulary: &[String]) -> CuratorResult<HashMap<String, f64>> {
        let request = self
            .client
            .get(format!("{}/topstories.json", self.base_url));
        let ids: Vec<u64> = fetch_json(NAME, request).await?;

        let stories = join_all(ids.into_iter().take(TOP_STORIES).map(|id| self.story(id))).await;

        let mut trends = HashMap::new();
        for story in stories.into_iter().flatten() {
            if let Some(title) = story.title {
                tally_keywords(&title, story.score, vocabulary, &mut trends);
            }
        }

        Ok(trends)
    }
}

#[async_trait]
impl SignalSource for HackerNewsSource {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::LinkAggregator
    }

    async fn fetch(&self, vocabulary: &[String]) -> HashMap<String, f64> {
        or_empty(NAME, self.try_fetch(vocabulary).await)
    }
}
