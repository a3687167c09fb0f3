//! Trend aggregation
//!
//! Combines every signal source into one snapshot per calendar date,
//! persists it, and serves lookups from it. A date's snapshot is built at
//! most once: the in-memory cache coalesces concurrent first requests and
//! the durable store answers once the cache has evicted the date.
//!
//! Scoring never fails. If the snapshot cannot be produced at all the
//! deterministic fallback scorer answers instead.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use curator_core::{
    combine_signals, compare_topics, evaluate_opportunity, score_mock, timing_recommendation,
    Clock, OpportunityEvaluation, SourceBreakdown, SourceSignals, TimingRecommendation,
    TopicComparison, TrendRecord, TrendSnapshot,
};
use futures::future::join_all;

use crate::cache::{CacheStats, SnapshotCache};
use crate::config::TrendsConfig;
use crate::error::Result;
use crate::sources::SignalSource;
use crate::store::Store;

pub struct TrendAggregator {
    sources: Vec<Arc<dyn SignalSource>>,
    store: Arc<Store>,
    cache: SnapshotCache,
    clock: Arc<dyn Clock>,
    vocabulary: Vec<String>,
    source_timeout: Duration,
    normalization_divisor: f64,
}

impl TrendAggregator {
    pub fn new(
        sources: Vec<Arc<dyn SignalSource>>,
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        vocabulary: Vec<String>,
        config: &TrendsConfig,
    ) -> Self {
        Self {
            sources,
            store,
            cache: SnapshotCache::new(config.snapshot_cache_capacity),
            clock,
            vocabulary,
            source_timeout: Duration::from_secs(config.source_timeout_seconds),
            normalization_divisor: config.normalization_divisor,
        }
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Today's snapshot, built on first request of the day.
    pub async fn today(&self) -> Result<Arc<TrendSnapshot>> {
        let date = self.clock.today();
        self.snapshot_for(&date).await
    }

    pub async fn snapshot_for(&self, date: &str) -> Result<Arc<TrendSnapshot>> {
        self.cache
            .get_or_build(date, async { self.load_or_build(date).await.map(Arc::new) })
            .await
    }

    async fn load_or_build(&self, date: &str) -> Result<TrendSnapshot> {
        if let Some(snapshot) = self.store.read_trends(date)? {
            tracing::debug!(date = date, topics = snapshot.records.len(), "Loaded stored snapshot");
            return Ok(snapshot);
        }

        let snapshot = self.build_snapshot(date).await;
        self.store.write_trends(&snapshot)?;

        tracing::info!(date = date, topics = snapshot.records.len(), "Trend snapshot built");
        Ok(snapshot)
    }

    /// Query every source concurrently. A source that errors or exceeds the
    /// timeout contributes nothing.
    async fn build_snapshot(&self, date: &str) -> TrendSnapshot {
        let fetches = self.sources.iter().map(|source| async move {
            let values = match tokio::time::timeout(
                self.source_timeout,
                source.fetch(&self.vocabulary),
            )
            .await
            {
                Ok(values) => values,
                Err(_) => {
                    tracing::warn!(
                        source = source.name(),
                        timeout_secs = self.source_timeout.as_secs_f64(),
                        "Source timed out, contributing nothing"
                    );
                    Default::default()
                }
            };
            SourceSignals::new(source.name(), source.kind(), values)
        });

        let signals = join_all(fetches).await;
        combine_signals(date, &signals, self.normalization_divisor, self.clock.now())
    }

    /// Score for a topic today. Falls back to the deterministic scorer if the
    /// snapshot is unavailable; never fails.
    pub async fn score_for_topic(&self, topic: &str) -> f64 {
        match self.today().await {
            Ok(snapshot) => snapshot.score_for(topic, &self.vocabulary),
            Err(e) => {
                let score = self.score_mock(topic);
                tracing::warn!(topic = topic, error = %e, score = score, "Using fallback trend score");
                score
            }
        }
    }

    /// Deterministic score for `(topic, today)`.
    pub fn score_mock(&self, topic: &str) -> f64 {
        score_mock(topic, &self.clock.today())
    }

    /// Today's highest-scoring records.
    pub async fn top_trending(&self, limit: usize) -> Result<Vec<TrendRecord>> {
        Ok(self.today().await?.top(limit, &self.vocabulary))
    }

    pub async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<TrendRecord>> {
        Ok(self.today().await?.search(keyword, limit, &self.vocabulary))
    }

    pub async fn source_breakdown(&self) -> Result<BTreeMap<String, SourceBreakdown>> {
        Ok(self.today().await?.source_breakdown(&self.vocabulary))
    }

    pub async fn evaluate_opportunity(&self, topic: &str, platform: &str) -> OpportunityEvaluation {
        let score = self.score_for_topic(topic).await;
        let computed_at = self.today().await.ok().and_then(|s| s.computed_at());
        evaluate_opportunity(topic, platform, score, computed_at)
    }

    pub async fn timing_recommendation(&self, topic: &str) -> TimingRecommendation {
        timing_recommendation(topic, self.score_for_topic(topic).await)
    }

    pub async fn compare_topics(&self, topics: &[String]) -> TopicComparison {
        let mut scored = Vec::with_capacity(topics.len());
        for topic in topics {
            scored.push((topic.clone(), self.score_for_topic(topic).await));
        }
        compare_topics(scored)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use curator_core::{default_vocabulary, FixedClock, SourceKind};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{tempdir, TempDir};

    /// Deterministic source that counts how often it is asked.
    pub(crate) struct StubSource {
        pub name: &'static str,
        pub kind: SourceKind,
        pub values: Vec<(&'static str, f64)>,
        pub calls: AtomicUsize,
        pub delay: Option<Duration>,
    }

    impl StubSource {
        pub(crate) fn new(name: &'static str, kind: SourceKind, values: Vec<(&'static str, f64)>) -> Self {
            Self {
                name,
                kind,
                values,
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl SignalSource for StubSource {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch(&self, _vocabulary: &[String]) -> HashMap<String, f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
        }
    }

    pub(crate) fn fixed_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()))
    }

    pub(crate) fn aggregator_with(
        sources: Vec<Arc<dyn SignalSource>>,
        clock: Arc<FixedClock>,
    ) -> (TrendAggregator, Arc<Store>, TempDir) {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("curator.db")).unwrap());
        let config = TrendsConfig {
            source_timeout_seconds: 1,
            ..TrendsConfig::default()
        };
        let aggregator =
            TrendAggregator::new(sources, store.clone(), clock, default_vocabulary(), &config);
        (aggregator, store, dir)
    }

    fn forum() -> Arc<StubSource> {
        Arc::new(StubSource::new(
            "reddit",
            SourceKind::Forum,
            vec![("GPT", 20_000.0), ("AI safety", 1_000.0)],
        ))
    }

    fn video() -> Arc<StubSource> {
        Arc::new(StubSource::new(
            "youtube",
            SourceKind::Video,
            vec![("GPT", 1_000.0), ("robotics", 500.0)],
        ))
    }

    #[tokio::test]
    async fn test_scores_combine_sources() {
        let (aggregator, _store, _dir) = aggregator_with(vec![forum(), video()], fixed_clock());

        // 0.30 * 20000 + 0.20 * 1000 = 6200 -> 62
        assert_eq!(aggregator.score_for_topic("GPT").await, 62.0);
        // indirect match through "AI safety"
        let partial = aggregator.score_for_topic("The AI Safety debate").await;
        assert!((partial - 3.0 * 0.7).abs() < 1e-9);
        assert_eq!(aggregator.score_for_topic("gardening").await, 0.0);
    }

    #[tokio::test]
    async fn test_consecutive_reads_fetch_once() {
        let reddit = forum();
        let youtube = video();
        let (aggregator, _store, _dir) =
            aggregator_with(vec![reddit.clone(), youtube.clone()], fixed_clock());

        let first = aggregator.top_trending(10).await.unwrap();
        let second = aggregator.top_trending(10).await.unwrap();
        aggregator.score_for_topic("GPT").await;

        assert_eq!(first, second);
        assert_eq!(reddit.calls.load(Ordering::SeqCst), 1);
        assert_eq!(youtube.calls.load(Ordering::SeqCst), 1);

        let topics: Vec<&str> = first.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(topics, vec!["GPT", "AI safety", "robotics"]);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_build_once() {
        let mut slow = StubSource::new("reddit", SourceKind::Forum, vec![("LLM", 5_000.0)]);
        slow.delay = Some(Duration::from_millis(50));
        let slow = Arc::new(slow);
        let (aggregator, _store, _dir) = aggregator_with(vec![slow.clone()], fixed_clock());

        let scores = join_all((0..8).map(|_| aggregator.score_for_topic("LLM"))).await;

        assert!(scores.iter().all(|s| *s == 15.0));
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stored_snapshot_is_reused_by_new_instance() {
        let clock = fixed_clock();
        let reddit = forum();
        let (aggregator, store, _dir) = aggregator_with(vec![reddit.clone()], clock.clone());
        aggregator.top_trending(5).await.unwrap();

        let again = forum();
        let config = TrendsConfig::default();
        let restarted = TrendAggregator::new(
            vec![again.clone()],
            store,
            clock,
            default_vocabulary(),
            &config,
        );
        assert_eq!(restarted.score_for_topic("GPT").await, 60.0);
        assert_eq!(again.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_new_day_rebuilds() {
        let clock = fixed_clock();
        let reddit = forum();
        let (aggregator, store, _dir) = aggregator_with(vec![reddit.clone()], clock.clone());

        aggregator.score_for_topic("GPT").await;
        clock.advance(chrono::Duration::days(1));
        aggregator.score_for_topic("GPT").await;

        assert_eq!(reddit.calls.load(Ordering::SeqCst), 2);
        assert!(store.read_trends("2026-10-18").unwrap().is_some());
        assert!(store.read_trends("2026-10-19").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_slow_source_is_treated_as_unavailable() {
        let mut stuck = StubSource::new("twitter", SourceKind::ShortFormSocial, vec![("GPT", 1e9)]);
        stuck.delay = Some(Duration::from_secs(5));
        let (aggregator, _store, _dir) =
            aggregator_with(vec![forum(), Arc::new(stuck)], fixed_clock());

        let top = aggregator.top_trending(1).await.unwrap();
        assert_eq!(top[0].topic, "GPT");
        assert_eq!(top[0].score, 60.0);
        assert_eq!(top[0].sources["twitter"], 0.0);
    }

    #[tokio::test]
    async fn test_no_sources_scores_zero_and_persists_empty_day() {
        let (aggregator, store, _dir) = aggregator_with(vec![], fixed_clock());

        assert_eq!(aggregator.score_for_topic("GPT").await, 0.0);
        assert!(aggregator.top_trending(10).await.unwrap().is_empty());
        assert_eq!(
            store.read_trends("2026-10-18").unwrap(),
            Some(TrendSnapshot::empty("2026-10-18"))
        );
    }

    #[tokio::test]
    async fn test_unreadable_store_falls_back_to_mock() {
        let clock = fixed_clock();
        let (aggregator, _store, dir) = aggregator_with(vec![forum()], clock);
        // Replace the database file with a directory so every open fails.
        let db = dir.path().join("curator.db");
        std::fs::remove_file(&db).unwrap();
        std::fs::create_dir(&db).unwrap();

        let score = aggregator.score_for_topic("GPT").await;
        assert_eq!(score, score_mock("GPT", "2026-10-18"));
        assert_eq!(score, aggregator.score_for_topic("GPT").await);
    }

    #[tokio::test]
    async fn test_insights_use_cached_snapshot() {
        let reddit = forum();
        let (aggregator, _store, _dir) = aggregator_with(vec![reddit.clone()], fixed_clock());

        let eval = aggregator.evaluate_opportunity("GPT", "twitter").await;
        assert_eq!(eval.raw_trend_score, 60.0);
        assert_eq!(eval.platform_adjusted_score, 72.0);
        assert!(eval.evaluation_timestamp.is_some());

        let timing = aggregator.timing_recommendation("GPT").await;
        assert_eq!(timing.urgency_level, "medium");

        let comparison = aggregator
            .compare_topics(&["robotics".to_string(), "GPT".to_string()])
            .await;
        assert_eq!(comparison.top_topic.as_deref(), Some("GPT"));

        let breakdown = aggregator.source_breakdown().await.unwrap();
        assert_eq!(breakdown["reddit"].count, 2);
        assert_eq!(aggregator.search("gpt", 5).await.unwrap().len(), 1);

        assert_eq!(reddit.calls.load(Ordering::SeqCst), 1);
    }
}
