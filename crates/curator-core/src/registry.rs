//! Append-only content history with incrementally maintained aggregates
//!
//! Invariants kept by [`ContentRegistry::append`]:
//! - `sum(platform_stats[*].posts) == history.len()`
//! - `sum(topic_coverage[*]) == history.len()`
//! - `platform_stats[p].total_engagement` equals the engagement of the
//!   history entries on `p`
//!
//! Read-side analytics are recomputed on every call.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CuratorError, CuratorResult};
use crate::models::{ContentPiece, ContentRollup, EngagementPoint, PerformanceAnalysis, PlatformStats};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentRegistry {
    #[serde(default)]
    content_history: Vec<ContentPiece>,
    #[serde(default)]
    platform_stats: BTreeMap<String, PlatformStats>,
    #[serde(default)]
    topic_coverage: BTreeMap<String, u64>,
    #[serde(default)]
    engagement_time_series: Vec<EngagementPoint>,
}

impl ContentRegistry {
    pub fn history(&self) -> &[ContentPiece] {
        &self.content_history
    }

    pub fn platform_stats(&self) -> &BTreeMap<String, PlatformStats> {
        &self.platform_stats
    }

    pub fn topic_coverage(&self) -> &BTreeMap<String, u64> {
        &self.topic_coverage
    }

    pub fn engagement_time_series(&self) -> &[EngagementPoint] {
        &self.engagement_time_series
    }

    /// Append a piece and fold it into the aggregates.
    pub(crate) fn append(&mut self, piece: ContentPiece) {
        let stats = self.platform_stats.entry(piece.platform.clone()).or_default();
        stats.posts += 1;
        stats.total_engagement += piece.engagement_score;

        *self.topic_coverage.entry(piece.topic.clone()).or_insert(0) += 1;

        self.content_history.push(piece);
    }

    pub(crate) fn clear(&mut self) {
        self.content_history.clear();
        self.platform_stats.clear();
        self.topic_coverage.clear();
        self.engagement_time_series.clear();
    }

    /// Append `(now, total_engagement)` to the time series.
    pub(crate) fn record_observation(&mut self, now: DateTime<Utc>) -> f64 {
        let total = self.total_engagement();
        self.engagement_time_series.push((now, total));
        total
    }

    /// Whether the aggregates agree with the history.
    pub fn is_consistent(&self) -> bool {
        let len = self.content_history.len() as u64;
        let posts: u64 = self.platform_stats.values().map(|s| s.posts).sum();
        let covered: u64 = self.topic_coverage.values().sum();
        if posts != len || covered != len {
            return false;
        }

        self.platform_stats.iter().all(|(platform, stats)| {
            let expected: f64 = self
                .content_history
                .iter()
                .filter(|c| &c.platform == platform)
                .map(|c| c.engagement_score)
                .sum();
            (expected - stats.total_engagement).abs() <= 1e-6 * expected.abs().max(1.0)
        })
    }

    pub fn total_engagement(&self) -> f64 {
        self.content_history.iter().map(|c| c.engagement_score).sum()
    }

    /// Average engagement per piece, 0 for an empty history.
    pub fn engagement_rate(&self) -> f64 {
        if self.content_history.is_empty() {
            return 0.0;
        }
        self.total_engagement() / self.content_history.len() as f64
    }

    /// Average engagement per post for each platform.
    pub fn platform_performance(&self) -> BTreeMap<String, f64> {
        self.platform_stats
            .iter()
            .map(|(platform, stats)| {
                let avg = if stats.posts > 0 {
                    stats.total_engagement / stats.posts as f64
                } else {
                    0.0
                };
                (platform.clone(), avg)
            })
            .collect()
    }

    /// Most covered topics. Equal counts keep the order in which the topics
    /// were first covered.
    pub fn top_topics(&self, limit: usize) -> Vec<(String, u64)> {
        let mut topics: Vec<(usize, &String, u64)> = self
            .topic_coverage
            .iter()
            .map(|(topic, count)| (self.first_seen(topic), topic, *count))
            .collect();

        topics.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

        topics
            .into_iter()
            .take(limit)
            .map(|(_, topic, count)| (topic.clone(), count))
            .collect()
    }

    fn first_seen(&self, topic: &str) -> usize {
        self.content_history
            .iter()
            .position(|c| c.topic == topic)
            .unwrap_or(usize::MAX)
    }

    /// Pieces created within `window` of `now`, in history order. A window
    /// reaching past the representable range covers the whole history.
    pub fn recent_content(&self, now: DateTime<Utc>, window: Duration) -> Vec<&ContentPiece> {
        let Some(cutoff) = now.checked_sub_signed(window) else {
            return self.content_history.iter().collect();
        };
        self.content_history
            .iter()
            .filter(|c| c.timestamp >= cutoff)
            .collect()
    }

    /// Highest-trending piece whose topic contains `topic` (case-insensitive).
    /// The earliest piece wins a tie.
    pub fn best_match(&self, topic: &str) -> CuratorResult<&ContentPiece> {
        let needle = topic.to_lowercase();
        let mut best: Option<&ContentPiece> = None;

        for piece in &self.content_history {
            if !piece.topic.to_lowercase().contains(&needle) {
                continue;
            }
            match best {
                Some(current) if piece.trend_score <= current.trend_score => {}
                _ => best = Some(piece),
            }
        }

        best.ok_or_else(|| CuratorError::TopicNotFound(topic.to_string()))
    }

    /// Per-platform and per-topic rollups computed from the history.
    pub fn analyze(&self, credits_remaining: f64) -> PerformanceAnalysis {
        let mut platform_analysis: BTreeMap<String, ContentRollup> = BTreeMap::new();
        let mut topic_performance: BTreeMap<String, ContentRollup> = BTreeMap::new();

        for piece in &self.content_history {
            accumulate(platform_analysis.entry(piece.platform.clone()).or_default(), piece);
            accumulate(topic_performance.entry(piece.topic.clone()).or_default(), piece);
        }

        for rollup in platform_analysis
            .values_mut()
            .chain(topic_performance.values_mut())
        {
            let count = rollup.count as f64;
            rollup.avg_engagement = rollup.total_engagement / count;
            rollup.avg_trend_score /= count;
        }

        PerformanceAnalysis {
            message: self
                .content_history
                .is_empty()
                .then(|| "No content history to analyze".to_string()),
            total_content: self.content_history.len(),
            total_engagement: self.total_engagement(),
            avg_engagement: self.engagement_rate(),
            platform_analysis,
            topic_performance,
            credits_remaining,
        }
    }
}

// avg_trend_score holds the running sum until analyze() divides it
fn accumulate(rollup: &mut ContentRollup, piece: &ContentPiece) {
    rollup.count += 1;
    rollup.total_engagement += piece.engagement_score;
    rollup.avg_trend_score += piece.trend_score;
}
