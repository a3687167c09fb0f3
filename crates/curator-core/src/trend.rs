//! Trend snapshot math
//!
//! Raw intensities from several signal sources are combined into one
//! 0-100 score per topic with fixed per-source weights. A [`TrendSnapshot`]
//! holds the result for one calendar date.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Divides the weighted raw sum before clamping into 0-100.
pub const DEFAULT_NORMALIZATION_DIVISOR: f64 = 100.0;

/// Applied when a topic only matches the vocabulary indirectly.
pub const PARTIAL_MATCH_PENALTY: f64 = 0.7;

pub const MAX_TREND_SCORE: f64 = 100.0;

// =============================================================================
// Sources
// =============================================================================

/// Category of an external signal feed. Each category carries a fixed weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Forum,
    ShortFormSocial,
    LinkAggregator,
    Video,
}

impl SourceKind {
    /// Weights sum to 1.0 across the four kinds.
    pub fn weight(self) -> f64 {
        match self {
            SourceKind::Forum => 0.30,
            SourceKind::ShortFormSocial => 0.25,
            SourceKind::LinkAggregator => 0.25,
            SourceKind::Video => 0.20,
        }
    }
}

/// What one source returned for a snapshot build.
#[derive(Debug, Clone)]
pub struct SourceSignals {
    pub name: String,
    pub kind: SourceKind,
    pub values: HashMap<String, f64>,
}

impl SourceSignals {
    pub fn new(name: impl Into<String>, kind: SourceKind, values: HashMap<String, f64>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }
}

// =============================================================================
// Records and snapshots
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub topic: String,

    /// Normalized score (0-100)
    pub score: f64,

    /// Raw, unweighted value per source name
    pub sources: BTreeMap<String, f64>,

    #[serde(rename = "timestamp")]
    pub computed_at: DateTime<Utc>,
}

/// All trend records computed for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub date: String,
    pub records: BTreeMap<String, TrendRecord>,
}

/// Compress an unbounded weighted sum into 0-100.
pub fn normalize_score(raw: f64, divisor: f64) -> f64 {
    let divisor = if divisor > 0.0 {
        divisor
    } else {
        DEFAULT_NORMALIZATION_DIVISOR
    };
    (raw / divisor).clamp(0.0, MAX_TREND_SCORE)
}

/// Build a snapshot from every source's output.
///
/// Topics are the union of all sources' keys. A source that did not report a
/// topic (or returned nothing at all) contributes 0.
pub fn combine_signals(
    date: &str,
    signals: &[SourceSignals],
    divisor: f64,
    computed_at: DateTime<Utc>,
) -> TrendSnapshot {
    let mut records = BTreeMap::new();

    let topics: std::collections::BTreeSet<&String> =
        signals.iter().flat_map(|s| s.values.keys()).collect();

    for topic in topics {
        let mut sources = BTreeMap::new();
        let mut raw = 0.0;

        for signal in signals {
            let value = signal.values.get(topic).copied().unwrap_or(0.0);
            *sources.entry(signal.name.clone()).or_insert(0.0) += value;
            raw += signal.kind.weight() * value;
        }

        records.insert(
            topic.clone(),
            TrendRecord {
                topic: topic.clone(),
                score: normalize_score(raw, divisor),
                sources,
                computed_at,
            },
        );
    }

    TrendSnapshot {
        date: date.to_string(),
        records,
    }
}

impl TrendSnapshot {
    pub fn empty(date: &str) -> Self {
        Self {
            date: date.to_string(),
            records: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Score for a topic: exact key first, then the first vocabulary keyword
    /// (in vocabulary order) that the topic contains and that has a record,
    /// discounted by [`PARTIAL_MATCH_PENALTY`]. Unknown topics score 0.
    pub fn score_for(&self, topic: &str, vocabulary: &[String]) -> f64 {
        if let Some(record) = self.records.get(topic) {
            return record.score;
        }

        let topic_lower = topic.to_lowercase();
        for keyword in vocabulary {
            if !topic_lower.contains(&keyword.to_lowercase()) {
                continue;
            }
            if let Some(record) = self.records.get(keyword) {
                return record.score * PARTIAL_MATCH_PENALTY;
            }
        }

        0.0
    }

    /// Up to `limit` records by descending score; ties follow vocabulary
    /// order, then topic name for topics outside the vocabulary.
    pub fn top(&self, limit: usize, vocabulary: &[String]) -> Vec<TrendRecord> {
        let rank = |topic: &str| {
            vocabulary
                .iter()
                .position(|k| k == topic)
                .unwrap_or(usize::MAX)
        };

        let mut records: Vec<&TrendRecord> = self.records.values().collect();
        records.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| rank(&a.topic).cmp(&rank(&b.topic)))
                .then_with(|| a.topic.cmp(&b.topic))
        });

        records.into_iter().take(limit).cloned().collect()
    }

    /// When the snapshot's records were computed, if it has any.
    pub fn computed_at(&self) -> Option<DateTime<Utc>> {
        self.records.values().map(|r| r.computed_at).min()
    }

    /// Ranked records whose topic contains `keyword`, drawn from the top 50.
    pub fn search(&self, keyword: &str, limit: usize, vocabulary: &[String]) -> Vec<TrendRecord> {
        let needle = keyword.to_lowercase();
        self.top(50, vocabulary)
            .into_iter()
            .filter(|r| r.topic.to_lowercase().contains(&needle))
            .take(limit)
            .collect()
    }

    /// Contribution of each source across the top 20 records.
    pub fn source_breakdown(&self, vocabulary: &[String]) -> BTreeMap<String, SourceBreakdown> {
        let mut breakdown: BTreeMap<String, SourceBreakdown> = BTreeMap::new();

        for record in self.top(20, vocabulary) {
            for (source, value) in &record.sources {
                let entry = breakdown.entry(source.clone()).or_default();
                if *value > 0.0 {
                    entry.total += value;
                    entry.count += 1;
                }
            }
        }

        for entry in breakdown.values_mut() {
            if entry.count > 0 {
                entry.average = entry.total / entry.count as f64;
            }
        }

        breakdown
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SourceBreakdown {
    pub total: f64,
    pub count: u64,
    pub average: f64,
}

/// Deterministic stand-in score, a pure function of `(topic, date)`.
///
/// Used when the snapshot cannot be loaded at all so that content creation
/// never fails on trend-source trouble.
pub fn score_mock(topic: &str, date: &str) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(topic.as_bytes());
    hasher.update(date.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % 100) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::default_vocabulary;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap()
    }

    fn signals(name: &str, kind: SourceKind, pairs: &[(&str, f64)]) -> SourceSignals {
        SourceSignals::new(
            name,
            kind,
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        )
    }

    fn sample_snapshot() -> TrendSnapshot {
        combine_signals(
            "2026-02-02",
            &[
                signals("reddit", SourceKind::Forum, &[("GPT", 10_000.0), ("LLM", 2_000.0)]),
                signals("hackernews", SourceKind::LinkAggregator, &[("LLM", 4_000.0), ("AGI", 800.0)]),
                signals("twitter", SourceKind::ShortFormSocial, &[]),
                signals("youtube", SourceKind::Video, &[("GPT", 1_000.0)]),
            ],
            DEFAULT_NORMALIZATION_DIVISOR,
            now(),
        )
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = [
            SourceKind::Forum,
            SourceKind::ShortFormSocial,
            SourceKind::LinkAggregator,
            SourceKind::Video,
        ]
        .iter()
        .map(|k| k.weight())
        .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_combine_weights_and_normalizes() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.records.len(), 3);

        // 0.30 * 10000 + 0.20 * 1000 = 3200 -> 32
        assert_eq!(snapshot.records["GPT"].score, 32.0);
        // 0.30 * 2000 + 0.25 * 4000 = 1600 -> 16
        assert!((snapshot.records["LLM"].score - 16.0).abs() < 1e-9);
        // 0.25 * 800 = 200 -> 2
        assert!((snapshot.records["AGI"].score - 2.0).abs() < 1e-9);

        let sources = &snapshot.records["AGI"].sources;
        assert_eq!(sources.len(), 4);
        assert_eq!(sources["reddit"], 0.0);
        assert_eq!(sources["hackernews"], 800.0);
    }

    #[test]
    fn test_normalize_clamps_both_ends() {
        assert_eq!(normalize_score(1_000_000.0, 100.0), 100.0);
        assert_eq!(normalize_score(-50.0, 100.0), 0.0);
        assert_eq!(normalize_score(5_000.0, 100.0), 50.0);
        assert_eq!(normalize_score(500.0, 0.0), 5.0);
    }

    #[test]
    fn test_no_sources_gives_empty_snapshot() {
        let snapshot = combine_signals("2026-02-02", &[], 100.0, now());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.score_for("GPT", &default_vocabulary()), 0.0);
        assert!(snapshot.computed_at().is_none());
    }

    #[test]
    fn test_score_for_exact_partial_and_unknown() {
        let snapshot = sample_snapshot();
        let vocabulary = default_vocabulary();

        assert_eq!(snapshot.score_for("GPT", &vocabulary), 32.0);
        // "gpt" matches indirectly through the vocabulary
        assert!((snapshot.score_for("gpt-5 release notes", &vocabulary) - 32.0 * 0.7).abs() < 1e-9);
        assert_eq!(snapshot.score_for("quantum computing", &vocabulary), 0.0);
    }

    #[test]
    fn test_partial_match_takes_first_vocabulary_keyword_with_record() {
        let snapshot = sample_snapshot();
        let vocabulary = default_vocabulary();

        // Contains "GPT" (index 4) and "LLM" (index 7): GPT wins by order.
        let score = snapshot.score_for("ChatGPT vs open LLM", &vocabulary);
        assert!((score - 32.0 * 0.7).abs() < 1e-9);

        // "Claude" comes first but has no record, so "LLM" is used.
        let skipped = snapshot.score_for("Claude as an LLM", &vocabulary);
        assert!((skipped - 16.0 * 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_top_orders_by_score_then_vocabulary() {
        let vocabulary = default_vocabulary();
        let snapshot = combine_signals(
            "2026-02-02",
            &[signals(
                "hackernews",
                SourceKind::LinkAggregator,
                &[("robotics", 400.0), ("AGI", 400.0), ("GPT", 400.0), ("NLP", 900.0)],
            )],
            100.0,
            now(),
        );

        let top: Vec<String> = snapshot.top(10, &vocabulary).into_iter().map(|r| r.topic).collect();
        assert_eq!(top, vec!["NLP", "GPT", "AGI", "robotics"]);
        assert_eq!(snapshot.top(2, &vocabulary).len(), 2);
    }

    #[test]
    fn test_search_and_breakdown() {
        let snapshot = sample_snapshot();
        let vocabulary = default_vocabulary();

        let hits = snapshot.search("l", 5, &vocabulary);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].topic, "LLM");

        let breakdown = snapshot.source_breakdown(&vocabulary);
        assert_eq!(breakdown["reddit"].count, 2);
        assert_eq!(breakdown["reddit"].total, 12_000.0);
        assert_eq!(breakdown["reddit"].average, 6_000.0);
        assert_eq!(breakdown["twitter"].count, 0);
        assert_eq!(breakdown["twitter"].average, 0.0);
    }

    #[test]
    fn test_score_mock_is_deterministic_per_day() {
        let a = score_mock("AI safety", "2026-02-02");
        let b = score_mock("AI safety", "2026-02-02");
        assert_eq!(a, b);
        assert!((0.0..100.0).contains(&a));
        assert_eq!(a.fract(), 0.0);

        let spread: std::collections::HashSet<u64> = (0..50)
            .map(|i| score_mock(&format!("topic {}", i), "2026-02-02") as u64)
            .collect();
        assert!(spread.len() > 1);
    }
}
