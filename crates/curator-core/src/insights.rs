//! Heuristics that turn a trend score into advice for the orchestration layer

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How well a platform suits trend-driven content. Distinct from the
/// engagement multipliers used when content is actually created.
pub fn platform_fit(platform: &str) -> f64 {
    match platform.to_lowercase().as_str() {
        "twitter" => 1.2,
        "linkedin" => 0.9,
        "blog" => 1.1,
        "newsletter" => 0.8,
        _ => 1.0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityEvaluation {
    pub topic: String,
    pub platform: String,
    pub raw_trend_score: f64,
    pub platform_adjusted_score: f64,
    pub recommendation: String,
    pub evaluation_timestamp: Option<DateTime<Utc>>,
}

pub fn evaluate_opportunity(
    topic: &str,
    platform: &str,
    score: f64,
    evaluated_against: Option<DateTime<Utc>>,
) -> OpportunityEvaluation {
    let adjusted = score * platform_fit(platform);

    let recommendation = if adjusted >= 70.0 {
        "STRONG CREATE - High trend score, excellent opportunity"
    } else if adjusted >= 50.0 {
        "CREATE - Good trend score, solid opportunity"
    } else if adjusted >= 30.0 {
        "CONSIDER - Moderate trend score, evaluate against strategy"
    } else {
        "SKIP - Low trend score, better opportunities available"
    };

    OpportunityEvaluation {
        topic: topic.to_string(),
        platform: platform.to_string(),
        raw_trend_score: round2(score),
        platform_adjusted_score: round2(adjusted),
        recommendation: recommendation.to_string(),
        evaluation_timestamp: evaluated_against,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingRecommendation {
    pub topic: String,
    pub trend_score: f64,
    pub timing_recommendation: String,
    pub urgency_level: String,
}

pub fn timing_recommendation(topic: &str, score: f64) -> TimingRecommendation {
    let timing = if score >= 80.0 {
        "URGENT - Create within 2-4 hours while trend is hot"
    } else if score >= 60.0 {
        "SOON - Create within 24 hours to capitalize on trend"
    } else if score >= 40.0 {
        "NORMAL - Create within 2-3 days, trend is stable"
    } else if score >= 25.0 {
        "FLEXIBLE - No urgency, can schedule when convenient"
    } else {
        "LOW PRIORITY - Consider skipping or saving for later"
    };

    let urgency = if score >= 70.0 {
        "high"
    } else if score >= 40.0 {
        "medium"
    } else {
        "low"
    };

    TimingRecommendation {
        topic: topic.to_string(),
        trend_score: round2(score),
        timing_recommendation: timing.to_string(),
        urgency_level: urgency.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicScore {
    pub topic: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRange {
    pub highest: f64,
    pub lowest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicComparison {
    pub topic_comparison: Vec<TopicScore>,
    pub top_topic: Option<String>,
    pub score_range: ScoreRange,
}

/// Rank scored topics, highest first. Equal scores keep input order.
pub fn compare_topics(scored: Vec<(String, f64)>) -> TopicComparison {
    let mut topic_comparison: Vec<TopicScore> = scored
        .into_iter()
        .map(|(topic, score)| TopicScore {
            topic,
            score: round2(score),
        })
        .collect();
    topic_comparison.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let score_range = ScoreRange {
        highest: topic_comparison.first().map(|t| t.score).unwrap_or(0.0),
        lowest: topic_comparison.last().map(|t| t.score).unwrap_or(0.0),
    };

    TopicComparison {
        top_topic: topic_comparison.first().map(|t| t.topic.clone()),
        topic_comparison,
        score_range,
    }
}
