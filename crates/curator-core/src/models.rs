//! Data models for curator accounts and their content
//!
//! An [`Account`] is the unit of persistence: one JSON document per curator,
//! keyed by lower-cased name. It owns its credit [`Ledger`] and its
//! [`ContentRegistry`] (history plus materialized aggregates).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CuratorResult;
use crate::ledger::{Ledger, CONTENT_COST};
use crate::registry::ContentRegistry;

/// Trend score is multiplied by this before the platform multiplier.
pub const ENGAGEMENT_MULTIPLIER: f64 = 10.0;

/// Content type recorded for promotions of existing content.
pub const PROMOTED_CONTENT_TYPE: &str = "promoted_post";

/// Window used by the account report's `recent_content_count`.
pub const REPORT_RECENT_DAYS: i64 = 7;

/// Number of topics listed in the account report.
pub const REPORT_TOP_TOPICS: usize = 5;

/// Audience multiplier applied to engagement for a publishing platform.
///
/// Unknown platforms get a neutral 1.0.
pub fn platform_multiplier(platform: &str) -> f64 {
    match platform {
        "twitter" => 1.2,
        "linkedin" => 0.8,
        "blog" => 1.5,
        "newsletter" => 1.0,
        _ => 1.0,
    }
}

/// Engagement assigned to a piece at creation time.
pub fn engagement_score(trend_score: f64, platform: &str) -> f64 {
    trend_score * ENGAGEMENT_MULTIPLIER * platform_multiplier(platform)
}

// =============================================================================
// Content
// =============================================================================

/// What the caller asks to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub topic: String,
    pub platform: String,
    pub content_type: String,
    pub rationale: String,
}

impl ContentRequest {
    pub fn new(
        topic: impl Into<String>,
        platform: impl Into<String>,
        content_type: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            platform: platform.into(),
            content_type: content_type.into(),
            rationale: rationale.into(),
        }
    }

    /// Re-publication of an already covered topic on another platform.
    pub fn promotion(topic: &str, platform: &str, rationale: &str) -> Self {
        Self::new(
            topic,
            platform,
            PROMOTED_CONTENT_TYPE,
            format!("Promotion: {}", rationale),
        )
    }
}

/// A published piece of content. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPiece {
    pub topic: String,

    /// Publishing platform (e.g., "blog", "twitter", "linkedin", "newsletter")
    pub platform: String,

    /// Free-form type (e.g., "article", "thread", "promoted_post")
    pub content_type: String,

    /// Trend score of the topic at creation time (0-100)
    pub trend_score: f64,

    pub timestamp: DateTime<Utc>,

    pub strategy_rationale: String,

    /// Derived once from trend score and platform, never recomputed
    pub engagement_score: f64,
}

impl ContentPiece {
    pub fn from_request(request: ContentRequest, trend_score: f64, timestamp: DateTime<Utc>) -> Self {
        let engagement_score = engagement_score(trend_score, &request.platform);
        Self {
            topic: request.topic,
            platform: request.platform,
            content_type: request.content_type,
            trend_score,
            timestamp,
            strategy_rationale: request.rationale,
            engagement_score,
        }
    }
}

/// Running per-platform counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub posts: u64,
    pub total_engagement: f64,
}

/// `(observed_at, cumulative_engagement)`
pub type EngagementPoint = (DateTime<Utc>, f64);

// =============================================================================
// Account
// =============================================================================

/// A curator account: credits, strategy and content registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Lower-cased curator name, the persistence key
    pub name: String,

    pub credits: Ledger,

    pub strategy: String,

    #[serde(flatten)]
    pub registry: ContentRegistry,
}

impl Account {
    /// Fresh account with the initial credit allocation and no history.
    pub fn new(name: &str) -> Self {
        Self {
            name: account_key(name),
            credits: Ledger::default(),
            strategy: String::new(),
            registry: ContentRegistry::default(),
        }
    }

    /// Fail with `InsufficientFunds` unless one piece of content is affordable.
    pub fn ensure_can_publish(&self) -> CuratorResult<()> {
        self.credits.ensure_available(CONTENT_COST)
    }

    /// Publish one piece as a single all-or-nothing transaction.
    ///
    /// Funds are validated before anything changes; once validated the
    /// debit, the history append and both aggregate updates are applied
    /// together.
    pub fn create_content(
        &mut self,
        request: ContentRequest,
        trend_score: f64,
        now: DateTime<Utc>,
    ) -> CuratorResult<ContentPiece> {
        self.ensure_can_publish()?;

        let piece = ContentPiece::from_request(request, trend_score, now);
        let mut credits = self.credits;
        credits.debit(CONTENT_COST)?;

        self.credits = credits;
        self.registry.append(piece.clone());
        Ok(piece)
    }

    /// Existing piece a promotion of `topic` would build on.
    pub fn promotion_source(&self, topic: &str) -> CuratorResult<&ContentPiece> {
        self.registry.best_match(topic)
    }

    /// Destructive: credits back to the initial allocation, history and
    /// aggregates cleared.
    pub fn reset(&mut self, strategy: &str) {
        self.credits.reset();
        self.strategy = strategy.to_string();
        self.registry.clear();
    }

    pub fn change_strategy(&mut self, strategy: &str) {
        self.strategy = strategy.to_string();
    }

    /// Full report. Every call appends an observation to the engagement
    /// time series, so the series is a log of report requests rather than a
    /// fixed-interval sampling. Callers persist the account afterwards.
    pub fn report(&mut self, now: DateTime<Utc>) -> AccountReport {
        self.registry.record_observation(now);

        AccountReport {
            account: self.clone(),
            total_engagement: self.registry.total_engagement(),
            engagement_rate: self.registry.engagement_rate(),
            platform_performance: self.registry.platform_performance(),
            top_topics: self.registry.top_topics(REPORT_TOP_TOPICS),
            recent_content_count: self
                .registry
                .recent_content(now, Duration::days(REPORT_RECENT_DAYS))
                .len(),
        }
    }

    pub fn analyze(&self) -> PerformanceAnalysis {
        self.registry.analyze(self.credits.balance())
    }
}

/// Accounts are keyed case-insensitively.
pub fn account_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    #[serde(flatten)]
    pub account: Account,
    pub total_engagement: f64,
    pub engagement_rate: f64,
    pub platform_performance: BTreeMap<String, f64>,
    pub top_topics: Vec<(String, u64)>,
    pub recent_content_count: usize,
}

/// Rollup over a group of content pieces (one platform or one topic).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ContentRollup {
    pub count: u64,
    pub total_engagement: f64,
    pub avg_engagement: f64,
    pub avg_trend_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total_content: usize,
    pub total_engagement: f64,
    pub avg_engagement: f64,
    pub platform_analysis: BTreeMap<String, ContentRollup>,
    pub topic_performance: BTreeMap<String, ContentRollup>,
    pub credits_remaining: f64,
}
