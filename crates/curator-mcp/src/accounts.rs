//! Account-level operations
//!
//! Composes the ledger and content registry held in each [`Account`] with
//! the trend aggregator and the durable store. Every mutation loads the
//! account, applies the change in memory and writes the whole profile back
//! before returning, so a reader always sees either the old or the new
//! state.
//!
//! Operations on one account are serialized by a per-account async lock;
//! different accounts never contend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Duration;
use curator_core::{
    account_key, Account, AccountReport, Clock, ContentPiece, ContentRequest, PerformanceAnalysis,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::Result;
use crate::store::{LogEntry, Store};
use crate::trends::TrendAggregator;

/// Operational log categories.
const LOG_CONTENT: &str = "content";
const LOG_ACCOUNT: &str = "content_account";

pub struct AccountService {
    store: Arc<Store>,
    trends: Arc<TrendAggregator>,
    clock: Arc<dyn Clock>,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AccountService {
    pub fn new(store: Arc<Store>, trends: Arc<TrendAggregator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            trends,
            clock,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries nobody holds or waits on are only referenced by the map
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(account_key(name)).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Read the account, creating and persisting a fresh one on first access.
    fn load(&self, name: &str) -> Result<Account> {
        if let Some(account) = self.store.read_account(name)? {
            return Ok(account);
        }

        let account = Account::new(name);
        self.store.write_account(&account)?;
        tracing::info!(account = %account.name, credits = account.credits.balance(), "Account created");
        Ok(account)
    }

    /// Best effort: runs after the account is committed, so a failing log
    /// sink must not turn a completed operation into an error.
    fn log(&self, name: &str, kind: &str, message: &str) {
        if let Err(e) = self.store.write_log(name, kind, message) {
            tracing::warn!(account = %account_key(name), kind = kind, error = %e, "Failed to write operational log");
        }
    }

    // ---- Reads ----

    pub async fn get_account(&self, name: &str) -> Result<Account> {
        let _guard = self.lock(name).await;
        self.load(name)
    }

    /// Full report. Appends an engagement observation and persists it.
    pub async fn report(&self, name: &str) -> Result<AccountReport> {
        let _guard = self.lock(name).await;
        let mut account = self.load(name)?;

        let report = account.report(self.clock.now());
        self.store.write_account(&account)?;
        self.log(name, LOG_ACCOUNT, "Retrieved account details");

        tracing::debug!(
            account = %account.name,
            points = account.registry.engagement_time_series().len(),
            "Report generated"
        );
        Ok(report)
    }

    pub async fn get_strategy(&self, name: &str) -> Result<String> {
        let _guard = self.lock(name).await;
        let account = self.load(name)?;
        self.log(name, LOG_ACCOUNT, "Retrieved strategy");
        Ok(account.strategy)
    }

    pub async fn analyze(&self, name: &str) -> Result<PerformanceAnalysis> {
        let _guard = self.lock(name).await;
        Ok(self.load(name)?.analyze())
    }

    /// Pieces from the last `days` days. Windows too large for the calendar
    /// return the whole history.
    pub async fn recent_content(&self, name: &str, days: i64) -> Result<Vec<ContentPiece>> {
        let _guard = self.lock(name).await;
        let account = self.load(name)?;
        let window = Duration::try_days(days).unwrap_or(Duration::MAX);
        let recent = account
            .registry
            .recent_content(self.clock.now(), window)
            .into_iter()
            .cloned()
            .collect();
        Ok(recent)
    }

    pub async fn top_topics(&self, name: &str, limit: usize) -> Result<Vec<(String, u64)>> {
        let _guard = self.lock(name).await;
        Ok(self.load(name)?.registry.top_topics(limit))
    }

    pub async fn platform_performance(&self, name: &str) -> Result<BTreeMap<String, f64>> {
        let _guard = self.lock(name).await;
        Ok(self.load(name)?.registry.platform_performance())
    }

    pub fn read_log(&self, name: &str, last_n: usize) -> Result<Vec<LogEntry>> {
        self.store.read_log(name, last_n)
    }

    // ---- Content ----

    /// Score the topic, charge one credit and record the piece.
    ///
    /// Funds are checked before the trend score is even requested; on
    /// failure the stored account is untouched.
    pub async fn create_content(&self, name: &str, request: ContentRequest) -> Result<ContentPiece> {
        let _guard = self.lock(name).await;
        let mut account = self.load(name)?;
        self.publish(&mut account, request).await
    }

    async fn publish(&self, account: &mut Account, request: ContentRequest) -> Result<ContentPiece> {
        account.ensure_can_publish()?;

        let score = self.trends.score_for_topic(&request.topic).await;
        let piece = account.create_content(request, score, self.clock.now())?;
        self.store.write_account(account)?;

        self.log(
            &account.name,
            LOG_CONTENT,
            &format!(
                "Created {} about {} on {}",
                piece.content_type, piece.topic, piece.platform
            ),
        );

        tracing::info!(
            account = %account.name,
            topic = %piece.topic,
            platform = %piece.platform,
            trend_score = piece.trend_score,
            engagement = piece.engagement_score,
            credits = account.credits.balance(),
            "Content created"
        );
        Ok(piece)
    }

    /// Record a decision not to publish. Touches only the log and never fails.
    pub fn skip_content(&self, name: &str, topic: &str, rationale: &str) {
        self.log(
            name,
            LOG_CONTENT,
            &format!("Skipped content for {}: {}", topic, rationale),
        );
        tracing::info!(account = %account_key(name), topic = topic, "Content skipped");
    }

    /// Re-publish an already covered topic on another platform.
    pub async fn promote_content(
        &self,
        name: &str,
        topic: &str,
        platform: &str,
        rationale: &str,
    ) -> Result<ContentPiece> {
        let _guard = self.lock(name).await;
        let mut account = self.load(name)?;

        let source = account.promotion_source(topic)?;
        tracing::debug!(
            account = %account.name,
            topic = topic,
            source_platform = %source.platform,
            source_score = source.trend_score,
            "Promoting existing content"
        );

        self.publish(&mut account, ContentRequest::promotion(topic, platform, rationale))
            .await
    }

    // ---- Account management ----

    pub async fn change_strategy(&self, name: &str, strategy: &str) -> Result<()> {
        let _guard = self.lock(name).await;
        let mut account = self.load(name)?;

        account.change_strategy(strategy);
        self.store.write_account(&account)?;
        self.log(name, LOG_ACCOUNT, "Changed strategy");

        tracing::info!(account = %account.name, "Strategy changed");
        Ok(())
    }

    /// Destructive: credits, history and every aggregate start over.
    pub async fn reset_account(&self, name: &str, strategy: &str) -> Result<()> {
        let _guard = self.lock(name).await;
        let mut account = self.load(name)?;

        account.reset(strategy);
        self.store.write_account(&account)?;
        self.log(name, LOG_ACCOUNT, "Reset account with new strategy");

        tracing::info!(account = %account.name, "Account reset");
        Ok(())
    }

    /// Returns the new balance.
    pub async fn add_credits(&self, name: &str, amount: f64) -> Result<f64> {
        let _guard = self.lock(name).await;
        let mut account = self.load(name)?;

        let balance = account.credits.credit(amount)?;
        self.store.write_account(&account)?;
        self.log(name, LOG_ACCOUNT, &format!("Added {} credits", amount));

        tracing::info!(account = %account.name, amount = amount, balance = balance, "Credits added");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CuratorMcpError;
    use crate::sources::SignalSource;
    use crate::trends::tests::{aggregator_with, fixed_clock, StubSource};
    use curator_core::{CuratorError, FixedClock, Ledger, SourceKind, PROMOTED_CONTENT_TYPE};
    use tempfile::TempDir;

    struct Fixture {
        service: AccountService,
        store: Arc<Store>,
        clock: Arc<FixedClock>,
        dir: TempDir,
    }

    /// "LLM" scores 50 and "GPT" scores 80.
    fn fixture() -> Fixture {
        let clock = fixed_clock();
        let source: Arc<dyn SignalSource> = Arc::new(StubSource::new(
            "reddit",
            SourceKind::Forum,
            vec![("LLM", 50_000.0 / 3.0), ("GPT", 80_000.0 / 3.0)],
        ));
        let (aggregator, store, dir) = aggregator_with(vec![source], clock.clone());
        let service = AccountService::new(store.clone(), Arc::new(aggregator), clock.clone());
        Fixture {
            service,
            store,
            clock,
            dir,
        }
    }

    fn article(topic: &str, platform: &str) -> ContentRequest {
        ContentRequest::new(topic, platform, "article", "r")
    }

    #[tokio::test]
    async fn test_first_access_creates_account() {
        let fx = fixture();
        let account = fx.service.get_account("Alex").await.unwrap();

        assert_eq!(account.name, "alex");
        assert_eq!(account.credits.balance(), 100.0);
        assert!(account.registry.history().is_empty());
        assert!(fx.store.read_account("ALEX").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_content_debits_and_records() {
        let fx = fixture();
        fx.service
            .create_content("alex", article("X", "blog"))
            .await
            .unwrap();

        let account = fx.store.read_account("alex").unwrap().unwrap();
        assert_eq!(account.credits.balance(), 99.0);
        assert_eq!(account.registry.history().len(), 1);
        assert_eq!(account.registry.platform_stats()["blog"].posts, 1);
        assert_eq!(account.registry.topic_coverage()["X"], 1);

        let logs = fx.service.read_log("alex", 10).unwrap();
        assert_eq!(logs.last().unwrap().message, "Created article about X on blog");
    }

    #[tokio::test]
    async fn test_trend_score_drives_engagement() {
        let fx = fixture();
        let piece = fx
            .service
            .create_content("alex", article("LLM", "blog"))
            .await
            .unwrap();

        assert!((piece.trend_score - 50.0).abs() < 1e-9);
        assert!((piece.engagement_score - 750.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_create_without_credits_is_rejected() {
        let fx = fixture();
        let mut broke = Account::new("broke");
        broke.credits = Ledger::new(0.0);
        fx.store.write_account(&broke).unwrap();

        let err = fx
            .service
            .create_content("broke", article("X", "blog"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CuratorMcpError::Core(CuratorError::InsufficientFunds { .. })
        ));
        assert_eq!(fx.store.read_account("broke").unwrap().unwrap(), broke);
    }

    #[tokio::test]
    async fn test_promote_unknown_topic() {
        let fx = fixture();
        let err = fx
            .service
            .promote_content("alex", "X", "twitter", "r2")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CuratorMcpError::Core(CuratorError::TopicNotFound(ref t)) if t == "X"
        ));
        assert!(fx.store.read_account("alex").unwrap().unwrap().registry.history().is_empty());
    }

    #[tokio::test]
    async fn test_promote_existing_topic() {
        let fx = fixture();
        fx.service
            .create_content("alex", article("GPT agents", "blog"))
            .await
            .unwrap();

        let piece = fx
            .service
            .promote_content("alex", "gpt", "twitter", "did well")
            .await
            .unwrap();

        assert_eq!(piece.topic, "gpt");
        assert_eq!(piece.content_type, PROMOTED_CONTENT_TYPE);
        assert_eq!(piece.strategy_rationale, "Promotion: did well");

        let account = fx.service.get_account("alex").await.unwrap();
        assert_eq!(account.credits.balance(), 98.0);
        assert!(account.registry.is_consistent());
    }

    #[tokio::test]
    async fn test_promote_checks_credits() {
        let fx = fixture();
        fx.service
            .create_content("alex", article("GPT", "blog"))
            .await
            .unwrap();
        let mut account = fx.store.read_account("alex").unwrap().unwrap();
        account.credits = Ledger::new(0.5);
        fx.store.write_account(&account).unwrap();

        let err = fx
            .service
            .promote_content("alex", "GPT", "twitter", "r")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CuratorMcpError::Core(CuratorError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn test_report_appends_observation() {
        let fx = fixture();
        fx.service
            .create_content("alex", article("LLM", "blog"))
            .await
            .unwrap();

        let first = fx.service.report("alex").await.unwrap();
        fx.clock.advance(chrono::Duration::seconds(1));
        let second = fx.service.report("alex").await.unwrap();

        assert_eq!(first.recent_content_count, 1);
        assert_eq!(second.account.registry.engagement_time_series().len(), 2);
        let stored = fx.store.read_account("alex").unwrap().unwrap();
        assert_eq!(stored.registry.engagement_time_series().len(), 2);
    }

    #[tokio::test]
    async fn test_strategy_reset_and_credits() {
        let fx = fixture();
        fx.service.change_strategy("alex", "deep dives").await.unwrap();
        assert_eq!(fx.service.get_strategy("alex").await.unwrap(), "deep dives");

        assert_eq!(fx.service.add_credits("alex", 5.0).await.unwrap(), 105.0);
        assert!(matches!(
            fx.service.add_credits("alex", 0.0).await.unwrap_err(),
            CuratorMcpError::Core(CuratorError::InvalidAmount(_))
        ));

        fx.service
            .create_content("alex", article("GPT", "twitter"))
            .await
            .unwrap();
        fx.service.reset_account("alex", "news").await.unwrap();

        let account = fx.service.get_account("alex").await.unwrap();
        assert_eq!(account.credits.balance(), 100.0);
        assert_eq!(account.strategy, "news");
        assert!(account.registry.history().is_empty());
        assert!(account.registry.platform_stats().is_empty());
    }

    #[tokio::test]
    async fn test_skip_only_logs() {
        let fx = fixture();
        let before = fx.service.get_account("alex").await.unwrap();

        fx.service.skip_content("alex", "AGI", "too speculative");

        assert_eq!(fx.service.get_account("alex").await.unwrap(), before);
        let logs = fx.service.read_log("alex", 1).unwrap();
        assert_eq!(logs[0].kind, "content");
        assert_eq!(logs[0].message, "Skipped content for AGI: too speculative");
    }

    #[tokio::test]
    async fn test_derived_reads() {
        let fx = fixture();
        for (topic, platform) in [("GPT", "twitter"), ("LLM", "blog"), ("GPT", "blog")] {
            fx.service
                .create_content("alex", article(topic, platform))
                .await
                .unwrap();
        }

        let top = fx.service.top_topics("alex", 5).await.unwrap();
        assert_eq!(top, vec![("GPT".to_string(), 2), ("LLM".to_string(), 1)]);

        let performance = fx.service.platform_performance("alex").await.unwrap();
        assert_eq!(performance.len(), 2);

        let analysis = fx.service.analyze("alex").await.unwrap();
        assert_eq!(analysis.total_content, 3);
        assert_eq!(analysis.topic_performance["GPT"].count, 2);

        fx.clock.advance(chrono::Duration::days(8));
        assert!(fx.service.recent_content("alex", 7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accounts_are_independent() {
        let fx = fixture();
        let service = &fx.service;
        let (a, b) = tokio::join!(
            service.create_content("alice", article("GPT", "blog")),
            service.create_content("bob", article("LLM", "twitter")),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(service.get_account("alice").await.unwrap().credits.balance(), 99.0);
        assert_eq!(service.get_account("bob").await.unwrap().credits.balance(), 99.0);
    }

    #[tokio::test]
    async fn test_log_failure_does_not_fail_committed_operations() {
        let fx = fixture();
        let conn = rusqlite::Connection::open(fx.dir.path().join("curator.db")).unwrap();
        conn.execute_batch("DROP TABLE logs").unwrap();

        let piece = fx
            .service
            .create_content("alex", article("GPT", "blog"))
            .await
            .unwrap();
        assert_eq!(piece.topic, "GPT");

        fx.service.skip_content("alex", "AGI", "later");
        fx.service.change_strategy("alex", "explainers").await.unwrap();
        assert_eq!(fx.service.add_credits("alex", 1.0).await.unwrap(), 100.0);
        fx.service.report("alex").await.unwrap();

        let stored = fx.store.read_account("alex").unwrap().unwrap();
        assert_eq!(stored.credits.balance(), 100.0);
        assert_eq!(stored.registry.history().len(), 1);
        assert_eq!(stored.strategy, "explainers");
    }

    #[tokio::test]
    async fn test_recent_content_with_huge_window() {
        let fx = fixture();
        fx.service
            .create_content("alex", article("LLM", "blog"))
            .await
            .unwrap();

        for days in [100_000_000, 1_000_000_000_000_000, i64::MAX] {
            assert_eq!(fx.service.recent_content("alex", days).await.unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_idle_account_locks_are_released() {
        let fx = fixture();
        for name in ["a", "b", "c", "d"] {
            fx.service.get_account(name).await.unwrap();
        }

        let locks = fx.service.locks.lock().unwrap();
        assert_eq!(locks.len(), 1);
        assert!(locks.contains_key("d"));
    }
}
