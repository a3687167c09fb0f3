use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::future::Future;
use std::sync::Arc;

use curator_core::TrendSnapshot;

use crate::error::{CuratorMcpError, Result};

/// In-memory per-date snapshot cache, owned by one trend aggregator.
///
/// Concurrent misses for the same date are coalesced: exactly one caller
/// runs the build, the rest wait for its result. Eviction is plain LRU so a
/// new date is always admitted, however often older dates were read.
#[derive(Clone)]
pub struct SnapshotCache {
    cache: Cache<String, Arc<TrendSnapshot>>,
}

impl SnapshotCache {
    pub fn new(max_dates: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_dates.max(2))
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { cache }
    }

    #[cfg(test)]
    pub async fn get(&self, date: &str) -> Option<Arc<TrendSnapshot>> {
        self.cache.get(date).await
    }

    /// Return the snapshot for `date`, running `build` on a miss.
    ///
    /// A failed build is not cached; the next call tries again.
    pub async fn get_or_build<F>(&self, date: &str, build: F) -> Result<Arc<TrendSnapshot>>
    where
        F: Future<Output = Result<Arc<TrendSnapshot>>>,
    {
        self.cache
            .try_get_with(date.to_string(), build)
            .await
            .map_err(|e: Arc<CuratorMcpError>| CuratorMcpError::Trends(e.to_string()))
    }

    #[cfg(test)]
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.cache.entry_count(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub entry_count: u64,
}
