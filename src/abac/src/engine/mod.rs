//! Ability engine
//!
//! Ties the store, compiler and cache together behind `get_ability`:
//!
//! ```text
//! get_ability(user) ─→ [AbilityCache] ──hit──────────────────────────→ Arc<Ability>
//!                           │ miss
//!                           ↓
//!                      PermissionStore ─→ AbilityCompiler ─→ cache ─→ Arc<Ability>
//!                           │
//!                      UserNotFound / StoreUnavailable (never cached)
//! ```

pub mod cache;
pub mod metrics;

pub use cache::{AbilityCache, BuildTicket, CacheConfig, CacheStats};
pub use metrics::{EngineMetrics, MetricsCollector};

use crate::ability::{Ability, AbilityCompiler, Target};
use crate::error::{AbacError, Result};
use crate::store::PermissionStore;
use crate::types::{Action, UserContext, UserId};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Ability engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Upper bound on one store lookup, `None` to rely on the store's own policy
    pub store_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            store_timeout: None,
        }
    }
}

/// Cache-aware ability provider
pub struct AbilityEngine {
    /// Permission store (read only)
    store: Arc<dyn PermissionStore>,

    /// Shared ability cache
    cache: Arc<AbilityCache>,

    compiler: AbilityCompiler,

    metrics: Option<Arc<MetricsCollector>>,

    config: EngineConfig,
}

impl AbilityEngine {
    /// Create an engine over an explicitly owned cache
    pub fn new(config: EngineConfig, store: Arc<dyn PermissionStore>, cache: Arc<AbilityCache>) -> Self {
        let metrics = if config.enable_metrics {
            Some(Arc::new(MetricsCollector::new()))
        } else {
            None
        };

        info!(
            "AbilityEngine initialized with ttl={:?}, capacity={}, metrics={}",
            cache.config().ttl,
            cache.config().capacity,
            config.enable_metrics
        );

        Self {
            store,
            cache,
            compiler: AbilityCompiler::new(),
            metrics,
            config,
        }
    }

    /// Create an engine with default configuration and a private cache
    pub fn with_defaults(store: Arc<dyn PermissionStore>) -> Result<Self> {
        let cache = Arc::new(AbilityCache::new(CacheConfig::default())?);
        Ok(Self::new(EngineConfig::default(), store, cache))
    }

    /// Get the user's ability, compiling and caching it on a miss.
    ///
    /// # Errors
    ///
    /// * [`AbacError::UserNotFound`] - the store has no such user
    /// * [`AbacError::StoreUnavailable`] - the store lookup failed or timed out
    ///
    /// Neither error leaves anything in the cache. Both are engine failures,
    /// not permission denials.
    pub async fn get_ability(&self, user_id: UserId) -> Result<Arc<Ability>> {
        if let Some(ability) = self.cache.get(user_id) {
            if let Some(metrics) = &self.metrics {
                metrics.record_cache_hit().await;
            }
            debug!(user_id, "Ability cache hit");
            return Ok(ability);
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_cache_miss().await;
        }
        debug!(user_id, "Ability cache miss");

        let start = Instant::now();
        let ticket = self.cache.begin_build(user_id);

        let user = match self.load_user(user_id).await {
            Ok(user) => user,
            Err(e) => {
                error!(user_id, "Failed to build ability: {}", e);
                if let Some(metrics) = &self.metrics {
                    metrics.record_build_failure().await;
                }
                return Err(e);
            }
        };

        let (ability, report) = self.compiler.compile_with_report(&user);
        let ability = Arc::new(ability);

        if let Some(metrics) = &self.metrics {
            metrics.record_build(start.elapsed(), report.skipped.len()).await;
        }

        if !self.cache.put_if_current(ticket, Arc::clone(&ability)) {
            debug!(user_id, "User invalidated during build, ability not cached");
        }

        Ok(ability)
    }

    /// Check a permission for a user in one call
    pub async fn can<'a>(&self, user_id: UserId, action: Action, target: impl Into<Target<'a>>) -> Result<bool> {
        let ability = self.get_ability(user_id).await?;
        Ok(ability.can(action, target))
    }

    /// Like [`AbilityEngine::can`], but a refusal is an [`AbacError::Forbidden`]
    pub async fn authorize<'a>(&self, user_id: UserId, action: Action, target: impl Into<Target<'a>>) -> Result<()> {
        let ability = self.get_ability(user_id).await?;
        ability.authorize(action, target)
    }

    /// Drop the cached ability of a user after their role or permissions changed
    pub fn invalidate_user(&self, user_id: UserId) {
        self.cache.invalidate(user_id);
    }

    /// Drop every cached ability, e.g. after a role's permission set changed
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Shared cache handle
    pub fn cache(&self) -> &Arc<AbilityCache> {
        &self.cache
    }

    /// Get engine metrics
    pub async fn get_metrics(&self) -> Option<EngineMetrics> {
        match &self.metrics {
            Some(metrics) => Some(metrics.get_metrics().await),
            None => None,
        }
    }

    /// Get cache statistics
    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn load_user(&self, user_id: UserId) -> Result<UserContext> {
        let lookup = self.store.find_user_with_role_permissions(user_id);

        let found = match self.config.store_timeout {
            Some(limit) => tokio::time::timeout(limit, lookup).await.map_err(|_| {
                AbacError::StoreUnavailable(format!("lookup of user {} timed out after {:?}", user_id, limit))
            })??,
            None => lookup.await?,
        };

        found.ok_or(AbacError::UserNotFound(user_id))
    }
}
