//! Per-user ability cache with TTL and invalidation fences

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::ability::Ability;
use crate::error::{AbacError, Result};
use crate::types::UserId;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached abilities
    pub capacity: usize,

    /// Time-to-live of a cached ability
    pub ttl: Duration,

    /// Period of the background sweeper, `None` for lazy expiry only
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl: Duration::from_secs(5 * 60),
            sweep_interval: Some(Duration::from_secs(60)),
        }
    }
}

impl CacheConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(AbacError::Config("cache ttl must be greater than zero".to_string()));
        }
        if self.capacity == 0 {
            return Err(AbacError::Config("cache capacity must be greater than zero".to_string()));
        }
        if self.sweep_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(AbacError::Config("sweep interval must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Cached entry with TTL
#[derive(Clone)]
struct CachedAbility {
    ability: Arc<Ability>,
    inserted_at: Instant,
}

impl CachedAbility {
    fn new(ability: Arc<Ability>) -> Self {
        Self {
            ability,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

/// Proof that a build started before any later invalidation of its user.
///
/// Obtained from [`AbilityCache::begin_build`] before reading the store and
/// handed back to [`AbilityCache::put_if_current`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTicket {
    user_id: UserId,
    global_epoch: u64,
    user_epoch: u64,
}

impl BuildTicket {
    /// User the ticket was issued for
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
    stale_puts: AtomicU64,
}

/// Per-user ability cache
///
/// Provides:
/// - In-memory map keyed by user id (DashMap, shard-locked)
/// - TTL expiry, lazily on `get` and optionally by a background sweeper
/// - Bounded capacity with oldest-first eviction
/// - Invalidation fences so a build racing an invalidation cannot reinsert a
///   stale ability once `invalidate` has returned
///
/// The cache only stores abilities; it never compiles them.
pub struct AbilityCache {
    entries: DashMap<UserId, CachedAbility>,

    /// Bumped by `invalidate_all`
    global_epoch: AtomicU64,

    /// Bumped by `invalidate`, only for users that were invalidated
    user_epochs: DashMap<UserId, u64>,

    config: CacheConfig,
    counters: Counters,
}

impl AbilityCache {
    /// Create a new ability cache
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            entries: DashMap::new(),
            global_epoch: AtomicU64::new(0),
            user_epochs: DashMap::new(),
            config,
            counters: Counters::default(),
        })
    }

    /// Cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a live cached ability
    pub fn get(&self, user_id: UserId) -> Option<Arc<Ability>> {
        if let Some(entry) = self.entries.get(&user_id) {
            if !entry.is_expired(self.config.ttl) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.ability));
            }
            drop(entry);

            // Expired - remove unless a fresh entry replaced it meanwhile
            let ttl = self.config.ttl;
            if self.entries.remove_if(&user_id, |_, e| e.is_expired(ttl)).is_some() {
                self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                debug!(user_id, "Cached ability expired");
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store an ability, replacing any previous entry for the user
    pub fn put(&self, user_id: UserId, ability: Arc<Ability>) {
        if !self.entries.contains_key(&user_id) && self.entries.len() >= self.config.capacity {
            self.make_room();
        }

        self.entries.insert(user_id, CachedAbility::new(ability));
    }

    /// Issue a ticket before building an ability for `user_id`
    pub fn begin_build(&self, user_id: UserId) -> BuildTicket {
        BuildTicket {
            user_id,
            global_epoch: self.global_epoch.load(Ordering::SeqCst),
            user_epoch: self.user_epoch(user_id),
        }
    }

    /// Store an ability unless its user was invalidated after the ticket was
    /// issued. Returns whether the ability is cached.
    pub fn put_if_current(&self, ticket: BuildTicket, ability: Arc<Ability>) -> bool {
        if !self.is_current(&ticket) {
            self.counters.stale_puts.fetch_add(1, Ordering::Relaxed);
            debug!(user_id = ticket.user_id, "Discarding ability built before invalidation");
            return false;
        }

        self.put(ticket.user_id, Arc::clone(&ability));

        // An invalidation may have slipped in between the check and the insert
        if !self.is_current(&ticket) {
            self.entries
                .remove_if(&ticket.user_id, |_, e| Arc::ptr_eq(&e.ability, &ability));
            self.counters.stale_puts.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        true
    }

    /// Drop the cached ability of one user. Returns whether an entry existed.
    pub fn invalidate(&self, user_id: UserId) -> bool {
        // Fence first so in-flight builds see the invalidation
        *self.user_epochs.entry(user_id).or_insert(0) += 1;
        let removed = self.entries.remove(&user_id).is_some();

        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        info!(user_id, removed, "Ability cache entry invalidated");
        removed
    }

    /// Drop every cached ability
    pub fn invalidate_all(&self) {
        self.global_epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
        // Per-user epochs are subsumed by the global bump
        self.user_epochs.clear();

        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        info!("Ability cache cleared");
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.config.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(ttl));
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            self.counters.expirations.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "Purged expired abilities");
        }
        removed
    }

    /// Number of entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            stale_puts: self.counters.stale_puts.load(Ordering::Relaxed),
            entries: self.entries.len(),
            max_entries: self.config.capacity,
        }
    }

    /// Run `purge_expired` every `sweep_interval` until the cache is dropped.
    ///
    /// Returns `None` when no sweep interval is configured. Must be called
    /// from within a Tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.config.sweep_interval?;
        let cache: Weak<Self> = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.purge_expired();
                    }
                    None => break,
                }
            }
        }))
    }

    fn user_epoch(&self, user_id: UserId) -> u64 {
        self.user_epochs.get(&user_id).map(|epoch| *epoch).unwrap_or(0)
    }

    fn is_current(&self, ticket: &BuildTicket) -> bool {
        self.global_epoch.load(Ordering::SeqCst) == ticket.global_epoch
            && self.user_epoch(ticket.user_id) == ticket.user_epoch
    }

    fn make_room(&self) {
        if self.purge_expired() > 0 && self.entries.len() < self.config.capacity {
            return;
        }

        while self.entries.len() >= self.config.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().inserted_at)
                .map(|entry| *entry.key());

            let Some(user_id) = oldest else { break };
            if self.entries.remove(&user_id).is_some() {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(user_id, "Evicted oldest cached ability");
            }
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub invalidations: u64,
    /// Builds discarded because their user was invalidated meanwhile
    pub stale_puts: u64,
    pub entries: usize,
    pub max_entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
