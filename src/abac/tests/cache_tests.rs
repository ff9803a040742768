//! Ability cache tests
//!
//! Hit/miss accounting, TTL expiry, invalidation, capacity bounds and
//! concurrent access patterns.

use scribe_abac::{
    Ability, AbilityCache, AbilityCompiler, AbacError, CacheConfig, PermissionRecord, UserContext, UserId,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn ability_for(user_id: UserId) -> Arc<Ability> {
    let user = UserContext::new(user_id, format!("user{}@example.com", user_id)).with_role(
        "author",
        vec![PermissionRecord::new("update", "Article", json!({"authorId": "$user.id"}))],
    );
    Arc::new(AbilityCompiler::new().compile(&user))
}

fn cache_with(ttl: Duration, capacity: usize) -> AbilityCache {
    AbilityCache::new(CacheConfig {
        capacity,
        ttl,
        sweep_interval: None,
    })
    .unwrap()
}

// ============================================================================
// BASIC CACHE OPERATIONS
// ============================================================================

#[tokio::test]
async fn test_cache_hit_miss_basic() {
    let cache = cache_with(Duration::from_secs(300), 100);

    assert!(cache.get(7).is_none(), "Cache should be empty initially");

    let ability = ability_for(7);
    cache.put(7, Arc::clone(&ability));

    let cached = cache.get(7).expect("Should hit after put");
    assert!(Arc::ptr_eq(&cached, &ability));
    assert!(cache.get(9).is_none(), "Other users are not affected");

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_put_replaces_entry() {
    let cache = cache_with(Duration::from_secs(300), 100);

    let first = ability_for(7);
    let second = ability_for(7);
    cache.put(7, Arc::clone(&first));
    cache.put(7, Arc::clone(&second));

    assert!(Arc::ptr_eq(&cache.get(7).unwrap(), &second));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let zero_ttl = AbilityCache::new(CacheConfig {
        ttl: Duration::ZERO,
        ..Default::default()
    });
    assert!(matches!(zero_ttl, Err(AbacError::Config(_))));

    let zero_capacity = AbilityCache::new(CacheConfig {
        capacity: 0,
        ..Default::default()
    });
    assert!(matches!(zero_capacity, Err(AbacError::Config(_))));
}

// ============================================================================
// TTL EXPIRATION
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() {
    let cache = cache_with(Duration::from_secs(300), 100);
    cache.put(7, ability_for(7));

    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(cache.get(7).is_some(), "Entry is live before the TTL elapses");

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(cache.get(7).is_none(), "Entry is gone once the TTL has elapsed");
    assert_eq!(cache.stats().expirations, 1);
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_purge_expired_keeps_fresh_entries() {
    let cache = cache_with(Duration::from_secs(60), 100);
    cache.put(1, ability_for(1));
    cache.put(2, ability_for(2));

    tokio::time::advance(Duration::from_secs(45)).await;
    cache.put(3, ability_for(3));

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(cache.purge_expired(), 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.get(3).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_removes_expired_entries() {
    let cache = Arc::new(
        AbilityCache::new(CacheConfig {
            capacity: 100,
            ttl: Duration::from_secs(10),
            sweep_interval: Some(Duration::from_secs(5)),
        })
        .unwrap(),
    );
    let sweeper = cache.spawn_sweeper().expect("sweeper enabled");

    cache.put(7, ability_for(7));
    tokio::time::sleep(Duration::from_secs(16)).await;

    // Removed without any `get`
    assert_eq!(cache.len(), 0);
    sweeper.abort();
}

// ============================================================================
// INVALIDATION
// ============================================================================

#[tokio::test]
async fn test_invalidate_single_user() {
    let cache = cache_with(Duration::from_secs(300), 100);
    cache.put(7, ability_for(7));
    cache.put(9, ability_for(9));

    assert!(cache.invalidate(7));
    assert!(!cache.invalidate(7), "Second invalidation finds nothing");

    assert!(cache.get(7).is_none());
    assert!(cache.get(9).is_some());
}

#[tokio::test]
async fn test_invalidate_all() {
    let cache = cache_with(Duration::from_secs(300), 100);
    for user_id in 0..20 {
        cache.put(user_id, ability_for(user_id));
    }

    cache.invalidate_all();

    assert!(cache.is_empty());
    for user_id in 0..20 {
        assert!(cache.get(user_id).is_none());
    }
}

#[tokio::test]
async fn test_build_started_before_invalidation_is_discarded() {
    let cache = cache_with(Duration::from_secs(300), 100);

    let ticket = cache.begin_build(7);
    cache.invalidate(7);
    assert!(!cache.put_if_current(ticket, ability_for(7)));
    assert!(cache.get(7).is_none());

    let ticket = cache.begin_build(9);
    cache.invalidate_all();
    assert!(!cache.put_if_current(ticket, ability_for(9)));
    assert!(cache.get(9).is_none());

    // A build started after the invalidation is accepted
    let ticket = cache.begin_build(7);
    assert!(cache.put_if_current(ticket, ability_for(7)));
    assert!(cache.get(7).is_some());
}

#[tokio::test]
async fn test_invalidating_other_user_does_not_void_ticket() {
    let cache = cache_with(Duration::from_secs(300), 100);

    let ticket = cache.begin_build(7);
    cache.invalidate(9);

    assert!(cache.put_if_current(ticket, ability_for(7)));
}

// ============================================================================
// CAPACITY
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_capacity_evicts_oldest() {
    let cache = cache_with(Duration::from_secs(300), 3);

    for user_id in 1..=3 {
        cache.put(user_id, ability_for(user_id));
        tokio::time::advance(Duration::from_secs(1)).await;
    }
    cache.put(4, ability_for(4));

    assert_eq!(cache.len(), 3);
    assert!(cache.get(1).is_none(), "Oldest entry is evicted first");
    for user_id in 2..=4 {
        assert!(cache.get(user_id).is_some());
    }
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_capacity_prefers_expired_entries() {
    let cache = cache_with(Duration::from_secs(10), 2);

    cache.put(1, ability_for(1));
    tokio::time::advance(Duration::from_secs(8)).await;
    cache.put(2, ability_for(2));
    tokio::time::advance(Duration::from_secs(3)).await;

    // User 1 has expired and makes room without evicting a live entry
    cache.put(3, ability_for(3));

    assert_eq!(cache.len(), 2);
    assert!(cache.get(2).is_some());
    assert!(cache.get(3).is_some());
    assert_eq!(cache.stats().evictions, 0);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_put_and_get() {
    let cache = Arc::new(cache_with(Duration::from_secs(300), 1_000));

    let writers: Vec<_> = (0..8u64)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..50u64 {
                    let user_id = worker * 50 + i;
                    cache.put(user_id, ability_for(user_id));
                    let cached = cache.get(user_id).expect("own write is visible");
                    assert_eq!(cached.user_id(), user_id);
                }
            })
        })
        .collect();

    for result in futures::future::join_all(writers).await {
        result.unwrap();
    }

    assert_eq!(cache.len(), 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invalidation_never_leaves_stale_entry() {
    let cache = Arc::new(cache_with(Duration::from_secs(300), 1_000));

    // Every build starts before any invalidation
    let tickets: Vec<_> = (0..16).map(|_| cache.begin_build(7)).collect();

    let builders: Vec<_> = tickets
        .into_iter()
        .map(|ticket| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                cache.put_if_current(ticket, ability_for(7));
            })
        })
        .collect();

    let invalidator = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            for _ in 0..4 {
                cache.invalidate(7);
                tokio::task::yield_now().await;
            }
        })
    };

    for result in futures::future::join_all(builders).await {
        result.unwrap();
    }
    invalidator.await.unwrap();

    assert!(cache.get(7).is_none(), "no pre-invalidation build may survive");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capacity_holds_under_concurrent_inserts() {
    let cache = Arc::new(cache_with(Duration::from_secs(300), 64));

    let writers: Vec<_> = (0..8u64)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..100u64 {
                    cache.put(worker * 100 + i, ability_for(worker * 100 + i));
                }
            })
        })
        .collect();

    for result in futures::future::join_all(writers).await {
        result.unwrap();
    }

    // Each insert makes room first, so only in-flight inserts can overshoot
    assert!(cache.len() <= 64 + 8, "len = {}", cache.len());
}
