use ahash::AHashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use super::bucket::TokenBucket;
use super::decision::Tier;
use crate::config::TierPolicy;

/// Holds one token bucket per (entity, tier) pair.
///
/// Buckets are created lazily on first reference and live for the process
/// lifetime. Tiers are namespaced in the key, so an entity holds independent
/// buckets for the monitoring and challenge tiers.
///
/// # Thread Safety
///
/// One mutex guards the map, held only for the lookup-or-create itself.
/// Callers receive an `Arc` to the bucket and take the bucket's own lock
/// after the map lock is released, so consumption on one bucket never
/// contends with lookups of unrelated buckets.
pub struct BucketStore {
    buckets: Mutex<AHashMap<(String, Tier), Arc<TokenBucket>>>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self { buckets: Mutex::new(AHashMap::new()) }
    }

    /// Return the bucket for (entity, tier), creating a full one with the
    /// tier's parameters if none exists. Lookup and insert are a single
    /// atomic unit, so two racing first references yield the same bucket.
    pub fn get_or_create(&self, entity: &str, tier: Tier, policy: &TierPolicy) -> Arc<TokenBucket> {
        self.get_or_create_at(entity, tier, policy, Instant::now())
    }

    pub(crate) fn get_or_create_at(
        &self,
        entity: &str,
        tier: Tier,
        policy: &TierPolicy,
        now: Instant,
    ) -> Arc<TokenBucket> {
        // Insertions cannot leave the map torn, so a poisoned guard is safe
        // to recover.
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(buckets.entry((entity.to_string(), tier)).or_insert_with(|| {
            Arc::new(TokenBucket::new_at(policy.capacity, policy.refill_per_second, now))
        }))
    }

    /// Number of buckets created so far.
    pub fn len(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BucketStore {
    fn default() -> Self {
        Self::new()
    }
}
