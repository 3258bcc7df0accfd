use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct BucketState {
    tokens: u64,
    last_refill: Instant,
}

/// Token bucket for one (entity, tier) pair.
///
/// Bounds burst size via `capacity` and sustained rate via `refill_rate`
/// (whole tokens per second). Created full; refilled on demand inside
/// [`try_consume`](Self::try_consume).
///
/// # Refill arithmetic
///
/// Refill adds `floor(elapsed_seconds * refill_rate)` tokens, capped at
/// `capacity`. `last_refill` advances only when that amount is nonzero, so
/// elapsed time worth less than one whole token keeps accumulating across
/// calls instead of being discarded.
///
/// # Thread Safety
///
/// One mutex per bucket guards the token count and refill timestamp for the
/// whole refill-and-consume sequence, so concurrent callers serialize and no
/// two of them can spend the same token. Unrelated buckets never contend.
pub struct TokenBucket {
    capacity: u64,
    refill_rate: u64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: u64, refill_rate: u64) -> Self {
        Self::new_at(capacity, refill_rate, Instant::now())
    }

    pub(crate) fn new_at(capacity: u64, refill_rate: u64, now: Instant) -> Self {
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState { tokens: capacity, last_refill: now }),
        }
    }

    /// Refill based on elapsed time, then try to take one token.
    ///
    /// Returns true if a token was consumed. A denial consumes nothing,
    /// though the refill (if any) still applies.
    pub fn try_consume(&self) -> bool {
        self.try_consume_at(Instant::now())
    }

    /// Same as [`try_consume`](Self::try_consume) with an explicit current
    /// time. `now` must come from a monotonic source; a `now` earlier than
    /// the last refill counts as zero elapsed time.
    pub fn try_consume_at(&self, now: Instant) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => {
                // Token count is suspect after a panic mid-update; deny.
                tracing::warn!("token bucket lock poisoned");
                return false;
            }
        };

        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        let refill = (elapsed * self.refill_rate as f64) as u64;
        if refill > 0 {
            state.tokens = self.capacity.min(state.tokens.saturating_add(refill));
            state.last_refill = now;
        }

        if state.tokens > 0 {
            state.tokens -= 1;
            true
        } else {
            false
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Current token count, without refilling. Snapshot only; stale as soon
    /// as it is returned.
    pub fn tokens(&self) -> u64 {
        self.state.lock().map(|state| state.tokens).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_fresh_bucket_allows_exactly_capacity() {
        let bucket = TokenBucket::new(20, 5);
        let now = Instant::now();

        for i in 0..20 {
            assert!(bucket.try_consume_at(now), "consumption {i} should succeed");
        }
        assert!(!bucket.try_consume_at(now), "21st consumption should be denied");
    }

    #[test]
    fn test_denial_leaves_tokens_unchanged() {
        let bucket = TokenBucket::new(1, 0);
        let now = Instant::now();

        assert!(bucket.try_consume_at(now));
        assert_eq!(bucket.tokens(), 0);

        assert!(!bucket.try_consume_at(now));
        assert!(!bucket.try_consume_at(now));
        assert_eq!(bucket.tokens(), 0);
    }

    #[test]
    fn test_refill_after_one_second() {
        // capacity=20, refill=5: drain, deny, then one second refills 5
        let bucket = TokenBucket::new(20, 5);
        let now = Instant::now();

        for _ in 0..20 {
            assert!(bucket.try_consume_at(now));
        }
        assert!(!bucket.try_consume_at(now));

        let later = now + Duration::from_secs(1);
        assert!(bucket.try_consume_at(later));
        assert_eq!(bucket.tokens(), 4, "5 refilled, 1 consumed");
    }

    #[test]
    fn test_refill_never_exceeds_capacity() {
        let bucket = TokenBucket::new(10, 5);
        let now = Instant::now();

        assert!(bucket.try_consume_at(now));
        assert!(bucket.try_consume_at(now + Duration::from_secs(3600)));
        assert_eq!(bucket.tokens(), 9, "refill must cap at capacity");
    }

    #[test]
    fn test_fractional_elapsed_time_accumulates() {
        // refill=1: 600ms yields no tokens, but last_refill must not advance,
        // so 1200ms total still yields one whole token.
        let bucket = TokenBucket::new(1, 1);
        let now = Instant::now();

        assert!(bucket.try_consume_at(now));
        assert!(!bucket.try_consume_at(now + Duration::from_millis(600)));
        assert!(bucket.try_consume_at(now + Duration::from_millis(1200)));
    }

    #[test]
    fn test_zero_refill_rate_never_refills() {
        let bucket = TokenBucket::new(2, 0);
        let now = Instant::now();

        assert!(bucket.try_consume_at(now));
        assert!(bucket.try_consume_at(now));
        assert!(!bucket.try_consume_at(now + Duration::from_secs(3600)));
    }

    #[test]
    fn test_zero_capacity_denies_everything() {
        let bucket = TokenBucket::new(0, 10);
        let now = Instant::now();

        assert!(!bucket.try_consume_at(now));
        assert!(!bucket.try_consume_at(now + Duration::from_secs(60)));
    }

    #[test]
    fn test_time_going_backwards_counts_as_zero_elapsed() {
        let created = Instant::now() + Duration::from_secs(100);
        let bucket = TokenBucket::new_at(5, 100, created);

        for _ in 0..5 {
            assert!(bucket.try_consume_at(created));
        }
        // An earlier instant must not refill anything.
        assert!(!bucket.try_consume_at(created - Duration::from_secs(10)));
    }

    #[test]
    fn test_concurrent_consumes_spend_exactly_capacity() {
        // refill=0 so elapsed wall time cannot add tokens mid-test
        let bucket = Arc::new(TokenBucket::new(16, 0));
        let mut handles = Vec::new();

        for _ in 0..64 {
            let bucket = Arc::clone(&bucket);
            handles.push(std::thread::spawn(move || bucket.try_consume()));
        }

        let allowed = handles
            .into_iter()
            .map(|h| h.join().expect("consumer thread panicked"))
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(allowed, 16, "no token may be double-spent or lost");
    }
}
