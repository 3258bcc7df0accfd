use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{BlockStore, BucketStore};
use crate::config::{EnforcementConfig, TierPolicy};

/// Policy tier selected per request by the upstream decision source.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Allow unconditionally
    Permissive,
    /// Lenient rate limiting
    Monitoring,
    /// Strict rate limiting
    Challenge,
    /// Record a temporal block and deny
    Block,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Permissive => "permissive",
            Tier::Monitoring => "monitoring",
            Tier::Challenge => "challenge",
            Tier::Block => "block",
        }
    }
}

/// Why a verdict came out the way it did.
///
/// The string forms are part of the API contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Allowed,
    AllowedMonitoring,
    AllowedChallenge,
    RateLimitedMonitor,
    RateLimitedChallenge,
    Blocked,
    EntityBlocked,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Allowed => "allowed",
            Reason::AllowedMonitoring => "allowed (monitoring)",
            Reason::AllowedChallenge => "allowed (challenge mode)",
            Reason::RateLimitedMonitor => "rate limited (monitor)",
            Reason::RateLimitedChallenge => "rate limited (challenge)",
            Reason::Blocked => "blocked",
            Reason::EntityBlocked => "entity is currently blocked",
        }
    }
}

/// Outcome of one enforcement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub reason: Reason,
}

impl Verdict {
    fn allow(reason: Reason) -> Self {
        Self { allowed: true, reason }
    }

    fn deny(reason: Reason) -> Self {
        Self { allowed: false, reason }
    }
}

/// Evaluates enforcement requests against the block list and the per-tier
/// token buckets.
///
/// Stateless itself: all mutable state lives in the injected stores, so
/// tests instantiate isolated instances per case. The tier policy table is
/// fixed at construction from configuration.
pub struct Enforcer {
    blocks: Arc<BlockStore>,
    buckets: Arc<BucketStore>,
    monitoring: TierPolicy,
    challenge: TierPolicy,
}

impl Enforcer {
    pub fn new(blocks: Arc<BlockStore>, buckets: Arc<BucketStore>, config: &EnforcementConfig) -> Self {
        Self {
            blocks,
            buckets,
            monitoring: config.monitoring,
            challenge: config.challenge,
        }
    }

    /// Decide whether `entity` may proceed under `tier`.
    ///
    /// `ttl` is meaningful only for [`Tier::Block`], where it sets the block
    /// deadline relative to now; other tiers ignore it.
    ///
    /// An existing block precedes and overrides every other outcome,
    /// including [`Tier::Permissive`].
    pub fn enforce(&self, entity: &str, tier: Tier, ttl: Duration) -> Verdict {
        self.enforce_at(entity, tier, ttl, Instant::now())
    }

    /// Same as [`enforce`](Self::enforce) with an explicit current time.
    pub fn enforce_at(&self, entity: &str, tier: Tier, ttl: Duration, now: Instant) -> Verdict {
        if self.blocks.is_blocked_at(entity, now) {
            return Verdict::deny(Reason::EntityBlocked);
        }

        match tier {
            Tier::Permissive => Verdict::allow(Reason::Allowed),
            Tier::Monitoring => {
                let bucket = self
                    .buckets
                    .get_or_create_at(entity, tier, &self.monitoring, now);
                if bucket.try_consume_at(now) {
                    Verdict::allow(Reason::AllowedMonitoring)
                } else {
                    Verdict::deny(Reason::RateLimitedMonitor)
                }
            }
            Tier::Challenge => {
                let bucket = self
                    .buckets
                    .get_or_create_at(entity, tier, &self.challenge, now);
                if bucket.try_consume_at(now) {
                    Verdict::allow(Reason::AllowedChallenge)
                } else {
                    Verdict::deny(Reason::RateLimitedChallenge)
                }
            }
            Tier::Block => {
                debug!(entity, ttl_secs = ttl.as_secs(), "recording block");
                self.blocks.block_at(entity, ttl, now);
                Verdict::deny(Reason::Blocked)
            }
        }
    }
}
