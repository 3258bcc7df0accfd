use ahash::AHashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// A blocked entity and when the block lapses.
#[derive(Debug, Clone, Copy)]
struct BlockEntry {
    expires_at: Instant,
}

/// Tracks entities under a hard temporal block.
///
/// Entries expire lazily: an entry whose deadline has passed is logically
/// absent, and the read that observes it deletes it. There is no background
/// sweep, so memory for expired-but-never-queried entities is reclaimed only
/// when that entity is queried again.
///
/// # Thread Safety
///
/// A single `RwLock` guards the whole map. Lookups that find a live entry or
/// no entry take shared access only; inserts and cleanup deletions take
/// exclusive access.
pub struct BlockStore {
    blocks: RwLock<AHashMap<String, BlockEntry>>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self { blocks: RwLock::new(AHashMap::new()) }
    }

    /// Block `entity` for `ttl` from now, replacing any prior entry.
    ///
    /// Last write wins: re-blocking does not extend an existing deadline, it
    /// overwrites it. A zero `ttl` produces an already-expired entry, which
    /// effectively unblocks the entity.
    pub fn block(&self, entity: &str, ttl: Duration) {
        self.block_at(entity, ttl, Instant::now());
    }

    /// Same as [`block`](Self::block) with an explicit current time.
    pub fn block_at(&self, entity: &str, ttl: Duration, now: Instant) {
        // Absurdly large TTLs would overflow Instant arithmetic; clamp them
        // to effectively permanent.
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 100));

        match self.blocks.write() {
            Ok(mut blocks) => {
                blocks.insert(entity.to_string(), BlockEntry { expires_at });
            }
            Err(_) => tracing::warn!("block store lock poisoned"),
        }
    }

    /// Check whether `entity` is currently blocked.
    ///
    /// Returns true iff an entry exists and its deadline is strictly in the
    /// future. A read that observes an expired entry removes it before
    /// returning false.
    pub fn is_blocked(&self, entity: &str) -> bool {
        self.is_blocked_at(entity, Instant::now())
    }

    /// Same as [`is_blocked`](Self::is_blocked) with an explicit current time.
    pub fn is_blocked_at(&self, entity: &str, now: Instant) -> bool {
        let expires_at = {
            let blocks = match self.blocks.read() {
                Ok(blocks) => blocks,
                Err(_) => {
                    tracing::warn!("block store lock poisoned");
                    return false;
                }
            };
            match blocks.get(entity) {
                Some(entry) => entry.expires_at,
                None => return false,
            }
        };

        if expires_at > now {
            return true;
        }

        // Expired: purge under the write lock. Re-check the deadline first,
        // another writer may have re-blocked the entity since the read above.
        if let Ok(mut blocks) = self.blocks.write() {
            if let Some(entry) = blocks.get(entity) {
                if entry.expires_at <= now {
                    blocks.remove(entity);
                }
            }
        }

        false
    }

    /// Number of entries physically present, including expired ones that no
    /// read has purged yet.
    pub fn len(&self) -> usize {
        self.blocks.read().map(|blocks| blocks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new()
    }
}
