//! Admission-control state for the gatekeeper.
//!
//! Two independent in-memory stores compose into a single enforcement
//! decision:
//!
//! 1. **BlockStore** (`block_store.rs`): entities under a hard temporal
//!    block, with lazy expiry on read.
//!
//! 2. **BucketStore** (`bucket_store.rs`): one token bucket per
//!    (entity, tier) pair, created lazily and kept for the process lifetime.
//!
//! 3. **Enforcer** (`decision.rs`): per-request dispatch that consults the
//!    block list first (a block always wins) and then the tier's bucket.
//!
//! All state is process-local. A restart clears both stores; there is no
//! persistence and no cross-instance coordination.

mod block_store;
mod bucket;
mod bucket_store;
mod decision;

pub use block_store::BlockStore;
pub use bucket::TokenBucket;
pub use bucket_store::BucketStore;
pub use decision::{Enforcer, Reason, Tier, Verdict};
