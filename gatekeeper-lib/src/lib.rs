#![forbid(unsafe_code)]

pub mod config;
pub mod enforcement;
pub mod error;
pub mod server;
pub mod telemetry;

pub use config::{load_from_path, Config, EnforcementMode, TierPolicy};
pub use enforcement::{BlockStore, BucketStore, Enforcer, Reason, Tier, TokenBucket, Verdict};
pub use error::{GatekeeperError, Result};
pub use server::{run, serve, AppState};
