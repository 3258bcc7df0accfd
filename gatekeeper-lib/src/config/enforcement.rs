use serde::Deserialize;

/// Caller-visible behavior when the service is unreachable or errors.
///
/// The enforcement core never reads this flag; it is published to callers via
/// `/mode` so upstream request-handling logic can decide what to do when it
/// cannot reach us.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EnforcementMode {
    /// Callers should let traffic through if the service cannot answer
    FailOpen,
    /// Callers should reject traffic if the service cannot answer
    #[default]
    FailClosed,
}

impl EnforcementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementMode::FailOpen => "fail-open",
            EnforcementMode::FailClosed => "fail-closed",
        }
    }
}

/// Token bucket parameters for one policy tier
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    /// Maximum tokens the bucket holds (burst size)
    pub capacity: u64,
    /// Tokens added per second. Zero means the bucket never refills and the
    /// capacity is a fixed allowance.
    pub refill_per_second: u64,
}

/// Enforcement configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EnforcementConfig {
    /// Enforcement mode advertised at startup
    /// Can be changed at runtime via POST /mode
    /// Default: "fail-closed"
    #[serde(default)]
    pub mode: EnforcementMode,
    /// Bucket parameters for the monitoring tier (lenient limiting)
    /// Default: capacity 20, 5 tokens/second
    #[serde(default = "default_monitoring")]
    pub monitoring: TierPolicy,
    /// Bucket parameters for the challenge tier (strict limiting)
    /// Default: capacity 5, 1 token/second
    #[serde(default = "default_challenge")]
    pub challenge: TierPolicy,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            mode: EnforcementMode::default(),
            monitoring: default_monitoring(),
            challenge: default_challenge(),
        }
    }
}

fn default_monitoring() -> TierPolicy {
    TierPolicy { capacity: 20, refill_per_second: 5 }
}

fn default_challenge() -> TierPolicy {
    TierPolicy { capacity: 5, refill_per_second: 1 }
}
