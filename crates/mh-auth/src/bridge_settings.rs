use chrono::TimeDelta;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_UNLOCK_TTL_SECS: i64 = 600;

/// Tunables for the authentication bridge.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Consecutive failures before the local lockout
    pub max_attempts: u32,
    /// Opt-in offline verification against the unhashed PIN cache
    pub local_fallback: bool,
    /// How long an unlock remains valid
    pub unlock_ttl: TimeDelta,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            local_fallback: false,
            unlock_ttl: TimeDelta::seconds(DEFAULT_UNLOCK_TTL_SECS),
        }
    }
}
