use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

pub const MIN_DEFAULT_LIFETIME_SECS: u64 = 60;
pub const MAX_DEFAULT_LIFETIME_SECS: u64 = 90 * 24 * 60 * 60;
pub const DEFAULT_LIFETIME_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime assumed for a backend session that reports no expiry
    pub default_lifetime_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_lifetime_secs: DEFAULT_LIFETIME_SECS,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.default_lifetime_secs < MIN_DEFAULT_LIFETIME_SECS
            || self.default_lifetime_secs > MAX_DEFAULT_LIFETIME_SECS
        {
            return Err(ConfigError::session(format!(
                "session.default_lifetime_secs must be {}-{}, got {}",
                MIN_DEFAULT_LIFETIME_SECS, MAX_DEFAULT_LIFETIME_SECS, self.default_lifetime_secs
            )));
        }

        Ok(())
    }
}
