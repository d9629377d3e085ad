use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

pub const MIN_TTL_SECS: u64 = 60;
pub const MAX_TTL_SECS: u64 = 86_400;
pub const DEFAULT_TTL_SECS: u64 = 600;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UnlockConfig {
    /// How long a PIN unlock stays valid within one application session
    pub ttl_secs: u64,
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl UnlockConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.ttl_secs < MIN_TTL_SECS || self.ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::unlock(format!(
                "unlock.ttl_secs must be {}-{}, got {}",
                MIN_TTL_SECS, MAX_TTL_SECS, self.ttl_secs
            )));
        }

        Ok(())
    }
}
