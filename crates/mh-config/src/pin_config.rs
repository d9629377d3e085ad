use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

pub const MIN_MAX_ATTEMPTS: u32 = 1;
pub const MAX_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_LOCAL_FALLBACK: bool = false;

/// PIN verification policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    /// Consecutive client-observed failures before the local lockout
    pub max_attempts: u32,
    /// Allow unhashed offline verification against the local PIN cache
    pub local_fallback: bool,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            local_fallback: DEFAULT_LOCAL_FALLBACK,
        }
    }
}

impl PinConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.max_attempts < MIN_MAX_ATTEMPTS || self.max_attempts > MAX_MAX_ATTEMPTS {
            return Err(ConfigError::pin(format!(
                "pin.max_attempts must be {}-{}, got {}",
                MIN_MAX_ATTEMPTS, MAX_MAX_ATTEMPTS, self.max_attempts
            )));
        }

        Ok(())
    }
}
