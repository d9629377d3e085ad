use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Hosted backend connection settings.
///
/// Both `url` and `anon_key` are optional so the bridge can run in
/// local-only mode; `is_configured()` reports whether remote calls are possible.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.anon_key.is_some()
    }

    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.timeout_secs < MIN_TIMEOUT_SECS || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::backend(format!(
                "backend.timeout_secs must be {}-{}, got {}",
                MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS, self.timeout_secs
            )));
        }

        if let Some(url) = &self.url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::backend(format!(
                "backend.url must start with http:// or https://, got '{url}'"
            )));
        }

        if self.url.is_some() != self.anon_key.is_some() {
            return Err(ConfigError::backend(
                "backend.url and backend.anon_key must be set together",
            ));
        }

        Ok(())
    }
}
