use crate::{
    BackendConfig, CONFIG_DIR_ENV, CONFIG_FILENAME, ConfigError, ConfigErrorResult,
    DEFAULT_CONFIG_DIR, LoggingConfig, PinConfig, SessionConfig, StorageConfig, UnlockConfig,
};

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub pin: PinConfig,
    pub unlock: UnlockConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config.
    ///
    /// Loading order:
    /// 1. Check for MH_CONFIG_DIR env var, else use ./.munro/
    /// 2. Auto-create config directory if it doesn't exist
    /// 3. Load config.toml if it exists, else use defaults
    /// 4. Apply MH_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load() -> ConfigErrorResult<Self> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io {
                path: config_dir.clone(),
                source: e,
            })?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            Self::load_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    fn load_toml(path: &Path) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the config directory.
    /// Priority: MH_CONFIG_DIR env var > ./.munro/ (relative to cwd)
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let cwd = std::env::current_dir()
            .map_err(|_| ConfigError::config("Cannot determine current working directory"))?;
        Ok(cwd.join(DEFAULT_CONFIG_DIR))
    }

    /// Validate all configuration.
    /// Call after load() to catch all errors at startup.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.backend.validate()?;
        self.pin.validate()?;
        self.unlock.validate()?;
        self.session.validate()?;
        self.storage.validate()?;

        Ok(())
    }

    /// Get absolute path to the local storage directory.
    pub fn storage_path(&self) -> ConfigErrorResult<PathBuf> {
        let config_dir = Self::config_dir()?;
        Ok(config_dir.join(&self.storage.dir))
    }

    /// Log configuration summary (NEVER logs the anon key).
    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!(
            "  backend: {} (timeout {}s)",
            self.backend.url.as_deref().unwrap_or("none (local-only)"),
            self.backend.timeout_secs
        );
        info!(
            "  pin: max_attempts={}, local_fallback={}",
            self.pin.max_attempts,
            if self.pin.local_fallback {
                "enabled"
            } else {
                "disabled"
            }
        );
        info!("  unlock: ttl={}s", self.unlock.ttl_secs);
        info!(
            "  session: default_lifetime={}s",
            self.session.default_lifetime_secs
        );
        info!("  storage: {}", self.storage.dir);
        info!(
            "  logging: {} (colored: {})",
            *self.logging.level, self.logging.colored
        );
    }

    fn apply_env_overrides(&mut self) {
        // Backend
        Self::apply_env_option_string("MH_BACKEND_URL", &mut self.backend.url);
        Self::apply_env_option_string("MH_BACKEND_ANON_KEY", &mut self.backend.anon_key);
        Self::apply_env_parse("MH_BACKEND_TIMEOUT_SECS", &mut self.backend.timeout_secs);

        // PIN
        Self::apply_env_parse("MH_PIN_MAX_ATTEMPTS", &mut self.pin.max_attempts);
        Self::apply_env_bool("MH_PIN_LOCAL_FALLBACK", &mut self.pin.local_fallback);

        // Unlock
        Self::apply_env_parse("MH_UNLOCK_TTL_SECS", &mut self.unlock.ttl_secs);

        // Session
        Self::apply_env_parse(
            "MH_SESSION_DEFAULT_LIFETIME_SECS",
            &mut self.session.default_lifetime_secs,
        );

        // Storage
        Self::apply_env_string("MH_STORAGE_DIR", &mut self.storage.dir);

        // Logging
        Self::apply_env_parse("MH_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_bool("MH_LOG_COLORED", &mut self.logging.colored);
        Self::apply_env_option_string("MH_LOG_FILE", &mut self.logging.file);
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for bool values (accepts "true"/"1")
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }

    /// Helper: Apply environment variable override for Option<String> values
    fn apply_env_option_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(val);
        }
    }
}
