mod backend_config;
mod config;
mod error;
mod log_level;
mod logging_config;
mod pin_config;
mod session_config;
mod storage_config;
mod unlock_config;

#[cfg(test)]
mod tests;

pub use backend_config::BackendConfig;
pub use config::Config;
pub use error::{ConfigError, ConfigErrorResult};
pub use log_level::LogLevel;
pub use logging_config::LoggingConfig;
pub use pin_config::PinConfig;
pub use session_config::SessionConfig;
pub use storage_config::StorageConfig;
pub use unlock_config::UnlockConfig;

const CONFIG_DIR_ENV: &str = "MH_CONFIG_DIR";
const DEFAULT_CONFIG_DIR: &str = ".munro";
const CONFIG_FILENAME: &str = "config.toml";
const DEFAULT_STORAGE_DIRECTORY: &str = "storage";
const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_COLORED: bool = true;
