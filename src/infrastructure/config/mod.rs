//! Bot configuration: TOML file, CLI arguments and environment.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{BotConfig, LogLevel, PresenceConfig};
pub use args::CliArgs;
pub use storage::{ConfigError, StorageManager};
