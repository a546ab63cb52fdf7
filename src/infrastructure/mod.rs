//! Infrastructure layer with external service adapters.

/// Bot configuration.
pub mod config;
/// Discord gateway and REST clients.
pub mod discord;

pub use config::{BotConfig, CliArgs, ConfigError, LogLevel, StorageManager};
pub use discord::{
    EventTranslator, GatewayClient, GatewayClientConfig, GatewayCommand, GatewayError,
    GatewayEventKind, GatewayIntent, GatewayIntents, PresenceUpdate, RequestClient, RestError,
};
