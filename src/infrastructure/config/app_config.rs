//! Bot configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::args::CliArgs;
use super::storage::ConfigError;
use crate::domain::entities::{Activity, ActivityType, GuildId, PresenceStatus};
use crate::infrastructure::discord::gateway::{
    GatewayClientConfig, GatewayIntents, MAX_RECONNECT_ATTEMPTS, PresenceUpdate,
};

pub(super) const APP_NAME: &str = "gatebird";
pub(super) const APP_QUALIFIER: &str = "rs";
pub(super) const APP_ORGANIZATION: &str = "gatebird";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Presence set at Identify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// One of `online`, `idle`, `dnd`, `invisible`.
    #[serde(default = "default_status")]
    pub status: String,

    /// Activity text, e.g. "with the gateway".
    #[serde(default)]
    pub activity: Option<String>,

    /// Activity type number (0 playing, 2 listening, 3 watching, 5 competing).
    #[serde(default)]
    pub activity_type: u8,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            status: default_status(),
            activity: None,
            activity_type: 0,
        }
    }
}

/// Bot configuration from `config.toml`, overridden by CLI arguments.
#[derive(Debug, Serialize, Deserialize)]
pub struct BotConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Gateway intent names. Empty means the default bot set.
    #[serde(default)]
    pub intents: Vec<String>,

    #[serde(default)]
    pub presence: Option<PresenceConfig>,

    /// Ask the gateway for zlib-stream compression.
    #[serde(default)]
    pub compress: bool,

    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Guild that receives the demo commands instead of registering them globally.
    #[serde(default)]
    pub test_guild: Option<GuildId>,
}

fn default_status() -> String {
    "online".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_reconnect_attempts() -> u32 {
    MAX_RECONNECT_ATTEMPTS
}

impl BotConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
    }

    /// Parses the configured intent names.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidIntents` naming the first unknown intent.
    pub fn gateway_intents(&self) -> Result<GatewayIntents, ConfigError> {
        if self.intents.is_empty() {
            return Ok(GatewayIntents::default_bot());
        }
        GatewayIntents::from_names(&self.intents).map_err(ConfigError::InvalidIntents)
    }

    /// Builds the Identify presence, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidStatus` for an unknown status name.
    pub fn presence_update(&self) -> Result<Option<PresenceUpdate>, ConfigError> {
        let Some(presence) = &self.presence else {
            return Ok(None);
        };

        let status: PresenceStatus = presence
            .status
            .parse()
            .map_err(ConfigError::InvalidStatus)?;
        let mut update = PresenceUpdate::new(status);
        if let Some(name) = &presence.activity {
            update = update.with_activity(Activity::new(
                ActivityType::from(presence.activity_type),
                name.clone(),
            ));
        }
        Ok(Some(update))
    }

    /// Gateway settings derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the intents or presence are invalid.
    pub fn gateway_config(&self) -> Result<GatewayClientConfig, ConfigError> {
        let mut config = GatewayClientConfig::new()
            .with_intents(self.gateway_intents()?)
            .with_compression(self.compress)
            .with_auto_reconnect(self.auto_reconnect)
            .with_max_reconnect_attempts(self.max_reconnect_attempts);
        if let Some(presence) = self.presence_update()? {
            config = config.with_presence(presence);
        }
        Ok(config)
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            intents: Vec::new(),
            presence: None,
            compress: false,
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            test_guild: None,
        }
    }
}
