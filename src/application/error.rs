//! Façade-level errors.

use thiserror::Error;

use crate::domain::errors::DecodeError;
use crate::infrastructure::config::ConfigError;
use crate::infrastructure::discord::gateway::GatewayError;
use crate::infrastructure::discord::rest::RestError;

/// One failed command registration request.
#[derive(Debug)]
pub struct RegistrationFailure {
    /// Command name.
    pub command: String,
    /// `None` for the global bulk overwrite.
    pub guild_id: Option<u64>,
    /// Why the request failed.
    pub error: RestError,
}

impl std::fmt::Display for RegistrationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.guild_id {
            Some(guild_id) => write!(f, "{} in guild {guild_id}: {}", self.command, self.error),
            None => write!(f, "{} (global): {}", self.command, self.error),
        }
    }
}

/// Errors surfaced by [`Client`](super::Client).
#[derive(Debug, Error)]
pub enum ClientError {
    /// An outbound action was called before `READY`.
    #[error("client is not ready, wait for login to complete")]
    NotReady,

    #[error("invalid bot token format")]
    InvalidToken,

    #[error("client is already logged in")]
    AlreadyLoggedIn,

    /// The gateway stopped before `READY` without an error, e.g. `close()` during login.
    #[error("gateway closed before the session was ready")]
    Closed,

    #[error("command registration failed: {}", format_failures(.failures))]
    Registration { failures: Vec<RegistrationFailure> },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Rest(#[from] RestError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn format_failures(failures: &[RegistrationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClientError {
    /// Whether the token was rejected, at URL lookup or with close code 4004.
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        match self {
            Self::Gateway(err) => err.is_authentication_failure(),
            Self::Rest(err) => err.is_unauthorized(),
            Self::InvalidToken => true,
            _ => false,
        }
    }
}
