use std::io;
use thiserror::Error;

use crate::infrastructure::discord::rest::RestError;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// The server closed with a code that forbids reconnecting.
    #[error("gateway closed with code {code}: {reason}")]
    Closed { code: u16, reason: String },

    #[error("websocket error: {message}")]
    WebSocket { message: String },

    #[error("gateway URL lookup failed: {0}")]
    UrlLookup(#[source] RestError),

    #[error("reconnection limit exceeded after {attempts} attempts")]
    ReconnectionLimitExceeded { attempts: u32 },

    #[error("compression error: {message}")]
    CompressionError { message: String },

    #[error("serialization error: {message}")]
    SerializationError { message: String },

    #[error("protocol error: unexpected opcode {opcode}")]
    UnexpectedOpcode { opcode: u8 },

    #[error("protocol error: {message}")]
    ProtocolError { message: String },

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("channel closed")]
    ChannelClosed,

    #[error("not connected to gateway")]
    NotConnected,

    #[error("already connecting or connected")]
    AlreadyConnected,

    #[error("gateway task panicked: {message}")]
    Panicked { message: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl GatewayError {
    #[must_use]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn closed(code: u16) -> Self {
        let reason = GatewayCloseCode::from_u16(code)
            .map_or("unknown close code", GatewayCloseCode::description);
        Self::Closed {
            code,
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn compression(message: impl Into<String>) -> Self {
        Self::CompressionError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Errors that end the gateway for good instead of triggering a reconnect.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Closed { .. }
                | Self::UrlLookup(_)
                | Self::ReconnectionLimitExceeded { .. }
                | Self::AlreadyConnected
                | Self::Panicked { .. }
        )
    }

    /// Bad token, either at URL lookup or as close code 4004.
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        match self {
            Self::Closed { code, .. } => *code == GatewayCloseCode::AuthenticationFailed as u16,
            Self::UrlLookup(err) => err.is_unauthorized(),
            _ => false,
        }
    }

    #[must_use]
    pub const fn close_code(&self) -> Option<u16> {
        if let Self::Closed { code, .. } = self {
            Some(*code)
        } else {
            None
        }
    }
}

/// Server close codes in 4000-4009, except 4004, leave the session resumable.
#[must_use]
pub const fn close_allows_resume(code: u16) -> bool {
    code >= 4000 && code != GatewayCloseCode::AuthenticationFailed as u16 && code < 4010
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayCloseCode {
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    NotAuthenticated = 4003,
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    InvalidSequence = 4007,
    RateLimited = 4008,
    SessionTimedOut = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    DisallowedIntents = 4014,
}

impl GatewayCloseCode {
    #[must_use]
    pub const fn from_u16(code: u16) -> Option<Self> {
        match code {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::NotAuthenticated),
            4004 => Some(Self::AuthenticationFailed),
            4005 => Some(Self::AlreadyAuthenticated),
            4007 => Some(Self::InvalidSequence),
            4008 => Some(Self::RateLimited),
            4009 => Some(Self::SessionTimedOut),
            4010 => Some(Self::InvalidShard),
            4011 => Some(Self::ShardingRequired),
            4012 => Some(Self::InvalidApiVersion),
            4013 => Some(Self::InvalidIntents),
            4014 => Some(Self::DisallowedIntents),
            _ => None,
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "unknown error",
            Self::UnknownOpcode => "unknown opcode",
            Self::DecodeError => "decode error",
            Self::NotAuthenticated => "not authenticated",
            Self::AuthenticationFailed => "authentication failed, check the token",
            Self::AlreadyAuthenticated => "already authenticated",
            Self::InvalidSequence => "invalid resume sequence",
            Self::RateLimited => "rate limited",
            Self::SessionTimedOut => "session timed out",
            Self::InvalidShard => "invalid shard",
            Self::ShardingRequired => "sharding required",
            Self::InvalidApiVersion => "invalid API version",
            Self::InvalidIntents => "invalid intents",
            Self::DisallowedIntents => "disallowed intents, enable them in the developer portal",
        }
    }

    #[must_use]
    pub const fn is_resumable(self) -> bool {
        close_allows_resume(self as u16)
    }

    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }
}

impl From<GatewayCloseCode> for u16 {
    fn from(code: GatewayCloseCode) -> Self {
        code as Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(4000, true ; "unknown error")]
    #[test_case(4001, true ; "unknown opcode")]
    #[test_case(4003, true ; "not authenticated")]
    #[test_case(4004, false ; "authentication failed")]
    #[test_case(4007, true ; "invalid sequence")]
    #[test_case(4009, true ; "session timed out")]
    #[test_case(4010, false ; "invalid shard")]
    #[test_case(4014, false ; "disallowed intents")]
    #[test_case(1000, false ; "normal closure")]
    #[test_case(1001, false ; "going away is handled separately")]
    #[test_case(3999, false ; "below range")]
    fn test_close_allows_resume(code: u16, expected: bool) {
        assert_eq!(close_allows_resume(code), expected);
    }

    #[test]
    fn test_every_code_in_range_except_auth_resumes() {
        for code in 4000..4010 {
            assert_eq!(close_allows_resume(code), code != 4004, "code {code}");
        }
    }

    #[test]
    fn test_close_code_mapping() {
        assert_eq!(
            GatewayCloseCode::from_u16(4004),
            Some(GatewayCloseCode::AuthenticationFailed)
        );
        assert!(GatewayCloseCode::AuthenticationFailed.is_fatal());
        assert!(!GatewayCloseCode::UnknownError.is_fatal());
        assert!(GatewayCloseCode::SessionTimedOut.is_resumable());
    }

    #[test]
    fn test_error_fatality() {
        let closed = GatewayError::closed(4004);
        assert!(closed.is_fatal());
        assert!(closed.is_authentication_failure());
        assert_eq!(closed.close_code(), Some(4004));
        assert!(closed.to_string().contains("check the token"));

        assert!(!GatewayError::connection_failed("refused").is_fatal());
        assert!(!GatewayError::timeout("Hello").is_fatal());
        assert!(GatewayError::UrlLookup(RestError::MissingToken).is_fatal());
    }
}
