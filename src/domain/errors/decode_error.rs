//! Payload decoding error types.

use thiserror::Error;

/// A dispatch payload that could not be turned into a domain entity.
///
/// Decode errors are scoped to one payload: they are logged and the payload is
/// dropped, the connection carries on.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum DecodeError {
    #[error("malformed {event_type} payload: {source}")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown channel type {0}")]
    UnknownChannelType(u8),

    #[error("unknown interaction type {0}")]
    UnknownInteractionType(u8),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("option `{name}` has type {option_type} but value {found} is not {expected}")]
    OptionType {
        name: String,
        option_type: u8,
        expected: &'static str,
        found: String,
    },

    #[error("option `{name}` has no value")]
    MissingOptionValue { name: String },

    #[error("attachment option `{name}` references unresolved attachment {key}")]
    UnresolvedAttachment { name: String, key: String },
}

impl DecodeError {
    /// Wraps a serde failure for the given dispatch type.
    #[must_use]
    pub fn payload(event_type: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Payload {
            event_type: event_type.into(),
            source,
        }
    }

    /// Creates an option type mismatch error.
    #[must_use]
    pub fn option_type(
        name: impl Into<String>,
        option_type: u8,
        expected: &'static str,
        found: &serde_json::Value,
    ) -> Self {
        Self::OptionType {
            name: name.into(),
            option_type,
            expected,
            found: found.to_string(),
        }
    }
}
