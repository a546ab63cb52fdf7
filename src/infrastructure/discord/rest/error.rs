use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub type RestResult<T> = Result<T, RestError>;

#[derive(Debug, Error)]
pub enum RestError {
    /// Discord answered with a non-2xx status.
    #[error("Discord API error {code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        /// Platform error code, e.g. 50001 for Missing Access.
        code: u32,
        message: String,
        /// Field-level error tree for form errors (code 50035).
        errors: Option<Value>,
        /// Seconds to wait, set on 429 responses.
        retry_after: Option<f64>,
    },

    /// The request never produced a response.
    #[error("request failed: {message}")]
    Transport {
        message: String,
        timeout: bool,
        connect: bool,
    },

    #[error("failed to decode response: {message}")]
    Decode { message: String },

    #[error("failed to encode request: {message}")]
    Encode { message: String },

    #[error("no bot token set")]
    MissingToken,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<Value>,
    #[serde(default)]
    retry_after: Option<f64>,
}

impl RestError {
    /// Builds an API error from a non-2xx response body.
    ///
    /// Bodies that are not Discord's JSON error shape keep the raw text as the
    /// message and report code 0.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiErrorBody>(body) {
            Ok(error) => Self::Api {
                status,
                code: error.code,
                message: error.message.unwrap_or_else(|| format!("HTTP {status}")),
                errors: error.errors,
                retry_after: error.retry_after,
            },
            Err(_) => Self::Api {
                status,
                code: 0,
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    String::from_utf8_lossy(body).into_owned()
                },
                errors: None,
                retry_after: None,
            },
        }
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Platform error code of an API error.
    #[must_use]
    pub const fn api_code(&self) -> Option<u32> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// HTTP status of an API error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401 responses, which mean the token is invalid.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::decode(err.to_string());
        }

        Self::Transport {
            message: err.to_string(),
            timeout: err.is_timeout(),
            connect: err.is_connect(),
        }
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}
