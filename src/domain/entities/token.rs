//! Bot token value object.

use std::fmt;

use zeroize::Zeroizing;

/// Discord bot token. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct BotToken {
    value: Zeroizing<String>,
}

impl BotToken {
    /// Creates a token, rejecting empty input and a pasted `Bot ` prefix.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        let trimmed = trimmed.strip_prefix("Bot ").unwrap_or(trimmed).trim();

        if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
            return None;
        }

        Some(Self {
            value: Zeroizing::new(trimmed.to_string()),
        })
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bot {}", self.value.as_str())
    }

    /// Returns a fixed placeholder; no part of the secret is ever shown.
    #[must_use]
    pub const fn masked(&self) -> &'static str {
        "***"
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotToken")
            .field("value", &self.masked())
            .finish()
    }
}

impl fmt::Display for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.masked())
    }
}
