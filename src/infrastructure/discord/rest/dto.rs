use serde::Deserialize;

use crate::domain::entities::{ApplicationId, User};
use crate::domain::serde_utils::nullable_bits;

/// Response of `GET /gateway`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GatewayInfo {
    /// WebSocket URL, without query string.
    pub url: String,
}

/// Response of `GET /gateway/bot`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GatewayBotInfo {
    /// WebSocket URL, without query string.
    pub url: String,
    /// Recommended shard count.
    pub shards: u32,
    /// Identify budget.
    pub session_start_limit: SessionStartLimit,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct SessionStartLimit {
    pub total: u32,
    pub remaining: u32,
    /// Milliseconds until `remaining` resets.
    pub reset_after: u64,
    pub max_concurrency: u32,
}

/// Response of `GET /applications/@me`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[allow(missing_docs)]
pub struct CurrentApplication {
    pub id: ApplicationId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bot_public: bool,
    #[serde(default)]
    pub owner: Option<User>,
    #[serde(default, deserialize_with = "nullable_bits::deserialize")]
    pub flags: u64,
}
