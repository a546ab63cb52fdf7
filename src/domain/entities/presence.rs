use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GuildId, UserId};

/// Online status shown next to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum PresenceStatus {
    #[default]
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
}

impl PresenceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Invisible => "invisible",
            Self::Offline => "offline",
        }
    }
}

impl std::str::FromStr for PresenceStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "idle" => Ok(Self::Idle),
            "dnd" => Ok(Self::Dnd),
            "invisible" => Ok(Self::Invisible),
            "offline" => Ok(Self::Offline),
            other => Err(format!("unknown presence status: {other}")),
        }
    }
}

/// Activity type shown in a presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
#[allow(missing_docs)]
pub enum ActivityType {
    #[default]
    Playing,
    Streaming,
    Listening,
    Watching,
    Custom,
    Competing,
}

impl From<u8> for ActivityType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Streaming,
            2 => Self::Listening,
            3 => Self::Watching,
            4 => Self::Custom,
            5 => Self::Competing,
            _ => Self::Playing,
        }
    }
}

impl From<ActivityType> for u8 {
    fn from(value: ActivityType) -> Self {
        match value {
            ActivityType::Playing => 0,
            ActivityType::Streaming => 1,
            ActivityType::Listening => 2,
            ActivityType::Watching => 3,
            ActivityType::Custom => 4,
            ActivityType::Competing => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Activity {
    #[must_use]
    pub fn new(kind: ActivityType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            url: None,
            state: None,
        }
    }
}

/// User reference inside a presence; only `id` is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[allow(missing_docs)]
pub struct PresenceUser {
    pub id: UserId,
}

/// Payload of `PRESENCE_UPDATE`, also embedded in `GUILD_CREATE`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[allow(missing_docs)]
pub struct Presence {
    pub user: PresenceUser,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default = "offline")]
    pub status: PresenceStatus,
    #[serde(default)]
    pub activities: Vec<Value>,
    #[serde(default)]
    pub client_status: Option<Value>,
}

const fn offline() -> PresenceStatus {
    PresenceStatus::Offline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_update_payload() {
        let presence: Presence = serde_json::from_value(serde_json::json!({
            "user": { "id": "80351110224678912" },
            "guild_id": "1",
            "status": "dnd",
            "activities": [{ "name": "chess", "type": 0 }],
            "client_status": { "desktop": "dnd" }
        }))
        .unwrap();

        assert_eq!(presence.user.id, UserId(80_351_110_224_678_912));
        assert_eq!(presence.status, PresenceStatus::Dnd);
        assert_eq!(presence.activities.len(), 1);
    }

    #[test]
    fn test_activity_serializes_numeric_type() {
        let activity = Activity::new(ActivityType::Watching, "the logs");
        assert_eq!(
            serde_json::to_value(&activity).unwrap(),
            serde_json::json!({ "name": "the logs", "type": 3 })
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("IDLE".parse::<PresenceStatus>(), Ok(PresenceStatus::Idle));
        assert!("away".parse::<PresenceStatus>().is_err());
    }
}
