//! Discord guild entity.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::snowflake::snowflake;
use super::{ApplicationId, Channel, ChannelId, GuildMember, Presence, Role, UserId};

snowflake!(
    /// Unique identifier for a Discord guild (server).
    GuildId
);

/// Guild boost tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "u8")]
#[allow(missing_docs)]
pub enum PremiumTier {
    #[default]
    None,
    Tier1,
    Tier2,
    Tier3,
}

impl From<u8> for PremiumTier {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Tier1,
            2 => Self::Tier2,
            3 => Self::Tier3,
            _ => Self::None,
        }
    }
}

/// Guild verification level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "u8")]
#[allow(missing_docs)]
pub enum VerificationLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl From<u8> for VerificationLevel {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            4 => Self::VeryHigh,
            _ => Self::None,
        }
    }
}

/// Discord guild (server) information.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[allow(missing_docs)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub splash: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub afk_channel_id: Option<ChannelId>,
    #[serde(default)]
    pub afk_timeout: u32,
    #[serde(default)]
    pub verification_level: VerificationLevel,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub emojis: Vec<Value>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub mfa_level: u8,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
    #[serde(default)]
    pub system_channel_id: Option<ChannelId>,
    #[serde(default)]
    pub rules_channel_id: Option<ChannelId>,
    #[serde(default)]
    pub public_updates_channel_id: Option<ChannelId>,
    #[serde(default)]
    pub max_members: Option<u64>,
    #[serde(default)]
    pub vanity_url_code: Option<String>,
    #[serde(default)]
    pub premium_tier: PremiumTier,
    #[serde(default)]
    pub premium_subscription_count: Option<u32>,
    #[serde(default)]
    pub preferred_locale: Option<String>,
    #[serde(default)]
    pub nsfw_level: u8,
}

impl Guild {
    #[must_use]
    pub const fn id(&self) -> GuildId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// A guild the bot has just joined or that became available, as sent in `GUILD_CREATE`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[allow(missing_docs)]
pub struct NewGuild {
    #[serde(flatten)]
    pub guild: Guild,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub members: Vec<GuildMember>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub threads: Vec<Channel>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    #[serde(default)]
    pub voice_states: Vec<Value>,
    #[serde(default)]
    pub stage_instances: Vec<Value>,
}

/// A guild that is offline or that the bot was removed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[allow(missing_docs)]
pub struct UnavailableGuild {
    pub id: GuildId,
    /// False when the bot was removed rather than the guild going offline.
    #[serde(default)]
    pub unavailable: bool,
}

/// Any of the guild shapes a guild dispatch can carry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum AnyGuild {
    /// A plain guild (`GUILD_UPDATE`).
    Available(Box<Guild>),
    /// A freshly joined guild with members and channels.
    New(Box<NewGuild>),
    /// An outage or removal notice.
    Unavailable(UnavailableGuild),
}

impl TryFrom<Value> for AnyGuild {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let has = |key: &str| value.get(key).is_some_and(|v| !v.is_null());

        if has("joined_at") {
            serde_json::from_value(value).map(|g| Self::New(Box::new(g)))
        } else if has("unavailable") {
            serde_json::from_value(value).map(Self::Unavailable)
        } else {
            serde_json::from_value(value).map(|g| Self::Available(Box::new(g)))
        }
    }
}

impl AnyGuild {
    #[must_use]
    pub fn id(&self) -> GuildId {
        match self {
            Self::Available(guild) => guild.id,
            Self::New(new) => new.guild.id,
            Self::Unavailable(unavailable) => unavailable.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild_json() -> Value {
        serde_json::json!({
            "id": "197038439483310086",
            "name": "Discord Testers",
            "icon": "f64c482b807da4f539cff778d174971c",
            "owner_id": "73193882359173120",
            "verification_level": 3,
            "roles": [],
            "emojis": [],
            "features": ["ANIMATED_ICON", "COMMUNITY"],
            "premium_tier": 3
        })
    }

    #[test]
    fn test_plain_guild() {
        let guild: AnyGuild = serde_json::from_value(guild_json()).unwrap();
        let AnyGuild::Available(guild) = guild else {
            panic!("expected a plain guild");
        };
        assert_eq!(guild.verification_level, VerificationLevel::High);
        assert_eq!(guild.premium_tier, PremiumTier::Tier3);
        assert!(guild.has_feature("COMMUNITY"));
    }

    #[test]
    fn test_joined_at_selects_new_guild() {
        let mut raw = guild_json();
        raw["joined_at"] = serde_json::json!("2021-04-12T23:40:39.855793+00:00");
        raw["member_count"] = serde_json::json!(2);
        raw["channels"] = serde_json::json!([{ "id": "1", "type": 0, "name": "general" }]);
        raw["members"] = serde_json::json!([{ "user": { "id": "2", "username": "u" }, "roles": [] }]);

        let guild: AnyGuild = serde_json::from_value(raw).unwrap();
        let AnyGuild::New(new) = guild else {
            panic!("expected a new guild");
        };
        assert_eq!(new.guild.name, "Discord Testers");
        assert_eq!(new.channels[0].name(), Some("general"));
        assert_eq!(new.members.len(), 1);
        assert_eq!(new.member_count, 2);
    }

    #[test]
    fn test_unavailable_flag_selects_unavailable_guild() {
        let guild: AnyGuild =
            serde_json::from_value(serde_json::json!({ "id": "5", "unavailable": true })).unwrap();
        assert_eq!(
            guild,
            AnyGuild::Unavailable(UnavailableGuild {
                id: GuildId(5),
                unavailable: true
            })
        );
        assert_eq!(guild.id(), GuildId(5));
    }
}
