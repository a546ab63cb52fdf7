//! Discord user entity.

use serde::{Deserialize, Serialize};

use super::GuildMember;
use super::snowflake::snowflake;
use crate::domain::serde_utils::nullable_bits;

snowflake!(
    /// Unique identifier for a Discord user.
    UserId
);

/// Base URL of the Discord media CDN.
pub const CDN_URL: &str = "https://cdn.discordapp.com";

bitflags::bitflags! {
    /// Public and private user flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UserFlags: u64 {
        const STAFF = 1 << 0;
        const PARTNER = 1 << 1;
        const HYPESQUAD = 1 << 2;
        const BUG_HUNTER_LEVEL_1 = 1 << 3;
        const HYPESQUAD_BRAVERY = 1 << 6;
        const HYPESQUAD_BRILLIANCE = 1 << 7;
        const HYPESQUAD_BALANCE = 1 << 8;
        const PREMIUM_EARLY_SUPPORTER = 1 << 9;
        const TEAM_PSEUDO_USER = 1 << 10;
        const BUG_HUNTER_LEVEL_2 = 1 << 14;
        const VERIFIED_BOT = 1 << 16;
        const VERIFIED_DEVELOPER = 1 << 17;
        const CERTIFIED_MODERATOR = 1 << 18;
        const BOT_HTTP_INTERACTIONS = 1 << 19;
        const ACTIVE_DEVELOPER = 1 << 22;
    }
}

/// Nitro subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
#[repr(u8)]
pub enum PremiumType {
    /// No subscription.
    #[default]
    None = 0,
    /// Nitro Classic.
    NitroClassic = 1,
    /// Nitro.
    Nitro = 2,
    /// Nitro Basic.
    NitroBasic = 3,
}

impl From<u8> for PremiumType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::NitroClassic,
            2 => Self::Nitro,
            3 => Self::NitroBasic,
            _ => Self::None,
        }
    }
}

impl From<PremiumType> for u8 {
    fn from(value: PremiumType) -> Self {
        value as Self
    }
}

/// A Discord user as delivered in gateway and REST payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    id: UserId,
    username: String,
    #[serde(default)]
    discriminator: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    bot: bool,
    #[serde(default)]
    system: bool,
    #[serde(default)]
    mfa_enabled: bool,
    #[serde(default)]
    banner: Option<String>,
    #[serde(default)]
    accent_color: Option<u32>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, deserialize_with = "nullable_bits::deserialize")]
    flags: u64,
    #[serde(default, deserialize_with = "nullable_bits::deserialize")]
    public_flags: u64,
    #[serde(default)]
    premium_type: PremiumType,
    /// Present on mention entries inside guild messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    member: Option<Box<GuildMember>>,
}

impl User {
    /// Creates a minimal user.
    #[must_use]
    pub fn new(id: impl Into<UserId>, username: impl Into<String>, bot: bool) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            discriminator: "0".to_string(),
            global_name: None,
            avatar: None,
            bot,
            system: false,
            mfa_enabled: false,
            banner: None,
            accent_color: None,
            locale: None,
            verified: false,
            email: None,
            flags: 0,
            public_flags: 0,
            premium_type: PremiumType::None,
            member: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    #[must_use]
    pub fn global_name(&self) -> Option<&str> {
        self.global_name.as_deref()
    }

    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    #[must_use]
    pub const fn is_bot(&self) -> bool {
        self.bot
    }

    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.system
    }

    #[must_use]
    pub const fn mfa_enabled(&self) -> bool {
        self.mfa_enabled
    }

    #[must_use]
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    #[must_use]
    pub const fn accent_color(&self) -> Option<u32> {
        self.accent_color
    }

    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.verified
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub const fn flags(&self) -> UserFlags {
        UserFlags::from_bits_retain(self.flags)
    }

    #[must_use]
    pub const fn public_flags(&self) -> UserFlags {
        UserFlags::from_bits_retain(self.public_flags)
    }

    #[must_use]
    pub const fn premium_type(&self) -> PremiumType {
        self.premium_type
    }

    /// Guild member data attached to a mention.
    #[must_use]
    pub fn member(&self) -> Option<&GuildMember> {
        self.member.as_deref()
    }

    /// Global name if set, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }

    /// Returns the `<@id>` mention string.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Returns the avatar URL, falling back to the default avatar.
    #[must_use]
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => {
                let ext = if hash.starts_with("a_") { "gif" } else { "png" };
                format!("{CDN_URL}/avatars/{}/{hash}.{ext}", self.id)
            }
            None => format!("{CDN_URL}/embed/avatars/{}.png", self.default_avatar_index()),
        }
    }

    fn default_avatar_index(&self) -> u64 {
        match self.discriminator.parse::<u64>() {
            Ok(discriminator) if discriminator != 0 => discriminator % 5,
            _ => (self.id.as_u64() >> 22) % 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_from_gateway_payload() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "80351110224678912",
            "username": "Nelly",
            "discriminator": "1337",
            "avatar": "8342729096ea3675442027381ff50dfe",
            "verified": true,
            "flags": 64,
            "public_flags": null,
            "premium_type": 1
        }))
        .unwrap();

        assert_eq!(user.id(), UserId(80_351_110_224_678_912));
        assert!(user.flags().contains(UserFlags::HYPESQUAD_BRAVERY));
        assert!(user.public_flags().is_empty());
        assert_eq!(user.premium_type(), PremiumType::NitroClassic);
        assert!(!user.is_bot());
        assert!(user.avatar_url().ends_with("8342729096ea3675442027381ff50dfe.png"));
    }

    #[test]
    fn test_default_avatar_index() {
        let legacy: User = serde_json::from_value(serde_json::json!({
            "id": "1", "username": "a", "discriminator": "0007"
        }))
        .unwrap();
        assert!(legacy.avatar_url().ends_with("/embed/avatars/2.png"));

        let migrated = User::new(80_351_110_224_678_912_u64, "b", false);
        let expected = (80_351_110_224_678_912_u64 >> 22) % 6;
        assert!(migrated.avatar_url().ends_with(&format!("/{expected}.png")));
    }

    #[test]
    fn test_display_name_prefers_global_name() {
        let mut user = User::new(1_u64, "name", true);
        assert_eq!(user.display_name(), "name");
        user.global_name = Some("Global".to_string());
        assert_eq!(user.display_name(), "Global");
        assert_eq!(user.mention(), "<@1>");
    }
}
