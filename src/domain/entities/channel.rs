//! Discord channel entity.
//!
//! Channels arrive as one flat JSON shape discriminated by `type`. They are
//! decoded through [`RawChannel`] into the closed [`Channel`] enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snowflake::snowflake;
use super::{ApplicationId, GuildId, MessageId, User, UserId};
use crate::domain::errors::DecodeError;
use crate::domain::serde_utils::nullable_bits;

snowflake!(
    /// Unique identifier for a Discord channel.
    ChannelId
);

/// Discord channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelKind {
    /// Guild text channel.
    GuildText,
    /// Direct message channel.
    Dm,
    /// Voice channel.
    Voice,
    /// Group direct message channel.
    GroupDm,
    /// Category channel.
    Category,
    /// Announcement channel.
    Announcement,
    /// Announcement thread channel.
    AnnouncementThread,
    /// Public thread channel.
    PublicThread,
    /// Private thread channel.
    PrivateThread,
    /// Stage voice channel.
    StageVoice,
    /// Directory channel.
    Directory,
    /// Forum channel.
    Forum,
    /// Media channel.
    Media,
    /// A type this crate does not know about.
    Unknown(u8),
}

impl ChannelKind {
    /// Returns true if this channel type supports text messages.
    #[must_use]
    pub const fn is_text_based(self) -> bool {
        matches!(
            self,
            Self::GuildText
                | Self::Dm
                | Self::GroupDm
                | Self::Announcement
                | Self::AnnouncementThread
                | Self::PublicThread
                | Self::PrivateThread
                | Self::Voice
                | Self::StageVoice
        )
    }

    #[must_use]
    pub const fn is_thread(self) -> bool {
        matches!(
            self,
            Self::AnnouncementThread | Self::PublicThread | Self::PrivateThread
        )
    }

    #[must_use]
    pub const fn is_voice(self) -> bool {
        matches!(self, Self::Voice | Self::StageVoice)
    }
}

impl From<u8> for ChannelKind {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::GuildText,
            1 => Self::Dm,
            2 => Self::Voice,
            3 => Self::GroupDm,
            4 => Self::Category,
            5 => Self::Announcement,
            10 => Self::AnnouncementThread,
            11 => Self::PublicThread,
            12 => Self::PrivateThread,
            13 => Self::StageVoice,
            14 => Self::Directory,
            15 => Self::Forum,
            16 => Self::Media,
            other => Self::Unknown(other),
        }
    }
}

impl From<ChannelKind> for u8 {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::GuildText => 0,
            ChannelKind::Dm => 1,
            ChannelKind::Voice => 2,
            ChannelKind::GroupDm => 3,
            ChannelKind::Category => 4,
            ChannelKind::Announcement => 5,
            ChannelKind::AnnouncementThread => 10,
            ChannelKind::PublicThread => 11,
            ChannelKind::PrivateThread => 12,
            ChannelKind::StageVoice => 13,
            ChannelKind::Directory => 14,
            ChannelKind::Forum => 15,
            ChannelKind::Media => 16,
            ChannelKind::Unknown(other) => other,
        }
    }
}

bitflags::bitflags! {
    /// Channel flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelFlags: u64 {
        const PINNED = 1 << 1;
        const REQUIRE_TAG = 1 << 4;
        const HIDE_MEDIA_DOWNLOAD_OPTIONS = 1 << 15;
    }
}

/// Target of a permission overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum OverwriteType {
    /// Role overwrite.
    Role,
    /// Member overwrite.
    Member,
}

impl From<u8> for OverwriteType {
    fn from(value: u8) -> Self {
        if value == 1 { Self::Member } else { Self::Role }
    }
}

impl From<OverwriteType> for u8 {
    fn from(value: OverwriteType) -> Self {
        match value {
            OverwriteType::Role => 0,
            OverwriteType::Member => 1,
        }
    }
}

/// Per-role or per-member permission overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct PermissionOverwrite {
    #[serde(with = "crate::domain::serde_utils::snowflake")]
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: OverwriteType,
    #[serde(default)]
    pub allow: String,
    #[serde(default)]
    pub deny: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ThreadMetadata {
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub auto_archive_duration: u32,
    #[serde(default)]
    pub archive_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub invitable: Option<bool>,
    #[serde(default)]
    pub create_timestamp: Option<DateTime<Utc>>,
}

/// The current user's membership of a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ThreadMember {
    #[serde(default)]
    pub id: Option<ChannelId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub join_timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable_bits::deserialize")]
    pub flags: u64,
}

/// Flat wire shape shared by every channel type.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChannel {
    id: ChannelId,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    guild_id: Option<GuildId>,
    #[serde(default)]
    position: Option<i32>,
    #[serde(default)]
    permission_overwrites: Vec<PermissionOverwrite>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    nsfw: bool,
    #[serde(default)]
    last_message_id: Option<MessageId>,
    #[serde(default)]
    bitrate: Option<u32>,
    #[serde(default)]
    user_limit: Option<u32>,
    #[serde(default)]
    rate_limit_per_user: Option<u32>,
    #[serde(default)]
    recipients: Vec<User>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    owner_id: Option<UserId>,
    #[serde(default)]
    application_id: Option<ApplicationId>,
    #[serde(default)]
    parent_id: Option<ChannelId>,
    #[serde(default)]
    last_pin_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    rtc_region: Option<String>,
    #[serde(default)]
    video_quality_mode: Option<u8>,
    #[serde(default)]
    message_count: Option<u32>,
    #[serde(default)]
    member_count: Option<u32>,
    #[serde(default)]
    thread_metadata: Option<ThreadMetadata>,
    #[serde(default)]
    member: Option<ThreadMember>,
    #[serde(default)]
    default_auto_archive_duration: Option<u32>,
    #[serde(default)]
    permissions: Option<String>,
    #[serde(default, deserialize_with = "nullable_bits::deserialize")]
    flags: u64,
    #[serde(default)]
    total_message_sent: Option<u32>,
    #[serde(default)]
    available_tags: Vec<Value>,
    #[serde(default)]
    applied_tags: Vec<String>,
    #[serde(default)]
    default_reaction_emoji: Option<Value>,
    #[serde(default)]
    default_thread_rate_limit_per_user: Option<u32>,
    #[serde(default)]
    default_sort_order: Option<u8>,
    #[serde(default)]
    default_forum_layout: Option<u8>,
}

/// Fields every channel carries.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ChannelBase {
    pub id: ChannelId,
    pub kind: ChannelKind,
    pub last_pin_timestamp: Option<DateTime<Utc>>,
    pub flags: u64,
    /// Computed permissions for the invoking user, only set on interaction payloads.
    pub permissions: Option<String>,
}

/// Fields shared by channels that live in a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct GuildChannelFields {
    /// Absent on channels nested inside `GUILD_CREATE`.
    pub guild_id: Option<GuildId>,
    pub name: String,
    pub position: i32,
    pub parent_id: Option<ChannelId>,
    pub permission_overwrites: Vec<PermissionOverwrite>,
    pub nsfw: bool,
}

/// Text and announcement channels.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct TextChannel {
    pub base: ChannelBase,
    pub guild: GuildChannelFields,
    pub topic: Option<String>,
    pub last_message_id: Option<MessageId>,
    pub rate_limit_per_user: u32,
    pub default_auto_archive_duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct VoiceChannel {
    pub base: ChannelBase,
    pub guild: GuildChannelFields,
    pub bitrate: u32,
    pub user_limit: u32,
    pub rtc_region: Option<String>,
    pub video_quality_mode: Option<u8>,
    pub last_message_id: Option<MessageId>,
    pub rate_limit_per_user: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CategoryChannel {
    pub base: ChannelBase,
    pub guild: GuildChannelFields,
}

#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct DmChannel {
    pub base: ChannelBase,
    pub last_message_id: Option<MessageId>,
    pub recipients: Vec<User>,
}

#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct GroupDmChannel {
    pub base: ChannelBase,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub owner_id: Option<UserId>,
    pub application_id: Option<ApplicationId>,
    pub last_message_id: Option<MessageId>,
    pub recipients: Vec<User>,
}

/// Public, private and announcement threads.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ThreadChannel {
    pub base: ChannelBase,
    pub guild_id: Option<GuildId>,
    pub name: String,
    pub parent_id: Option<ChannelId>,
    pub owner_id: Option<UserId>,
    pub last_message_id: Option<MessageId>,
    pub rate_limit_per_user: u32,
    pub message_count: u32,
    pub member_count: u32,
    pub total_message_sent: u32,
    pub metadata: Option<ThreadMetadata>,
    pub member: Option<ThreadMember>,
    pub applied_tags: Vec<String>,
}

/// Stage and directory channels, which carry only the shared guild fields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct GenericGuildChannel {
    pub base: ChannelBase,
    pub guild: GuildChannelFields,
}

/// Forum and media channels, which only hold threads.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct ForumChannel {
    pub base: ChannelBase,
    pub guild: GuildChannelFields,
    pub topic: Option<String>,
    pub rate_limit_per_user: u32,
    pub default_auto_archive_duration: Option<u32>,
    pub available_tags: Vec<Value>,
    pub default_reaction_emoji: Option<Value>,
    pub default_thread_rate_limit_per_user: Option<u32>,
    pub default_sort_order: Option<u8>,
    pub default_forum_layout: Option<u8>,
}

/// A channel, one variant per channel family.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawChannel")]
pub enum Channel {
    /// Type 0.
    GuildText(TextChannel),
    /// Type 1.
    Dm(DmChannel),
    /// Type 2.
    Voice(VoiceChannel),
    /// Type 3.
    GroupDm(GroupDmChannel),
    /// Type 4.
    Category(CategoryChannel),
    /// Type 5.
    Announcement(TextChannel),
    /// Types 10, 11 and 12.
    Thread(ThreadChannel),
    /// Types 13 and 14.
    Guild(GenericGuildChannel),
    /// Types 15 and 16.
    Forum(ForumChannel),
}

impl RawChannel {
    fn base(&self) -> ChannelBase {
        ChannelBase {
            id: self.id,
            kind: ChannelKind::from(self.kind),
            last_pin_timestamp: self.last_pin_timestamp,
            flags: self.flags,
            permissions: self.permissions.clone(),
        }
    }

    fn guild_fields(&mut self) -> GuildChannelFields {
        GuildChannelFields {
            guild_id: self.guild_id,
            name: self.name.take().unwrap_or_default(),
            position: self.position.unwrap_or_default(),
            parent_id: self.parent_id,
            permission_overwrites: std::mem::take(&mut self.permission_overwrites),
            nsfw: self.nsfw,
        }
    }

    fn text(mut self) -> TextChannel {
        TextChannel {
            base: self.base(),
            guild: self.guild_fields(),
            topic: self.topic,
            last_message_id: self.last_message_id,
            rate_limit_per_user: self.rate_limit_per_user.unwrap_or_default(),
            default_auto_archive_duration: self.default_auto_archive_duration,
        }
    }
}

impl TryFrom<RawChannel> for Channel {
    type Error = DecodeError;

    fn try_from(mut raw: RawChannel) -> Result<Self, Self::Error> {
        let base = raw.base();
        let channel = match base.kind {
            ChannelKind::GuildText => Self::GuildText(raw.text()),
            ChannelKind::Announcement => Self::Announcement(raw.text()),
            ChannelKind::Dm => Self::Dm(DmChannel {
                base,
                last_message_id: raw.last_message_id,
                recipients: raw.recipients,
            }),
            ChannelKind::GroupDm => Self::GroupDm(GroupDmChannel {
                base,
                name: raw.name,
                icon: raw.icon,
                owner_id: raw.owner_id,
                application_id: raw.application_id,
                last_message_id: raw.last_message_id,
                recipients: raw.recipients,
            }),
            ChannelKind::Voice => Self::Voice(VoiceChannel {
                guild: raw.guild_fields(),
                base,
                bitrate: raw.bitrate.unwrap_or_default(),
                user_limit: raw.user_limit.unwrap_or_default(),
                rtc_region: raw.rtc_region,
                video_quality_mode: raw.video_quality_mode,
                last_message_id: raw.last_message_id,
                rate_limit_per_user: raw.rate_limit_per_user.unwrap_or_default(),
            }),
            ChannelKind::Category => Self::Category(CategoryChannel {
                guild: raw.guild_fields(),
                base,
            }),
            ChannelKind::AnnouncementThread
            | ChannelKind::PublicThread
            | ChannelKind::PrivateThread => Self::Thread(ThreadChannel {
                base,
                guild_id: raw.guild_id,
                name: raw.name.unwrap_or_default(),
                parent_id: raw.parent_id,
                owner_id: raw.owner_id,
                last_message_id: raw.last_message_id,
                rate_limit_per_user: raw.rate_limit_per_user.unwrap_or_default(),
                message_count: raw.message_count.unwrap_or_default(),
                member_count: raw.member_count.unwrap_or_default(),
                total_message_sent: raw.total_message_sent.unwrap_or_default(),
                metadata: raw.thread_metadata,
                member: raw.member,
                applied_tags: raw.applied_tags,
            }),
            ChannelKind::StageVoice | ChannelKind::Directory => {
                Self::Guild(GenericGuildChannel {
                    guild: raw.guild_fields(),
                    base,
                })
            }
            ChannelKind::Forum | ChannelKind::Media => Self::Forum(ForumChannel {
                guild: raw.guild_fields(),
                base,
                topic: raw.topic,
                rate_limit_per_user: raw.rate_limit_per_user.unwrap_or_default(),
                default_auto_archive_duration: raw.default_auto_archive_duration,
                available_tags: raw.available_tags,
                default_reaction_emoji: raw.default_reaction_emoji,
                default_thread_rate_limit_per_user: raw.default_thread_rate_limit_per_user,
                default_sort_order: raw.default_sort_order,
                default_forum_layout: raw.default_forum_layout,
            }),
            ChannelKind::Unknown(kind) => return Err(DecodeError::UnknownChannelType(kind)),
        };

        Ok(channel)
    }
}

impl Channel {
    /// Fields shared by every variant.
    #[must_use]
    pub const fn base(&self) -> &ChannelBase {
        match self {
            Self::GuildText(c) | Self::Announcement(c) => &c.base,
            Self::Dm(c) => &c.base,
            Self::Voice(c) => &c.base,
            Self::GroupDm(c) => &c.base,
            Self::Category(c) => &c.base,
            Self::Thread(c) => &c.base,
            Self::Guild(c) => &c.base,
            Self::Forum(c) => &c.base,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ChannelId {
        self.base().id
    }

    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        self.base().kind
    }

    #[must_use]
    pub const fn flags(&self) -> ChannelFlags {
        ChannelFlags::from_bits_retain(self.base().flags)
    }

    /// Guild-scoped fields, absent for DMs and threads.
    #[must_use]
    pub const fn guild_fields(&self) -> Option<&GuildChannelFields> {
        match self {
            Self::GuildText(c) | Self::Announcement(c) => Some(&c.guild),
            Self::Voice(c) => Some(&c.guild),
            Self::Category(c) => Some(&c.guild),
            Self::Guild(c) => Some(&c.guild),
            Self::Forum(c) => Some(&c.guild),
            Self::Dm(_) | Self::GroupDm(_) | Self::Thread(_) => None,
        }
    }

    #[must_use]
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            Self::Thread(c) => c.guild_id,
            _ => self.guild_fields().and_then(|g| g.guild_id),
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Thread(c) => Some(&c.name),
            Self::GroupDm(c) => c.name.as_deref(),
            Self::Dm(_) => None,
            _ => self.guild_fields().map(|g| g.name.as_str()),
        }
    }

    #[must_use]
    pub fn parent_id(&self) -> Option<ChannelId> {
        match self {
            Self::Thread(c) => c.parent_id,
            _ => self.guild_fields().and_then(|g| g.parent_id),
        }
    }

    #[must_use]
    pub const fn last_message_id(&self) -> Option<MessageId> {
        match self {
            Self::GuildText(c) | Self::Announcement(c) => c.last_message_id,
            Self::Dm(c) => c.last_message_id,
            Self::GroupDm(c) => c.last_message_id,
            Self::Voice(c) => c.last_message_id,
            Self::Thread(c) => c.last_message_id,
            Self::Category(_) | Self::Guild(_) | Self::Forum(_) => None,
        }
    }

    #[must_use]
    pub const fn is_thread(&self) -> bool {
        matches!(self, Self::Thread(_))
    }

    #[must_use]
    pub const fn is_dm(&self) -> bool {
        matches!(self, Self::Dm(_) | Self::GroupDm(_))
    }

    #[must_use]
    pub const fn is_text_based(&self) -> bool {
        self.kind().is_text_based()
    }

    /// Returns the `<#id>` mention string.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id())
    }
}

/// Payload of `CHANNEL_PINS_UPDATE`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ChannelPinsUpdate {
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub last_pin_timestamp: Option<DateTime<Utc>>,
}
