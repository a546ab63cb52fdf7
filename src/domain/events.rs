//! Typed dispatch events delivered to listeners.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::entities::{
    AnyGuild, ApplicationId, Channel, ChannelId, ChannelKind, ChannelPinsUpdate, Guild, GuildId,
    GuildMember, GuildMemberRemove, GuildMembersChunk, Interaction, Message, MessageDelete,
    MessageDeleteBulk, Presence, UnavailableGuild, User,
};
use crate::domain::serde_utils::nullable_bits;

/// Dispatch exactly as received, before translation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Dispatch name, e.g. `MESSAGE_CREATE`.
    pub event_type: String,
    /// Sequence number of the frame.
    pub sequence: Option<u64>,
    /// The `d` field.
    pub data: Value,
}

/// Application summary sent with `READY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[allow(missing_docs)]
pub struct ReadyApplication {
    pub id: ApplicationId,
    #[serde(default, deserialize_with = "nullable_bits::deserialize")]
    pub flags: u64,
}

/// Payload of `READY`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[allow(missing_docs)]
pub struct Ready {
    #[serde(rename = "v")]
    pub version: u8,
    pub user: User,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    pub session_id: String,
    pub resume_gateway_url: String,
    #[serde(default)]
    pub shard: Option<[u32; 2]>,
    pub application: ReadyApplication,
}

/// Payload of `THREAD_DELETE`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[allow(missing_docs)]
pub struct ThreadDelete {
    pub id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
}

/// A translated dispatch.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Event {
    /// Every dispatch, before translation.
    Raw(RawEvent),
    Ready(Box<Ready>),
    Resumed,
    ChannelCreate(Box<Channel>),
    ChannelUpdate(Box<Channel>),
    ChannelDelete(Box<Channel>),
    ChannelPinsUpdate(ChannelPinsUpdate),
    ThreadCreate(Box<Channel>),
    ThreadUpdate(Box<Channel>),
    ThreadDelete(ThreadDelete),
    GuildCreate(AnyGuild),
    GuildUpdate(Box<Guild>),
    GuildDelete(UnavailableGuild),
    GuildMemberAdd(Box<GuildMember>),
    GuildMemberRemove(GuildMemberRemove),
    GuildMemberUpdate(Box<GuildMember>),
    GuildMembersChunk(GuildMembersChunk),
    InteractionCreate(Box<Interaction>),
    InviteCreate(Value),
    InviteDelete(Value),
    MessageCreate(Box<Message>),
    MessageUpdate(Box<Message>),
    MessageDelete(MessageDelete),
    MessageDeleteBulk(MessageDeleteBulk),
    PresenceUpdate(Box<Presence>),
    UserUpdate(Box<User>),
    /// A dispatch this crate does not translate.
    Unknown { event_type: String, data: Value },
}

macro_rules! event_types {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Listener key, one per [`Event`] variant.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum EventType {
            $($variant,)*
        }

        impl EventType {
            /// Every key, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Dispatch name as sent on the wire.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

event_types! {
    Raw => "RAW",
    Ready => "READY",
    Resumed => "RESUMED",
    ChannelCreate => "CHANNEL_CREATE",
    ChannelUpdate => "CHANNEL_UPDATE",
    ChannelDelete => "CHANNEL_DELETE",
    ChannelPinsUpdate => "CHANNEL_PINS_UPDATE",
    ThreadCreate => "THREAD_CREATE",
    ThreadUpdate => "THREAD_UPDATE",
    ThreadDelete => "THREAD_DELETE",
    GuildCreate => "GUILD_CREATE",
    GuildUpdate => "GUILD_UPDATE",
    GuildDelete => "GUILD_DELETE",
    GuildMemberAdd => "GUILD_MEMBER_ADD",
    GuildMemberRemove => "GUILD_MEMBER_REMOVE",
    GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
    GuildMembersChunk => "GUILD_MEMBERS_CHUNK",
    InteractionCreate => "INTERACTION_CREATE",
    InviteCreate => "INVITE_CREATE",
    InviteDelete => "INVITE_DELETE",
    MessageCreate => "MESSAGE_CREATE",
    MessageUpdate => "MESSAGE_UPDATE",
    MessageDelete => "MESSAGE_DELETE",
    MessageDeleteBulk => "MESSAGE_DELETE_BULK",
    PresenceUpdate => "PRESENCE_UPDATE",
    UserUpdate => "USER_UPDATE",
    Unknown => "UNKNOWN",
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    /// Accepts wire names (`MESSAGE_CREATE`) and camel case (`messageCreate`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = if value.contains('_') || !value.chars().any(|c| c.is_ascii_lowercase()) {
            value.to_ascii_uppercase()
        } else {
            let mut out = String::with_capacity(value.len() + 4);
            for (i, c) in value.chars().enumerate() {
                if i > 0 && c.is_ascii_uppercase() {
                    out.push('_');
                }
                out.push(c.to_ascii_uppercase());
            }
            out
        };

        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown event type: {value}"))
    }
}

impl Event {
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Raw(_) => EventType::Raw,
            Self::Ready(_) => EventType::Ready,
            Self::Resumed => EventType::Resumed,
            Self::ChannelCreate(_) => EventType::ChannelCreate,
            Self::ChannelUpdate(_) => EventType::ChannelUpdate,
            Self::ChannelDelete(_) => EventType::ChannelDelete,
            Self::ChannelPinsUpdate(_) => EventType::ChannelPinsUpdate,
            Self::ThreadCreate(_) => EventType::ThreadCreate,
            Self::ThreadUpdate(_) => EventType::ThreadUpdate,
            Self::ThreadDelete(_) => EventType::ThreadDelete,
            Self::GuildCreate(_) => EventType::GuildCreate,
            Self::GuildUpdate(_) => EventType::GuildUpdate,
            Self::GuildDelete(_) => EventType::GuildDelete,
            Self::GuildMemberAdd(_) => EventType::GuildMemberAdd,
            Self::GuildMemberRemove(_) => EventType::GuildMemberRemove,
            Self::GuildMemberUpdate(_) => EventType::GuildMemberUpdate,
            Self::GuildMembersChunk(_) => EventType::GuildMembersChunk,
            Self::InteractionCreate(_) => EventType::InteractionCreate,
            Self::InviteCreate(_) => EventType::InviteCreate,
            Self::InviteDelete(_) => EventType::InviteDelete,
            Self::MessageCreate(_) => EventType::MessageCreate,
            Self::MessageUpdate(_) => EventType::MessageUpdate,
            Self::MessageDelete(_) => EventType::MessageDelete,
            Self::MessageDeleteBulk(_) => EventType::MessageDeleteBulk,
            Self::PresenceUpdate(_) => EventType::PresenceUpdate,
            Self::UserUpdate(_) => EventType::UserUpdate,
            Self::Unknown { .. } => EventType::Unknown,
        }
    }

    #[must_use]
    pub const fn is_message_event(&self) -> bool {
        matches!(
            self,
            Self::MessageCreate(_)
                | Self::MessageUpdate(_)
                | Self::MessageDelete(_)
                | Self::MessageDeleteBulk(_)
        )
    }

    #[must_use]
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            Self::ChannelCreate(c) | Self::ChannelUpdate(c) | Self::ChannelDelete(c) => {
                c.guild_id()
            }
            Self::ThreadCreate(c) | Self::ThreadUpdate(c) => c.guild_id(),
            Self::ThreadDelete(d) => d.guild_id,
            Self::ChannelPinsUpdate(p) => p.guild_id,
            Self::GuildCreate(g) => Some(g.id()),
            Self::GuildUpdate(g) => Some(g.id),
            Self::GuildDelete(g) => Some(g.id),
            Self::GuildMemberAdd(m) | Self::GuildMemberUpdate(m) => m.guild_id,
            Self::GuildMemberRemove(r) => Some(r.guild_id),
            Self::GuildMembersChunk(c) => Some(c.guild_id),
            Self::InteractionCreate(i) => i.guild_id(),
            Self::MessageCreate(m) | Self::MessageUpdate(m) => m.guild_id,
            Self::MessageDelete(d) => d.guild_id,
            Self::MessageDeleteBulk(d) => d.guild_id,
            Self::PresenceUpdate(p) => p.guild_id,
            _ => None,
        }
    }
}
