//! Interaction entity.

use serde::Deserialize;
use serde_json::Value;

use super::snowflake::snowflake;
use super::{
    ApplicationCommandData, Channel, ChannelId, GuildId, GuildMember, Message, ResolvedData, User,
};
use crate::domain::errors::DecodeError;

snowflake!(
    /// Unique identifier for an interaction.
    InteractionId
);

snowflake!(
    /// Unique identifier for an application.
    ApplicationId
);

/// Interaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Autocomplete,
    ModalSubmit,
}

impl TryFrom<u8> for InteractionType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Ping),
            2 => Ok(Self::ApplicationCommand),
            3 => Ok(Self::MessageComponent),
            4 => Ok(Self::Autocomplete),
            5 => Ok(Self::ModalSubmit),
            other => Err(DecodeError::UnknownInteractionType(other)),
        }
    }
}

/// Where an interaction was invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionContext {
    /// Invoked inside a guild.
    Guild {
        /// Guild the interaction came from.
        guild_id: GuildId,
        /// Invoking member, including its `user`.
        member: Box<GuildMember>,
        /// Permissions the app has in the channel.
        app_permissions: Option<String>,
        /// Guild's preferred locale.
        guild_locale: Option<String>,
    },
    /// Invoked in a DM or group DM.
    Dm {
        /// Invoking user.
        user: User,
    },
}

/// Data of a button or select menu interaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[allow(missing_docs)]
pub struct MessageComponentData {
    pub custom_id: String,
    pub component_type: u8,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub resolved: Option<ResolvedData>,
}

impl MessageComponentData {
    #[must_use]
    pub const fn is_button(&self) -> bool {
        self.component_type == 2
    }

    /// String, user, role, mentionable and channel selects.
    #[must_use]
    pub const fn is_select_menu(&self) -> bool {
        self.component_type == 3 || self.component_type >= 5
    }
}

/// Data of a submitted modal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[allow(missing_docs)]
pub struct ModalSubmitData {
    pub custom_id: String,
    #[serde(default)]
    pub components: Vec<Value>,
}

impl ModalSubmitData {
    /// Text input values by custom id, in submission order.
    #[must_use]
    pub fn text_values(&self) -> Vec<(&str, &str)> {
        self.components
            .iter()
            .filter_map(|row| row.get("components").and_then(Value::as_array))
            .flatten()
            .filter_map(|input| {
                let id = input.get("custom_id")?.as_str()?;
                let value = input.get("value")?.as_str()?;
                Some((id, value))
            })
            .collect()
    }

    #[must_use]
    pub fn text_value(&self, custom_id: &str) -> Option<&str> {
        self.text_values()
            .into_iter()
            .find_map(|(id, value)| (id == custom_id).then_some(value))
    }
}

/// Type-specific interaction data.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionData {
    /// Ping interactions carry nothing.
    None,
    /// Slash, context menu and autocomplete interactions.
    Command(Box<ApplicationCommandData>),
    /// Buttons and select menus.
    Component(MessageComponentData),
    /// Modal submissions.
    Modal(ModalSubmitData),
}

#[derive(Debug, Deserialize)]
struct RawInteraction {
    id: InteractionId,
    application_id: ApplicationId,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    guild_id: Option<GuildId>,
    #[serde(default)]
    channel: Option<Channel>,
    #[serde(default)]
    channel_id: Option<ChannelId>,
    #[serde(default)]
    member: Option<GuildMember>,
    #[serde(default)]
    user: Option<User>,
    token: String,
    #[serde(default)]
    version: u8,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    app_permissions: Option<String>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    guild_locale: Option<String>,
}

/// An interaction from `INTERACTION_CREATE`.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Interaction {
    pub id: InteractionId,
    pub application_id: ApplicationId,
    pub kind: InteractionType,
    /// Continuation token for responses, valid for 15 minutes.
    pub token: String,
    pub version: u8,
    pub channel: Option<Channel>,
    pub channel_id: Option<ChannelId>,
    /// Message a component was attached to.
    pub message: Option<Box<Message>>,
    /// Invoking user's locale.
    pub locale: Option<String>,
    pub context: InteractionContext,
    pub data: InteractionData,
}

impl Interaction {
    /// Decodes an `INTERACTION_CREATE` payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] for malformed payloads, unknown interaction
    /// types, or command options whose value does not match their type.
    pub fn decode(value: Value) -> Result<Self, DecodeError> {
        let raw: RawInteraction = serde_json::from_value(value)
            .map_err(|e| DecodeError::payload("INTERACTION_CREATE", e))?;
        let kind = InteractionType::try_from(raw.kind)?;

        let context = match raw.guild_id {
            Some(guild_id) => InteractionContext::Guild {
                guild_id,
                member: Box::new(raw.member.ok_or(DecodeError::MissingField("member"))?),
                app_permissions: raw.app_permissions,
                guild_locale: raw.guild_locale,
            },
            None => InteractionContext::Dm {
                user: raw.user.ok_or(DecodeError::MissingField("user"))?,
            },
        };

        let data = match (kind, raw.data) {
            (InteractionType::Ping, _) => InteractionData::None,
            (_, None) => return Err(DecodeError::MissingField("data")),
            (InteractionType::ApplicationCommand | InteractionType::Autocomplete, Some(data)) => {
                InteractionData::Command(Box::new(ApplicationCommandData::decode(data)?))
            }
            (InteractionType::MessageComponent, Some(data)) => InteractionData::Component(
                serde_json::from_value(data)
                    .map_err(|e| DecodeError::payload("message component data", e))?,
            ),
            (InteractionType::ModalSubmit, Some(data)) => InteractionData::Modal(
                serde_json::from_value(data)
                    .map_err(|e| DecodeError::payload("modal submit data", e))?,
            ),
        };

        Ok(Self {
            id: raw.id,
            application_id: raw.application_id,
            kind,
            token: raw.token,
            version: raw.version,
            channel: raw.channel,
            channel_id: raw.channel_id,
            message: raw.message.map(Box::new),
            locale: raw.locale,
            context,
            data,
        })
    }

    /// The invoking user, from the member in guilds.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match &self.context {
            InteractionContext::Guild { member, .. } => member.user.as_ref(),
            InteractionContext::Dm { user } => Some(user),
        }
    }

    #[must_use]
    pub const fn guild_id(&self) -> Option<GuildId> {
        match &self.context {
            InteractionContext::Guild { guild_id, .. } => Some(*guild_id),
            InteractionContext::Dm { .. } => None,
        }
    }

    #[must_use]
    pub fn member(&self) -> Option<&GuildMember> {
        match &self.context {
            InteractionContext::Guild { member, .. } => Some(&**member),
            InteractionContext::Dm { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_guild(&self) -> bool {
        matches!(self.context, InteractionContext::Guild { .. })
    }

    #[must_use]
    pub fn command(&self) -> Option<&ApplicationCommandData> {
        match &self.data {
            InteractionData::Command(data) => Some(&**data),
            _ => None,
        }
    }

    #[must_use]
    pub const fn component(&self) -> Option<&MessageComponentData> {
        match &self.data {
            InteractionData::Component(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub const fn modal(&self) -> Option<&ModalSubmitData> {
        match &self.data {
            InteractionData::Modal(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_autocomplete(&self) -> bool {
        matches!(self.kind, InteractionType::Autocomplete)
    }

    /// Channel the interaction was sent from.
    #[must_use]
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel_id.or_else(|| self.channel.as_ref().map(Channel::id))
    }
}
