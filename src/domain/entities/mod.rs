//! Domain entity definitions.

mod snowflake;

mod channel;
mod command_options;
mod guild;
mod interaction;
mod member;
mod message;
mod presence;
mod role;
mod token;
mod user;

pub use channel::{
    CategoryChannel, Channel, ChannelBase, ChannelFlags, ChannelId, ChannelKind,
    ChannelPinsUpdate, DmChannel, ForumChannel, GenericGuildChannel, GroupDmChannel,
    GuildChannelFields, OverwriteType, PermissionOverwrite, RawChannel, TextChannel,
    ThreadChannel, ThreadMember, ThreadMetadata, VoiceChannel,
};
pub use command_options::{
    ApplicationCommandData, CommandId, CommandOptions, CommandType, FocusedOption, ResolvedData,
    option_type,
};
pub use guild::{AnyGuild, Guild, GuildId, NewGuild, PremiumTier, UnavailableGuild, VerificationLevel};
pub use interaction::{
    ApplicationId, Interaction, InteractionContext, InteractionData, InteractionId,
    InteractionType, MessageComponentData, ModalSubmitData,
};
pub use member::{GuildMember, GuildMemberRemove, GuildMembersChunk};
pub use message::{
    Attachment, AttachmentId, MentionChannel, Message, MessageDelete, MessageDeleteBulk,
    MessageFlags, MessageId, MessageKind, MessageReference, WebhookId,
};
pub use presence::{Activity, ActivityType, Presence, PresenceStatus, PresenceUser};
pub use role::{Role, RoleId};
pub use token::BotToken;
pub use user::{CDN_URL, PremiumType, User, UserFlags, UserId};
