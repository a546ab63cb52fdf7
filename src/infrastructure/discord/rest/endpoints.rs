//! REST endpoint catalogue.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};

use super::body::{FileUpload, percent_encode};
use super::client::RequestClient;
use super::dto::{CurrentApplication, GatewayBotInfo, GatewayInfo};
use super::error::RestResult;
use crate::domain::entities::{
    ApplicationId, Channel, ChannelId, CommandId, GuildId, GuildMember, InteractionId, Message,
    MessageId, RoleId, User, UserId,
};
use crate::infrastructure::discord::gateway::GatewayUrlSource;

/// Emoji used in reaction routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionEmoji<'a> {
    /// A unicode emoji, percent-encoded in the path.
    Unicode(&'a str),
    /// A guild emoji, sent as `name:id`.
    Custom {
        /// Emoji name.
        name: &'a str,
        /// Emoji id.
        id: u64,
    },
}

impl ReactionEmoji<'_> {
    fn path_segment(&self) -> String {
        match self {
            Self::Unicode(emoji) => percent_encode(emoji),
            Self::Custom { name, id } => format!("{name}:{id}"),
        }
    }
}

/// Pagination for the message history route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MessageQuery {
    pub around: Option<MessageId>,
    pub before: Option<MessageId>,
    pub after: Option<MessageId>,
    /// 1 to 100, server default 50.
    pub limit: Option<u8>,
}

impl MessageQuery {
    fn to_query_string(self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(id) = self.around {
            query.append_pair("around", &id.to_string());
        }
        if let Some(id) = self.before {
            query.append_pair("before", &id.to_string());
        }
        if let Some(id) = self.after {
            query.append_pair("after", &id.to_string());
        }
        if let Some(limit) = self.limit {
            query.append_pair("limit", &limit.clamp(1, 100).to_string());
        }

        let query = query.finish();
        if query.is_empty() {
            query
        } else {
            format!("?{query}")
        }
    }
}

fn reason_body(reason: Option<&str>) -> Option<Value> {
    reason.map(|reason| json!({ "reason": reason }))
}

fn with_reason(mut body: Value, reason: Option<&str>) -> Value {
    if let (Some(reason), Some(object)) = (reason, body.as_object_mut()) {
        object.insert("reason".to_string(), Value::from(reason));
    }
    body
}

impl RequestClient {
    // Gateway

    /// `GET /gateway`, unauthenticated.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_gateway(&self) -> RestResult<GatewayInfo> {
        self.request_unauthenticated(Method::GET, "gateway")
            .await?
            .json()
    }

    /// `GET /gateway/bot`. Fails with 401 for an invalid token.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_gateway_bot(&self) -> RestResult<GatewayBotInfo> {
        self.get("gateway/bot").await
    }

    // Users

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_current_user(&self) -> RestResult<User> {
        self.get("users/@me").await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_current_application(&self) -> RestResult<CurrentApplication> {
        self.get("applications/@me").await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_user(&self, user_id: UserId) -> RestResult<User> {
        self.get(&format!("users/{user_id}")).await
    }

    /// Opens (or returns the existing) DM channel with a user.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn create_dm(&self, recipient_id: UserId) -> RestResult<Channel> {
        self.post(
            "users/@me/channels",
            json!({ "recipient_id": recipient_id.to_string() }),
        )
        .await
    }

    // Application commands

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_global_commands(&self, application_id: ApplicationId) -> RestResult<Vec<Value>> {
        self.get(&format!("applications/{application_id}/commands"))
            .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn create_global_command(
        &self,
        application_id: ApplicationId,
        command: Value,
    ) -> RestResult<Value> {
        self.post(&format!("applications/{application_id}/commands"), command)
            .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_global_command(
        &self,
        application_id: ApplicationId,
        command_id: CommandId,
    ) -> RestResult<Value> {
        self.get(&format!(
            "applications/{application_id}/commands/{command_id}"
        ))
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn edit_global_command(
        &self,
        application_id: ApplicationId,
        command_id: CommandId,
        command: Value,
    ) -> RestResult<Value> {
        self.patch(
            &format!("applications/{application_id}/commands/{command_id}"),
            command,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn delete_global_command(
        &self,
        application_id: ApplicationId,
        command_id: CommandId,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("applications/{application_id}/commands/{command_id}"),
            None,
        )
        .await
    }

    /// Replaces every global command in one call.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn bulk_overwrite_global_commands(
        &self,
        application_id: ApplicationId,
        commands: Vec<Value>,
    ) -> RestResult<Vec<Value>> {
        self.put(
            &format!("applications/{application_id}/commands"),
            Value::Array(commands),
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_guild_commands(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
    ) -> RestResult<Vec<Value>> {
        self.get(&format!(
            "applications/{application_id}/guilds/{guild_id}/commands"
        ))
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn create_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        command: Value,
    ) -> RestResult<Value> {
        self.post(
            &format!("applications/{application_id}/guilds/{guild_id}/commands"),
            command,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        command_id: CommandId,
    ) -> RestResult<Value> {
        self.get(&format!(
            "applications/{application_id}/guilds/{guild_id}/commands/{command_id}"
        ))
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn edit_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        command_id: CommandId,
        command: Value,
    ) -> RestResult<Value> {
        self.patch(
            &format!("applications/{application_id}/guilds/{guild_id}/commands/{command_id}"),
            command,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn delete_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        command_id: CommandId,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("applications/{application_id}/guilds/{guild_id}/commands/{command_id}"),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn bulk_overwrite_guild_commands(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        commands: Vec<Value>,
    ) -> RestResult<Vec<Value>> {
        self.put(
            &format!("applications/{application_id}/guilds/{guild_id}/commands"),
            Value::Array(commands),
        )
        .await
    }

    // Interactions

    /// Answers an interaction. Must happen within 3 seconds of receipt.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn create_interaction_response(
        &self,
        interaction_id: InteractionId,
        token: &str,
        response: Value,
        files: Vec<FileUpload>,
    ) -> RestResult<()> {
        self.request(
            Method::POST,
            &format!("interactions/{interaction_id}/{token}/callback"),
            Some(response),
            files,
        )
        .await
        .map(|_| ())
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_original_response(
        &self,
        application_id: ApplicationId,
        token: &str,
    ) -> RestResult<Message> {
        self.get(&format!(
            "webhooks/{application_id}/{token}/messages/@original"
        ))
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn edit_original_response(
        &self,
        application_id: ApplicationId,
        token: &str,
        body: Value,
        files: Vec<FileUpload>,
    ) -> RestResult<Message> {
        self.request(
            Method::PATCH,
            &format!("webhooks/{application_id}/{token}/messages/@original"),
            Some(body),
            files,
        )
        .await?
        .json()
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn delete_original_response(
        &self,
        application_id: ApplicationId,
        token: &str,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("webhooks/{application_id}/{token}/messages/@original"),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn create_followup(
        &self,
        application_id: ApplicationId,
        token: &str,
        body: Value,
        files: Vec<FileUpload>,
    ) -> RestResult<Message> {
        self.request(
            Method::POST,
            &format!("webhooks/{application_id}/{token}"),
            Some(body),
            files,
        )
        .await?
        .json()
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_followup(
        &self,
        application_id: ApplicationId,
        token: &str,
        message_id: MessageId,
    ) -> RestResult<Message> {
        self.get(&format!(
            "webhooks/{application_id}/{token}/messages/{message_id}"
        ))
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn edit_followup(
        &self,
        application_id: ApplicationId,
        token: &str,
        message_id: MessageId,
        body: Value,
        files: Vec<FileUpload>,
    ) -> RestResult<Message> {
        self.request(
            Method::PATCH,
            &format!("webhooks/{application_id}/{token}/messages/{message_id}"),
            Some(body),
            files,
        )
        .await?
        .json()
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn delete_followup(
        &self,
        application_id: ApplicationId,
        token: &str,
        message_id: MessageId,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("webhooks/{application_id}/{token}/messages/{message_id}"),
            None,
        )
        .await
    }

    // Channels

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_channel(&self, channel_id: ChannelId) -> RestResult<Channel> {
        self.get(&format!("channels/{channel_id}")).await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn modify_channel(
        &self,
        channel_id: ChannelId,
        changes: Value,
        reason: Option<&str>,
    ) -> RestResult<Channel> {
        self.patch(&format!("channels/{channel_id}"), with_reason(changes, reason))
            .await
    }

    /// Deletes a guild channel or closes a DM.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn delete_channel(
        &self,
        channel_id: ChannelId,
        reason: Option<&str>,
    ) -> RestResult<Channel> {
        self.request(
            Method::DELETE,
            &format!("channels/{channel_id}"),
            reason_body(reason),
            Vec::new(),
        )
        .await?
        .json()
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_messages(
        &self,
        channel_id: ChannelId,
        query: MessageQuery,
    ) -> RestResult<Vec<Message>> {
        self.get(&format!(
            "channels/{channel_id}/messages{}",
            query.to_query_string()
        ))
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> RestResult<Message> {
        self.get(&format!("channels/{channel_id}/messages/{message_id}"))
            .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn create_message(
        &self,
        channel_id: ChannelId,
        body: Value,
        files: Vec<FileUpload>,
    ) -> RestResult<Message> {
        self.request(
            Method::POST,
            &format!("channels/{channel_id}/messages"),
            Some(body),
            files,
        )
        .await?
        .json()
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        body: Value,
        files: Vec<FileUpload>,
    ) -> RestResult<Message> {
        self.request(
            Method::PATCH,
            &format!("channels/{channel_id}/messages/{message_id}"),
            Some(body),
            files,
        )
        .await?
        .json()
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        reason: Option<&str>,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("channels/{channel_id}/messages/{message_id}"),
            reason_body(reason),
        )
        .await
    }

    /// Deletes 2 to 100 messages younger than two weeks.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn bulk_delete_messages(
        &self,
        channel_id: ChannelId,
        message_ids: &[MessageId],
        reason: Option<&str>,
    ) -> RestResult<()> {
        let body = json!({ "messages": message_ids });
        self.execute(
            Method::POST,
            &format!("channels/{channel_id}/messages/bulk-delete"),
            Some(with_reason(body, reason)),
        )
        .await
    }

    /// Publishes a message in an announcement channel to following channels.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn crosspost_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> RestResult<Message> {
        self.request(
            Method::POST,
            &format!("channels/{channel_id}/messages/{message_id}/crosspost"),
            None,
            Vec::new(),
        )
        .await?
        .json()
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn create_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: ReactionEmoji<'_>,
    ) -> RestResult<()> {
        self.execute(
            Method::PUT,
            &format!(
                "channels/{channel_id}/messages/{message_id}/reactions/{}/@me",
                emoji.path_segment()
            ),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn delete_own_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: ReactionEmoji<'_>,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!(
                "channels/{channel_id}/messages/{message_id}/reactions/{}/@me",
                emoji.path_segment()
            ),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn delete_user_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: ReactionEmoji<'_>,
        user_id: UserId,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!(
                "channels/{channel_id}/messages/{message_id}/reactions/{}/{user_id}",
                emoji.path_segment()
            ),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn delete_all_reactions(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("channels/{channel_id}/messages/{message_id}/reactions"),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_pinned_messages(&self, channel_id: ChannelId) -> RestResult<Vec<Message>> {
        self.get(&format!("channels/{channel_id}/pins")).await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn pin_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        reason: Option<&str>,
    ) -> RestResult<()> {
        self.execute(
            Method::PUT,
            &format!("channels/{channel_id}/pins/{message_id}"),
            reason_body(reason),
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn unpin_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        reason: Option<&str>,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("channels/{channel_id}/pins/{message_id}"),
            reason_body(reason),
        )
        .await
    }

    /// Shows the typing indicator for about 10 seconds.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn trigger_typing(&self, channel_id: ChannelId) -> RestResult<()> {
        self.execute(Method::POST, &format!("channels/{channel_id}/typing"), None)
            .await
    }

    // Threads

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn start_thread_from_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        options: Value,
    ) -> RestResult<Channel> {
        self.post(
            &format!("channels/{channel_id}/messages/{message_id}/threads"),
            options,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn start_thread(&self, channel_id: ChannelId, options: Value) -> RestResult<Channel> {
        self.post(&format!("channels/{channel_id}/threads"), options)
            .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn join_thread(&self, thread_id: ChannelId) -> RestResult<()> {
        self.execute(
            Method::PUT,
            &format!("channels/{thread_id}/thread-members/@me"),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn leave_thread(&self, thread_id: ChannelId) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("channels/{thread_id}/thread-members/@me"),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn add_thread_member(&self, thread_id: ChannelId, user_id: UserId) -> RestResult<()> {
        self.execute(
            Method::PUT,
            &format!("channels/{thread_id}/thread-members/{user_id}"),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn remove_thread_member(
        &self,
        thread_id: ChannelId,
        user_id: UserId,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("channels/{thread_id}/thread-members/{user_id}"),
            None,
        )
        .await
    }

    /// Returns `{threads, members}` for all active threads in a guild.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_active_guild_threads(&self, guild_id: GuildId) -> RestResult<Value> {
        self.get(&format!("guilds/{guild_id}/threads/active")).await
    }

    // Guild members

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn get_guild_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> RestResult<GuildMember> {
        self.get(&format!("guilds/{guild_id}/members/{user_id}"))
            .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn modify_guild_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        changes: Value,
        reason: Option<&str>,
    ) -> RestResult<GuildMember> {
        self.patch(
            &format!("guilds/{guild_id}/members/{user_id}"),
            with_reason(changes, reason),
        )
        .await
    }

    /// Kicks a member.
    ///
    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn remove_guild_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: Option<&str>,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("guilds/{guild_id}/members/{user_id}"),
            reason_body(reason),
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn add_member_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: Option<&str>,
    ) -> RestResult<()> {
        self.execute(
            Method::PUT,
            &format!("guilds/{guild_id}/members/{user_id}/roles/{role_id}"),
            reason_body(reason),
        )
        .await
    }

    /// # Errors
    /// Returns a [`RestError`](super::RestError) if the request fails.
    pub async fn remove_member_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: Option<&str>,
    ) -> RestResult<()> {
        self.execute(
            Method::DELETE,
            &format!("guilds/{guild_id}/members/{user_id}/roles/{role_id}"),
            reason_body(reason),
        )
        .await
    }
}

#[async_trait]
impl GatewayUrlSource for RequestClient {
    async fn gateway_url(&self) -> RestResult<String> {
        Ok(self.get_gateway_bot().await?.url)
    }
}
