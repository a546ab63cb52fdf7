//! The bot client façade.
//!
//! [`Client`] ties the gateway session, the REST client and the listener
//! registry together. Listeners and commands are registered on the
//! [`ClientBuilder`]; [`Client::login`] connects and resolves once the session
//! is ready, [`Client::wait`] resolves when the gateway stops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::dto::{CommandChoice, CommandDefinition, InteractionResponse, MessageOptions};
use super::error::ClientError;
use super::services::ListenerRegistry;
use super::use_cases::{CommandRegistrar, RegisterCommandsUseCase};
use crate::domain::entities::{
    ApplicationId, BotToken, Channel, ChannelId, GuildId, GuildMember, Interaction, Message,
    MessageId, User, UserId,
};
use crate::domain::events::{Event, EventType, Ready};
use crate::domain::ports::{CommandHandler, EventHandler};
use crate::infrastructure::discord::gateway::{
    EventTranslator, GatewayClient, GatewayClientConfig, GatewayCommand, GatewayError,
    GatewayEventKind, GatewayIntents, GatewayUrlSource, PresenceUpdate, RequestGuildMembers,
    TransportFactory,
};
use crate::infrastructure::discord::rest::{ReactionEmoji, RequestClient};

/// Who the bot is, captured from the first `READY`.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user: User,
    pub session_id: String,
    pub application_id: ApplicationId,
}

/// Result of [`Client::ping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    /// Round trip of an unauthenticated REST call.
    pub rest: Duration,
    /// Last heartbeat round trip, `None` before the first ACK.
    pub gateway: Option<Duration>,
}

struct ClientInner {
    rest: Arc<RequestClient>,
    gateway: tokio::sync::Mutex<GatewayClient>,
    registrar: Arc<dyn CommandRegistrar>,
    registry: ListenerRegistry<Client>,
    identity: RwLock<Option<Identity>>,
    latency: RwLock<Option<Duration>>,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<Result<(), ClientError>>>>,
}

/// A Discord bot session. Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

/// Configures a [`Client`] before it connects.
pub struct ClientBuilder {
    gateway_config: GatewayClientConfig,
    registry: ListenerRegistry<Client>,
    rest_base_url: Option<String>,
    url_source: Option<Arc<dyn GatewayUrlSource>>,
    transport_factory: Option<TransportFactory>,
    registrar: Option<Arc<dyn CommandRegistrar>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            gateway_config: GatewayClientConfig::default(),
            registry: ListenerRegistry::new(),
            rest_base_url: None,
            url_source: None,
            transport_factory: None,
            registrar: None,
        }
    }
}

impl ClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every gateway setting at once, e.g. from a config file.
    #[must_use]
    pub fn gateway_config(mut self, config: GatewayClientConfig) -> Self {
        self.gateway_config = config;
        self
    }

    #[must_use]
    pub fn intents(mut self, intents: GatewayIntents) -> Self {
        self.gateway_config = self.gateway_config.with_intents(intents);
        self
    }

    /// Presence sent with Identify.
    #[must_use]
    pub fn presence(mut self, presence: PresenceUpdate) -> Self {
        self.gateway_config = self.gateway_config.with_presence(presence);
        self
    }

    #[must_use]
    pub fn compression(mut self, enabled: bool) -> Self {
        self.gateway_config = self.gateway_config.with_compression(enabled);
        self
    }

    #[must_use]
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.gateway_config = self.gateway_config.with_auto_reconnect(enabled);
        self
    }

    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.gateway_config = self.gateway_config.with_max_reconnect_attempts(attempts);
        self
    }

    /// Adds an event listener. `EventType::Raw` listeners see every
    /// dispatch before translation.
    #[must_use]
    pub fn on<H: EventHandler<Client> + 'static>(mut self, event_type: EventType, handler: H) -> Self {
        self.registry.on(event_type, handler);
        self
    }

    /// Adds a command, registered with Discord after the first `READY`.
    #[must_use]
    pub fn command<H: CommandHandler<Client> + 'static>(
        mut self,
        definition: CommandDefinition,
        handler: H,
    ) -> Self {
        self.registry.command(definition, handler);
        self
    }

    /// Points the REST client at another API root.
    #[must_use]
    pub fn rest_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.rest_base_url = Some(base_url.into());
        self
    }

    /// Replaces the `GET /gateway/bot` lookup.
    #[must_use]
    pub fn with_gateway_url_source(mut self, source: Arc<dyn GatewayUrlSource>) -> Self {
        self.url_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_transport_factory(mut self, factory: TransportFactory) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    /// Replaces the endpoints used for command registration.
    #[must_use]
    pub fn with_registrar(mut self, registrar: Arc<dyn CommandRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    /// # Errors
    ///
    /// Returns `ClientError::Rest` if the HTTP client cannot be created.
    pub fn build(self) -> Result<Client, ClientError> {
        let rest = Arc::new(match &self.rest_base_url {
            Some(base_url) => RequestClient::with_base_url(base_url, None)?,
            None => RequestClient::new(None)?,
        });

        let url_source = self
            .url_source
            .unwrap_or_else(|| rest.clone() as Arc<dyn GatewayUrlSource>);
        let registrar = self
            .registrar
            .unwrap_or_else(|| rest.clone() as Arc<dyn CommandRegistrar>);

        let mut gateway = GatewayClient::new(self.gateway_config, url_source);
        if let Some(factory) = self.transport_factory {
            gateway = gateway.with_transport_factory(factory);
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                rest,
                gateway: tokio::sync::Mutex::new(gateway),
                registrar,
                registry: self.registry,
                identity: RwLock::new(None),
                latency: RwLock::new(None),
                started: AtomicBool::new(false),
                task: Mutex::new(None),
            }),
        })
    }
}

impl Client {
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connects to the gateway and resolves once `READY` arrived and the
    /// registered commands were published.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for an empty or malformed token.
    /// - `AlreadyLoggedIn` on a second call.
    /// - The gateway's fatal error (e.g. close code 4004) if it stops before `READY`.
    /// - `Registration` if publishing commands failed; the client is closed.
    pub async fn login(&self, token: &str) -> Result<(), ClientError> {
        let token = BotToken::new(token).ok_or(ClientError::InvalidToken)?;
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyLoggedIn);
        }

        info!("Logging in");
        self.inner.rest.set_token(Some(token.clone()));

        let events = self
            .inner
            .gateway
            .lock()
            .await
            .connect(token)
            .map_err(|e| match e {
                GatewayError::AlreadyConnected => ClientError::AlreadyLoggedIn,
                other => other.into(),
            })?;

        let (ready_tx, ready_rx) = oneshot::channel();
        let handle = tokio::spawn(self.clone().run_events(events, ready_tx));
        *self.inner.task.lock() = Some(handle);

        match ready_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.close().await;
                Err(e)
            }
            // The event loop ended before READY; its result says why.
            Err(_) => match self.wait().await {
                Ok(()) => Err(ClientError::Closed),
                Err(e) => Err(e),
            },
        }
    }

    /// Resolves when the gateway stops: `Ok` after [`close`](Self::close),
    /// the fatal error otherwise. Returns immediately if nothing is running.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the gateway.
    pub async fn wait(&self) -> Result<(), ClientError> {
        let handle = self.inner.task.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };

        match handle.await {
            Ok(result) => result,
            Err(e) => Err(GatewayError::Panicked {
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Closes the socket with code 1000 and stops reconnecting.
    pub async fn close(&self) {
        info!("Closing client");
        self.inner.gateway.lock().await.shutdown().await;
        self.inner.rest.set_token(None);
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.identity.read().clone()
    }

    /// The bot user. `None` before `READY`.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.identity.read().as_ref().map(|identity| identity.user.clone())
    }

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`.
    pub fn application_id(&self) -> Result<ApplicationId, ClientError> {
        self.inner
            .identity
            .read()
            .as_ref()
            .map(|identity| identity.application_id)
            .ok_or(ClientError::NotReady)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.identity.read().is_some()
    }

    /// Last heartbeat round trip.
    #[must_use]
    pub fn latency(&self) -> Option<Duration> {
        *self.inner.latency.read()
    }

    /// Direct access to every REST endpoint.
    #[must_use]
    pub fn rest(&self) -> &RequestClient {
        &self.inner.rest
    }

    /// # Errors
    ///
    /// Returns `ClientError::Rest` if the round trip fails.
    pub async fn ping(&self) -> Result<Ping, ClientError> {
        let started = Instant::now();
        self.inner.rest.get_gateway().await?;
        Ok(Ping {
            rest: started.elapsed(),
            gateway: self.latency(),
        })
    }

    /// Updates the bot's presence. Also used for the next Identify.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Gateway` if the gateway is not running.
    pub async fn set_presence(&self, presence: PresenceUpdate) -> Result<(), ClientError> {
        self.send_command(GatewayCommand::UpdatePresence(presence))
            .await
    }

    /// Asks for member chunks; they arrive as `GuildMembersChunk` events.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Gateway` if the gateway is not running.
    pub async fn request_guild_members(
        &self,
        request: RequestGuildMembers,
    ) -> Result<(), ClientError> {
        self.send_command(GatewayCommand::RequestGuildMembers(request))
            .await
    }

    async fn send_command(&self, command: GatewayCommand) -> Result<(), ClientError> {
        self.inner
            .gateway
            .lock()
            .await
            .send_command(command)
            .await
            .map_err(Into::into)
    }

    fn require_ready(&self) -> Result<(), ClientError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ClientError::NotReady)
        }
    }

    // Messages

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn send_message(
        &self,
        channel_id: ChannelId,
        options: impl Into<MessageOptions>,
    ) -> Result<Message, ClientError> {
        self.require_ready()?;
        let (body, files) = options.into().into_parts();
        Ok(self.inner.rest.create_message(channel_id, body, files).await?)
    }

    /// Sends a message referencing `message` in the same channel.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn reply(
        &self,
        message: &Message,
        options: impl Into<MessageOptions>,
    ) -> Result<Message, ClientError> {
        let options = options.into().reply_to(message.id);
        self.send_message(message.channel_id, options).await
    }

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        options: impl Into<MessageOptions>,
    ) -> Result<Message, ClientError> {
        self.require_ready()?;
        let (body, files) = options.into().into_parts();
        Ok(self
            .inner
            .rest
            .edit_message(channel_id, message_id, body, files)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        reason: Option<&str>,
    ) -> Result<(), ClientError> {
        self.require_ready()?;
        Ok(self
            .inner
            .rest
            .delete_message(channel_id, message_id, reason)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn react(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: ReactionEmoji<'_>,
    ) -> Result<(), ClientError> {
        self.require_ready()?;
        Ok(self
            .inner
            .rest
            .create_reaction(channel_id, message_id, emoji)
            .await?)
    }

    /// Publishes an announcement channel message to following channels.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn crosspost(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<Message, ClientError> {
        self.require_ready()?;
        Ok(self
            .inner
            .rest
            .crosspost_message(channel_id, message_id)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn pin(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        reason: Option<&str>,
    ) -> Result<(), ClientError> {
        self.require_ready()?;
        Ok(self
            .inner
            .rest
            .pin_message(channel_id, message_id, reason)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn unpin(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        reason: Option<&str>,
    ) -> Result<(), ClientError> {
        self.require_ready()?;
        Ok(self
            .inner
            .rest
            .unpin_message(channel_id, message_id, reason)
            .await?)
    }

    // Channels

    /// Starts a thread on `message_id`, or a public thread without a
    /// starter message when it is `None`.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn start_thread(
        &self,
        channel_id: ChannelId,
        message_id: Option<MessageId>,
        name: &str,
        auto_archive_minutes: Option<u32>,
    ) -> Result<Channel, ClientError> {
        self.require_ready()?;
        let mut options = json!({ "name": name });
        if let (Some(minutes), Some(object)) = (auto_archive_minutes, options.as_object_mut()) {
            object.insert("auto_archive_duration".to_string(), Value::from(minutes));
        }

        let channel = match message_id {
            Some(message_id) => {
                self.inner
                    .rest
                    .start_thread_from_message(channel_id, message_id, options)
                    .await?
            }
            None => {
                if let Some(object) = options.as_object_mut() {
                    object.insert("type".to_string(), Value::from(11));
                }
                self.inner.rest.start_thread(channel_id, options).await?
            }
        };
        Ok(channel)
    }

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn fetch_channel(&self, channel_id: ChannelId) -> Result<Channel, ClientError> {
        self.require_ready()?;
        Ok(self.inner.rest.get_channel(channel_id).await?)
    }

    // Interaction responses

    async fn respond(
        &self,
        interaction: &Interaction,
        response: InteractionResponse,
    ) -> Result<(), ClientError> {
        self.require_ready()?;
        let (body, files) = response.into_parts();
        Ok(self
            .inner
            .rest
            .create_interaction_response(interaction.id, &interaction.token, body, files)
            .await?)
    }

    /// Answers with a message (callback type 4).
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn reply_interaction(
        &self,
        interaction: &Interaction,
        options: impl Into<MessageOptions>,
    ) -> Result<(), ClientError> {
        self.respond(interaction, InteractionResponse::reply(options.into()))
            .await
    }

    /// Shows "thinking..." (callback type 5); finish with [`edit_reply`](Self::edit_reply).
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn defer_reply(
        &self,
        interaction: &Interaction,
        ephemeral: bool,
    ) -> Result<(), ClientError> {
        self.respond(interaction, InteractionResponse::defer(ephemeral))
            .await
    }

    /// Acknowledges a component without changing its message (callback type 6).
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn defer_component_reply(&self, interaction: &Interaction) -> Result<(), ClientError> {
        self.respond(interaction, InteractionResponse::defer_update())
            .await
    }

    /// Edits the message a component is attached to (callback type 7).
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn update_components(
        &self,
        interaction: &Interaction,
        options: impl Into<MessageOptions>,
    ) -> Result<(), ClientError> {
        self.respond(interaction, InteractionResponse::update(options.into()))
            .await
    }

    /// Answers an autocomplete interaction (callback type 8).
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn show_choices(
        &self,
        interaction: &Interaction,
        choices: Vec<CommandChoice>,
    ) -> Result<(), ClientError> {
        self.respond(interaction, InteractionResponse::choices(choices))
            .await
    }

    /// Opens a modal (callback type 9).
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn show_modal(
        &self,
        interaction: &Interaction,
        custom_id: &str,
        title: &str,
        components: Vec<Value>,
    ) -> Result<(), ClientError> {
        self.respond(
            interaction,
            InteractionResponse::modal(custom_id, title, components),
        )
        .await
    }

    // Follow-ups

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn follow_up(
        &self,
        interaction: &Interaction,
        options: impl Into<MessageOptions>,
    ) -> Result<Message, ClientError> {
        let application_id = self.application_id()?;
        let (body, files) = options.into().into_parts();
        Ok(self
            .inner
            .rest
            .create_followup(application_id, &interaction.token, body, files)
            .await?)
    }

    /// Edits the original response.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn edit_reply(
        &self,
        interaction: &Interaction,
        options: impl Into<MessageOptions>,
    ) -> Result<Message, ClientError> {
        let application_id = self.application_id()?;
        let (body, files) = options.into().into_parts();
        Ok(self
            .inner
            .rest
            .edit_original_response(application_id, &interaction.token, body, files)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn edit_follow_up(
        &self,
        interaction: &Interaction,
        message_id: MessageId,
        options: impl Into<MessageOptions>,
    ) -> Result<Message, ClientError> {
        let application_id = self.application_id()?;
        let (body, files) = options.into().into_parts();
        Ok(self
            .inner
            .rest
            .edit_followup(application_id, &interaction.token, message_id, body, files)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn delete_reply(&self, interaction: &Interaction) -> Result<(), ClientError> {
        let application_id = self.application_id()?;
        Ok(self
            .inner
            .rest
            .delete_original_response(application_id, &interaction.token)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn delete_follow_up(
        &self,
        interaction: &Interaction,
        message_id: MessageId,
    ) -> Result<(), ClientError> {
        let application_id = self.application_id()?;
        Ok(self
            .inner
            .rest
            .delete_followup(application_id, &interaction.token, message_id)
            .await?)
    }

    // Members

    /// Applies `changes` (nick, roles, mute, deaf, channel_id,
    /// communication_disabled_until) to a member.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before `READY`, or the REST error.
    pub async fn modify_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        changes: Value,
        reason: Option<&str>,
    ) -> Result<GuildMember, ClientError> {
        self.require_ready()?;
        Ok(self
            .inner
            .rest
            .modify_guild_member(guild_id, user_id, changes, reason)
            .await?)
    }

    // Event loop

    async fn run_events(
        self,
        mut events: mpsc::UnboundedReceiver<GatewayEventKind>,
        ready_tx: oneshot::Sender<Result<(), ClientError>>,
    ) -> Result<(), ClientError> {
        let mut ready_tx = Some(ready_tx);

        while let Some(event) = events.recv().await {
            match event {
                GatewayEventKind::Dispatch(raw) => {
                    let registry = &self.inner.registry;
                    if registry.has_listeners(EventType::Raw) {
                        registry.emit(&self, &Event::Raw(raw.clone())).await;
                    }

                    let event_type = raw.event_type.clone();
                    let event = match EventTranslator::translate(raw) {
                        Ok(event) => event,
                        Err(e) => {
                            warn!(event = %event_type, error = %e, "Dropping undecodable dispatch");
                            continue;
                        }
                    };

                    match &event {
                        Event::Ready(ready) => {
                            self.set_identity(ready);
                            if let Some(tx) = ready_tx.take() {
                                let setup = self.register_commands().await;
                                let _ = tx.send(setup);
                            }
                        }
                        Event::InteractionCreate(interaction) => {
                            registry.run_command(&self, interaction).await;
                        }
                        _ => {}
                    }

                    registry.emit(&self, &event).await;
                }
                GatewayEventKind::HeartbeatAck { latency_ms } => {
                    *self.inner.latency.write() = Some(Duration::from_millis(latency_ms));
                }
                GatewayEventKind::Fatal(e) => return Err(e.into()),
                GatewayEventKind::Stopped => {
                    debug!("Gateway stopped");
                    return Ok(());
                }
                other => trace!(event = ?other, "Gateway event"),
            }
        }

        Ok(())
    }

    /// Captures the identity at the first `READY`; later sessions keep it.
    fn set_identity(&self, ready: &Ready) {
        let mut identity = self.inner.identity.write();
        if identity.is_some() {
            debug!(session_id = %ready.session_id, "New session, identity unchanged");
            return;
        }

        info!(
            user = %ready.user.username(),
            application_id = %ready.application.id,
            guilds = ready.guilds.len(),
            "Client ready"
        );
        *identity = Some(Identity {
            user: ready.user.clone(),
            session_id: ready.session_id.clone(),
            application_id: ready.application.id,
        });
    }

    async fn register_commands(&self) -> Result<(), ClientError> {
        if self.inner.registry.command_count() == 0 {
            return Ok(());
        }
        let application_id = self.application_id()?;
        RegisterCommandsUseCase::new(self.inner.registrar.clone())
            .execute(application_id, self.inner.registry.definitions())
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::use_cases::MockCommandRegistrar;
    use crate::domain::HandlerResult;
    use crate::infrastructure::discord::gateway::MockGatewayUrlSource;
    use crate::infrastructure::discord::gateway::testing::{
        Step, dispatch, hello, ready, scripted_factory,
    };
    use crate::infrastructure::discord::rest::RestError;

    const TOKEN: &str = "token.value.here";

    fn url_source() -> Arc<dyn GatewayUrlSource> {
        let mut source = MockGatewayUrlSource::new();
        source
            .expect_gateway_url()
            .returning(|| Ok("wss://gw".to_string()));
        Arc::new(source)
    }

    fn builder(scripts: Vec<Vec<Step>>) -> ClientBuilder {
        let (factory, _log) = scripted_factory(scripts);
        Client::builder()
            .rest_base_url("http://127.0.0.1:9/api/v10")
            .with_gateway_url_source(url_source())
            .with_transport_factory(factory)
    }

    fn message_create(sequence: u64) -> Step {
        dispatch(
            sequence,
            "MESSAGE_CREATE",
            json!({
                "id": "10",
                "channel_id": "20",
                "author": { "id": "40", "username": "someone" },
                "content": "hello"
            }),
        )
    }

    fn ping_command(sequence: u64) -> Step {
        dispatch(
            sequence,
            "INTERACTION_CREATE",
            json!({
                "id": "1",
                "application_id": "200",
                "type": 2,
                "token": "tok",
                "user": { "id": "40", "username": "someone" },
                "data": { "id": "5", "name": "ping", "type": 1 }
            }),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_captures_identity() {
        let client = builder(vec![vec![hello(41_250), ready(1, "abc", "wss://x")]])
            .build()
            .unwrap();
        assert!(!client.is_ready());

        client.login(TOKEN).await.unwrap();

        let identity = client.identity().unwrap();
        assert_eq!(identity.session_id, "abc");
        assert_eq!(identity.user.id(), UserId(100));
        assert_eq!(client.application_id().unwrap(), ApplicationId(200));

        client.close().await;
        client.wait().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_listeners_and_commands_receive_dispatches() {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let raw_tx = tx.clone();
        let message_tx = tx.clone();
        let command_tx = tx;

        let mut registrar = MockCommandRegistrar::new();
        registrar
            .expect_overwrite_global_commands()
            .times(1)
            .returning(|_, _| Ok(()));

        let client = builder(vec![vec![
            hello(41_250),
            ready(1, "abc", "wss://x"),
            message_create(2),
            ping_command(3),
            dispatch(4, "TYPING_START", json!({ "channel_id": "20" })),
        ]])
        .with_registrar(Arc::new(registrar))
        .on(EventType::Raw, move |_client: Client, event: Event| {
            let tx = raw_tx.clone();
            async move {
                if let Event::Raw(raw) = event {
                    let _ = tx.send(format!("raw {}", raw.event_type));
                }
                HandlerResult::Ok(())
            }
        })
        .on(EventType::MessageCreate, move |client: Client, event: Event| {
            let tx = message_tx.clone();
            async move {
                assert!(client.is_ready());
                if let Event::MessageCreate(message) = event {
                    let _ = tx.send(format!("message {}", message.content));
                }
                HandlerResult::Ok(())
            }
        })
        .command(
            CommandDefinition::slash("ping", "Latency"),
            move |_client: Client, interaction: Interaction| {
                let tx = command_tx.clone();
                async move {
                    let name = interaction.command().map(|c| c.name.clone()).unwrap_or_default();
                    let _ = tx.send(format!("command {name}"));
                    HandlerResult::Ok(())
                }
            },
        )
        .build()
        .unwrap();

        client.login(TOKEN).await.unwrap();

        let mut seen = Vec::new();
        while seen.len() < 6 {
            seen.push(rx.recv().await.unwrap());
        }
        assert_eq!(
            seen,
            vec![
                "raw READY",
                "raw MESSAGE_CREATE",
                "message hello",
                "raw INTERACTION_CREATE",
                "command ping",
                "raw TYPING_START",
            ]
        );

        client.close().await;
        client.wait().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_before_ready_fails_login() {
        let client = builder(vec![vec![hello(41_250), Step::Close(Some(4004))]])
            .build()
            .unwrap();

        let err = client.login(TOKEN).await.unwrap_err();

        assert!(err.is_authentication_failure(), "unexpected error: {err:?}");
        assert!(!client.is_ready());
        client.wait().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_close_after_ready_ends_wait() {
        let client = builder(vec![vec![
            hello(41_250),
            ready(1, "abc", "wss://x"),
            Step::Close(Some(4014)),
        ]])
        .build()
        .unwrap();

        client.login(TOKEN).await.unwrap();
        let err = client.wait().await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Gateway(GatewayError::Closed { code: 4014, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_is_kept_across_sessions() {
        let client = builder(vec![
            vec![hello(41_250), ready(1, "abc", "wss://x"), Step::Close(Some(1000))],
            vec![hello(41_250), ready(1, "def", "wss://y"), Step::Close(Some(4014))],
        ])
        .build()
        .unwrap();

        client.login(TOKEN).await.unwrap();
        assert!(client.wait().await.is_err());

        assert_eq!(client.identity().unwrap().session_id, "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_failure_fails_login_and_closes() {
        let mut registrar = MockCommandRegistrar::new();
        registrar
            .expect_create_guild_command()
            .returning(|_, _, _| Err(RestError::from_response(403, br#"{"code":50001}"#)));

        let (factory, log) = scripted_factory(vec![vec![hello(41_250), ready(1, "abc", "wss://x")]]);
        let client = Client::builder()
            .rest_base_url("http://127.0.0.1:9/api/v10")
            .with_gateway_url_source(url_source())
            .with_transport_factory(factory)
            .with_registrar(Arc::new(registrar))
            .command(
                CommandDefinition::slash("debug", "Internal").in_guilds(vec![GuildId(1)]),
                |_client: Client, _interaction: Interaction| async move { HandlerResult::Ok(()) },
            )
            .build()
            .unwrap();

        let err = client.login(TOKEN).await.unwrap_err();
        assert!(matches!(err, ClientError::Registration { ref failures } if failures.len() == 1));

        client.wait().await.unwrap();
        assert_eq!(log.lock().closes, vec![1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_follows_heartbeat_ack() {
        let client = builder(vec![vec![
            hello(1_000),
            ready(1, "abc", "wss://x"),
            Step::Wait(Duration::from_millis(1_010)),
            Step::Frame(json!({ "op": 11 })),
        ]])
        .build()
        .unwrap();

        client.login(TOKEN).await.unwrap();
        while client.latency().is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        client.close().await;
        client.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_login_rejects_bad_token_and_second_call() {
        let client = builder(vec![vec![hello(41_250), Step::Close(Some(4004))]])
            .build()
            .unwrap();

        assert!(matches!(client.login("  ").await, Err(ClientError::InvalidToken)));

        let _ = client.login(TOKEN).await;
        assert!(matches!(
            client.login(TOKEN).await,
            Err(ClientError::AlreadyLoggedIn)
        ));
    }

    #[tokio::test]
    async fn test_outbound_actions_need_ready() {
        let client = builder(Vec::new()).build().unwrap();

        assert!(matches!(
            client.send_message(ChannelId(1), "hi").await,
            Err(ClientError::NotReady)
        ));
        assert!(matches!(
            client.fetch_channel(ChannelId(1)).await,
            Err(ClientError::NotReady)
        ));
        assert!(matches!(
            client.modify_member(GuildId(1), UserId(2), json!({ "nick": "x" }), None).await,
            Err(ClientError::NotReady)
        ));
        assert!(matches!(client.application_id(), Err(ClientError::NotReady)));
    }

    #[tokio::test]
    async fn test_wait_without_login_returns_immediately() {
        let client = builder(Vec::new()).build().unwrap();
        client.wait().await.unwrap();
        assert!(matches!(
            client.set_presence(PresenceUpdate::default()).await,
            Err(ClientError::Gateway(GatewayError::NotConnected))
        ));
    }
}
