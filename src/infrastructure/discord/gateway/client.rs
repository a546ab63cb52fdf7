use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::connection::{ConnectionOptions, GatewayConnection};
use super::constants::{
    CLOSE_GOING_AWAY, GATEWAY_VERSION, GatewayIntents, MAX_RECONNECT_ATTEMPTS,
    RECONNECT_DELAY_BASE, RECONNECT_DELAY_MAX, RECONNECT_JITTER_MAX,
};
use super::error::{GatewayError, GatewayResult, close_allows_resume};
use super::events::{CloseEvent, GatewayCommand, GatewayEventKind};
use super::payloads::PresenceUpdate;
use super::session::SessionState;
use super::transport::{TransportFactory, WebSocketTransport};
use crate::domain::entities::BotToken;
use crate::infrastructure::discord::rest::RestResult;

/// Looks up the gateway WebSocket URL, normally via `GET /gateway/bot`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayUrlSource: Send + Sync {
    async fn gateway_url(&self) -> RestResult<String>;
}

pub struct GatewayClientConfig {
    pub intents: GatewayIntents,
    pub presence: Option<PresenceUpdate>,
    /// Ask for `compress=zlib-stream` transport compression.
    pub compress: bool,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
}

impl Default for GatewayClientConfig {
    fn default() -> Self {
        Self {
            intents: GatewayIntents::default_bot(),
            presence: None,
            compress: false,
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl GatewayClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_intents(mut self, intents: GatewayIntents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub fn with_presence(mut self, presence: PresenceUpdate) -> Self {
        self.presence = Some(presence);
        self
    }

    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

/// What to do after a socket ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Reconnect to the resume URL and send Resume.
    Resume,
    /// Drop the session and Identify on the bot gateway URL.
    Identify,
    /// The application closed the gateway.
    Stop,
    /// The close code forbids reconnecting.
    Fatal(u16),
}

/// Close policy.
///
/// A user close stops. No code, 1001 and the resumable 4000-4009 range
/// resume when a session exists. 4004 and 4010-4014 are fatal. Anything
/// else, a server-sent 1000 included, starts a fresh session.
#[must_use]
pub fn reconnect_action(close: &CloseEvent, has_session: bool) -> ReconnectAction {
    if close.is_user_requested() {
        return ReconnectAction::Stop;
    }

    match close.code {
        None => resume_or_identify(has_session),
        Some(code) if code == CLOSE_GOING_AWAY || close_allows_resume(code) => {
            resume_or_identify(has_session)
        }
        Some(code) if code == 4004 || (4010..=4014).contains(&code) => {
            ReconnectAction::Fatal(code)
        }
        Some(_) => ReconnectAction::Identify,
    }
}

const fn resume_or_identify(has_session: bool) -> ReconnectAction {
    if has_session {
        ReconnectAction::Resume
    } else {
        ReconnectAction::Identify
    }
}

/// Appends the pinned version and encoding to a gateway base URL.
#[must_use]
pub fn gateway_url(base: &str, compress: bool) -> String {
    let base = base.split('?').next().unwrap_or(base).trim_end_matches('/');
    let mut url = format!("{base}/?v={GATEWAY_VERSION}&encoding=json");
    if compress {
        url.push_str("&compress=zlib-stream");
    }
    url
}

/// Owns the reconnect loop around [`GatewayConnection`].
pub struct GatewayClient {
    config: GatewayClientConfig,
    url_source: Arc<dyn GatewayUrlSource>,
    transport_factory: Option<TransportFactory>,
    command_tx: Option<mpsc::Sender<GatewayCommand>>,
}

impl GatewayClient {
    #[must_use]
    pub fn new(config: GatewayClientConfig, url_source: Arc<dyn GatewayUrlSource>) -> Self {
        Self {
            config,
            url_source,
            transport_factory: Some(WebSocketTransport::factory()),
            command_tx: None,
        }
    }

    /// Replaces the socket implementation, e.g. with a scripted one in tests.
    #[must_use]
    pub fn with_transport_factory(mut self, factory: TransportFactory) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    /// Spawns the gateway task.
    ///
    /// The receiver yields every gateway event and ends with exactly one
    /// [`GatewayEventKind::Stopped`] or [`GatewayEventKind::Fatal`].
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::AlreadyConnected` if the gateway was already started.
    pub fn connect(
        &mut self,
        token: BotToken,
    ) -> GatewayResult<mpsc::UnboundedReceiver<GatewayEventKind>> {
        let transport_factory = self
            .transport_factory
            .take()
            .ok_or(GatewayError::AlreadyConnected)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(32);
        self.command_tx = Some(command_tx);

        let gateway_loop = GatewayLoop {
            options: ConnectionOptions {
                token,
                intents: self.config.intents,
                presence: self.config.presence.clone(),
            },
            compress: self.config.compress,
            auto_reconnect: self.config.auto_reconnect,
            max_attempts: self.config.max_reconnect_attempts,
            url_source: self.url_source.clone(),
            transport_factory,
            event_tx: event_tx.clone(),
            command_rx,
        };

        tokio::spawn(async move {
            let result = std::panic::AssertUnwindSafe(gateway_loop.run()).catch_unwind().await;

            let last = match result {
                Ok(Ok(())) => GatewayEventKind::Stopped,
                Ok(Err(e)) => {
                    error!(error = %e, "Gateway stopped");
                    GatewayEventKind::Fatal(e)
                }
                Err(panic_info) => {
                    let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "unknown panic".to_string()
                    };
                    error!(panic = %message, "Gateway task panicked");
                    GatewayEventKind::Fatal(GatewayError::Panicked { message })
                }
            };
            let _ = event_tx.send(last);
        });

        Ok(event_rx)
    }

    /// Queues a command for the running connection.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` before `connect` and `ChannelClosed` once the
    /// gateway task has ended.
    pub async fn send_command(&self, command: GatewayCommand) -> GatewayResult<()> {
        let tx = self.command_tx.as_ref().ok_or(GatewayError::NotConnected)?;
        tx.send(command)
            .await
            .map_err(|_| GatewayError::ChannelClosed)
    }

    /// Closes the socket with 1000 and stops reconnecting.
    pub async fn shutdown(&self) {
        if self.send_command(GatewayCommand::Shutdown).await.is_err() {
            debug!("Gateway already stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.command_tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

struct GatewayLoop {
    options: ConnectionOptions,
    compress: bool,
    auto_reconnect: bool,
    max_attempts: u32,
    url_source: Arc<dyn GatewayUrlSource>,
    transport_factory: TransportFactory,
    event_tx: mpsc::UnboundedSender<GatewayEventKind>,
    command_rx: mpsc::Receiver<GatewayCommand>,
}

impl GatewayLoop {
    async fn run(mut self) -> GatewayResult<()> {
        let mut session = SessionState::new();
        let mut bot_gateway_url: Option<String> = None;
        let mut resume = false;
        let mut attempts: u32 = 0;

        loop {
            let base = match session.resume_gateway_url() {
                Some(url) if resume => url.to_string(),
                _ => self.bot_gateway_url(&mut bot_gateway_url).await?,
            };
            let url = gateway_url(&base, self.compress);

            let mut connection = GatewayConnection::new(
                (self.transport_factory)(),
                self.options.clone(),
                self.event_tx.clone(),
            );
            let result = connection
                .run(&url, &mut session, resume, &mut self.command_rx)
                .await;
            let reached_ready = connection.reached_ready();
            self.options = connection.into_options();

            match result {
                Ok(close) => {
                    let action = reconnect_action(&close, session.can_resume());
                    debug!(code = ?close.code, origin = ?close.origin, action = ?action, "Socket closed");

                    match action {
                        ReconnectAction::Stop => {
                            info!("Gateway closed");
                            return Ok(());
                        }
                        ReconnectAction::Fatal(code) => return Err(GatewayError::closed(code)),
                        ReconnectAction::Resume => resume = true,
                        ReconnectAction::Identify => {
                            session.clear();
                            resume = false;
                        }
                    }

                    self.emit(GatewayEventKind::Disconnected {
                        close,
                        resuming: resume,
                    });

                    if reached_ready {
                        attempts = 0;
                    } else {
                        attempts += 1;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Gateway connection attempt failed");
                    if e.is_fatal() {
                        return Err(e);
                    }
                    attempts += 1;
                }
            }

            if !self.auto_reconnect {
                return Err(GatewayError::connection_failed(
                    "connection lost and auto-reconnect is disabled",
                ));
            }

            if attempts >= self.max_attempts {
                return Err(GatewayError::ReconnectionLimitExceeded { attempts });
            }

            if attempts > 0 {
                let delay = backoff_delay(attempts);
                info!(
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Reconnecting to gateway"
                );
                self.emit(GatewayEventKind::Reconnecting { attempt: attempts });

                if self.wait_or_shutdown(delay).await {
                    info!("Gateway closed while reconnecting");
                    return Ok(());
                }
            }
        }
    }

    /// Looks the URL up once; later identifies reuse it.
    async fn bot_gateway_url(&self, cached: &mut Option<String>) -> GatewayResult<String> {
        if let Some(url) = cached {
            return Ok(url.clone());
        }

        let url = self
            .url_source
            .gateway_url()
            .await
            .map_err(GatewayError::UrlLookup)?;
        debug!(url = %url, "Resolved gateway URL");
        *cached = Some(url.clone());
        Ok(url)
    }

    /// Sleeps for `delay`. Returns true if a shutdown arrived meanwhile.
    async fn wait_or_shutdown(&mut self, delay: Duration) -> bool {
        let sleeper = sleep(delay);
        tokio::pin!(sleeper);

        loop {
            tokio::select! {
                () = &mut sleeper => return false,
                command = self.command_rx.recv() => match command {
                    Some(GatewayCommand::Shutdown) | None => return true,
                    Some(GatewayCommand::UpdatePresence(presence)) => {
                        self.options.presence = Some(presence);
                    }
                    Some(other) => warn!(command = ?other, "Dropping gateway command while disconnected"),
                },
            }
        }
    }

    fn emit(&self, event: GatewayEventKind) {
        let _ = self.event_tx.send(event);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn backoff_delay(attempt: u32) -> Duration {
    let base_delay = RECONNECT_DELAY_BASE.as_millis() as u64;
    let max_delay = RECONNECT_DELAY_MAX.as_millis() as u64;
    let jitter_max = RECONNECT_JITTER_MAX.as_millis() as u64;

    let exponential = base_delay.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1).min(6)));
    let capped = exponential.min(max_delay);
    let jitter = rand::thread_rng().gen_range(0..=jitter_max);

    Duration::from_millis(capped.saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::infrastructure::discord::gateway::events::CloseOrigin;
    use crate::infrastructure::discord::gateway::testing::{Step, hello, ready, scripted_factory};
    use crate::infrastructure::discord::rest::RestError;

    fn url_source(url: &'static str) -> Arc<dyn GatewayUrlSource> {
        let mut source = MockGatewayUrlSource::new();
        source
            .expect_gateway_url()
            .times(1)
            .returning(move || Ok(url.to_string()));
        Arc::new(source)
    }

    fn token() -> BotToken {
        BotToken::new("token.value.here").unwrap()
    }

    async fn collect(mut events: mpsc::UnboundedReceiver<GatewayEventKind>) -> Vec<GatewayEventKind> {
        let mut out = Vec::new();
        while let Some(event) = events.recv().await {
            let last = event.is_terminal();
            out.push(event);
            if last {
                break;
            }
        }
        out
    }

    #[test_case(CloseEvent::user(1000), true, ReconnectAction::Stop ; "user close stops")]
    #[test_case(CloseEvent::remote(None), true, ReconnectAction::Resume ; "no code resumes")]
    #[test_case(CloseEvent::remote(None), false, ReconnectAction::Identify ; "no code without session identifies")]
    #[test_case(CloseEvent::local(1001), true, ReconnectAction::Resume ; "going away resumes")]
    #[test_case(CloseEvent::remote(Some(4000)), true, ReconnectAction::Resume ; "unknown error resumes")]
    #[test_case(CloseEvent::remote(Some(4009)), true, ReconnectAction::Resume ; "session timeout resumes")]
    #[test_case(CloseEvent::remote(Some(4004)), true, ReconnectAction::Fatal(4004) ; "auth failure is fatal")]
    #[test_case(CloseEvent::remote(Some(4010)), true, ReconnectAction::Fatal(4010) ; "invalid shard is fatal")]
    #[test_case(CloseEvent::remote(Some(4014)), true, ReconnectAction::Fatal(4014) ; "disallowed intents is fatal")]
    #[test_case(CloseEvent::remote(Some(1000)), true, ReconnectAction::Identify ; "server clean close identifies")]
    #[test_case(CloseEvent::local(1000), true, ReconnectAction::Identify ; "invalid session identifies")]
    #[test_case(CloseEvent::remote(Some(1006)), true, ReconnectAction::Identify ; "abnormal close identifies")]
    fn test_reconnect_action(close: CloseEvent, has_session: bool, expected: ReconnectAction) {
        assert_eq!(reconnect_action(&close, has_session), expected);
    }

    #[test_case("wss://gateway.discord.gg", false, "wss://gateway.discord.gg/?v=10&encoding=json" ; "plain")]
    #[test_case("wss://x/", false, "wss://x/?v=10&encoding=json" ; "trailing slash")]
    #[test_case("wss://x/?v=9", false, "wss://x/?v=10&encoding=json" ; "existing query replaced")]
    #[test_case("wss://x", true, "wss://x/?v=10&encoding=json&compress=zlib-stream" ; "compressed")]
    fn test_gateway_url(base: &str, compress: bool, expected: &str) {
        assert_eq!(gateway_url(base, compress), expected);
    }

    #[test]
    fn test_config_builder() {
        let config = GatewayClientConfig::new()
            .with_auto_reconnect(false)
            .with_compression(true)
            .with_max_reconnect_attempts(5);

        assert!(!config.auto_reconnect);
        assert!(config.compress);
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_backoff_delay() {
        assert!(backoff_delay(1) >= RECONNECT_DELAY_BASE);
        assert!(backoff_delay(1) <= RECONNECT_DELAY_BASE + RECONNECT_JITTER_MAX);
        assert!(backoff_delay(3) >= RECONNECT_DELAY_BASE * 4);

        let delay_max = backoff_delay(100);
        assert!(delay_max <= RECONNECT_DELAY_MAX + RECONNECT_JITTER_MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumes_against_ready_url() {
        let (factory, log) = scripted_factory(vec![
            vec![hello(41_250), ready(1, "abc", "wss://x"), Step::Close(Some(4000))],
            vec![hello(41_250), Step::Close(Some(4004))],
        ]);
        let mut client = GatewayClient::new(GatewayClientConfig::default(), url_source("wss://gw"))
            .with_transport_factory(factory);

        let events = collect(client.connect(token()).unwrap()).await;

        let log = log.lock();
        assert_eq!(
            log.urls,
            vec![
                "wss://gw/?v=10&encoding=json".to_string(),
                "wss://x/?v=10&encoding=json".to_string(),
            ]
        );
        assert_eq!(log.sent_ops(), vec![2, 6]);
        assert_eq!(log.sent[1].d["session_id"], "abc");
        assert_eq!(log.sent[1].d["seq"], 1);

        assert!(events.iter().any(|e| matches!(
            e,
            GatewayEventKind::Disconnected { resuming: true, close }
                if close.code == Some(4000) && close.origin == CloseOrigin::Remote
        )));
        let Some(GatewayEventKind::Fatal(err)) = events.last() else {
            panic!("expected a fatal event, got {events:?}");
        };
        assert!(err.is_authentication_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_server_close_identifies_again() {
        let (factory, log) = scripted_factory(vec![
            vec![hello(41_250), ready(1, "abc", "wss://x"), Step::Close(Some(1000))],
            vec![hello(41_250), ready(1, "def", "wss://y"), Step::Close(Some(4013))],
        ]);
        let mut client = GatewayClient::new(GatewayClientConfig::default(), url_source("wss://gw"))
            .with_transport_factory(factory);

        let events = collect(client.connect(token()).unwrap()).await;

        let log = log.lock();
        assert_eq!(log.urls[1], "wss://gw/?v=10&encoding=json");
        assert_eq!(log.sent_ops(), vec![2, 2]);
        assert!(matches!(
            events.last(),
            Some(GatewayEventKind::Fatal(GatewayError::Closed { code: 4013, .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_lookup_failure_is_fatal() {
        let mut source = MockGatewayUrlSource::new();
        source.expect_gateway_url().times(1).returning(|| {
            Err(RestError::from_response(401, br#"{"message": "401: Unauthorized", "code": 0}"#))
        });
        let (factory, log) = scripted_factory(vec![]);
        let mut client = GatewayClient::new(GatewayClientConfig::default(), Arc::new(source))
            .with_transport_factory(factory);

        let events = collect(client.connect(token()).unwrap()).await;

        assert!(log.lock().urls.is_empty());
        let Some(GatewayEventKind::Fatal(err)) = events.last() else {
            panic!("expected a fatal event");
        };
        assert!(err.is_authentication_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_without_reconnect() {
        let (factory, log) = scripted_factory(vec![vec![hello(41_250), ready(1, "abc", "wss://x")]]);
        let mut client = GatewayClient::new(GatewayClientConfig::default(), url_source("wss://gw"))
            .with_transport_factory(factory);
        let mut events = client.connect(token()).unwrap();

        loop {
            if let Some(GatewayEventKind::Connected { .. }) = events.recv().await {
                break;
            }
        }
        client.shutdown().await;
        let rest = collect(events).await;

        assert!(matches!(rest.last(), Some(GatewayEventKind::Stopped)));
        let log = log.lock();
        assert_eq!(log.urls.len(), 1);
        assert_eq!(log.closes, vec![1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_socket_error_resumes_against_ready_url() {
        let (factory, log) = scripted_factory(vec![
            vec![hello(41_250), ready(1, "abc", "wss://x"), Step::Error],
            vec![hello(41_250), Step::Close(Some(4004))],
        ]);
        let mut client = GatewayClient::new(GatewayClientConfig::default(), url_source("wss://gw"))
            .with_transport_factory(factory);

        let events = collect(client.connect(token()).unwrap()).await;

        let log = log.lock();
        assert_eq!(log.urls[1], "wss://x/?v=10&encoding=json");
        assert_eq!(log.sent_ops(), vec![2, 6]);
        assert_eq!(log.sent[1].d["session_id"], "abc");
        assert!(events.iter().any(|e| matches!(
            e,
            GatewayEventKind::Disconnected { resuming: true, close } if close.code.is_none()
        )));
        assert!(!events
            .iter()
            .any(|e| matches!(e, GatewayEventKind::Reconnecting { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_backoff_stops() {
        let (factory, log) = scripted_factory(vec![vec![Step::Close(None)]]);
        let mut client = GatewayClient::new(GatewayClientConfig::default(), url_source("wss://gw"))
            .with_transport_factory(factory);
        let mut events = client.connect(token()).unwrap();

        loop {
            if let Some(GatewayEventKind::Reconnecting { attempt }) = events.recv().await {
                assert_eq!(attempt, 1);
                break;
            }
        }
        client.shutdown().await;
        let rest = collect(events).await;

        assert!(matches!(rest.as_slice(), [GatewayEventKind::Stopped]));
        let log = log.lock();
        assert_eq!(log.urls.len(), 1);
        assert!(log.closes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let (factory, log) = scripted_factory(vec![
            vec![Step::Close(None)],
            vec![Step::Close(None)],
            vec![Step::Close(None)],
        ]);
        let config = GatewayClientConfig::default().with_max_reconnect_attempts(3);
        let mut client =
            GatewayClient::new(config, url_source("wss://gw")).with_transport_factory(factory);

        let events = collect(client.connect(token()).unwrap()).await;

        assert_eq!(log.lock().urls.len(), 3);
        assert!(matches!(
            events.last(),
            Some(GatewayEventKind::Fatal(GatewayError::ReconnectionLimitExceeded { attempts: 3 }))
        ));
        let reconnecting = events
            .iter()
            .filter(|e| matches!(e, GatewayEventKind::Reconnecting { .. }))
            .count();
        assert_eq!(reconnecting, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_twice_is_rejected() {
        let mut source = MockGatewayUrlSource::new();
        source
            .expect_gateway_url()
            .returning(|| Ok("wss://gw".to_string()));
        let (factory, _log) = scripted_factory(vec![]);
        let mut client = GatewayClient::new(GatewayClientConfig::default(), Arc::new(source))
            .with_transport_factory(factory);

        let _events = client.connect(token()).unwrap();
        assert!(matches!(
            client.connect(token()),
            Err(GatewayError::AlreadyConnected)
        ));
        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_latency_is_published() {
        let (factory, _log) = scripted_factory(vec![vec![
            hello(1_000),
            ready(1, "abc", "wss://x"),
            Step::Wait(Duration::from_millis(1_010)),
            Step::Frame(json!({ "op": 11 })),
            Step::Close(Some(4004)),
        ]]);
        let mut client = GatewayClient::new(GatewayClientConfig::default(), url_source("wss://gw"))
            .with_transport_factory(factory);

        let events = collect(client.connect(token()).unwrap()).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, GatewayEventKind::HeartbeatAck { .. })));
    }
}
