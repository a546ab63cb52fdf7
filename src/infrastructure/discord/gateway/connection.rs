use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use super::constants::{
    CLOSE_GOING_AWAY, CLOSE_NORMAL, CONNECTION_TIMEOUT, GatewayIntents, GatewayOpcode,
    HELLO_TIMEOUT,
};
use super::error::{GatewayError, GatewayResult};
use super::events::{CloseEvent, GatewayCommand, GatewayEventKind};
use super::heartbeat::{HeartbeatManager, HeartbeatSignal};
use super::payloads::{GatewayMessage, GatewayPayload, HelloPayload, PresenceUpdate, ReadySession};
use super::session::SessionState;
use super::state::{ConnectionState, GatewayState};
use super::transport::{GatewayTransport, TransportEvent};
use crate::domain::entities::BotToken;
use crate::domain::events::RawEvent;

/// Identify inputs, fixed for one connection attempt.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub token: BotToken,
    pub intents: GatewayIntents,
    pub presence: Option<PresenceUpdate>,
}

/// One gateway socket: handshake, heartbeat and the frame loop.
///
/// A connection is used once. Its owner keeps the [`SessionState`] across
/// sockets and picks Resume or Identify for the next one.
pub struct GatewayConnection {
    transport: Box<dyn GatewayTransport>,
    options: ConnectionOptions,
    state: GatewayState,
    heartbeat: Option<HeartbeatManager>,
    event_tx: mpsc::UnboundedSender<GatewayEventKind>,
    reached_ready: bool,
}

impl GatewayConnection {
    pub fn new(
        transport: Box<dyn GatewayTransport>,
        options: ConnectionOptions,
        event_tx: mpsc::UnboundedSender<GatewayEventKind>,
    ) -> Self {
        Self {
            transport,
            options,
            state: GatewayState::new(),
            heartbeat: None,
            event_tx,
            reached_ready: false,
        }
    }

    /// Connects to `url` and runs until the socket ends.
    ///
    /// Resumes when `resume` is set and `session` holds a session;
    /// otherwise identifies and clears `session` first.
    ///
    /// # Errors
    ///
    /// Returns an error when the socket cannot be opened or the handshake
    /// fails before Hello. Anything after that ends as a [`CloseEvent`].
    pub async fn run(
        &mut self,
        url: &str,
        session: &mut SessionState,
        resume: bool,
        commands: &mut mpsc::Receiver<GatewayCommand>,
    ) -> GatewayResult<CloseEvent> {
        self.state.transition_to(ConnectionState::Connecting);
        debug!(url, "Connecting to gateway");

        timeout(CONNECTION_TIMEOUT, self.transport.connect(url))
            .await
            .map_err(|_| GatewayError::timeout("connection"))??;

        self.state.transition_to(ConnectionState::AwaitingHello);
        let interval_ms = match self.await_hello().await? {
            Ok(interval_ms) => interval_ms,
            Err(close) => return Ok(self.finish(close)),
        };

        let (heartbeat_tx, mut heartbeat_rx) = mpsc::channel(4);
        let mut heartbeat = HeartbeatManager::new(interval_ms);
        heartbeat.start(heartbeat_tx);
        self.heartbeat = Some(heartbeat);

        let handshake = if resume && session.can_resume() {
            self.resume(session).await
        } else {
            self.identify(session).await
        };
        if let Err(e) = handshake {
            warn!(error = %e, "Handshake send failed");
            return Ok(self.finish(CloseEvent::remote(None)));
        }

        let close = loop {
            tokio::select! {
                received = self.transport.receive() => match received {
                    Ok(TransportEvent::Frame(message)) => {
                        if let Some(close) = self.handle_message(message, session).await {
                            break close;
                        }
                    }
                    Ok(TransportEvent::Malformed(error)) => {
                        warn!(%error, "Dropping malformed gateway frame");
                    }
                    Ok(TransportEvent::Closed(code)) => {
                        info!(code = ?code, "Gateway closed the connection");
                        break CloseEvent::remote(code);
                    }
                    Err(e) => {
                        warn!(error = %e, "Gateway transport failed");
                        break CloseEvent::remote(None);
                    }
                },

                Some(signal) = heartbeat_rx.recv() => match signal {
                    HeartbeatSignal::Beat => {
                        if self.send_heartbeat(session.sequence()).await.is_err() {
                            break CloseEvent::remote(None);
                        }
                    }
                    HeartbeatSignal::Zombie => {
                        warn!("Zombie connection, closing to resume");
                        break self.close_locally(CLOSE_GOING_AWAY).await;
                    }
                },

                command = commands.recv() => {
                    if let Some(close) = self.handle_command(command).await {
                        break close;
                    }
                }
            }
        };

        Ok(self.finish(close))
    }

    /// Waits for Hello. A close before Hello is returned as `Ok(Err(close))`.
    async fn await_hello(&mut self) -> GatewayResult<Result<u64, CloseEvent>> {
        let received = timeout(HELLO_TIMEOUT, self.transport.receive())
            .await
            .map_err(|_| GatewayError::timeout("Hello"))?;

        let message = match received {
            Ok(TransportEvent::Frame(message)) => message,
            Ok(TransportEvent::Closed(code)) => return Ok(Err(CloseEvent::remote(code))),
            Ok(TransportEvent::Malformed(error)) => {
                return Err(GatewayError::serialization(format!(
                    "Failed to parse Hello: {error}"
                )));
            }
            Err(e) => {
                return Err(GatewayError::connection_failed(format!(
                    "Failed to receive Hello: {e}"
                )));
            }
        };

        if message.opcode() != Some(GatewayOpcode::Hello) {
            return Err(GatewayError::UnexpectedOpcode { opcode: message.op });
        }

        let data = message
            .d
            .ok_or_else(|| GatewayError::protocol("Hello missing data"))?;
        let hello: HelloPayload = serde_json::from_value(data)
            .map_err(|e| GatewayError::serialization(format!("Failed to parse Hello: {e}")))?;

        self.state.set_heartbeat_interval(hello.heartbeat_interval);
        debug!(
            interval_ms = hello.heartbeat_interval,
            "Received Hello from gateway"
        );

        Ok(Ok(hello.heartbeat_interval))
    }

    async fn identify(&mut self, session: &mut SessionState) -> GatewayResult<()> {
        self.state.transition_to(ConnectionState::Identifying);
        session.clear();

        let payload = GatewayPayload::identify(
            self.options.token.as_str(),
            self.options.intents.as_u32(),
            self.options.presence.as_ref(),
        )?;
        self.transport.send(&payload).await?;

        debug!(intents = self.options.intents.as_u32(), "Sent Identify");
        Ok(())
    }

    async fn resume(&mut self, session: &SessionState) -> GatewayResult<()> {
        self.state.transition_to(ConnectionState::Resuming);

        let session_id = session
            .session_id()
            .ok_or_else(|| GatewayError::protocol("No session to resume"))?;

        let payload =
            GatewayPayload::resume(self.options.token.as_str(), session_id, session.sequence())?;
        self.transport.send(&payload).await?;

        debug!(session_id, sequence = ?session.sequence(), "Sent Resume");
        Ok(())
    }

    async fn send_heartbeat(&mut self, sequence: Option<u64>) -> GatewayResult<()> {
        self.transport
            .send(&GatewayPayload::heartbeat(sequence))
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to send heartbeat"))?;
        self.state.record_heartbeat_sent();
        trace!(sequence = ?sequence, "Sent heartbeat");
        Ok(())
    }

    async fn handle_message(
        &mut self,
        message: GatewayMessage,
        session: &mut SessionState,
    ) -> Option<CloseEvent> {
        session.update_sequence(message.s);

        match message.opcode() {
            Some(GatewayOpcode::Dispatch) => {
                let Some(event_type) = message.t else {
                    warn!("Dispatch without event type");
                    return None;
                };
                let data = message.d.unwrap_or(Value::Null);
                trace!(event = %event_type, sequence = ?message.s, "Raw dispatch received");

                match event_type.as_str() {
                    "READY" => self.handle_ready(&data, session),
                    "RESUMED" => {
                        info!(sequence = ?session.sequence(), "Session resumed");
                        self.mark_connected();
                        self.emit(GatewayEventKind::Resumed);
                    }
                    _ => {}
                }

                self.emit(GatewayEventKind::Dispatch(RawEvent {
                    event_type,
                    sequence: message.s,
                    data,
                }));
                None
            }
            Some(GatewayOpcode::Heartbeat) => {
                debug!("Gateway requested immediate heartbeat");
                if self.send_heartbeat(session.sequence()).await.is_err() {
                    return Some(CloseEvent::remote(None));
                }
                None
            }
            Some(GatewayOpcode::HeartbeatAck) => {
                if let Some(heartbeat) = &self.heartbeat {
                    heartbeat.acknowledge();
                }
                if let Some(latency_ms) = self.state.record_heartbeat_ack() {
                    trace!(latency_ms, "Heartbeat acknowledged");
                    self.emit(GatewayEventKind::HeartbeatAck { latency_ms });
                }
                None
            }
            Some(GatewayOpcode::Reconnect) => {
                info!("Gateway requested reconnect");
                Some(self.close_locally(CLOSE_GOING_AWAY).await)
            }
            Some(GatewayOpcode::InvalidSession) => {
                let resumable = message.d.as_ref().and_then(Value::as_bool).unwrap_or(false);
                warn!(resumable, "Session invalidated");

                if resumable {
                    Some(self.close_locally(CLOSE_GOING_AWAY).await)
                } else {
                    session.clear();
                    Some(self.close_locally(CLOSE_NORMAL).await)
                }
            }
            opcode => {
                debug!(opcode = ?opcode, raw = message.op, "Ignoring opcode");
                None
            }
        }
    }

    fn handle_ready(&mut self, data: &Value, session: &mut SessionState) {
        match ReadySession::deserialize(data) {
            Ok(ready) => {
                info!(session_id = %ready.session_id, "Gateway ready");
                session.set_session(ready.session_id.clone(), ready.resume_gateway_url.clone());
                self.mark_connected();
                self.emit(GatewayEventKind::Connected {
                    session_id: ready.session_id,
                    resume_url: ready.resume_gateway_url,
                });
            }
            Err(e) => warn!(error = %e, "READY without session fields, resume disabled"),
        }
    }

    async fn handle_command(&mut self, command: Option<GatewayCommand>) -> Option<CloseEvent> {
        let payload = match command {
            Some(GatewayCommand::UpdatePresence(presence)) => {
                let payload = GatewayPayload::presence_update(&presence);
                self.options.presence = Some(presence);
                payload
            }
            Some(GatewayCommand::RequestGuildMembers(request)) => {
                GatewayPayload::request_guild_members(&request)
            }
            Some(GatewayCommand::Shutdown) | None => {
                info!("Closing gateway on request");
                self.transport.close(CLOSE_NORMAL).await.ok();
                return Some(CloseEvent::user(CLOSE_NORMAL));
            }
        };

        match payload {
            Ok(payload) => {
                if let Err(e) = self.transport.send(&payload).await {
                    warn!(error = %e, "Failed to send gateway command");
                    return Some(CloseEvent::remote(None));
                }
                debug!(op = payload.op, "Sent gateway command");
            }
            Err(e) => warn!(error = %e, "Failed to encode gateway command"),
        }
        None
    }

    async fn close_locally(&mut self, code: u16) -> CloseEvent {
        if let Err(e) = self.transport.close(code).await {
            debug!(error = %e, "Error while closing socket");
        }
        CloseEvent::local(code)
    }

    fn mark_connected(&mut self) {
        self.state.transition_to(ConnectionState::Connected);
        self.reached_ready = true;
    }

    fn finish(&mut self, close: CloseEvent) -> CloseEvent {
        if let Some(mut heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
        self.state.transition_to(ConnectionState::Disconnected);
        close
    }

    fn emit(&self, event: GatewayEventKind) {
        let _ = self.event_tx.send(event);
    }

    /// Whether this socket got as far as `READY` or `RESUMED`.
    #[must_use]
    pub const fn reached_ready(&self) -> bool {
        self.reached_ready
    }

    #[must_use]
    pub const fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Gives back the options, including any presence changed while running.
    #[must_use]
    pub fn into_options(self) -> ConnectionOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::infrastructure::discord::gateway::testing::{
        ScriptedTransport, Step, TransportLog, dispatch, hello, op, ready,
    };

    fn options() -> ConnectionOptions {
        ConnectionOptions {
            token: BotToken::new("token.value.here").unwrap(),
            intents: GatewayIntents::default_bot(),
            presence: None,
        }
    }

    struct Harness {
        connection: GatewayConnection,
        log: Arc<Mutex<TransportLog>>,
        events: mpsc::UnboundedReceiver<GatewayEventKind>,
        commands_tx: mpsc::Sender<GatewayCommand>,
        commands: mpsc::Receiver<GatewayCommand>,
    }

    fn harness(steps: Vec<Step>) -> Harness {
        let log = Arc::new(Mutex::new(TransportLog::default()));
        let (event_tx, events) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::channel(8);
        let transport = Box::new(ScriptedTransport::new(steps, log.clone()));
        Harness {
            connection: GatewayConnection::new(transport, options(), event_tx),
            log,
            events,
            commands_tx,
            commands,
        }
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<GatewayEventKind>) -> Vec<GatewayEventKind> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_populates_session() {
        let mut h = harness(vec![
            hello(41_250),
            ready(1, "abc", "wss://x"),
            Step::Close(Some(4000)),
        ]);
        let mut session = SessionState::new();

        let close = h
            .connection
            .run("wss://gw/?v=10&encoding=json", &mut session, false, &mut h.commands)
            .await
            .unwrap();

        assert_eq!(close, CloseEvent::remote(Some(4000)));
        assert_eq!(session.session_id(), Some("abc"));
        assert_eq!(session.resume_gateway_url(), Some("wss://x"));
        assert_eq!(session.sequence(), Some(1));
        assert!(h.connection.reached_ready());

        let log = h.log.lock();
        assert_eq!(log.sent_ops(), vec![2]);
        assert_eq!(log.sent[0].d["token"], "token.value.here");

        let events = drain(&mut h.events);
        assert!(matches!(
            &events[0],
            GatewayEventKind::Connected { session_id, resume_url }
                if session_id == "abc" && resume_url == "wss://x"
        ));
        assert!(matches!(&events[1], GatewayEventKind::Dispatch(raw) if raw.event_type == "READY"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_is_monotonic_and_reset_on_identify() {
        let mut h = harness(vec![
            hello(41_250),
            ready(1, "abc", "wss://x"),
            dispatch(5, "MESSAGE_CREATE", json!({})),
            dispatch(3, "MESSAGE_CREATE", json!({})),
            Step::Close(Some(4000)),
        ]);
        let mut session = SessionState::new();
        session.set_session("old".into(), "wss://old".into());
        session.update_sequence(Some(99));

        h.connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await
            .unwrap();

        assert_eq!(session.sequence(), Some(5));
        assert_eq!(session.session_id(), Some("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_is_dropped() {
        let mut h = harness(vec![
            hello(41_250),
            ready(1, "abc", "wss://x"),
            Step::Frame(json!({ "op": "garbage" })),
            dispatch(2, "MESSAGE_CREATE", json!({})),
            Step::Close(Some(4000)),
        ]);
        let mut session = SessionState::new();

        let close = h
            .connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await
            .unwrap();

        assert_eq!(close, CloseEvent::remote(Some(4000)));
        assert_eq!(session.sequence(), Some(2));
        assert!(h.log.lock().closes.is_empty());
        let dispatches = drain(&mut h.events)
            .into_iter()
            .filter(|e| matches!(e, GatewayEventKind::Dispatch(raw) if raw.event_type == "MESSAGE_CREATE"))
            .count();
        assert_eq!(dispatches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_sends_stored_session() {
        let mut h = harness(vec![
            hello(41_250),
            dispatch(43, "RESUMED", json!(null)),
            Step::Close(None),
        ]);
        let mut session = SessionState::new();
        session.set_session("abc".into(), "wss://x".into());
        session.update_sequence(Some(42));

        let close = h
            .connection
            .run("wss://x/?v=10&encoding=json", &mut session, true, &mut h.commands)
            .await
            .unwrap();

        assert_eq!(close, CloseEvent::remote(None));
        let log = h.log.lock();
        assert_eq!(log.sent_ops(), vec![6]);
        assert_eq!(log.sent[0].d["session_id"], "abc");
        assert_eq!(log.sent[0].d["seq"], 42);
        assert_eq!(session.sequence(), Some(43));

        let events = drain(&mut h.events);
        assert!(matches!(events[0], GatewayEventKind::Resumed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_acks_close_as_zombie() {
        let mut h = harness(vec![hello(1_000), ready(1, "abc", "wss://x")]);
        let mut session = SessionState::new();

        let close = h
            .connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await
            .unwrap();

        assert_eq!(close, CloseEvent::local(1001));
        let log = h.log.lock();
        // Identify, then two unacknowledged heartbeats, then the close.
        assert_eq!(log.sent_ops(), vec![2, 1, 1]);
        assert_eq!(log.sent[1].d, json!(1));
        assert_eq!(log.closes, vec![1001]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acks_keep_connection_alive() {
        let mut h = harness(vec![
            hello(1_000),
            ready(1, "abc", "wss://x"),
            Step::Wait(Duration::from_millis(1_010)),
            op(11, json!(null)),
            Step::Wait(Duration::from_millis(1_000)),
            op(11, json!(null)),
            Step::Close(Some(4009)),
        ]);
        let mut session = SessionState::new();

        let close = h
            .connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await
            .unwrap();

        assert_eq!(close, CloseEvent::remote(Some(4009)));
        assert!(h.log.lock().closes.is_empty());
        let acks = drain(&mut h.events)
            .into_iter()
            .filter(|e| matches!(e, GatewayEventKind::HeartbeatAck { .. }))
            .count();
        assert_eq!(acks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_heartbeat_request_is_answered() {
        let mut h = harness(vec![
            hello(41_250),
            ready(7, "abc", "wss://x"),
            op(1, json!(null)),
            Step::Close(Some(4000)),
        ]);
        let mut session = SessionState::new();

        h.connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await
            .unwrap();

        let log = h.log.lock();
        assert_eq!(log.sent_ops(), vec![2, 1]);
        assert_eq!(log.sent[1].d, json!(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_opcode_closes_resumable() {
        let mut h = harness(vec![hello(41_250), op(7, json!(null))]);
        let mut session = SessionState::new();

        let close = h
            .connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await
            .unwrap();

        assert_eq!(close, CloseEvent::local(1001));
        assert_eq!(h.log.lock().closes, vec![1001]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_session_codes() {
        let mut h = harness(vec![
            hello(41_250),
            ready(1, "abc", "wss://x"),
            op(9, json!(false)),
        ]);
        let mut session = SessionState::new();
        let close = h
            .connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await
            .unwrap();
        assert_eq!(close, CloseEvent::local(1000));
        assert!(!session.can_resume());

        let mut h = harness(vec![hello(41_250), ready(1, "abc", "wss://x"), op(9, json!(true))]);
        let mut session = SessionState::new();
        let close = h
            .connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await
            .unwrap();
        assert_eq!(close, CloseEvent::local(1001));
        assert!(session.can_resume());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_are_sent_and_shutdown_closes() {
        let mut h = harness(vec![hello(41_250), ready(1, "abc", "wss://x")]);
        let mut session = SessionState::new();

        let presence = PresenceUpdate::new(crate::domain::entities::PresenceStatus::Dnd);
        h.commands_tx
            .send(GatewayCommand::UpdatePresence(presence.clone()))
            .await
            .unwrap();
        h.commands_tx.send(GatewayCommand::Shutdown).await.unwrap();

        let close = h
            .connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await
            .unwrap();

        assert_eq!(close, CloseEvent::user(1000));
        assert!(close.is_user_requested());
        assert!(h.log.lock().sent_ops().contains(&3));
        assert_eq!(h.log.lock().closes, vec![1000]);
        assert_eq!(h.connection.into_options().presence, Some(presence));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_before_hello() {
        let mut h = harness(vec![Step::Close(Some(4004))]);
        let mut session = SessionState::new();

        let close = h
            .connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await
            .unwrap();

        assert_eq!(close, CloseEvent::remote(Some(4004)));
        assert!(h.log.lock().sent.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_first_opcode_is_an_error() {
        let mut h = harness(vec![op(11, json!(null))]);
        let mut session = SessionState::new();

        let result = h
            .connection
            .run("wss://gw", &mut session, false, &mut h.commands)
            .await;

        assert!(matches!(result, Err(GatewayError::UnexpectedOpcode { opcode: 11 })));
    }
}
