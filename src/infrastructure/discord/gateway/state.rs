use tokio::time::Instant;

/// Where one socket is in the handshake.
///
/// Reconnects are owned by the client loop, so a socket only ever walks
/// forward from `Connecting` and ends in `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingHello,
    Identifying,
    Resuming,
    /// `READY` or `RESUMED` received.
    Connected,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Sent Identify or Resume and waiting for the answer.
    #[must_use]
    pub const fn is_handshaking(&self) -> bool {
        matches!(self, Self::Identifying | Self::Resuming)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingHello => "awaiting hello",
            Self::Identifying => "identifying",
            Self::Resuming => "resuming",
            Self::Connected => "connected",
        })
    }
}

/// Per-socket bookkeeping: handshake state and heartbeat round trips.
#[derive(Debug, Default)]
pub struct GatewayState {
    connection: ConnectionState,
    heartbeat_interval_ms: Option<u64>,
    last_heartbeat_sent: Option<Instant>,
    latency_ms: Option<u64>,
}

impl GatewayState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Moving to `Disconnected` forgets the pending heartbeat, so a late ACK
    /// cannot produce a latency sample for a dead socket.
    pub fn transition_to(&mut self, state: ConnectionState) {
        self.connection = state;
        if state == ConnectionState::Disconnected {
            self.last_heartbeat_sent = None;
        }
    }

    pub const fn set_heartbeat_interval(&mut self, interval_ms: u64) {
        self.heartbeat_interval_ms = Some(interval_ms);
    }

    /// Interval from the last Hello.
    #[must_use]
    pub const fn heartbeat_interval_ms(&self) -> Option<u64> {
        self.heartbeat_interval_ms
    }

    pub fn record_heartbeat_sent(&mut self) {
        self.last_heartbeat_sent = Some(Instant::now());
    }

    /// Records an ACK and returns the time since the last heartbeat, if any
    /// was sent on this socket.
    #[allow(clippy::cast_possible_truncation)]
    pub fn record_heartbeat_ack(&mut self) -> Option<u64> {
        let sent = self.last_heartbeat_sent?;
        let latency = sent.elapsed().as_millis() as u64;
        self.latency_ms = Some(latency);
        Some(latency)
    }

    #[must_use]
    pub const fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }
}
