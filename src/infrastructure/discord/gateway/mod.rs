//! Gateway session: socket handshake, heartbeat, resume and reconnect.

mod client;
mod codec;
mod connection;
mod constants;
mod error;
mod events;
mod heartbeat;
mod payloads;
mod session;
mod state;
#[cfg(test)]
pub(crate) mod testing;
mod translator;
mod transport;

#[cfg(test)]
pub use client::MockGatewayUrlSource;
pub use client::{
    GatewayClient, GatewayClientConfig, GatewayUrlSource, ReconnectAction, gateway_url,
    reconnect_action,
};
pub use codec::ZlibStream;
pub use connection::{ConnectionOptions, GatewayConnection};
pub use constants::{
    GATEWAY_VERSION, GatewayIntent, GatewayIntents, GatewayOpcode, MAX_RECONNECT_ATTEMPTS,
};
pub use error::{GatewayCloseCode, GatewayError, GatewayResult, close_allows_resume};
pub use events::{CloseEvent, CloseOrigin, GatewayCommand, GatewayEventKind};
pub use heartbeat::{HeartbeatManager, HeartbeatSignal, first_heartbeat_delay};
pub use payloads::{
    GatewayMessage, GatewayPayload, HelloPayload, PresenceUpdate, ReadySession,
    RequestGuildMembers,
};
pub use session::SessionState;
pub use state::{ConnectionState, GatewayState};
pub use translator::EventTranslator;
pub use transport::{GatewayTransport, TransportEvent, TransportFactory, WebSocketTransport};
