//! Domain layer with wire entities, events and handler ports.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Translated dispatch events.
pub mod events;
/// Port definitions.
pub mod ports;
/// Serde utilities.
pub mod serde_utils;

pub use entities::{BotToken, User};
pub use errors::DecodeError;
pub use events::{Event, EventType, RawEvent};
pub use ports::{CommandHandler, EventHandler, HandlerResult};
