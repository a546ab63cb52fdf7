//! Application layer: the client façade, listener registry and use cases.

mod client;
/// Outbound message, interaction response and command builders.
pub mod dto;
mod error;
/// Listener and command registry.
pub mod services;
/// Use case implementations.
pub mod use_cases;

pub use client::{Client, ClientBuilder, Identity, Ping};
pub use dto::{
    CommandChoice, CommandDefinition, CommandScope, InteractionCallbackType, InteractionResponse,
    MessageOptions,
};
pub use error::{ClientError, RegistrationFailure};
pub use services::{ListenerRegistry, RegisteredCommand};
pub use use_cases::{CommandRegistrar, RegisterCommandsUseCase};
