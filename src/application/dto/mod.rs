//! Data transfer objects for the application layer.

mod command_definition;
mod interaction_response;
mod message_options;

pub use command_definition::{CommandDefinition, CommandScope};
pub use interaction_response::{CommandChoice, InteractionCallbackType, InteractionResponse};
pub use message_options::MessageOptions;
