//! Discord gateway and REST adapters.

pub mod gateway;
pub mod rest;

pub use gateway::{
    EventTranslator, GatewayClient, GatewayClientConfig, GatewayCommand, GatewayError,
    GatewayEventKind, GatewayIntent, GatewayIntents, GatewayUrlSource, PresenceUpdate,
    RequestGuildMembers,
};
pub use rest::{FileUpload, MessageQuery, ReactionEmoji, RequestClient, RestError, RestResult};
