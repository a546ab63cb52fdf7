//! Discord REST API client.

mod body;
mod client;
mod dto;
mod endpoints;
mod error;

pub use body::{EncodedBody, FileUpload, Payload, REASON_KEY, encode_reason, percent_encode};
pub use client::{
    AUDIT_LOG_REASON_HEADER, ApiResponse, DISCORD_API_BASE, RequestClient, decode_response,
};
pub use dto::{CurrentApplication, GatewayBotInfo, GatewayInfo, SessionStartLimit};
pub use endpoints::{MessageQuery, ReactionEmoji};
pub use error::{RestError, RestResult};
