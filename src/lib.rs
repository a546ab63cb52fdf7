//! gatebird - A lightweight Discord bot client.
//!
//! This crate keeps a gateway session alive (heartbeat, resume, reconnect),
//! wraps the REST API, translates dispatches into typed events and exposes a
//! small [`Client`](application::Client) façade for listeners and commands.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the client façade, use cases and DTOs.
pub mod application;
/// Domain layer containing entities, events, errors, and handler ports.
pub mod domain;
/// Infrastructure layer containing the gateway, REST and config adapters.
pub mod infrastructure;

pub use application::{Client, ClientBuilder, ClientError};

/// Current version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = "gatebird";
