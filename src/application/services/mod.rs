//! Application services.

mod listener_registry;

pub use listener_registry::{ListenerRegistry, RegisteredCommand};
