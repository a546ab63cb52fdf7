mod handler_port;

pub use handler_port::{CommandHandler, EventHandler, HandlerError, HandlerResult};
