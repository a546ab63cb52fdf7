//! Listener and command handler ports.
//!
//! The loader layer that owns command and listener definitions implements
//! these traits and registers them before the gateway connects. `C` is the
//! context handed to every call, normally the client façade.

use std::future::Future;

use async_trait::async_trait;

use crate::domain::entities::Interaction;
use crate::domain::events::Event;

/// Error returned by a handler. Logged, never propagated to the gateway.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

/// Receives translated events of the types it was registered for.
#[async_trait]
pub trait EventHandler<C>: Send + Sync {
    /// Handles one event.
    async fn handle(&self, ctx: C, event: Event) -> HandlerResult;
}

#[async_trait]
impl<C, F, Fut> EventHandler<C> for F
where
    C: Send + 'static,
    F: Fn(C, Event) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn handle(&self, ctx: C, event: Event) -> HandlerResult {
        (self)(ctx, event).await
    }
}

/// Runs an application command by name.
#[async_trait]
pub trait CommandHandler<C>: Send + Sync {
    /// Handles a command or autocomplete interaction.
    async fn execute(&self, ctx: C, interaction: Interaction) -> HandlerResult;
}

#[async_trait]
impl<C, F, Fut> CommandHandler<C> for F
where
    C: Send + 'static,
    F: Fn(C, Interaction) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn execute(&self, ctx: C, interaction: Interaction) -> HandlerResult {
        (self)(ctx, interaction).await
    }
}
