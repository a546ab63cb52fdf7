//! Listener and command lookup for translated events.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::dto::CommandDefinition;
use crate::domain::entities::{Interaction, InteractionType};
use crate::domain::events::{Event, EventType};
use crate::domain::ports::{CommandHandler, EventHandler};

/// A command definition together with the handler that runs it.
pub struct RegisteredCommand<C> {
    pub definition: CommandDefinition,
    pub handler: Arc<dyn CommandHandler<C>>,
}

/// Listeners keyed by event type and commands keyed by name.
///
/// Filled before the gateway connects and read-only afterwards.
pub struct ListenerRegistry<C> {
    listeners: HashMap<EventType, Vec<Arc<dyn EventHandler<C>>>>,
    commands: HashMap<String, RegisteredCommand<C>>,
}

impl<C> Default for ListenerRegistry<C> {
    fn default() -> Self {
        Self {
            listeners: HashMap::new(),
            commands: HashMap::new(),
        }
    }
}

impl<C: Clone + Send + 'static> ListenerRegistry<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener. Several listeners per type run in registration order.
    pub fn on<H: EventHandler<C> + 'static>(&mut self, event_type: EventType, handler: H) {
        self.listeners
            .entry(event_type)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Adds a command. A second command with the same name replaces the first.
    pub fn command<H: CommandHandler<C> + 'static>(
        &mut self,
        definition: CommandDefinition,
        handler: H,
    ) {
        let name = definition.name().to_string();
        if self.commands.contains_key(&name) {
            warn!(command = %name, "Replacing command registered twice");
        }
        self.commands.insert(
            name,
            RegisteredCommand {
                definition,
                handler: Arc::new(handler),
            },
        );
    }

    #[must_use]
    pub fn has_listeners(&self, event_type: EventType) -> bool {
        self.listeners
            .get(&event_type)
            .is_some_and(|handlers| !handlers.is_empty())
    }

    pub fn definitions(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.commands.values().map(|command| &command.definition)
    }

    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Runs every listener for the event's type, one after another.
    ///
    /// Listener errors are logged and do not stop the remaining listeners.
    pub async fn emit(&self, ctx: &C, event: &Event) {
        let event_type = event.event_type();
        let Some(handlers) = self.listeners.get(&event_type) else {
            return;
        };

        for handler in handlers {
            if let Err(e) = handler.handle(ctx.clone(), event.clone()).await {
                warn!(event = %event_type, error = %e, "Listener failed");
            }
        }
    }

    /// Routes a command or autocomplete interaction to the command with the
    /// same name. Returns false when nothing handled it.
    pub async fn run_command(&self, ctx: &C, interaction: &Interaction) -> bool {
        if !matches!(
            interaction.kind,
            InteractionType::ApplicationCommand | InteractionType::Autocomplete
        ) {
            return false;
        }
        let Some(data) = interaction.command() else {
            return false;
        };
        let Some(command) = self.commands.get(&data.name) else {
            debug!(command = %data.name, "No handler for command");
            return false;
        };

        if let Err(e) = command
            .handler
            .execute(ctx.clone(), interaction.clone())
            .await
        {
            warn!(command = %data.name, error = %e, "Command failed");
        }
        true
    }
}
