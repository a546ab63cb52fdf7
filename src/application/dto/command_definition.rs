//! Application command definitions and where to register them.

use serde_json::{Value, json};

use crate::domain::entities::GuildId;

/// Where a command is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandScope {
    /// Part of the global bulk overwrite.
    Global,
    /// Created in each listed guild.
    Guilds(Vec<GuildId>),
}

/// A command as sent to the commands endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDefinition {
    pub data: Value,
    pub scope: CommandScope,
}

impl CommandDefinition {
    /// Wraps a complete command JSON object, registered globally.
    #[must_use]
    pub const fn new(data: Value) -> Self {
        Self {
            data,
            scope: CommandScope::Global,
        }
    }

    /// A chat input command without options.
    #[must_use]
    pub fn slash(name: &str, description: &str) -> Self {
        Self::new(json!({ "type": 1, "name": name, "description": description }))
    }

    #[must_use]
    pub fn option(mut self, option: Value) -> Self {
        if let Some(options) = self
            .data
            .as_object_mut()
            .map(|data| data.entry("options").or_insert_with(|| Value::Array(Vec::new())))
            .and_then(Value::as_array_mut)
        {
            options.push(option);
        }
        self
    }

    #[must_use]
    pub fn in_guilds(mut self, guilds: Vec<GuildId>) -> Self {
        self.scope = CommandScope::Guilds(guilds);
        self
    }

    /// The `name` field; empty when missing.
    #[must_use]
    pub fn name(&self) -> &str {
        self.data.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    #[must_use]
    pub const fn is_global(&self) -> bool {
        matches!(self.scope, CommandScope::Global)
    }
}
