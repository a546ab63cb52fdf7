//! Application command registration after the first `READY`.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::application::dto::{CommandDefinition, CommandScope};
use crate::application::error::{ClientError, RegistrationFailure};
use crate::domain::entities::{ApplicationId, GuildId};
use crate::infrastructure::discord::rest::{RequestClient, RestResult};

/// The two command endpoints registration needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRegistrar: Send + Sync {
    /// Replaces every global command.
    async fn overwrite_global_commands(
        &self,
        application_id: ApplicationId,
        commands: Vec<Value>,
    ) -> RestResult<()>;

    /// Creates or updates one guild command.
    async fn create_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        command: Value,
    ) -> RestResult<()>;
}

#[async_trait]
impl CommandRegistrar for RequestClient {
    async fn overwrite_global_commands(
        &self,
        application_id: ApplicationId,
        commands: Vec<Value>,
    ) -> RestResult<()> {
        self.bulk_overwrite_global_commands(application_id, commands)
            .await
            .map(|_| ())
    }

    async fn create_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        command: Value,
    ) -> RestResult<()> {
        Self::create_guild_command(self, application_id, guild_id, command)
            .await
            .map(|_| ())
    }
}

/// Publishes command definitions for an application.
#[derive(Clone)]
pub struct RegisterCommandsUseCase {
    registrar: Arc<dyn CommandRegistrar>,
}

impl RegisterCommandsUseCase {
    #[must_use]
    pub fn new(registrar: Arc<dyn CommandRegistrar>) -> Self {
        Self { registrar }
    }

    /// Registers global commands with one bulk overwrite, then creates guild
    /// commands concurrently.
    ///
    /// The overwrite is skipped when there are no global commands. A failed
    /// overwrite is reported once, naming every global command.
    ///
    /// # Errors
    /// Returns `ClientError::Registration` listing every request that failed.
    pub async fn execute<'a, I>(
        &self,
        application_id: ApplicationId,
        definitions: I,
    ) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = &'a CommandDefinition>,
    {
        let mut global = Vec::new();
        let mut guild = Vec::new();
        for definition in definitions {
            match &definition.scope {
                CommandScope::Global => global.push(definition),
                CommandScope::Guilds(guilds) => {
                    guild.extend(guilds.iter().map(|guild_id| (definition, *guild_id)));
                }
            }
        }

        let mut failures = Vec::new();

        if !global.is_empty() {
            debug!(count = global.len(), "Overwriting global commands");
            let payload = global.iter().map(|d| d.data.clone()).collect();
            if let Err(error) = self
                .registrar
                .overwrite_global_commands(application_id, payload)
                .await
            {
                warn!(error = %error, "Global command overwrite failed");
                failures.push(RegistrationFailure {
                    command: global
                        .iter()
                        .map(|d| d.name())
                        .collect::<Vec<_>>()
                        .join(", "),
                    guild_id: None,
                    error,
                });
            }
        }

        let results = join_all(guild.iter().map(|(definition, guild_id)| async move {
            let result = self
                .registrar
                .create_guild_command(application_id, *guild_id, definition.data.clone())
                .await;
            (definition, guild_id, result)
        }))
        .await;

        for (definition, guild_id, result) in results {
            if let Err(error) = result {
                warn!(
                    command = definition.name(),
                    guild_id = %guild_id,
                    error = %error,
                    "Guild command registration failed"
                );
                failures.push(RegistrationFailure {
                    command: definition.name().to_string(),
                    guild_id: Some(guild_id.0),
                    error,
                });
            }
        }

        if failures.is_empty() {
            info!(
                global = global.len(),
                guild = guild.len(),
                "Registered application commands"
            );
            Ok(())
        } else {
            Err(ClientError::Registration { failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::{always, eq};
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::infrastructure::discord::rest::RestError;

    const APP: ApplicationId = ApplicationId(7);

    fn definitions() -> Vec<CommandDefinition> {
        vec![
            CommandDefinition::slash("ping", "Latency"),
            CommandDefinition::slash("help", "Usage"),
            CommandDefinition::slash("debug", "Internal").in_guilds(vec![GuildId(1), GuildId(2)]),
        ]
    }

    #[tokio::test]
    async fn test_registers_global_then_guild_commands() {
        let mut registrar = MockCommandRegistrar::new();
        registrar
            .expect_overwrite_global_commands()
            .withf(|app, commands| {
                *app == APP
                    && commands.len() == 2
                    && commands[0]["name"] == "ping"
                    && commands[1]["name"] == "help"
            })
            .times(1)
            .returning(|_, _| Ok(()));
        registrar
            .expect_create_guild_command()
            .with(eq(APP), always(), always())
            .times(2)
            .returning(|_, _, _| Ok(()));

        let use_case = RegisterCommandsUseCase::new(Arc::new(registrar));
        let defs = definitions();

        assert_ok!(use_case.execute(APP, &defs).await);
    }

    #[tokio::test]
    async fn test_skips_overwrite_without_global_commands() {
        let mut registrar = MockCommandRegistrar::new();
        registrar.expect_overwrite_global_commands().never();
        registrar
            .expect_create_guild_command()
            .with(eq(APP), eq(GuildId(9)), always())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let use_case = RegisterCommandsUseCase::new(Arc::new(registrar));
        let defs = vec![CommandDefinition::slash("debug", "Internal").in_guilds(vec![GuildId(9)])];

        use_case.execute(APP, &defs).await.unwrap();
    }

    #[tokio::test]
    async fn test_collects_every_failure() {
        let mut registrar = MockCommandRegistrar::new();
        registrar
            .expect_overwrite_global_commands()
            .returning(|_, _| Ok(()));
        registrar
            .expect_create_guild_command()
            .returning(|_, guild_id, _| {
                if guild_id == GuildId(2) {
                    Err(RestError::from_response(403, br#"{"message":"Missing Access","code":50001}"#))
                } else {
                    Ok(())
                }
            });

        let use_case = RegisterCommandsUseCase::new(Arc::new(registrar));
        let defs = definitions();

        let err = use_case.execute(APP, &defs).await.unwrap_err();
        let ClientError::Registration { failures } = err else {
            panic!("expected a registration error, got {err:?}");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].command, "debug");
        assert_eq!(failures[0].guild_id, Some(2));
    }

    #[tokio::test]
    async fn test_global_failure_names_every_command() {
        let mut registrar = MockCommandRegistrar::new();
        registrar
            .expect_overwrite_global_commands()
            .returning(|_, _| Err(RestError::MissingToken));

        let use_case = RegisterCommandsUseCase::new(Arc::new(registrar));
        let defs = vec![
            CommandDefinition::slash("ping", "Latency"),
            CommandDefinition::slash("help", "Usage"),
        ];

        let err = assert_err!(use_case.execute(APP, &defs).await);
        assert!(err.to_string().contains("ping, help (global)"));
    }
}
