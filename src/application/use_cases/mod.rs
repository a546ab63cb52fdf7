//! Use case implementations.

mod register_commands_use_case;

#[cfg(test)]
pub use register_commands_use_case::MockCommandRegistrar;
pub use register_commands_use_case::{CommandRegistrar, RegisterCommandsUseCase};
