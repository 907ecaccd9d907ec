//! Command registry.
//!
//! Built once at startup, then frozen behind an `Arc` and only read. Names
//! and aliases share one case-sensitive namespace.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::command::{BoxedCommand, Command};
use crate::error::{DispatchError, DispatchResult, RegistryError};

/// Maps command names and aliases to commands.
#[derive(Default)]
pub struct CommandRegistry {
    /// Commands in registration order.
    commands: Vec<BoxedCommand>,
    /// Name or alias → index into `commands`.
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command under its name and aliases.
    pub fn register<C: Command>(&mut self, command: C) -> Result<(), RegistryError> {
        self.register_boxed(Arc::new(command))
    }

    /// Registers an already shared command.
    pub fn register_boxed(&mut self, command: BoxedCommand) -> Result<(), RegistryError> {
        let names: Vec<String> = std::iter::once(command.name().to_string())
            .chain(command.aliases().iter().cloned())
            .collect();

        for name in &names {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(RegistryError::InvalidName(name.clone()));
            }
            if let Some(&owner) = self.index.get(name) {
                return Err(RegistryError::Duplicate {
                    name: name.clone(),
                    owner: self.commands[owner].name().to_string(),
                });
            }
        }
        // Aliases within the same command must be distinct too.
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(RegistryError::Duplicate {
                    name: name.clone(),
                    owner: command.name().to_string(),
                });
            }
        }

        let slot = self.commands.len();
        for name in names {
            self.index.insert(name, slot);
        }
        debug!(
            command = command.name(),
            affinity = ?command.affinity(),
            "Registered command"
        );
        self.commands.push(command);
        Ok(())
    }

    /// Looks up a command by name or alias.
    pub fn lookup(&self, name: &str) -> DispatchResult<BoxedCommand> {
        self.get(name)
            .ok_or_else(|| DispatchError::CommandNotFound(name.to_string()))
    }

    /// Looks up a command by name or alias.
    pub fn get(&self, name: &str) -> Option<BoxedCommand> {
        self.index
            .get(name)
            .map(|&slot| Arc::clone(&self.commands[slot]))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterates over commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BoxedCommand> {
        self.commands.iter()
    }

    /// Number of distinct commands (aliases are not counted).
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.iter().map(|c| c.name()).collect::<Vec<_>>())
            .finish()
    }
}
