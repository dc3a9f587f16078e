//! Command name to handler lookup.
//!
//! Names are case-insensitive. Aliases are a second table pointing at
//! canonical names; an alias may not point at another alias.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use log::warn;
use thiserror::Error;

use crate::interpreter::{ExecutionContext, Interpreter};

/// A command handler. `args[0]` is the command name as written.
///
/// A handler either advances the interpreter's pointer or leaves it alone to
/// be dispatched again next tick. Returning `Err` aborts the event.
pub type CommandHandler = fn(&mut Interpreter, &[String], &mut ExecutionContext<'_>) -> anyhow::Result<()>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("alias '{alias}' cannot target '{target}', which is itself an alias")]
    AliasChain { alias: String, target: String },
    #[error("alias '{alias}' targets unregistered command '{target}'")]
    UnknownTarget { alias: String, target: String },
    #[error("alias '{0}' shadows a registered command")]
    ShadowsCommand(String),
}

#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, (String, CommandHandler)>,
    aliases: HashMap<String, String>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.handlers.len())
            .field("aliases", &self.aliases.len())
            .finish()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Registering a name twice keeps the later handler.
    pub fn register(&mut self, name: &str, handler: CommandHandler) {
        let key = name.to_ascii_lowercase();
        if self.handlers.contains_key(&key) {
            warn!("command '{name}' registered twice; the later handler wins");
        }
        self.handlers.insert(key, (name.to_string(), handler));
    }

    /// Register `alias` as another name for the command `target`.
    pub fn register_alias(&mut self, alias: &str, target: &str) -> Result<(), RegistryError> {
        let alias_key = alias.to_ascii_lowercase();
        let target_key = target.to_ascii_lowercase();
        if self.aliases.contains_key(&target_key) {
            return Err(RegistryError::AliasChain {
                alias: alias.to_string(),
                target: target.to_string(),
            });
        }
        if !self.handlers.contains_key(&target_key) {
            return Err(RegistryError::UnknownTarget {
                alias: alias.to_string(),
                target: target.to_string(),
            });
        }
        if self.handlers.contains_key(&alias_key) {
            return Err(RegistryError::ShadowsCommand(alias.to_string()));
        }
        if self.aliases.insert(alias_key, target_key).is_some() {
            warn!("alias '{alias}' registered twice; the later target wins");
        }
        Ok(())
    }

    /// Find the canonical name and handler for `name` (alias or command).
    pub fn resolve(&self, name: &str) -> Option<(&str, CommandHandler)> {
        let mut key = name.to_ascii_lowercase();
        if let Some(target) = self.aliases.get(&key) {
            key.clone_from(target);
        }
        self.handlers
            .get(&key)
            .map(|(canonical, handler)| (canonical.as_str(), *handler))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Canonical command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.values().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        names
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: Arc<CommandRegistry> = Arc::new(crate::commands::build_registry());
}

/// The built-in command table, built on first use.
pub fn default_registry() -> Arc<CommandRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}
