//! The interpreter's working command list.
//!
//! Handlers never edit the list they are being dispatched from. They queue
//! [`ScriptEdit`]s, and the interpreter applies them after the handler
//! returns. Dispatch reads from a [`BufferSnapshot`], which shares storage
//! with the buffer until the first edit copies it.

use std::sync::Arc;

use log::debug;

/// How a whole-script replacement was requested.
#[derive(Copy, Clone, Debug, PartialEq, Eq, variantly::Variantly)]
pub enum ReplaceMode {
    Fork,
    Switch,
}

/// A queued change to the working command list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptEdit {
    /// Splice commands in directly after `index`.
    InsertAfter { index: usize, commands: Vec<String> },
    /// Rewrite the command at `index` in place.
    ReplaceAt { index: usize, command: String },
    /// Swap in a new list; the pointer restarts at 0.
    ReplaceAll { commands: Vec<String>, mode: ReplaceMode },
}

/// Copy-on-write command list with a version counter bumped on every edit.
#[derive(Clone, Debug, Default)]
pub struct CommandBuffer {
    commands: Arc<Vec<String>>,
    version: u64,
}

/// A read-only view of the buffer at one version.
#[derive(Clone, Debug)]
pub struct BufferSnapshot {
    commands: Arc<Vec<String>>,
    version: u64,
}

impl BufferSnapshot {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.commands.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

impl CommandBuffer {
    pub fn new(commands: Vec<String>) -> Self {
        Self {
            commands: Arc::new(commands),
            version: 0,
        }
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            commands: Arc::clone(&self.commands),
            version: self.version,
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.commands.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Apply one edit. Out-of-range anchors clamp to the end of the list.
    pub fn apply(&mut self, edit: ScriptEdit) {
        match edit {
            ScriptEdit::InsertAfter { index, commands } => {
                let list = Arc::make_mut(&mut self.commands);
                let at = (index + 1).min(list.len());
                debug!("inserting {} command(s) at {at}", commands.len());
                list.splice(at..at, commands);
            },
            ScriptEdit::ReplaceAt { index, command } => {
                let list = Arc::make_mut(&mut self.commands);
                match list.get_mut(index) {
                    Some(slot) => *slot = command,
                    None => list.push(command),
                }
            },
            ScriptEdit::ReplaceAll { commands, mode } => {
                debug!("replacing script ({mode:?}) with {} command(s)", commands.len());
                self.commands = Arc::new(commands);
            },
        }
        self.version += 1;
    }
}
