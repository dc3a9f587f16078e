//! pageant_script: the text layer for Pageant event scripts.
//!
//! An event script is one string of slash-delimited commands, each of which
//! is a space-delimited command name followed by arguments:
//!
//! ```text
//! none/-1000 -1000/farmer 5 7 0 Abigail 6 7 3/move farmer 1 0 1/speak Abigail "Hi/there!"/end
//! ```
//!
//! Double quotes protect both separators. This crate splits that text
//! ([`split_script`], [`split_command`]) and decodes individual arguments into
//! typed values with structured errors ([`Args`], [`ArgError`]).

mod args;
mod tokenizer;

pub use args::{ArgError, Args};
pub use tokenizer::{ScriptSyntaxError, split_command, split_script, unquote};
