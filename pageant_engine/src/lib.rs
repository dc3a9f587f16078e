#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
//! Frame-stepped interpreter for staged event scripts: cutscenes, festival
//! set pieces, and other scenes built from slash-delimited commands.

pub const PAGEANT_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod actor;
pub mod buffer;
pub mod choreography;
pub mod commands;
pub mod config;
pub mod data_paths;
pub mod errors;
pub mod interpreter;
pub mod movement;
pub mod registry;
pub mod roster;
pub mod stage;
pub mod store;

// Re-exports for convenience
pub use actor::{Actor, ActorId, ActorKind, ActorRef};
pub use choreography::{DanceBinding, DanceInput, DancePair, DanceRole, Dancer, assemble_dance_event};
pub use config::{EngineConfig, load_config};
pub use errors::{CollectingSink, ErrorReport, ErrorSink, EventError, LogSink, Severity};
pub use interpreter::{EventFlags, ExecutionContext, FRAME_MS, Interpreter, PendingWait, Phase};
pub use registry::{CommandHandler, CommandRegistry, default_registry};
pub use roster::{ActorHandle, Roster};
pub use stage::{CameraMode, EffectSpec, EndBehavior, EventOutcome, RecordingStage, Stage, StageCall};
pub use store::{Script, ScriptKey, ScriptStore};
