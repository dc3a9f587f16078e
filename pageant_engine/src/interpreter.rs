//! The event interpreter.
//!
//! An [`Interpreter`] owns one event's working command list, its actors, and
//! its movement state. The host calls [`Interpreter::tick`] once per frame.
//! A tick never blocks: commands that need to wait simply leave the pointer
//! where it is and are dispatched again on the next tick.
//!
//! # Tick order
//!
//! 1. Terminal events do nothing; a pending skip request lands here.
//! 2. The first tick consumes the header (music, camera, actor layout).
//! 3. Actor sprites, timers, and path controllers update.
//! 4. A frozen world stops the tick here.
//! 5. Pending `move` targets are resolved; an open barrier stops the tick.
//! 6. One command is dispatched, or several inside a simultaneous block.
//!
//! # Logging
//!
//! Each command logs once when first dispatched:
//! ```text
//! └─ command: name(arg, arg)
//! ```
//! Re-dispatches of a waiting command log at `debug!` only.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use log::{debug, info, warn};
use pageant_data::Direction;
use pageant_script::{ArgError, Args, split_command};

use crate::actor::{Actor, ActorId, ActorKind, ActorRef};
use crate::buffer::{CommandBuffer, ReplaceMode, ScriptEdit};
use crate::config::EngineConfig;
use crate::errors::{ErrorReport, ErrorSink, EventError, Severity};
use crate::movement::{MovementSync, PathController};
use crate::registry::{CommandRegistry, default_registry};
use crate::roster::{ActorHandle, Roster};
use crate::stage::{CameraMode, EndBehavior, EventOutcome, Stage};
use crate::store::{Script, ScriptKey, ScriptStore};

/// Nominal frame length used when a host does not supply one.
pub const FRAME_MS: f32 = 1000.0 / 60.0;

/// Upper bound on commands dispatched in one tick, so a runaway simultaneous
/// block cannot hang the frame.
const MAX_DISPATCH_PER_TICK: usize = 1024;

#[derive(Copy, Clone, Debug, PartialEq, Eq, variantly::Variantly)]
pub enum Phase {
    Uninitialized,
    Running,
    /// The last dispatched command is waiting.
    Suspended,
    Finished,
    Skipped,
}

/// What a multi-tick command is waiting on. Recording the wait keeps a
/// re-dispatched command from repeating its side effect.
#[derive(Clone, Debug, PartialEq, variantly::Variantly)]
pub enum PendingWait {
    Dialogue,
    /// A question is up; `fork` is the answer index that sets the fork variable.
    Answer { fork: Option<usize> },
    Pause { remaining_ms: f32 },
    Fade,
    Emote(ActorHandle),
    Menu,
    Gate(String),
}

/// Script-visible state flags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventFlags {
    pub skippable: bool,
    pub skipped: bool,
    pub simultaneous: bool,
    pub continue_after_move: bool,
    pub forked: bool,
    pub switched: bool,
}

/// Per-call collaborators handed to every command handler.
pub struct ExecutionContext<'a> {
    pub stage: &'a mut dyn Stage,
    pub sink: &'a mut dyn ErrorSink,
    /// Loaded content, for fork lookups against the event's own asset.
    pub scripts: Option<&'a ScriptStore>,
    pub elapsed_ms: f32,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(stage: &'a mut dyn Stage, sink: &'a mut dyn ErrorSink) -> Self {
        Self {
            stage,
            sink,
            scripts: None,
            elapsed_ms: FRAME_MS,
        }
    }

    #[must_use]
    pub fn with_scripts(mut self, scripts: &'a ScriptStore) -> Self {
        self.scripts = Some(scripts);
        self
    }

    #[must_use]
    pub fn with_elapsed(mut self, elapsed_ms: f32) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }
}

/// One running event.
pub struct Interpreter {
    event_id: String,
    key: Option<ScriptKey>,
    buffer: CommandBuffer,
    pointer: usize,
    phase: Phase,
    config: EngineConfig,
    registry: Arc<CommandRegistry>,
    roster: Roster,
    movement: MovementSync,
    paths: Vec<PathController>,
    flags: EventFlags,
    wait: Option<PendingWait>,
    edits: Vec<ScriptEdit>,
    dispatching: Option<usize>,
    skip_requested: bool,
    chain_requested: bool,
    skip_actions: Vec<String>,
    scene_data: HashMap<String, String>,
    special_event_variable: bool,
    last_logged: Option<(usize, u64)>,
    outcome: Option<EventOutcome>,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("event_id", &self.event_id)
            .field("pointer", &self.pointer)
            .field("len", &self.buffer.len())
            .field("phase", &self.phase)
            .field("flags", &self.flags)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl Interpreter {
    pub fn new(script: Script, config: EngineConfig) -> Self {
        let mut interp = Self::from_commands(script.key.to_string(), script.commands().to_vec(), config);
        interp.key = Some(script.key);
        interp
    }

    /// An interpreter over ad-hoc commands (no store key).
    pub fn from_commands(event_id: impl Into<String>, commands: Vec<String>, config: EngineConfig) -> Self {
        Self {
            event_id: event_id.into(),
            key: None,
            buffer: CommandBuffer::new(commands),
            pointer: 0,
            phase: Phase::Uninitialized,
            config,
            registry: default_registry(),
            roster: Roster::default(),
            movement: MovementSync::default(),
            paths: Vec::new(),
            flags: EventFlags::default(),
            wait: None,
            edits: Vec::new(),
            dispatching: None,
            skip_requested: false,
            chain_requested: false,
            skip_actions: Vec::new(),
            scene_data: HashMap::new(),
            special_event_variable: false,
            last_logged: None,
            outcome: None,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Per-scene fork segments, consulted before the content store.
    #[must_use]
    pub fn with_scene_data(mut self, scene_data: HashMap<String, String>) -> Self {
        self.scene_data = scene_data;
        self
    }

    // ---------- inspection ----------

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn key(&self) -> Option<&ScriptKey> {
        self.key.as_ref()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Finished | Phase::Skipped)
    }

    pub fn is_skippable(&self) -> bool {
        self.flags.skippable
    }

    pub fn outcome(&self) -> Option<&EventOutcome> {
        self.outcome.as_ref()
    }

    pub fn commands(&self) -> &[String] {
        self.buffer.commands()
    }

    pub fn buffer_version(&self) -> u64 {
        self.buffer.version()
    }

    /// Raw text of the command being dispatched (or under the pointer).
    pub fn current_command(&self) -> Option<&str> {
        self.buffer.get(self.dispatching.unwrap_or(self.pointer))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn flags(&self) -> &EventFlags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut EventFlags {
        &mut self.flags
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn movement(&self) -> &MovementSync {
        &self.movement
    }

    pub fn movement_mut(&mut self) -> &mut MovementSync {
        &mut self.movement
    }

    pub fn paths(&self) -> &[PathController] {
        &self.paths
    }

    /// Start a path controller, replacing any other path for the same actor.
    pub fn add_path(&mut self, path: PathController) {
        self.paths.retain(|p| p.actor != path.actor);
        self.paths.push(path);
    }

    pub fn clear_paths(&mut self) {
        self.paths.clear();
    }

    pub fn remove_actor(&mut self, handle: ActorHandle) -> Option<Actor> {
        self.movement.remove(handle);
        self.paths.retain(|p| p.actor != handle);
        self.roster.remove(handle)
    }

    pub fn wait(&self) -> Option<&PendingWait> {
        self.wait.as_ref()
    }

    pub fn set_wait(&mut self, wait: PendingWait) {
        self.wait = Some(wait);
    }

    pub fn wait_mut(&mut self) -> Option<&mut PendingWait> {
        self.wait.as_mut()
    }

    pub fn special_event_variable(&self) -> bool {
        self.special_event_variable
    }

    pub fn set_special_event_variable(&mut self, value: bool) {
        self.special_event_variable = value;
    }

    pub fn scene_data(&self, key: &str) -> Option<&str> {
        self.scene_data.get(key).map(String::as_str)
    }

    pub fn set_skip_actions(&mut self, actions: Vec<String>) {
        self.skip_actions = actions;
    }

    pub fn skip_actions(&self) -> &[String] {
        &self.skip_actions
    }

    // ---------- pointer and script edits ----------

    /// Move the pointer forward, never past one beyond the last command.
    /// Any recorded wait is cleared.
    pub fn advance(&mut self, n: usize) {
        self.pointer = (self.pointer + n).min(self.buffer.len());
        self.wait = None;
    }

    /// Queue commands to run right after the command being dispatched.
    pub fn insert_after_current(&mut self, commands: Vec<String>) {
        let index = self.dispatching.unwrap_or(self.pointer);
        self.edits.push(ScriptEdit::InsertAfter { index, commands });
    }

    /// Queue an in-place rewrite of the command being dispatched.
    pub fn replace_current(&mut self, command: String) {
        let index = self.dispatching.unwrap_or(self.pointer);
        self.edits.push(ScriptEdit::ReplaceAt { index, command });
    }

    /// Queue a whole-script replacement (fork or switch).
    pub fn replace_script(&mut self, commands: Vec<String>, mode: ReplaceMode) {
        self.edits.push(ScriptEdit::ReplaceAll { commands, mode });
    }

    /// Ask for a skip once the current handler returns, or at the start of
    /// the next tick when nothing is being dispatched.
    pub fn request_skip(&mut self) {
        self.skip_requested = true;
    }

    /// Dispatch the next command in this same tick.
    pub fn request_chain(&mut self) {
        self.chain_requested = true;
    }

    fn apply_edits(&mut self) {
        for edit in std::mem::take(&mut self.edits) {
            match &edit {
                ScriptEdit::InsertAfter { index, commands } => {
                    if self.pointer > index + 1 {
                        self.pointer += commands.len();
                    }
                },
                ScriptEdit::ReplaceAt { .. } => {},
                ScriptEdit::ReplaceAll { mode, .. } => {
                    self.pointer = 0;
                    self.wait = None;
                    match mode {
                        ReplaceMode::Fork => self.flags.forked = true,
                        ReplaceMode::Switch => self.flags.switched = true,
                    }
                },
            }
            self.buffer.apply(edit);
        }
        self.pointer = self.pointer.min(self.buffer.len());
    }

    // ---------- error reporting ----------

    /// Report a failure for the command being dispatched.
    pub fn report(&mut self, ctx: &mut ExecutionContext<'_>, severity: Severity, reason: impl Display) {
        let index = self.dispatching.unwrap_or(self.pointer);
        ctx.sink.report(ErrorReport {
            event_id: self.event_id.clone(),
            command_index: index,
            command: self.buffer.get(index).unwrap_or_default().to_string(),
            reason: reason.to_string(),
            severity,
        });
    }

    /// Report a recoverable problem without moving the pointer.
    pub fn log_error(&mut self, ctx: &mut ExecutionContext<'_>, reason: impl Display) {
        self.report(ctx, Severity::Recoverable, reason);
    }

    /// Report a recoverable problem and skip the command.
    pub fn log_error_and_skip(&mut self, ctx: &mut ExecutionContext<'_>, reason: impl Display) {
        self.report(ctx, Severity::Recoverable, reason);
        self.advance(1);
    }

    /// Unwrap a parse result, or report it and skip the command.
    pub fn accept<T>(&mut self, ctx: &mut ExecutionContext<'_>, parsed: Result<T, ArgError>) -> Option<T> {
        match parsed {
            Ok(value) => Some(value),
            Err(e) => {
                self.log_error_and_skip(ctx, e);
                None
            },
        }
    }

    /// Resolve an actor token for the command being dispatched.
    ///
    /// When the actor is missing, the command is skipped: silently for an
    /// optional (`name?`) reference, with a recoverable report otherwise.
    pub fn require_actor(&mut self, ctx: &mut ExecutionContext<'_>, token: &str) -> Option<ActorHandle> {
        let actor = ActorRef::parse(token);
        match self.roster.resolve(&actor) {
            Some(handle) => Some(handle),
            None if actor.optional => {
                debug!("optional actor '{actor}' not present; skipping command");
                self.advance(1);
                None
            },
            None => {
                self.log_error_and_skip(ctx, format!("no actor found matching '{actor}'"));
                None
            },
        }
    }

    // ---------- the tick ----------

    /// Advance the event by one frame. Returns the phase afterwards.
    pub fn tick(&mut self, ctx: &mut ExecutionContext<'_>) -> Phase {
        if self.is_terminal() {
            return self.phase;
        }
        if self.skip_requested {
            self.skip(ctx);
            return self.phase;
        }
        if self.phase.is_uninitialized() {
            if !(self.flags.forked || self.flags.switched)
                && let Err(e) = self.initialize(ctx)
            {
                let index = match &e {
                    EventError::BadHeader { index, .. } => *index,
                    _ => 0,
                };
                let command = self.buffer.get(index).unwrap_or_default().to_string();
                self.abort(ctx, index, command, e.to_string());
                return self.phase;
            }
            self.phase = Phase::Running;
        }

        self.update_actors(ctx);

        if ctx.stage.is_world_frozen() {
            debug!("world frozen; event {} holds", self.event_id);
            return self.phase;
        }

        if !self.movement.is_empty() {
            let closed = self.movement.resolve(&mut self.roster, &self.config);
            if closed && self.flags.continue_after_move {
                self.flags.continue_after_move = false;
            } else if closed {
                debug!("movement barrier closed at command {}", self.pointer);
                self.advance(1);
                self.phase = Phase::Running;
                return self.phase;
            } else if !self.flags.continue_after_move {
                return self.phase;
            }
        }

        self.dispatch(ctx);
        self.phase
    }

    /// Skip the event: halt every actor, close menus, run the skip actions
    /// once, and end with the final `end` command's behavior. Calling it on a
    /// finished or skipped event does nothing.
    ///
    /// Called from inside a handler, the skip is deferred until that handler
    /// returns, so it never lands between a handler and its script edits.
    pub fn skip(&mut self, ctx: &mut ExecutionContext<'_>) {
        if self.is_terminal() {
            debug!("skip ignored; event {} already over", self.event_id);
            return;
        }
        if let Some(index) = self.dispatching {
            debug!("skip requested while dispatching command {index}; deferring");
            self.request_skip();
            return;
        }
        info!("skipping event {}", self.event_id);
        self.run_skip(ctx, None);
    }

    /// End the event normally.
    pub fn finish(&mut self, ctx: &mut ExecutionContext<'_>, behavior: EndBehavior) {
        if self.is_terminal() {
            return;
        }
        self.wait = None;
        self.movement.clear();
        self.paths.clear();
        self.roster.halt_all();
        self.flags.simultaneous = false;
        info!("event {} finished ({behavior:?})", self.event_id);
        self.conclude(ctx, Phase::Finished, EventOutcome::Finished(behavior));
    }

    fn initialize(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), EventError> {
        let header_len = self.config.header_len;
        if self.buffer.len() < header_len {
            return Err(EventError::ShortHeader {
                expected: header_len,
                found: self.buffer.len(),
            });
        }
        self.roster = Roster::new(ctx.stage.local_player_number());
        let header: Vec<String> = self.buffer.commands()[..header_len.min(3)].to_vec();
        if let Some(music) = header.first() {
            self.init_music(ctx, music);
        }
        if let Some(camera) = header.get(1) {
            let camera = parse_camera(camera)?;
            ctx.stage.set_viewport(camera);
        }
        if let Some(layout) = header.get(2) {
            self.init_layout(ctx, layout)?;
        }
        self.pointer = header_len;
        info!(
            "event {} initialized with {} actor(s)",
            self.event_id,
            self.roster.len()
        );
        Ok(())
    }

    fn init_music(&mut self, ctx: &mut ExecutionContext<'_>, music: &str) {
        let track = music.split_whitespace().next().unwrap_or("none");
        match track.to_ascii_lowercase().as_str() {
            "continue" => {},
            "none" => ctx.stage.play_music(None),
            _ => ctx.stage.play_music(Some(track)),
        }
    }

    fn init_layout(&mut self, ctx: &mut ExecutionContext<'_>, layout: &str) -> Result<(), EventError> {
        let bad = |reason: String| EventError::BadHeader {
            index: 2,
            field: "actor layout",
            reason,
        };
        let tokens = split_command(layout).map_err(|e| bad(e.to_string()))?;
        if tokens.len() % 4 != 0 {
            return Err(bad(format!(
                "expected groups of 'name x y facing', found {} token(s)",
                tokens.len()
            )));
        }
        let online = ctx.stage.online_players();
        let local = ctx.stage.local_player_number();
        let size = self.config.tile_size;
        for group in tokens.chunks(4) {
            let args = Args::new(group);
            let tile = args.point(1, "tile").map_err(|e| bad(e.to_string()))?;
            let facing = args.direction(3, "facing").map_err(|e| bad(e.to_string()))?;
            let actor = match ActorRef::parse(&group[0]).id {
                ActorId::LocalPlayer => player_actor(local, tile, facing, size),
                ActorId::Player(number) if online.contains(&number) || number == local => {
                    player_actor(number, tile, facing, size)
                },
                ActorId::Player(number) => {
                    debug!("player {number} is not online; leaving them out of the layout");
                    continue;
                },
                ActorId::Named(name) => Actor::new(name, ActorKind::NonPlayerCharacter, tile, facing, size),
            };
            self.roster.spawn(actor);
        }
        Ok(())
    }

    fn update_actors(&mut self, ctx: &mut ExecutionContext<'_>) {
        let elapsed = ctx.elapsed_ms;
        for (_, actor) in self.roster.iter_mut() {
            actor.update(elapsed);
        }
        let roster = &mut self.roster;
        let config = &self.config;
        self.paths.retain_mut(|path| match roster.get_mut(path.actor) {
            Some(actor) => !path.update(actor, elapsed, config),
            None => false,
        });
        ctx.stage.on_tick(elapsed);
    }

    fn dispatch(&mut self, ctx: &mut ExecutionContext<'_>) {
        for _ in 0..MAX_DISPATCH_PER_TICK {
            let snapshot = self.buffer.snapshot();
            let index = self.pointer;
            let Some(raw) = snapshot.get(index) else {
                warn!("event {} ran out of commands without an `end`", self.event_id);
                self.finish(ctx, EndBehavior::Plain);
                return;
            };
            let before = (index, snapshot.version());

            let marker = self.config.comment_marker.as_str();
            if !marker.is_empty() && raw.starts_with(marker) {
                debug!("comment at {index} skipped");
                self.advance(1);
                if self.flags.simultaneous {
                    continue;
                }
                return;
            }

            self.chain_requested = false;
            self.run_command(ctx, index, raw);

            if self.is_terminal() {
                return;
            }
            if self.skip_requested {
                self.skip(ctx);
                return;
            }
            let progressed = (self.pointer, self.buffer.version()) != before;
            self.phase = if progressed { Phase::Running } else { Phase::Suspended };
            let keep_going = self.flags.simultaneous || std::mem::take(&mut self.chain_requested);
            if !progressed || !keep_going {
                return;
            }
        }
        warn!(
            "event {} dispatched {MAX_DISPATCH_PER_TICK} commands in one tick; yielding",
            self.event_id
        );
    }

    fn run_command(&mut self, ctx: &mut ExecutionContext<'_>, index: usize, raw: &str) {
        self.dispatching = Some(index);
        let tokens = match split_command(raw) {
            Ok(tokens) if !tokens.is_empty() => tokens,
            Ok(_) => {
                self.advance(1);
                self.dispatching = None;
                return;
            },
            Err(e) => {
                self.log_error_and_skip(ctx, e);
                self.dispatching = None;
                return;
            },
        };
        let registry = Arc::clone(&self.registry);
        let Some((canonical, handler)) = registry.resolve(&tokens[0]) else {
            self.report(ctx, Severity::UnknownCommand, format!("unknown command '{}'", tokens[0]));
            self.advance(1);
            self.dispatching = None;
            return;
        };

        let stamp = (index, self.buffer.version());
        if self.last_logged == Some(stamp) {
            debug!("   waiting: {canonical} at {index}");
        } else {
            info!("└─ command: {canonical}({})", tokens[1..].join(", "));
            self.last_logged = Some(stamp);
        }

        let result = handler(self, &tokens, ctx);
        self.apply_edits();
        self.dispatching = None;
        if let Err(e) = result {
            self.abort(ctx, index, raw.to_string(), format!("{e:#}"));
        }
    }

    fn abort(&mut self, ctx: &mut ExecutionContext<'_>, index: usize, command: String, reason: String) {
        ctx.sink.report(ErrorReport {
            event_id: self.event_id.clone(),
            command_index: index,
            command,
            reason: reason.clone(),
            severity: Severity::Fatal,
        });
        self.run_skip(
            ctx,
            Some(EventOutcome::Aborted {
                command_index: index,
                reason,
            }),
        );
    }

    fn run_skip(&mut self, ctx: &mut ExecutionContext<'_>, outcome: Option<EventOutcome>) {
        self.flags.skipped = true;
        self.flags.simultaneous = false;
        self.flags.continue_after_move = false;
        self.skip_requested = false;
        self.wait = None;
        self.edits.clear();
        self.movement.clear();
        self.paths.clear();
        for (_, actor) in self.roster.iter_mut() {
            actor.halt();
            actor.clear_overrides();
        }
        ctx.stage.close_dialogue_and_menus();

        for action in std::mem::take(&mut self.skip_actions) {
            info!("└─ skip action: {action}");
            if let Err(e) = ctx.stage.run_trigger_action(&action) {
                ctx.sink.report(ErrorReport {
                    event_id: self.event_id.clone(),
                    command_index: self.pointer,
                    command: action.clone(),
                    reason: format!("skip action failed: {e:#}"),
                    severity: Severity::Recoverable,
                });
            }
        }

        let outcome = outcome.unwrap_or_else(|| EventOutcome::Skipped(self.final_end_behavior()));
        self.conclude(ctx, Phase::Skipped, outcome);
    }

    fn conclude(&mut self, ctx: &mut ExecutionContext<'_>, phase: Phase, outcome: EventOutcome) {
        self.phase = phase;
        ctx.stage.end_event(&outcome);
        self.outcome = Some(outcome);
    }

    /// End behavior of the last `end` command in the working script.
    fn final_end_behavior(&self) -> EndBehavior {
        for raw in self.buffer.commands().iter().rev() {
            let Ok(tokens) = split_command(raw) else {
                continue;
            };
            if tokens.first().is_some_and(|name| name.eq_ignore_ascii_case("end")) {
                return EndBehavior::from_args(&tokens).unwrap_or_else(|e| {
                    warn!("final `end` in {} is malformed ({e}); ending plainly", self.event_id);
                    EndBehavior::Plain
                });
            }
        }
        EndBehavior::Plain
    }
}

fn player_actor(number: u32, tile: pageant_data::TilePoint, facing: Direction, tile_size: i32) -> Actor {
    Actor::new(
        format!("farmer{number}"),
        ActorKind::PlayerAvatar { number },
        tile,
        facing,
        tile_size,
    )
}

fn parse_camera(text: &str) -> Result<CameraMode, EventError> {
    let bad = |reason: String| EventError::BadHeader {
        index: 1,
        field: "camera",
        reason,
    };
    let tokens = split_command(text).map_err(|e| bad(e.to_string()))?;
    if tokens.len() == 1 && tokens[0].eq_ignore_ascii_case("follow") {
        return Ok(CameraMode::Follow);
    }
    // header tokens are all arguments, so index them from a dummy name slot
    let mut shifted = vec![String::new()];
    shifted.extend(tokens);
    let tile = Args::new(&shifted).point(1, "camera tile").map_err(|e| bad(e.to_string()))?;
    Ok(CameraMode::Fixed(tile))
}
