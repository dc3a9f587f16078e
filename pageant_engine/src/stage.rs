//! The stage: everything a running event touches but does not own.
//!
//! Rendering, audio, menus, the player's save data, and network sync all live
//! behind the [`Stage`] trait. Command handlers reach it only through the
//! [`ExecutionContext`](crate::ExecutionContext) they are given.

pub mod recording;

pub use recording::{RecordingStage, StageCall};

use anyhow::Result;
use pageant_data::{Color, Rect, TilePoint};
use pageant_script::{ArgError, Args};
use serde::{Deserialize, Serialize};

/// Where the camera points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CameraMode {
    /// Track the local player.
    Follow,
    /// Center on a fixed tile.
    Fixed(TilePoint),
    /// Pan by a tile offset over a duration.
    Pan { offset: TilePoint, duration_ms: i32 },
}

/// A one-off visual flourish, passed through to the renderer untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub id: String,
    pub tile: TilePoint,
    pub options: Vec<String>,
    pub tint: Option<Color>,
    /// Sprite-sheet rectangle to draw from, in pixels.
    pub source: Option<Rect>,
}

/// What happens once an event is over.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum EndBehavior {
    /// Return control in place.
    #[default]
    Plain,
    /// Send the player to the location's exit.
    WarpOut,
    /// End the day.
    NewDay,
    /// Put the local player on a tile.
    Position(TilePoint),
    /// Queue one more line from an actor.
    Dialogue { actor: String, text: String },
    /// Hide an actor for the rest of the day.
    Invisible(String),
}

impl EndBehavior {
    /// Decode the arguments of an `end` command (index 0 is the command name).
    pub fn from_args(tokens: &[String]) -> Result<EndBehavior, ArgError> {
        let args = Args::new(tokens);
        let Some(kind) = args.opt(1) else {
            return Ok(EndBehavior::Plain);
        };
        match kind.to_ascii_lowercase().as_str() {
            "warpout" => Ok(EndBehavior::WarpOut),
            "newday" => Ok(EndBehavior::NewDay),
            "position" => Ok(EndBehavior::Position(args.point(2, "position")?)),
            "dialogue" => Ok(EndBehavior::Dialogue {
                actor: args.get(2, "actor")?.to_string(),
                text: args.remainder(3, "text")?,
            }),
            "invisible" => Ok(EndBehavior::Invisible(args.get(2, "actor")?.to_string())),
            _ => Err(ArgError::Invalid {
                index: 1,
                name: "end behavior".to_string(),
                value: kind.to_string(),
                expected: "warpOut, newDay, position, dialogue, or invisible",
            }),
        }
    }
}

/// How an event left the terminal state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, variantly::Variantly)]
pub enum EventOutcome {
    /// Reached an `end` command (or ran off the end of the script).
    Finished(EndBehavior),
    /// Skipped by request; carries the behavior of the script's final `end`.
    Skipped(EndBehavior),
    /// Halted by a fatal error at `command_index`.
    Aborted { command_index: usize, reason: String },
}

/// External collaborators consumed by command handlers.
///
/// Implementations must be cheap to poll: handlers query dialogue, fade, and
/// gate state every tick while they wait.
pub trait Stage {
    // ---- players ----
    fn local_player_number(&self) -> u32;
    fn online_players(&self) -> Vec<u32>;

    // ---- dialogue and menus ----
    fn is_dialogue_open(&self) -> bool;
    fn is_any_modal_menu_open(&self) -> bool;
    fn push_dialogue(&mut self, speaker: Option<&str>, text: &str);
    fn ask_question(&mut self, question: &str, answers: &[String]);
    /// The index of the answer picked for the last question, once there is one.
    fn take_answer(&mut self) -> Option<usize>;
    fn close_dialogue_and_menus(&mut self);

    // ---- world state ----
    /// True while something outside the event (a minigame overlay, say) owns the frame.
    fn is_world_frozen(&self) -> bool;
    fn begin_screen_fade(&mut self, to_black: bool, speed: f32, continue_during_fade: bool);
    fn is_fade_complete(&self) -> bool;
    fn flash_screen(&mut self, alpha: f32);

    // ---- multiplayer ready gates ----
    fn request_local_ready(&mut self, gate: &str);
    fn is_gate_ready(&self, gate: &str) -> bool;
    /// Show (or, with `None`, hide) the "waiting for other players" overlay.
    fn set_waiting_for_players(&mut self, gate: Option<&str>);

    // ---- audio and visuals ----
    fn play_sound(&mut self, id: &str);
    /// `None` stops the current track.
    fn play_music(&mut self, id: Option<&str>);
    fn set_viewport(&mut self, camera: CameraMode);
    fn spawn_transient_effect(&mut self, spec: EffectSpec);
    fn show_emote(&mut self, actor: &str, emote: i32);

    // ---- save data ----
    fn has_flag(&self, flag: &str) -> bool;
    fn add_flag(&mut self, flag: &str);
    fn change_friendship(&mut self, npc: &str, amount: i32);
    fn add_item(&mut self, item: &str, count: i32);
    /// Resolve a translation key such as `Strings\Events:Fork1`.
    fn translate(&self, _key: &str) -> Option<String> {
        None
    }
    /// Dialogue text an actor would say for a game-state key.
    fn dialogue_for_state(&self, _actor: &str, _key: &str) -> Option<String> {
        None
    }

    // ---- penalties and prizes ----
    /// Remove items after a knock-out; returns how many were lost.
    fn apply_death_penalty(&mut self) -> usize;
    fn show_lost_items(&mut self);
    fn is_festival_winner(&self) -> bool;
    fn award_festival_prize(&mut self, prize: Option<&str>);

    // ---- lifecycle ----
    /// Run one skip-time trigger action.
    fn run_trigger_action(&mut self, action: &str) -> Result<()>;
    fn end_event(&mut self, outcome: &EventOutcome);
    /// Per-tick hook for location effects; runs before any command dispatch.
    fn on_tick(&mut self, _elapsed_ms: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        pageant_script::split_command(text).unwrap()
    }

    #[test]
    fn end_behaviors_parse() {
        assert_eq!(EndBehavior::from_args(&tokens("end")).unwrap(), EndBehavior::Plain);
        assert_eq!(
            EndBehavior::from_args(&tokens("end warpOut")).unwrap(),
            EndBehavior::WarpOut
        );
        assert_eq!(
            EndBehavior::from_args(&tokens("end position 12 8")).unwrap(),
            EndBehavior::Position(TilePoint::new(12, 8))
        );
        assert_eq!(
            EndBehavior::from_args(&tokens(r#"end dialogue Lewis "See you tomorrow.""#)).unwrap(),
            EndBehavior::Dialogue {
                actor: "Lewis".into(),
                text: "See you tomorrow.".into()
            }
        );
    }

    #[test]
    fn bad_end_behavior_is_an_arg_error() {
        let err = EndBehavior::from_args(&tokens("end sideways")).unwrap_err();
        assert_eq!(err.index(), 1);
        assert!(EndBehavior::from_args(&tokens("end position 3")).is_err());
    }
}
