//! Built-in command handlers and the default command table.
//!
//! Handlers are grouped by concern:
//! - [`flow`]: pointer control, forks, skips, pauses, ready gates
//! - [`dialogue`]: speech, messages, questions
//! - [`actors`]: movement, facing, sprite frames, spawning
//! - [`staging`]: camera, audio, fades, effects
//! - [`world`]: save-data effects, penalties, festival prizes
//!
//! Every handler follows the same contract: advance the pointer when done, or
//! leave it alone to run again next tick. Argument problems are reported
//! through [`Interpreter::accept`] and skip the command.

mod actors;
mod dialogue;
mod flow;
mod staging;
mod world;

use anyhow::{Result, anyhow};
use log::warn;

use crate::actor::Actor;
use crate::interpreter::Interpreter;
use crate::registry::CommandRegistry;
use crate::roster::ActorHandle;

/// Alternate spellings accepted in scripts, mapped to canonical names.
pub const ALIASES: &[(&str, &str)] = &[
    ("addMailReceived", "mail"),
    ("face", "faceDirection"),
    ("wait", "pause"),
    ("sound", "playSound"),
    ("music", "playMusic"),
    ("temporarySprite", "spawnEffect"),
];

/// Build the table of built-in commands.
pub fn build_registry() -> CommandRegistry {
    let mut reg = CommandRegistry::new();

    reg.register("skippable", flow::skippable);
    reg.register("pause", flow::pause);
    reg.register("end", flow::end);
    reg.register("fork", flow::fork);
    reg.register("switchEvent", flow::switch_event);
    reg.register("beginSimultaneousCommand", flow::begin_simultaneous);
    reg.register("endSimultaneousCommand", flow::end_simultaneous);
    reg.register("setSkipActions", flow::set_skip_actions);
    reg.register("waitForOtherPlayers", flow::wait_for_other_players);

    reg.register("speak", dialogue::speak);
    reg.register("message", dialogue::message);
    reg.register("question", dialogue::question);
    reg.register("quickQuestion", dialogue::quick_question);
    reg.register("speakFromState", dialogue::speak_from_state);

    reg.register("move", actors::move_actors);
    reg.register("advancedMove", actors::advanced_move);
    reg.register("stopAdvancedMoves", actors::stop_advanced_moves);
    reg.register("walkInSquare", actors::walk_in_square);
    reg.register("warp", actors::warp);
    reg.register("faceDirection", actors::face_direction);
    reg.register("showFrame", actors::show_frame);
    reg.register("animate", actors::animate);
    reg.register("stopAnimation", actors::stop_animation);
    reg.register("positionOffset", actors::position_offset);
    reg.register("jump", actors::jump);
    reg.register("shake", actors::shake);
    reg.register("emote", actors::emote);
    reg.register("speed", actors::speed);
    reg.register("halt", actors::halt);
    reg.register("addActor", actors::add_actor);
    reg.register("removeActor", actors::remove_actor);

    reg.register("playSound", staging::play_sound);
    reg.register("playMusic", staging::play_music);
    reg.register("stopMusic", staging::stop_music);
    reg.register("viewport", staging::viewport);
    reg.register("globalFade", staging::global_fade);
    reg.register("globalFadeToClear", staging::global_fade_to_clear);
    reg.register("spawnEffect", staging::spawn_effect);
    reg.register("screenFlash", staging::screen_flash);

    reg.register("mail", world::mail);
    reg.register("friendship", world::friendship);
    reg.register("addItem", world::add_item);
    reg.register("loseItems", world::lose_items);
    reg.register("showItemsLost", world::show_items_lost);
    reg.register("awardFestivalPrize", world::award_festival_prize);

    for (alias, target) in ALIASES {
        if let Err(e) = reg.register_alias(alias, target) {
            warn!("{e}");
        }
    }
    reg
}

/// The actor behind a handle resolved earlier in the same handler.
fn actor_mut(interp: &mut Interpreter, handle: ActorHandle) -> Result<&mut Actor> {
    interp
        .roster_mut()
        .get_mut(handle)
        .ok_or_else(|| anyhow!("actor {handle} vanished mid-command"))
}

/// The trailing `continue` flag several actor commands accept.
fn chain_if(interp: &mut Interpreter, chain: bool) {
    interp.advance(1);
    if chain {
        interp.request_chain();
    }
}
