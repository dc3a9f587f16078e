//! Control flow: pauses, forks, simultaneous blocks, skip actions, and `end`.

use anyhow::{Context, Result};
use log::{debug, info};
use pageant_script::{Args, split_script};

use crate::buffer::ReplaceMode;
use crate::errors::EventError;
use crate::interpreter::{ExecutionContext, Interpreter, PendingWait};
use crate::stage::EndBehavior;

pub(super) fn skippable(interp: &mut Interpreter, _args: &[String], _ctx: &mut ExecutionContext<'_>) -> Result<()> {
    interp.flags_mut().skippable = true;
    interp.advance(1);
    Ok(())
}

/// `pause <ms>`: the timer only runs while no menu is up.
pub(super) fn pause(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let menu_open = ctx.stage.is_any_modal_menu_open();
    if let Some(PendingWait::Pause { remaining_ms }) = interp.wait_mut() {
        if !menu_open {
            *remaining_ms -= ctx.elapsed_ms;
        }
        let done = *remaining_ms <= 0.0;
        if done {
            interp.advance(1);
        }
        return Ok(());
    }
    let Some(ms) = interp.accept(ctx, Args::new(args).int(1, "duration")) else {
        return Ok(());
    };
    if ms <= 0 {
        interp.advance(1);
    } else {
        interp.set_wait(PendingWait::Pause { remaining_ms: ms as f32 });
    }
    Ok(())
}

/// `end [behavior]`: waits for any open dialogue, then finishes. A malformed
/// behavior is reported and the event ends plainly.
pub(super) fn end(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    if ctx.stage.is_dialogue_open() {
        return Ok(());
    }
    let behavior = match EndBehavior::from_args(args) {
        Ok(behavior) => behavior,
        Err(e) => {
            interp.log_error(ctx, e);
            EndBehavior::Plain
        },
    };
    interp.finish(ctx, behavior);
    Ok(())
}

/// `fork [requirement] <key>`: with a requirement, branch if the player has
/// that flag; otherwise branch if the event's fork variable is set.
pub(super) fn fork(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let (condition, key) = if a.len() >= 3 {
        let Some((requirement, key)) = interp.accept(ctx, a.get(1, "requirement").and_then(|r| Ok((r, a.get(2, "fork key")?))))
        else {
            return Ok(());
        };
        (ctx.stage.has_flag(requirement), key)
    } else {
        let Some(key) = interp.accept(ctx, a.get(1, "fork key")) else {
            return Ok(());
        };
        (interp.special_event_variable(), key)
    };
    if !condition {
        debug!("fork to '{key}' not taken");
        interp.advance(1);
        return Ok(());
    }
    redirect(interp, ctx, key, ReplaceMode::Fork);
    Ok(())
}

/// `switchEvent <key>`: unconditional fork.
pub(super) fn switch_event(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let Some(key) = interp.accept(ctx, Args::new(args).get(1, "event key")) else {
        return Ok(());
    };
    redirect(interp, ctx, key, ReplaceMode::Switch);
    Ok(())
}

fn redirect(interp: &mut Interpreter, ctx: &mut ExecutionContext<'_>, key: &str, mode: ReplaceMode) {
    match lookup_segment(interp, ctx, key) {
        Ok(commands) => {
            info!("   {mode:?} to '{key}' ({} commands)", commands.len());
            interp.replace_script(commands, mode);
        },
        Err(e) => interp.log_error_and_skip(ctx, format!("{e:#}")),
    }
}

/// Find a fork segment: the scene's own table, then the event's asset in the
/// store, then (for `file:key` style keys) the translation table.
fn lookup_segment(interp: &Interpreter, ctx: &ExecutionContext<'_>, key: &str) -> Result<Vec<String>> {
    let from_store = || -> Option<String> {
        let asset = &interp.key()?.asset;
        ctx.scripts?.entry(asset, key).map(str::to_string)
    };
    let from_translation = || key.contains(':').then(|| ctx.stage.translate(key)).flatten();
    let text = interp
        .scene_data(key)
        .map(str::to_string)
        .or_else(from_store)
        .or_else(from_translation)
        .ok_or_else(|| EventError::UnknownForkKey(key.to_string()))?;
    split_script(&text).with_context(|| format!("splitting fork segment '{key}'"))
}

pub(super) fn begin_simultaneous(
    interp: &mut Interpreter,
    _args: &[String],
    _ctx: &mut ExecutionContext<'_>,
) -> Result<()> {
    interp.flags_mut().simultaneous = true;
    interp.advance(1);
    Ok(())
}

pub(super) fn end_simultaneous(interp: &mut Interpreter, _args: &[String], _ctx: &mut ExecutionContext<'_>) -> Result<()> {
    interp.flags_mut().simultaneous = false;
    interp.advance(1);
    Ok(())
}

/// `setSkipActions <action>#<action>...`
pub(super) fn set_skip_actions(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let Some(text) = interp.accept(ctx, Args::new(args).remainder(1, "actions")) else {
        return Ok(());
    };
    let actions: Vec<String> = text
        .split('#')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    interp.set_skip_actions(actions);
    interp.advance(1);
    Ok(())
}

/// `waitForOtherPlayers <gate>`: mark this player ready once, then poll.
pub(super) fn wait_for_other_players(
    interp: &mut Interpreter,
    args: &[String],
    ctx: &mut ExecutionContext<'_>,
) -> Result<()> {
    let Some(gate) = interp.accept(ctx, Args::new(args).get(1, "gate")) else {
        return Ok(());
    };
    let already_waiting = matches!(interp.wait(), Some(PendingWait::Gate(g)) if g == gate);
    if !already_waiting {
        ctx.stage.request_local_ready(gate);
        ctx.stage.set_waiting_for_players(Some(gate));
        interp.set_wait(PendingWait::Gate(gate.to_string()));
    }
    if ctx.stage.is_gate_ready(gate) {
        ctx.stage.set_waiting_for_players(None);
        interp.advance(1);
    }
    Ok(())
}
