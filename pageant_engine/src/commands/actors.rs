//! Commands that move, pose, and animate actors.
//!
//! `move` is the only one that blocks: it hands its movers to the movement
//! barrier and the pointer stays put until every mover lands (unless the
//! command ends in `continue`). The rest act on the roster and advance at once.

use anyhow::Result;
use log::debug;
use pageant_data::TilePoint;
use pageant_script::{ArgError, Args};

use super::{actor_mut, chain_if};
use crate::actor::{Actor, ActorKind, ActorRef, FrameAnimation, Timer};
use crate::interpreter::{ExecutionContext, Interpreter, PendingWait};
use crate::movement::{PathController, PathStep, PendingMove};

/// True if the token at `index` asks the next command to run this tick.
fn wants_continue(args: &Args<'_>, index: usize) -> bool {
    args.opt(index)
        .is_some_and(|t| t.eq_ignore_ascii_case("continue") || t.eq_ignore_ascii_case("true"))
}

/// `move <actor> <dx> <dy> <facing> [<actor> <dx> <dy> <facing>...] [continue]`
///
/// Each actor gets a target tile relative to where it stands now. Without
/// `continue` the script waits at the barrier until every mover has landed.
/// Actors that cannot be found are reported and left out; the rest still move.
pub(super) fn move_actors(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let cont = args.len() > 1 && wants_continue(&a, args.len() - 1);
    let end = if cont { args.len() - 1 } else { args.len() };
    if end < 5 || (end - 1) % 4 != 0 {
        interp.log_error_and_skip(ctx, "move expects groups of 'actor dx dy facing'");
        return Ok(());
    }

    let mut groups = Vec::new();
    for start in (1..end).step_by(4) {
        let parsed = a.int(start + 1, "dx").and_then(|dx| {
            let dy = a.int(start + 2, "dy")?;
            let facing = a.direction(start + 3, "facing")?;
            Ok((&args[start], dx, dy, facing))
        });
        let Some(group) = interp.accept(ctx, parsed) else {
            return Ok(());
        };
        groups.push(group);
    }

    let tile_size = interp.config().tile_size;
    for (token, dx, dy, facing) in groups {
        let actor_ref = ActorRef::parse(token);
        let Some(handle) = interp.roster().resolve(&actor_ref) else {
            if actor_ref.optional {
                debug!("optional actor '{actor_ref}' not present; not moving it");
            } else {
                interp.log_error(ctx, format!("no actor found matching '{actor_ref}'; it will not move"));
            }
            continue;
        };
        let actor = actor_mut(interp, handle)?;
        let from = actor.tile(tile_size);
        actor.scripted_motion = true;
        let target = from + TilePoint::new(dx, dy);
        debug!("   {} heads from {from} to {target}", actor.name);
        interp.movement_mut().insert(handle, PendingMove { target, facing });
    }

    interp.flags_mut().continue_after_move = cont;
    if cont || interp.movement().is_empty() {
        interp.advance(1);
    }
    Ok(())
}

/// `advancedMove <actor> <loop> <x y>...`
///
/// Runs on a path controller beside the script, so it never blocks.
pub(super) fn advanced_move(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "actor").and_then(|actor| {
        let looping = a.bool(2, "loop")?;
        let mut pairs = Vec::new();
        let mut index = 3;
        while index < a.len() {
            pairs.push((a.int(index, "x")?, a.int(index + 1, "y")?));
            index += 2;
        }
        Ok((actor, looping, pairs))
    });
    let Some((token, looping, pairs)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let mut steps = Vec::with_capacity(pairs.len());
    for (x, y) in pairs {
        match PathStep::from_pair(x, y) {
            Some(step) => steps.push(step),
            None if x == 0 && y == 0 => {},
            None => interp.log_error(ctx, format!("path pair ({x}, {y}) is not a step or a facing")),
        }
    }
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    actor_mut(interp, handle)?.scripted_motion = true;
    let path = PathController::new(handle, steps, looping).with_callback(Box::new(|actor: &mut Actor| {
        actor.scripted_motion = false;
    }));
    interp.add_path(path);
    interp.advance(1);
    Ok(())
}

pub(super) fn stop_advanced_moves(interp: &mut Interpreter, _args: &[String], _ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let handles: Vec<_> = interp.paths().iter().map(|p| p.actor).collect();
    interp.clear_paths();
    for handle in handles {
        if let Some(actor) = interp.roster_mut().get_mut(handle) {
            actor.halt();
            actor.scripted_motion = false;
        }
    }
    interp.advance(1);
    Ok(())
}

/// `walkInSquare <actor> <width> <height> [pauseMs]`
pub(super) fn walk_in_square(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "actor").and_then(|actor| {
        Ok((
            actor,
            a.int(2, "width")?,
            a.int(3, "height")?,
            a.opt_float(4, "pause", 0.0)?,
        ))
    });
    let Some((token, width, height, pause_ms)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    actor_mut(interp, handle)?.scripted_motion = true;
    interp.add_path(PathController::square(handle, width, height, pause_ms));
    interp.advance(1);
    Ok(())
}

/// `warp <actor> <x> <y> [continue]`
pub(super) fn warp(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "actor").and_then(|actor| Ok((actor, a.point(2, "tile")?)));
    let Some((token, tile)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    let tile_size = interp.config().tile_size;
    let actor = actor_mut(interp, handle)?;
    actor.set_tile(tile, tile_size);
    actor.halt();
    interp.movement_mut().remove(handle);
    chain_if(interp, wants_continue(&a, 4));
    Ok(())
}

/// `faceDirection <actor> <dir> [continue]`
pub(super) fn face_direction(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a
        .get(1, "actor")
        .and_then(|actor| Ok((actor, a.direction(2, "direction")?)));
    let Some((token, direction)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    actor_mut(interp, handle)?.face(direction);
    chain_if(interp, wants_continue(&a, 3));
    Ok(())
}

/// `showFrame <actor> <frame> [flip]`
pub(super) fn show_frame(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "actor").and_then(|actor| {
        let frame = a.int(2, "frame")?;
        Ok((actor, frame, a.opt_bool(3, "flip", false)?))
    });
    let Some((token, frame, flip)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let frame = match u32::try_from(frame) {
        Ok(frame) => frame,
        Err(_) => {
            interp.log_error_and_skip(ctx, format!("frame {frame} is negative"));
            return Ok(());
        },
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    let actor = actor_mut(interp, handle)?;
    actor.animation = None;
    actor.frame = frame;
    actor.flipped = flip;
    interp.advance(1);
    Ok(())
}

/// `animate <actor> <flip> <loop> <frameMs> <frame>...`
pub(super) fn animate(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "actor").and_then(|actor| {
        let flip = a.bool(2, "flip")?;
        let looping = a.bool(3, "loop")?;
        let frame_ms = a.float(4, "frame duration")?;
        let mut frames = vec![frame_number(&a, 5)?];
        for index in 6..a.len() {
            frames.push(frame_number(&a, index)?);
        }
        Ok((actor, flip, looping, frame_ms, frames))
    });
    let Some((token, flip, looping, frame_ms, frames)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    let actor = actor_mut(interp, handle)?;
    actor.flipped = flip;
    actor.frame = frames[0];
    actor.animation = Some(FrameAnimation::new(frames, frame_ms, looping));
    interp.advance(1);
    Ok(())
}

fn frame_number(args: &Args<'_>, index: usize) -> Result<u32, ArgError> {
    let value = args.int(index, "frame")?;
    u32::try_from(value).map_err(|_| ArgError::Invalid {
        index,
        name: "frame".to_string(),
        value: value.to_string(),
        expected: "a non-negative frame number",
    })
}

/// `stopAnimation <actor> [frame]`
pub(super) fn stop_animation(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "actor").and_then(|actor| {
        let frame = match a.opt(2) {
            Some(_) => Some(frame_number(&a, 2)?),
            None => None,
        };
        Ok((actor, frame))
    });
    let Some((token, frame)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    let actor = actor_mut(interp, handle)?;
    actor.halt();
    if let Some(frame) = frame {
        actor.frame = frame;
    }
    interp.advance(1);
    Ok(())
}

/// `positionOffset <actor> <dx> <dy> [continue]`, in pixels.
pub(super) fn position_offset(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "actor").and_then(|actor| Ok((actor, a.vector(2, "offset")?)));
    let Some((token, offset)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    let actor = actor_mut(interp, handle)?;
    actor.position = actor.position + offset;
    chain_if(interp, wants_continue(&a, 4));
    Ok(())
}

/// `jump <actor> [intensity]`
pub(super) fn jump(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a
        .get(1, "actor")
        .and_then(|actor| Ok((actor, a.opt_int(2, "intensity", 8)?)));
    let Some((token, intensity)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    let jump_ms = interp.config().jump_ms;
    actor_mut(interp, handle)?.jump = Some(Timer::new(jump_ms, intensity));
    interp.advance(1);
    Ok(())
}

/// `shake <actor> <ms>`
pub(super) fn shake(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "actor").and_then(|actor| Ok((actor, a.float(2, "duration")?)));
    let Some((token, duration)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    actor_mut(interp, handle)?.shake = Some(Timer::new(duration, 1));
    interp.advance(1);
    Ok(())
}

/// `emote <actor> <id> [continue]`
///
/// Holds the script until the bubble has played unless `continue` is given.
pub(super) fn emote(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    if let Some(PendingWait::Emote(handle)) = interp.wait().cloned() {
        let playing = interp.roster().get(handle).is_some_and(|actor| actor.emote.is_some());
        if !playing {
            interp.advance(1);
        }
        return Ok(());
    }
    let a = Args::new(args);
    let parsed = a.get(1, "actor").and_then(|actor| Ok((actor, a.int(2, "emote")?)));
    let Some((token, id)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    let emote_ms = interp.config().emote_ms;
    let actor = actor_mut(interp, handle)?;
    if !actor.kind.can_emote() {
        let name = actor.name.clone();
        interp.log_error_and_skip(ctx, format!("'{name}' cannot emote"));
        return Ok(());
    }
    actor.emote = Some(Timer::new(emote_ms, id));
    let name = actor.name.clone();
    ctx.stage.show_emote(&name, id);
    if wants_continue(&a, 3) {
        chain_if(interp, true);
    } else {
        interp.set_wait(PendingWait::Emote(handle));
    }
    Ok(())
}

/// `speed <actor> <pixelsPerTick>`: lasts until the actor lands a `move`.
pub(super) fn speed(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "actor").and_then(|actor| {
        let speed = a.float(2, "speed")?;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ArgError::Invalid {
                index: 2,
                name: "speed".to_string(),
                value: speed.to_string(),
                expected: "a positive speed",
            });
        }
        Ok((actor, speed))
    });
    let Some((token, speed)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    actor_mut(interp, handle)?.speed_override = Some(speed);
    interp.advance(1);
    Ok(())
}

/// `halt`: everyone stops where they stand and pending moves are dropped.
pub(super) fn halt(interp: &mut Interpreter, _args: &[String], _ctx: &mut ExecutionContext<'_>) -> Result<()> {
    interp.roster_mut().halt_all();
    interp.movement_mut().clear();
    interp.flags_mut().continue_after_move = false;
    interp.advance(1);
    Ok(())
}

/// `addActor <npc|pet|monster|prop> <name> <x> <y> <dir>`
pub(super) fn add_actor(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "kind").and_then(|kind_token| {
        let kind = ActorKind::from_token(kind_token).ok_or_else(|| ArgError::Invalid {
            index: 1,
            name: "kind".to_string(),
            value: kind_token.to_string(),
            expected: "npc, pet, monster, or prop",
        })?;
        let name = a.get(2, "name")?;
        let tile = a.point(3, "tile")?;
        let facing = a.direction(5, "facing")?;
        Ok((kind, name, tile, facing))
    });
    let Some((kind, name, tile, facing)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let tile_size = interp.config().tile_size;
    let handle = interp
        .roster_mut()
        .spawn(Actor::new(name, kind, tile, facing, tile_size));
    debug!("   spawned {name} as {handle}");
    interp.advance(1);
    Ok(())
}

pub(super) fn remove_actor(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let Some(token) = interp.accept(ctx, Args::new(args).get(1, "actor")) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    interp.remove_actor(handle);
    interp.advance(1);
    Ok(())
}
