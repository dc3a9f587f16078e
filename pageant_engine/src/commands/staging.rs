//! Commands that only pass through to the stage: audio, camera, fades, and
//! one-off visual effects.

use anyhow::Result;
use pageant_data::TilePoint;
use pageant_script::Args;

use crate::interpreter::{ExecutionContext, Interpreter, PendingWait};
use crate::stage::{CameraMode, EffectSpec};

pub(super) fn play_sound(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let Some(id) = interp.accept(ctx, Args::new(args).get(1, "sound")) else {
        return Ok(());
    };
    ctx.stage.play_sound(id);
    interp.advance(1);
    Ok(())
}

pub(super) fn play_music(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let Some(id) = interp.accept(ctx, Args::new(args).get(1, "track")) else {
        return Ok(());
    };
    if id.eq_ignore_ascii_case("none") {
        ctx.stage.play_music(None);
    } else {
        ctx.stage.play_music(Some(id));
    }
    interp.advance(1);
    Ok(())
}

pub(super) fn stop_music(interp: &mut Interpreter, _args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    ctx.stage.play_music(None);
    interp.advance(1);
    Ok(())
}

/// `viewport <x> <y>`, `viewport follow`, or `viewport move <dx> <dy> <ms>`
pub(super) fn viewport(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = match a.opt(1).map(str::to_ascii_lowercase).as_deref() {
        Some("follow") => Ok(CameraMode::Follow),
        Some("move") => a.point(2, "pan offset").and_then(|offset| {
            Ok(CameraMode::Pan {
                offset,
                duration_ms: a.int(4, "pan duration")?,
            })
        }),
        _ => a.point(1, "camera tile").map(CameraMode::Fixed),
    };
    let Some(camera) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    ctx.stage.set_viewport(camera);
    interp.advance(1);
    Ok(())
}

/// `globalFade [speed] [continue]`
pub(super) fn global_fade(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    fade(interp, args, ctx, true)
}

/// `globalFadeToClear [speed] [continue]`
pub(super) fn global_fade_to_clear(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    fade(interp, args, ctx, false)
}

fn fade(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>, to_black: bool) -> Result<()> {
    if interp.wait().is_some_and(PendingWait::is_fade) {
        if ctx.stage.is_fade_complete() {
            interp.advance(1);
        }
        return Ok(());
    }
    let a = Args::new(args);
    let default_speed = interp.config().default_fade_speed;
    let parsed = a
        .opt_float(1, "fade speed", default_speed)
        .and_then(|speed| Ok((speed, a.opt_bool(2, "continue", false)?)));
    let Some((speed, cont)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    ctx.stage.begin_screen_fade(to_black, speed, cont);
    if cont {
        interp.advance(1);
    } else {
        interp.set_wait(PendingWait::Fade);
    }
    Ok(())
}

/// `spawnEffect <id> <x> <y> [options...]`
///
/// Options are handed to the renderer as written, except `tint <color>`.
pub(super) fn spawn_effect(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "effect").and_then(|id| {
        let tile: TilePoint = a.point(2, "tile")?;
        let mut options = Vec::new();
        let mut tint = None;
        let mut source = None;
        let mut index = 4;
        while index < a.len() {
            if args[index].eq_ignore_ascii_case("tint") {
                tint = Some(a.color(index + 1, "tint")?);
                index += 2;
            } else if args[index].eq_ignore_ascii_case("source") {
                source = Some(a.rect(index + 1, "source")?);
                index += 5;
            } else {
                options.push(args[index].clone());
                index += 1;
            }
        }
        Ok(EffectSpec {
            id: id.to_string(),
            tile,
            options,
            tint,
            source,
        })
    });
    let Some(spec) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    ctx.stage.spawn_transient_effect(spec);
    interp.advance(1);
    Ok(())
}

pub(super) fn screen_flash(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let Some(alpha) = interp.accept(ctx, Args::new(args).float(1, "alpha")) else {
        return Ok(());
    };
    ctx.stage.flash_screen(alpha.clamp(0.0, 1.0));
    interp.advance(1);
    Ok(())
}
