//! Save-data effects, knock-out penalties, and festival prizes.

use anyhow::Result;
use log::{debug, info};
use pageant_script::Args;

use crate::interpreter::{ExecutionContext, Interpreter, PendingWait};

/// `mail <id>`: mail received is a save-data flag.
pub(super) fn mail(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let Some(id) = interp.accept(ctx, Args::new(args).get(1, "mail id")) else {
        return Ok(());
    };
    if ctx.stage.has_flag(id) {
        debug!("   mail '{id}' already received");
    } else {
        ctx.stage.add_flag(id);
    }
    interp.advance(1);
    Ok(())
}

pub(super) fn friendship(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "npc").and_then(|npc| Ok((npc, a.int(2, "amount")?)));
    let Some((npc, amount)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    ctx.stage.change_friendship(npc, amount);
    interp.advance(1);
    Ok(())
}

/// `addItem <id> [count]`
pub(super) fn add_item(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a.get(1, "item").and_then(|item| Ok((item, a.opt_int(2, "count", 1)?)));
    let Some((item, count)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    ctx.stage.add_item(item, count);
    interp.advance(1);
    Ok(())
}

/// `loseItems`: applies the knock-out penalty and, when anything was taken,
/// queues `showItemsLost` to run next.
pub(super) fn lose_items(interp: &mut Interpreter, _args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let lost = ctx.stage.apply_death_penalty();
    info!("   {lost} item(s) lost");
    interp.advance(1);
    if lost > 0 {
        interp.insert_after_current(vec!["showItemsLost".to_string()]);
    }
    Ok(())
}

/// `showItemsLost`: opens the lost-items menu and holds until it closes.
pub(super) fn show_items_lost(interp: &mut Interpreter, _args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    if interp.wait().is_some_and(PendingWait::is_menu) {
        if !ctx.stage.is_any_modal_menu_open() {
            interp.advance(1);
        }
        return Ok(());
    }
    ctx.stage.show_lost_items();
    interp.set_wait(PendingWait::Menu);
    Ok(())
}

/// `awardFestivalPrize [prize]`
///
/// With no prize named, a local player who did not win skips the command
/// after this one as well (it is the winner's thank-you line).
pub(super) fn award_festival_prize(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    match Args::new(args).opt(1) {
        Some(prize) => {
            ctx.stage.award_festival_prize(Some(prize));
            interp.advance(1);
        },
        None if ctx.stage.is_festival_winner() => {
            ctx.stage.award_festival_prize(None);
            interp.advance(1);
        },
        None => {
            debug!("   local player did not win; skipping the prize line");
            interp.advance(2);
        },
    }
    Ok(())
}
