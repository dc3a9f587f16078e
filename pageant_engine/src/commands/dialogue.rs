//! Speech, messages, and questions.

use anyhow::Result;
use log::{debug, info};
use pageant_script::{ArgError, Args, unquote};

use super::actor_mut;
use crate::interpreter::{ExecutionContext, Interpreter, PendingWait};

/// `speak <actor> "<text>"`
///
/// Pushes the line once, then holds until the dialogue box closes. A box
/// already open from something else is waited out before pushing.
pub(super) fn speak(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    if interp.wait().is_some_and(PendingWait::is_dialogue) {
        if !ctx.stage.is_dialogue_open() {
            interp.advance(1);
        }
        return Ok(());
    }
    if ctx.stage.is_dialogue_open() {
        return Ok(());
    }
    let a = Args::new(args);
    let parsed = a
        .get(1, "actor")
        .and_then(|actor| Ok((actor, a.remainder(2, "dialogue")?)));
    let Some((token, text)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let Some(handle) = interp.require_actor(ctx, token) else {
        return Ok(());
    };
    let actor = actor_mut(interp, handle)?;
    if !actor.kind.can_speak() {
        let name = actor.name.clone();
        interp.log_error_and_skip(ctx, format!("'{name}' cannot speak"));
        return Ok(());
    }
    let name = actor.name.clone();
    ctx.stage.push_dialogue(Some(&name), &text);
    interp.set_wait(PendingWait::Dialogue);
    Ok(())
}

/// `message "<text>"`: narration with no speaker.
pub(super) fn message(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    if interp.wait().is_some_and(PendingWait::is_dialogue) {
        if !ctx.stage.is_dialogue_open() {
            interp.advance(1);
        }
        return Ok(());
    }
    if ctx.stage.is_dialogue_open() {
        return Ok(());
    }
    let Some(text) = interp.accept(ctx, Args::new(args).remainder(1, "message")) else {
        return Ok(());
    };
    ctx.stage.push_dialogue(None, &text);
    interp.set_wait(PendingWait::Dialogue);
    Ok(())
}

/// `question <forkN|null> "<question>#<answer>#..."`
///
/// Picking answer N (zero-based) under a `forkN` tag sets the event's fork
/// variable for a later `fork <key>`.
pub(super) fn question(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    if let Some(PendingWait::Answer { fork }) = interp.wait().cloned() {
        if let Some(answer) = ctx.stage.take_answer() {
            info!("   answered {answer}");
            if fork == Some(answer) {
                interp.set_special_event_variable(true);
            }
            interp.advance(1);
        }
        return Ok(());
    }
    if ctx.stage.is_dialogue_open() {
        return Ok(());
    }
    let a = Args::new(args);
    let parsed = a
        .get(1, "fork tag")
        .and_then(|tag| Ok((tag, a.remainder(2, "question")?)));
    let Some((tag, text)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    let fork = if tag.eq_ignore_ascii_case("null") {
        None
    } else {
        let number = tag
            .to_ascii_lowercase()
            .strip_prefix("fork")
            .and_then(|n| n.parse::<usize>().ok());
        let parsed = number.ok_or_else(|| ArgError::Invalid {
            index: 1,
            name: "fork tag".to_string(),
            value: tag.to_string(),
            expected: "forkN or null",
        });
        let Some(number) = interp.accept(ctx, parsed) else {
            return Ok(());
        };
        Some(number)
    };
    let Some((prompt, answers)) = split_prompt(&text) else {
        interp.log_error_and_skip(ctx, "question has no answers");
        return Ok(());
    };
    ctx.stage.ask_question(&prompt, &answers);
    interp.set_wait(PendingWait::Answer { fork });
    Ok(())
}

/// `quickQuestion <question>#<answer>...(break)<cmd>\<cmd>(break)...`
///
/// The commands of the chosen branch run next, spliced in after this one.
/// Branch text is taken from the raw command so quoting survives.
pub(super) fn quick_question(interp: &mut Interpreter, _args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let raw = interp.current_command().unwrap_or_default().to_string();
    let (prompt_text, branches) = split_quick_question(&raw);

    if matches!(interp.wait(), Some(PendingWait::Answer { .. })) {
        let Some(answer) = ctx.stage.take_answer() else {
            return Ok(());
        };
        let Some(branch) = branches.get(answer) else {
            interp.log_error_and_skip(ctx, format!("no branch for answer {answer}"));
            return Ok(());
        };
        let commands: Vec<String> = branch
            .split('\\')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        debug!("   answer {answer} splices {} command(s)", commands.len());
        interp.advance(1);
        if !commands.is_empty() {
            interp.insert_after_current(commands);
        }
        return Ok(());
    }
    if ctx.stage.is_dialogue_open() {
        return Ok(());
    }
    let Some((prompt, answers)) = split_prompt(&prompt_text) else {
        interp.log_error_and_skip(ctx, "quick question has no answers");
        return Ok(());
    };
    ctx.stage.ask_question(&prompt, &answers);
    interp.set_wait(PendingWait::Answer { fork: None });
    Ok(())
}

/// `speakFromState <actor> <key>`: rewrites itself into a `speak` with the
/// line the game picks for that state.
pub(super) fn speak_from_state(interp: &mut Interpreter, args: &[String], ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let a = Args::new(args);
    let parsed = a
        .get(1, "actor")
        .and_then(|actor| Ok((actor, a.get(2, "state key")?)));
    let Some((actor, key)) = interp.accept(ctx, parsed) else {
        return Ok(());
    };
    match ctx.stage.dialogue_for_state(actor, key) {
        Some(text) => {
            let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
            interp.replace_current(format!("speak {actor} \"{escaped}\""));
        },
        None => interp.log_error_and_skip(ctx, format!("no dialogue for '{actor}' in state '{key}'")),
    }
    Ok(())
}

/// Split `question#answer#answer` into the prompt and its answers.
fn split_prompt(text: &str) -> Option<(String, Vec<String>)> {
    let mut parts = text.split('#');
    let prompt = parts.next()?.trim().to_string();
    let answers: Vec<String> = parts.map(|p| p.trim().to_string()).collect();
    if answers.is_empty() {
        None
    } else {
        Some((prompt, answers))
    }
}

fn split_quick_question(raw: &str) -> (String, Vec<String>) {
    let body = raw.trim_start().split_once(' ').map_or("", |(_, rest)| rest);
    let mut sections = body.split("(break)");
    let prompt = unquote(sections.next().unwrap_or_default());
    let branches = sections.map(str::to_string).collect();
    (prompt, branches)
}
