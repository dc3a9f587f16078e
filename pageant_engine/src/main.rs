#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Pageant **
//! Replays an event script against a recording stage and prints what the
//! stage was asked to do.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::{info, warn};

use pageant_engine::data_paths::data_path;
use pageant_engine::{
    CollectingSink, DanceInput, EventOutcome, ExecutionContext, FRAME_MS, Interpreter, PAGEANT_VERSION, RecordingStage,
    ScriptStore, Severity, StageCall, assemble_dance_event, load_config,
};

#[derive(Parser)]
#[command(author, version, about = "Run a Pageant event script against a headless stage.")]
struct Cli {
    /// RON content bundle. Defaults to `content.ron` in the data directory.
    #[arg(long)]
    content: Option<PathBuf>,
    /// Asset holding the event (a location or festival name).
    #[arg(long)]
    asset: String,
    /// Entry id within the asset.
    #[arg(long)]
    entry: String,
    /// Current in-game year, used to pick `_yN` variants.
    #[arg(long, default_value_t = 1)]
    year: u32,
    /// Engine tuning file. Defaults to `pageant.toml` in the data directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Give up after this many ticks.
    #[arg(long, default_value_t = 10_000)]
    ticks: u32,
    /// Milliseconds per tick.
    #[arg(long, default_value_t = FRAME_MS)]
    frame_ms: f32,
    /// JSON dance input; treats the entry as a dance template.
    #[arg(long)]
    dancers: Option<PathBuf>,
    /// Print the transcript as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    info!("Start: pageant {PAGEANT_VERSION}");

    let config = load_config(&cli.config.clone().unwrap_or_else(|| data_path("pageant.toml")));
    let content = cli.content.clone().unwrap_or_else(|| data_path("content.ron"));
    let store = ScriptStore::load(&content).context("while loading event content")?;

    let mut stage = RecordingStage::autopilot();
    let script = match &cli.dancers {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading dance input '{}'", path.display()))?;
            let input: DanceInput =
                serde_json::from_str(&text).with_context(|| format!("parsing dance input '{}'", path.display()))?;
            stage.online.clone_from(&input.online_players);
            assemble_dance_event(&store, &cli.asset, &cli.entry, cli.year, &input)?
        },
        None => store.resolve(&cli.asset, &cli.entry, cli.year)?,
    };
    info!("running {} ({} commands)", script.key, script.len());

    let mut sink = CollectingSink::new();
    let mut interp = Interpreter::new(script, config);
    let mut ticks = 0;
    {
        let mut ctx = ExecutionContext::new(&mut stage, &mut sink)
            .with_scripts(&store)
            .with_elapsed(cli.frame_ms);
        while ticks < cli.ticks && !interp.is_terminal() {
            interp.tick(&mut ctx);
            ticks += 1;
        }
    }
    if !interp.is_terminal() {
        warn!("event {} still running after {ticks} tick(s)", interp.event_id());
    }

    if cli.json {
        let transcript = serde_json::json!({
            "event": interp.event_id(),
            "ticks": ticks,
            "calls": stage.calls,
            "errors": sink.reports.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "outcome": interp.outcome(),
        });
        println!("{}", serde_json::to_string_pretty(&transcript)?);
        return Ok(());
    }

    println!("{}", format!("PAGEANT: {}", interp.event_id()).bright_yellow().underline());
    for call in &stage.calls {
        print_call(call);
    }
    for report in &sink.reports {
        let line = report.to_string();
        match report.severity {
            Severity::Fatal => println!("{}", line.bright_red()),
            Severity::UnknownCommand | Severity::Recoverable => println!("{}", line.yellow()),
        }
    }
    match interp.outcome() {
        Some(EventOutcome::Finished(behavior)) => {
            println!("{} after {ticks} tick(s): {behavior:?}", "finished".bold().bright_green());
        },
        Some(EventOutcome::Skipped(behavior)) => {
            println!("{} after {ticks} tick(s): {behavior:?}", "skipped".bold().cyan());
        },
        Some(EventOutcome::Aborted { command_index, reason }) => {
            println!(
                "{} at command {command_index}: {reason}",
                "aborted".bold().bright_red()
            );
        },
        None => println!("{} after {ticks} tick(s)", "unfinished".bold().yellow()),
    }
    Ok(())
}

fn print_call(call: &StageCall) {
    match call {
        StageCall::PushDialogue { speaker, text } => {
            let speaker = speaker.as_deref().unwrap_or("*");
            println!("  {} {}", format!("{speaker}:").bold().bright_blue(), text.italic());
        },
        StageCall::AskQuestion { question, answers } => {
            println!("  {} {} [{}]", "?".bold().magenta(), question, answers.join(" | "));
        },
        other => println!("  {}", format!("{other:?}").dimmed()),
    }
}
