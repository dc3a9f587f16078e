use std::collections::HashMap;
use std::sync::Arc;

use pageant_data::{Color, Rect, TilePoint};
use pageant_engine as pe;
use pe::{
    CollectingSink, EndBehavior, EngineConfig, EventOutcome, ExecutionContext, Interpreter, Phase, RecordingStage,
    Severity, StageCall,
};

fn interp(text: &str) -> Interpreter {
    let commands = pageant_script::split_script(text).expect("test script splits");
    Interpreter::from_commands("test:flow", commands, EngineConfig::default())
}

fn tick(it: &mut Interpreter, stage: &mut RecordingStage, sink: &mut CollectingSink) -> Phase {
    let mut ctx = ExecutionContext::new(stage, sink);
    it.tick(&mut ctx)
}

fn sounds(stage: &RecordingStage) -> Vec<&str> {
    stage
        .calls
        .iter()
        .filter_map(|call| match call {
            StageCall::PlaySound(id) => Some(id.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn speak_holds_until_dialogue_closes_then_runs_on() {
    let mut it = interp(r#"none/follow/farmer 0 0 2 Abigail 3 3 2/speak Abigail "Hi there"/playSound coin/end"#);
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();

    assert_eq!(tick(&mut it, &mut stage, &mut sink), Phase::Suspended);
    assert_eq!(it.pointer(), 3);
    assert_eq!(stage.dialogue(), vec!["Hi there"]);

    // dialogue still open: nothing new happens
    for _ in 0..5 {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert_eq!(it.pointer(), 3);
    assert_eq!(stage.dialogue().len(), 1);

    stage.dialogue_open = false;
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 4);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(sounds(&stage), vec!["coin"]);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.outcome(), Some(&EventOutcome::Finished(EndBehavior::Plain)));
    assert!(sink.is_empty());
}

#[test]
fn ordinary_commands_advance_one_per_tick() {
    let mut it = interp("none/follow/farmer 0 0 2/playSound a/playSound b/friendship Abigail 10/mail hello/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    let mut pointers = Vec::new();
    while !it.is_terminal() {
        tick(&mut it, &mut stage, &mut sink);
        pointers.push(it.pointer());
    }
    assert_eq!(pointers, vec![4, 5, 6, 7, 7]);
    assert!(stage.flags.contains("hello"));
}

#[test]
fn pause_counts_down_without_repeating_side_effects() {
    let mut it = interp("none/follow/farmer 0 0 2/playSound start/pause 100/playSound end/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    let mut step = |it: &mut Interpreter, stage: &mut RecordingStage| {
        let mut ctx = ExecutionContext::new(stage, &mut sink).with_elapsed(40.0);
        it.tick(&mut ctx)
    };

    step(&mut it, &mut stage);
    step(&mut it, &mut stage);
    assert_eq!(it.pointer(), 4);
    assert!(it.wait().is_some());

    // an open menu stops the clock
    stage.menu_open = true;
    for _ in 0..10 {
        step(&mut it, &mut stage);
    }
    assert_eq!(it.pointer(), 4);
    stage.menu_open = false;

    step(&mut it, &mut stage);
    step(&mut it, &mut stage);
    assert_eq!(it.pointer(), 4);
    step(&mut it, &mut stage);
    assert_eq!(it.pointer(), 5);
    assert_eq!(sounds(&stage), vec!["start"]);
}

#[test]
fn simultaneous_block_runs_in_one_tick() {
    let mut it = interp(
        "none/follow/farmer 0 0 2/beginSimultaneousCommand/playSound a/-- note/playSound b/endSimultaneousCommand/playSound c/end",
    );
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 8);
    assert_eq!(sounds(&stage), vec!["a", "b"]);
    assert!(!it.flags().simultaneous);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(sounds(&stage), vec!["a", "b", "c"]);
}

#[test]
fn unknown_commands_and_bad_arguments_skip_one_instruction() {
    let mut it = interp("none/follow/farmer 0 0 2/frobnicate 1 2/pause soon/playSound ok/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 4);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 5);
    tick(&mut it, &mut stage, &mut sink);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.phase(), Phase::Finished);
    assert_eq!(sounds(&stage), vec!["ok"]);
    assert_eq!(sink.count(Severity::UnknownCommand), 1);
    assert_eq!(sink.count(Severity::Recoverable), 1);
    assert_eq!(sink.count(Severity::Fatal), 0);

    let unknown = &sink.reports[0];
    assert_eq!(unknown.event_id, "test:flow");
    assert_eq!(unknown.command_index, 3);
    assert_eq!(unknown.command, "frobnicate 1 2");
}

#[test]
fn unclosed_quote_costs_only_its_own_command() {
    let mut it = interp(r#"none/follow/farmer 0 0 2 Lewis 1 1 2/speak Lewis "Hi there/playSound a/end"#);
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    let mut phase = Phase::Uninitialized;
    for _ in 0..10 {
        phase = tick(&mut it, &mut stage, &mut sink);
        if it.is_terminal() {
            break;
        }
    }
    assert_eq!(phase, Phase::Finished);
    assert_eq!(sounds(&stage), vec!["a"]);
    assert!(stage.dialogue().is_empty());
    assert_eq!(sink.count(Severity::Recoverable), 1);
    assert_eq!(sink.reports[0].command_index, 3);
}

#[test]
fn effects_carry_their_source_rectangle() {
    let mut it = interp("none/follow/farmer 0 0 2/spawnEffect leaf 3 4 source 0 16 16 16 tint gold drift/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    tick(&mut it, &mut stage, &mut sink);
    let spec = stage
        .calls
        .iter()
        .find_map(|call| match call {
            StageCall::Effect(spec) => Some(spec.clone()),
            _ => None,
        })
        .expect("effect spawned");
    assert_eq!(spec.id, "leaf");
    assert_eq!(spec.tile, TilePoint::new(3, 4));
    assert_eq!(spec.source, Some(Rect::new(0, 16, 16, 16)));
    assert_eq!(spec.tint, Color::from_name("gold"));
    assert_eq!(spec.options, vec!["drift".to_string()]);
    assert!(sink.is_empty());
}

#[test]
fn aliases_dispatch_to_canonical_handlers() {
    let mut it = interp("none/follow/farmer 0 0 2/sound ding/addMailReceived ccDone/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    while !it.is_terminal() {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert_eq!(sounds(&stage), vec!["ding"]);
    assert!(stage.flags.contains("ccDone"));
    assert!(sink.is_empty());
}

#[test]
fn question_answer_drives_fork_without_reinitializing() {
    let mut it = interp(
        r#"none/follow/farmer 0 0 2 Lewis 1 1 2/question fork1 "Help?#No#Yes"/fork yes/speak Lewis "Fine."/end"#,
    )
    .with_scene_data(HashMap::from([(
        "yes".to_string(),
        r#"speak Lewis "Thanks!"/end warpOut"#.to_string(),
    )]));
    let mut stage = RecordingStage::new();
    stage.answer_with(1);
    let mut sink = CollectingSink::new();

    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(stage.count(StageCall::is_ask_question), 1);
    tick(&mut it, &mut stage, &mut sink);
    assert!(it.special_event_variable());
    assert_eq!(it.pointer(), 4);

    tick(&mut it, &mut stage, &mut sink);
    assert!(it.flags().forked);
    assert_eq!(it.pointer(), 0);
    assert_eq!(it.commands()[0], r#"speak Lewis "Thanks!""#);

    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(stage.dialogue(), vec!["Thanks!"]);
    stage.dialogue_open = false;
    tick(&mut it, &mut stage, &mut sink);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.outcome(), Some(&EventOutcome::Finished(EndBehavior::WarpOut)));
    assert_eq!(stage.count(StageCall::is_play_music), 1);
    assert_eq!(it.roster().len(), 2);
}

#[test]
fn fork_not_taken_falls_through() {
    let mut it = interp(r#"none/follow/farmer 0 0 2/fork metAbigail abigailBranch/playSound plain/end"#);
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(sounds(&stage), vec!["plain"]);
    assert!(!it.flags().forked);
}

#[test]
fn quick_question_splices_the_chosen_branch() {
    let mut it = interp(
        r"none/follow/farmer 0 0 2/quickQuestion Want some?#Yes#No(break)playSound yum\addItem Cake 2(break)playSound sad/end",
    );
    let mut stage = RecordingStage::new();
    stage.answer_with(0);
    let mut sink = CollectingSink::new();
    while !it.is_terminal() {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert_eq!(sounds(&stage), vec!["yum"]);
    assert_eq!(
        stage.count(|c| matches!(c, StageCall::AddItem { item, count: 2 } if item == "Cake")),
        1
    );
    assert_eq!(&it.commands()[4..6], ["playSound yum", "addItem Cake 2"]);
}

#[test]
fn speak_from_state_rewrites_itself() {
    let mut it = interp("none/follow/farmer 0 0 2 Pam 2 2 2/speakFromState Pam rainy/end");
    let mut stage = RecordingStage::new();
    stage
        .state_dialogue
        .insert(("Pam".to_string(), "rainy".to_string()), r#"Ugh, "weather"."#.to_string());
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.commands()[3], r#"speak Pam "Ugh, \"weather\".""#);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(stage.dialogue(), vec![r#"Ugh, "weather"."#]);
}

#[test]
fn lose_items_inserts_the_lost_items_menu() {
    let mut it = interp("none/follow/farmer 0 0 2/loseItems/end");
    let mut stage = RecordingStage::new();
    stage.items_to_lose = 2;
    let mut sink = CollectingSink::new();

    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.commands(), ["none", "follow", "farmer 0 0 2", "loseItems", "showItemsLost", "end"]);
    assert_eq!(it.pointer(), 4);

    tick(&mut it, &mut stage, &mut sink);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 4);
    assert_eq!(stage.count(StageCall::is_show_lost_items), 1);

    stage.menu_open = false;
    tick(&mut it, &mut stage, &mut sink);
    tick(&mut it, &mut stage, &mut sink);
    assert!(it.outcome().is_some_and(EventOutcome::is_finished));
}

#[test]
fn losing_nothing_inserts_nothing() {
    let mut it = interp("none/follow/farmer 0 0 2/loseItems/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.commands().len(), 5);
}

#[test]
fn losing_festival_skips_the_winner_line() {
    let script = r#"none/follow/farmer 0 0 2 Lewis 5 5 2/awardFestivalPrize/speak Lewis "Congratulations!"/playSound applause/end"#;
    let mut it = interp(script);
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 5);
    assert!(stage.dialogue().is_empty());

    let mut it = interp(script);
    let mut stage = RecordingStage::new();
    stage.festival_winner = true;
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 4);
    assert_eq!(stage.count(|c| *c == StageCall::AwardPrize(None)), 1);
}

#[test]
fn skip_runs_actions_once_and_is_idempotent() {
    let mut it = interp(
        r#"none/follow/farmer 0 0 2 Lewis 1 1 2/skippable/setSkipActions AddMail Current a#AddMail Current b/move Lewis 5 0 1/speak Lewis "long"/end newDay"#,
    );
    let mut stage = RecordingStage::new();
    stage.failing_actions.insert("AddMail Current a".to_string());
    let mut sink = CollectingSink::new();

    for _ in 0..3 {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert!(it.is_skippable());
    assert_eq!(it.pointer(), 5);
    assert_eq!(it.movement().len(), 1);

    {
        let mut ctx = ExecutionContext::new(&mut stage, &mut sink);
        it.skip(&mut ctx);
        it.skip(&mut ctx);
        assert_eq!(it.tick(&mut ctx), Phase::Skipped);
    }

    assert_eq!(it.outcome(), Some(&EventOutcome::Skipped(EndBehavior::NewDay)));
    assert!(it.movement().is_empty());
    assert!(it.flags().skipped);
    assert_eq!(
        stage.count(StageCall::is_trigger_action),
        2,
        "the failing action must not stop the second"
    );
    assert_eq!(stage.count(StageCall::is_end_event), 1);
    assert_eq!(stage.count(StageCall::is_close_menus), 1);
    assert_eq!(sink.count(Severity::Recoverable), 1);
    let lewis = it.roster().find(&pe::ActorId::Named("Lewis".into())).unwrap();
    assert!(!it.roster().get(lewis).unwrap().walking);
}

fn explode(_: &mut Interpreter, _: &[String], _: &mut ExecutionContext<'_>) -> anyhow::Result<()> {
    anyhow::bail!("boom")
}

#[test]
fn handler_failure_aborts_through_the_skip_path() {
    let mut registry = pe::commands::build_registry();
    registry.register("explode", explode);
    let mut it = interp(r#"none/follow/farmer 0 0 2/setSkipActions cleanup/explode/end dialogue Lewis "bye""#)
        .with_registry(Arc::new(registry));
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();

    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(tick(&mut it, &mut stage, &mut sink), Phase::Skipped);
    match it.outcome() {
        Some(EventOutcome::Aborted { command_index, reason }) => {
            assert_eq!(*command_index, 4);
            assert!(reason.contains("boom"));
        },
        other => panic!("expected an abort, got {other:?}"),
    }
    assert_eq!(sink.count(Severity::Fatal), 1);
    assert_eq!(stage.calls.iter().filter(|c| **c == StageCall::TriggerAction("cleanup".into())).count(), 1);
}

fn skip_now(interp: &mut Interpreter, _: &[String], ctx: &mut ExecutionContext<'_>) -> anyhow::Result<()> {
    interp.skip(ctx);
    interp.advance(1);
    Ok(())
}

#[test]
fn skip_inside_a_simultaneous_block_lands_after_the_handler() {
    let mut registry = pe::commands::build_registry();
    registry.register("skipNow", skip_now);
    let mut it = interp(
        "none/follow/farmer 0 0 2 Lewis 1 1 2/setSkipActions cleanup/beginSimultaneousCommand/playSound a/skipNow/playSound b/endSimultaneousCommand/end warpOut",
    )
    .with_registry(Arc::new(registry));
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();

    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 4);
    assert_eq!(tick(&mut it, &mut stage, &mut sink), Phase::Skipped);

    assert_eq!(sounds(&stage), vec!["a"], "nothing after the skip may run");
    assert_eq!(it.outcome(), Some(&EventOutcome::Skipped(EndBehavior::WarpOut)));
    assert!(!it.flags().simultaneous);

    {
        let mut ctx = ExecutionContext::new(&mut stage, &mut sink);
        it.skip(&mut ctx);
        assert_eq!(it.tick(&mut ctx), Phase::Skipped);
    }
    assert_eq!(stage.count(|c| *c == StageCall::TriggerAction("cleanup".into())), 1);
    assert_eq!(stage.count(StageCall::is_end_event), 1);
    assert!(sink.is_empty());
}

#[test]
fn requested_skip_lands_on_the_next_tick() {
    let mut it = interp("none/follow/farmer 0 0 2/setSkipActions cleanup/pause 5000/end newDay");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 4);

    it.request_skip();
    assert_eq!(tick(&mut it, &mut stage, &mut sink), Phase::Skipped);
    assert_eq!(it.outcome(), Some(&EventOutcome::Skipped(EndBehavior::NewDay)));
    assert_eq!(stage.count(|c| *c == StageCall::TriggerAction("cleanup".into())), 1);
}

#[test]
fn ready_gate_polls_until_open() {
    let mut it = interp("none/follow/farmer 0 0 2/waitForOtherPlayers festivalStart/playSound go/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    for _ in 0..4 {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert_eq!(it.pointer(), 3);
    assert_eq!(stage.count(StageCall::is_request_ready), 1);

    stage.ready_gates.insert("festivalStart".to_string());
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 4);
    assert_eq!(stage.calls.last(), Some(&StageCall::WaitingForPlayers(None)));
}

#[test]
fn world_freeze_holds_dispatch_but_not_initialization() {
    let mut it = interp("none/follow/farmer 0 0 2/playSound a/end");
    let mut stage = RecordingStage::new();
    stage.world_frozen = true;
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 3);
    assert!(sounds(&stage).is_empty());
    stage.world_frozen = false;
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(sounds(&stage), vec!["a"]);
}
