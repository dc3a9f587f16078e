use pageant_data::{Direction, TilePoint};
use pageant_engine as pe;
use pe::{ActorId, CollectingSink, EngineConfig, ExecutionContext, Interpreter, RecordingStage, StageCall};

fn interp(text: &str) -> Interpreter {
    let commands = pageant_script::split_script(text).expect("test script splits");
    Interpreter::from_commands("test:movement", commands, EngineConfig::default())
}

fn tick(it: &mut Interpreter, stage: &mut RecordingStage, sink: &mut CollectingSink) {
    let mut ctx = ExecutionContext::new(stage, sink);
    it.tick(&mut ctx);
}

fn tile_of(it: &Interpreter, name: &str) -> TilePoint {
    let handle = it.roster().find(&ActorId::Named(name.into())).expect("actor on stage");
    it.roster().get(handle).unwrap().tile(it.config().tile_size)
}

#[test]
fn barrier_closes_once_for_several_movers() {
    let mut it = interp("none/follow/farmer 0 0 2 Abigail 0 2 2 Sam 0 4 2/move Abigail 2 0 1 Sam 3 0 1/playSound done/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();

    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.movement().len(), 2);
    assert_eq!(it.pointer(), 3);

    let mut advances = Vec::new();
    let mut last = it.pointer();
    for _ in 0..400 {
        tick(&mut it, &mut stage, &mut sink);
        if it.pointer() != last {
            advances.push(it.pointer());
            last = it.pointer();
        }
        if it.is_terminal() {
            break;
        }
    }

    assert_eq!(advances, vec![4, 5]);
    assert!(it.movement().is_empty());
    assert_eq!(tile_of(&it, "Abigail"), TilePoint::new(2, 2));
    assert_eq!(tile_of(&it, "Sam"), TilePoint::new(3, 4));
    assert_eq!(stage.count(|c| *c == StageCall::PlaySound("done".into())), 1);
    assert!(sink.is_empty());
}

#[test]
fn arrival_faces_the_requested_direction_and_drops_overrides() {
    let mut it = interp("none/follow/farmer 0 0 2 Abigail 0 2 2/speed Abigail 4/move Abigail 0 -1 3/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    for _ in 0..100 {
        tick(&mut it, &mut stage, &mut sink);
    }
    let handle = it.roster().find(&ActorId::Named("Abigail".into())).unwrap();
    let abigail = it.roster().get(handle).unwrap();
    assert_eq!(abigail.facing, Direction::Left);
    assert_eq!(abigail.speed_override, None);
    assert!(!abigail.scripted_motion);
    assert!(it.is_terminal());
}

#[test]
fn continue_lets_the_script_run_while_actors_walk() {
    let mut it = interp("none/follow/farmer 0 0 2 Abigail 0 2 2/move Abigail 2 0 1 continue/playSound early/pause 5000/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();

    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 4);
    assert!(it.flags().continue_after_move);

    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 5);
    assert_eq!(it.movement().len(), 1);
    assert_eq!(stage.count(|c| *c == StageCall::PlaySound("early".into())), 1);

    for _ in 0..100 {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert!(it.movement().is_empty());
    assert!(!it.flags().continue_after_move);
    assert_eq!(it.pointer(), 5, "landing a continued move must not advance the pointer");
    assert_eq!(tile_of(&it, "Abigail"), TilePoint::new(2, 2));
}

#[test]
fn missing_mover_is_reported_and_the_rest_still_move() {
    let mut it = interp("none/follow/farmer 0 0 2 Abigail 0 2 2/move Ghost 1 0 1 Abigail 1 0 1 Dog? 1 0 1/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.movement().len(), 1);
    assert_eq!(sink.reports.len(), 1);
    assert!(sink.reports[0].reason.contains("Ghost"));
}

#[test]
fn malformed_move_is_skipped() {
    let mut it = interp("none/follow/farmer 0 0 2 Abigail 0 2 2/move Abigail 2 0/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 4);
    assert!(it.movement().is_empty());
    assert_eq!(sink.reports.len(), 1);
}

#[test]
fn non_finite_speed_is_rejected_and_the_move_still_lands() {
    let mut it = interp("none/follow/farmer 0 0 2 Abigail 0 2 2/speed Abigail NaN/move Abigail 1 0 1/playSound after/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    for _ in 0..200 {
        tick(&mut it, &mut stage, &mut sink);
        if it.is_terminal() {
            break;
        }
    }
    assert_eq!(sink.count(pe::Severity::Recoverable), 1);
    assert!(it.is_terminal());
    assert!(it.movement().is_empty());
    assert_eq!(tile_of(&it, "Abigail"), TilePoint::new(1, 2));
    assert_eq!(stage.count(|c| *c == StageCall::PlaySound("after".into())), 1);
}

#[test]
fn halt_clears_the_barrier() {
    let mut it = interp("none/follow/farmer 0 0 2 Abigail 0 2 2/move Abigail 5 0 1 continue/halt/playSound after/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    tick(&mut it, &mut stage, &mut sink);
    assert!(it.movement().is_empty());
    assert_eq!(it.pointer(), 5);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(stage.count(|c| *c == StageCall::PlaySound("after".into())), 1);
}

#[test]
fn advanced_move_walks_beside_the_script() {
    let mut it = interp("none/follow/farmer 0 0 2 Linus 0 0 2/advancedMove Linus false 1 0 2 300/playSound go/pause 3000/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.paths().len(), 1);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 5, "paths never hold the script back");

    for _ in 0..80 {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert!(it.paths().is_empty());
    assert_eq!(tile_of(&it, "Linus"), TilePoint::new(1, 0));
    let handle = it.roster().find(&ActorId::Named("Linus".into())).unwrap();
    let linus = it.roster().get(handle).unwrap();
    assert_eq!(linus.facing, Direction::Down);
    assert!(!linus.scripted_motion);
}

#[test]
fn walk_in_square_loops_until_stopped() {
    let mut it = interp("none/follow/farmer 0 0 2 Linus 3 3 2/walkInSquare Linus 1 1/pause 2000/stopAdvancedMoves/pause 100/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    for _ in 0..60 {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert_eq!(it.paths().len(), 1);
    assert!(it.paths()[0].is_looping());
    for _ in 0..100 {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert!(it.paths().is_empty());
}

#[test]
fn emote_waits_for_the_bubble_unless_continued() {
    let mut it = interp("none/follow/farmer 0 0 2 Abigail 0 2 2/emote Abigail 12/playSound after/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    for _ in 0..10 {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert_eq!(it.pointer(), 3);
    assert_eq!(stage.count(StageCall::is_emote), 1);
    for _ in 0..40 {
        tick(&mut it, &mut stage, &mut sink);
    }
    assert!(it.pointer() >= 4);

    let mut it = interp("none/follow/farmer 0 0 2 Abigail 0 2 2/emote Abigail 12 continue/playSound same/end");
    let mut stage = RecordingStage::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 5);
    assert_eq!(stage.count(|c| *c == StageCall::PlaySound("same".into())), 1);
}

#[test]
fn warp_and_face_chain_with_continue() {
    let mut it = interp("none/follow/farmer 0 0 2 Abigail 0 2 2/warp Abigail 7 7 continue/faceDirection Abigail left continue/playSound done/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 6);
    assert_eq!(tile_of(&it, "Abigail"), TilePoint::new(7, 7));
    let handle = it.roster().find(&ActorId::Named("Abigail".into())).unwrap();
    assert_eq!(it.roster().get(handle).unwrap().facing, Direction::Left);
}

#[test]
fn add_and_remove_actors() {
    let mut it = interp("none/follow/farmer 0 0 2/addActor pet Dog 4 4 down/jump Dog/removeActor Dog/emote Dog? 8/end");
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.roster().len(), 2);
    tick(&mut it, &mut stage, &mut sink);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.roster().len(), 1);
    tick(&mut it, &mut stage, &mut sink);
    assert_eq!(it.pointer(), 7);
    assert!(sink.is_empty(), "optional references skip silently");
}
