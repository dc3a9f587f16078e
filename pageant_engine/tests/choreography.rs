use std::collections::BTreeMap;

use pageant_data::{DanceRosterDef, DanceRosterPair};
use pageant_engine as pe;
use pe::choreography::{ChoreographyError, pair_dancers};
use pe::{
    CollectingSink, DanceBinding, DanceInput, DanceRole, Dancer, EngineConfig, ExecutionContext, Interpreter, Phase,
    ActorId, RecordingStage, ScriptStore, assemble_dance_event,
};
use pageant_data::TilePoint;

const TEMPLATE: &str = "none/follow/Leader1 2 2 2 Leader2 4 2 2 Leader3 6 2 2 Follower1 2 4 0 Follower2 4 4 0 Follower3 6 4 0/warp Leader1 2 2/warp Leader2 4 2/warp Leader3 6 2/showFrame Leader1 44/showFrame Leader3 44/end";

fn roster() -> DanceRosterDef {
    DanceRosterDef {
        pairs: vec![
            DanceRosterPair {
                leader: "Alex".into(),
                follower: "Haley".into(),
            },
            DanceRosterPair {
                leader: "Sam".into(),
                follower: "Penny".into(),
            },
        ],
    }
}

fn store() -> ScriptStore {
    let mut store = ScriptStore::new();
    store.insert_asset(
        "Festivals/spring24",
        BTreeMap::from([("mainEvent".to_string(), TEMPLATE.to_string())]),
    );
    store.set_dance_roster(roster());
    store
}

fn player_with_haley() -> DanceInput {
    DanceInput {
        online_players: vec![1],
        bindings: vec![DanceBinding {
            dancer: Dancer::Player(1),
            role: DanceRole::Leader,
            partner: Dancer::Villager("Haley".into()),
        }],
    }
}

#[test]
fn player_binding_takes_the_middle_and_roster_fills_the_rest() {
    let pairs = pair_dancers(&player_with_haley(), &roster(), 3).expect("pairs fit");
    let names: Vec<String> = pairs.iter().map(ToString::to_string).collect();
    // Sam has no free follower left, so only two of three slots fill
    assert_eq!(names, vec!["farmer1 & Haley", "Alex & Penny"]);
}

#[test]
fn assembled_dance_drops_empty_slots_and_runs_to_the_end() {
    let script =
        assemble_dance_event(&store(), "Festivals/spring24", "mainEvent", 1, &player_with_haley()).expect("assembles");
    assert_eq!(
        script.commands(),
        &[
            "none",
            "follow",
            "farmer1 2 2 2 Alex 4 2 2 Haley 2 4 0 Penny 4 4 0",
            "warp farmer1 2 2",
            "warp Alex 6 2",
            "showFrame farmer1 12",
            "faceDirection farmer1 0",
            "end",
        ]
    );

    let mut it = Interpreter::new(script, EngineConfig::default());
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    let mut phase = Phase::Uninitialized;
    for _ in 0..20 {
        let mut ctx = ExecutionContext::new(&mut stage, &mut sink);
        phase = it.tick(&mut ctx);
        if it.is_terminal() {
            break;
        }
    }
    assert_eq!(phase, Phase::Finished);
    assert_eq!(it.roster().len(), 4);
    assert!(sink.is_empty(), "unexpected reports: {:?}", sink.reports);
}

#[test]
fn shared_move_sheds_only_the_empty_slots() {
    let mut store = store();
    store.insert_asset(
        "Festivals/fall16",
        BTreeMap::from([(
            "mainEvent".to_string(),
            "none/follow/Leader1 2 2 2 Leader2 4 2 2 Leader3 6 2 2/move Leader1 0 1 2 Leader2 0 1 2 Leader3 0 1 2/end"
                .to_string(),
        )]),
    );
    let script =
        assemble_dance_event(&store, "Festivals/fall16", "mainEvent", 1, &player_with_haley()).expect("assembles");
    assert_eq!(script.commands()[3], "move farmer1 0 1 2 Alex 0 1 2");

    let mut it = Interpreter::new(script, EngineConfig::default());
    let mut stage = RecordingStage::new();
    let mut sink = CollectingSink::new();
    let mut phase = Phase::Uninitialized;
    for _ in 0..300 {
        let mut ctx = ExecutionContext::new(&mut stage, &mut sink);
        phase = it.tick(&mut ctx);
        if it.is_terminal() {
            break;
        }
    }
    assert_eq!(phase, Phase::Finished);
    let tile = EngineConfig::default().tile_size;
    for (id, expected) in [(ActorId::Player(1), TilePoint::new(2, 3)), (ActorId::Named("Alex".into()), TilePoint::new(4, 3))] {
        let handle = it.roster().find(&id).expect("dancer on stage");
        assert_eq!(it.roster().get(handle).unwrap().tile(tile), expected);
    }
    assert!(sink.is_empty(), "unexpected reports: {:?}", sink.reports);
}

#[test]
fn offline_players_do_not_dance() {
    let mut input = player_with_haley();
    input.online_players.clear();
    let pairs = pair_dancers(&input, &roster(), 2).expect("pairs fit");
    assert!(pairs.iter().all(|p| !p.involves_player()));
    assert_eq!(pairs.len(), 2);
}

#[test]
fn too_many_bound_pairs_is_an_error() {
    let input = DanceInput {
        online_players: vec![1, 2],
        bindings: vec![
            DanceBinding {
                dancer: Dancer::Player(1),
                role: DanceRole::Leader,
                partner: Dancer::Villager("Haley".into()),
            },
            DanceBinding {
                dancer: Dancer::Player(2),
                role: DanceRole::Follower,
                partner: Dancer::Villager("Sam".into()),
            },
        ],
    };
    assert_eq!(
        pair_dancers(&input, &roster(), 1),
        Err(ChoreographyError::TooManyPairs { pairs: 2, slots: 1 })
    );
}

#[test]
fn a_store_without_a_roster_cannot_host_a_dance() {
    let mut store = ScriptStore::new();
    store.insert_asset(
        "Festivals/spring24",
        BTreeMap::from([("mainEvent".to_string(), TEMPLATE.to_string())]),
    );
    let err = assemble_dance_event(&store, "Festivals/spring24", "mainEvent", 1, &player_with_haley())
        .expect_err("no roster");
    assert_eq!(
        err.downcast_ref::<ChoreographyError>(),
        Some(&ChoreographyError::MissingRoster)
    );
}

#[test]
fn templates_without_slots_are_rejected() {
    let mut store = store();
    store.insert_asset(
        "Festivals/summer28",
        BTreeMap::from([("mainEvent".to_string(), "none/follow/farmer 1 1 2/end".to_string())]),
    );
    let err = assemble_dance_event(&store, "Festivals/summer28", "mainEvent", 1, &DanceInput::default())
        .expect_err("no slots");
    assert!(matches!(
        err.downcast_ref::<ChoreographyError>(),
        Some(ChoreographyError::MissingTemplate(_))
    ));
}

#[test]
fn bundled_dance_input_parses_from_json() {
    let text = std::fs::read_to_string(pe::data_paths::data_path("dancers.json")).expect("dancers.json present");
    let input: DanceInput = serde_json::from_str(&text).expect("dance input parses");
    assert_eq!(input.online_players, vec![1, 2]);
    assert_eq!(input.bindings[1].partner, Dancer::Villager("Sam".into()));

    let without_bindings: DanceInput = serde_json::from_str(r#"{ "online_players": [3] }"#).unwrap();
    assert!(without_bindings.bindings.is_empty());
}
