use std::fs;

use pageant_engine as pe;
use pe::{EventError, ScriptStore};
use tempfile::tempdir;

const CONTENT: &str = r##"(
    bundles: [
        (
            asset: "Data/Events/Town",
            entries: {
                "100": r#"none/follow/farmer 1 1 2/speak Lewis "Hello, neighbor."/end"#,
            },
        ),
        (
            asset: "Festivals/spring24",
            entries: {
                "mainEvent": "none/follow/farmer 1 1 2/end",
                "mainEvent_y2": "none/follow/farmer 2 2 2/end",
            },
        ),
    ],
)"##;

#[test]
fn ron_content_loads_and_resolves_year_variants() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("content.ron");
    fs::write(&path, CONTENT).unwrap();

    let store = ScriptStore::load(&path).expect("content loads");
    assert!(store.has_asset("Data/Events/Town"));
    assert!(store.dance_roster().is_none());

    let town = store.resolve("Data/Events/Town", "100", 1).unwrap();
    assert_eq!(town.commands()[3], r#"speak Lewis "Hello, neighbor.""#);

    let year_one = store.resolve("Festivals/spring24", "mainEvent", 1).unwrap();
    let year_four = store.resolve("Festivals/spring24", "mainEvent", 4).unwrap();
    assert_eq!(year_one.commands()[2], "farmer 1 1 2");
    assert_eq!(year_four.commands()[2], "farmer 2 2 2");
    assert_eq!(year_four.key.to_string(), "Festivals/spring24:mainEvent_y2");
}

#[test]
fn duplicate_assets_are_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dupes.ron");
    fs::write(
        &path,
        r#"(bundles: [
            (asset: "Town", entries: { "1": "none/follow/farmer 1 1 2/end" }),
            (asset: "Town", entries: { "2": "none/follow/farmer 1 1 2/end" }),
        ])"#,
    )
    .unwrap();

    let err = ScriptStore::load(&path).expect_err("duplicates rejected");
    assert!(format!("{err:#}").contains("duplicate asset id 'Town'"));
}

#[test]
fn malformed_ron_names_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    fs::write(&path, "(bundles: [ (asset: \"Town\" ").unwrap();

    let err = ScriptStore::load(&path).expect_err("parse fails");
    let message = format!("{err:#}");
    assert!(message.contains("parsing content RON"));
    assert!(message.contains("broken.ron"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = ScriptStore::load(&dir.path().join("absent.ron")).expect_err("no file");
    assert!(format!("{err:#}").contains("reading content"));
}

#[test]
fn unknown_assets_and_entries_are_typed_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("content.ron");
    fs::write(&path, CONTENT).unwrap();
    let store = ScriptStore::load(&path).unwrap();

    let err = store.resolve("Data/Events/Farm", "100", 1).unwrap_err();
    assert_eq!(
        err.downcast_ref::<EventError>(),
        Some(&EventError::UnknownAsset("Data/Events/Farm".into()))
    );

    let err = store.resolve("Data/Events/Town", "999", 1).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EventError>(),
        Some(EventError::MissingScript { entry, .. }) if entry == "999"
    ));
}

#[test]
fn bundled_content_is_valid() {
    let path = pe::data_paths::data_path("content.ron");
    let store = ScriptStore::load(&path).expect("shipped content loads");
    assert!(store.has_asset("FlowerDance"));
    assert!(store.dance_roster().is_some());
    assert!(store.resolve("Town", "intro", 1).is_ok());
}
