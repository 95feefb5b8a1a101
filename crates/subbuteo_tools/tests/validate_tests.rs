//! Validation of the data files shipped in the repository and of files
//! written by the engine itself.

use std::path::{Path, PathBuf};

use subbuteo_core::phase::Team;
use subbuteo_core::store::MatchStore;
use subbuteo_headless::store::FileStore;
use subbuteo_test_utils::fixtures::session_in_play;
use subbuteo_tools::validate::{
    validate_data_directory, validate_file, validate_path, FileKind, ValidateError,
};

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

#[test]
fn test_bundled_rules_are_valid() {
    let reports = validate_path(&repo_root().join("assets"), None).unwrap();
    assert!(!reports.is_empty());
    for report in reports {
        assert_eq!(report.result.unwrap(), FileKind::Rules, "{}", report.path.display());
    }
}

#[test]
fn test_bundled_scenarios_are_valid() {
    let dir = repo_root().join("crates/subbuteo_headless/scenarios");
    validate_data_directory(&dir).unwrap();
    for report in validate_path(&dir, None).unwrap() {
        assert_eq!(report.result.unwrap(), FileKind::Scenario);
    }
}

#[test]
fn test_saved_snapshot_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    store.save(&session_in_play(Team::Away).snapshot(5_000)).unwrap();

    let reports = validate_path(dir.path(), None).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].result.as_ref().unwrap(), &FileKind::Snapshot);
}

#[test]
fn test_tampered_snapshot_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    store.save(&session_in_play(Team::Home).snapshot(5_000)).unwrap();

    let path = dir.path().join("fixture.ron");
    let text = std::fs::read_to_string(&path).unwrap();
    let tampered = text.replacen("home: 0", "home: 2", 1);
    assert_ne!(text, tampered);
    std::fs::write(&path, tampered).unwrap();

    assert!(matches!(
        validate_file(&path, Some(FileKind::Snapshot)),
        Err(ValidateError::Data {
            kind: FileKind::Snapshot,
            ..
        })
    ));
}

#[test]
fn test_unordered_scenario_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.ron");
    std::fs::write(
        &path,
        r#"(
            name: "bad",
            steps: [
                (at_ms: 500, command: StartPositioning),
                (at_ms: 100, command: FinishPositioning),
            ],
        )"#,
    )
    .unwrap();

    assert!(matches!(
        validate_file(&path, None),
        Err(ValidateError::Scenario { .. })
    ));
    assert!(matches!(
        validate_data_directory(dir.path()),
        Err(ValidateError::Failed {
            failed: 1,
            total: 1
        })
    ));
}

#[test]
fn test_unrecognized_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.ron");
    std::fs::write(&path, "\"just a string\"").unwrap();
    assert!(matches!(
        validate_file(&path, None),
        Err(ValidateError::Unrecognized(_))
    ));
}
