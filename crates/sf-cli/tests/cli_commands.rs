#![allow(deprecated)] // Command::cargo_bin: macro replacement not yet stable

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A character that spends exactly its attribute and skill budgets.
const VALID_CHARACTER: &str = r#"{
    "name": "Tova",
    "agilityAllocation": 2,
    "smartsAllocation": 1,
    "spiritAllocation": 1,
    "vigorAllocation": 1,
    "skillAllocation.Athletics": 3,
    "skillAllocation.Fighting": 3,
    "skillAllocation.Notice": 2,
    "skillAllocation.Persuasion": 2,
    "skillAllocation.Stealth": 2
}"#;

const BRAWNY_WEAKLING: &str = r#"{ "edges.Brawny": 1 }"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn statforge() -> Command {
    let mut cmd = Command::cargo_bin("statforge").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_sample_catalog() {
    statforge()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("All checks passed"));
}

#[test]
fn check_reports_broken_entries() {
    let dir = TempDir::new().unwrap();
    let catalog = write(
        &dir,
        "catalog.json",
        r#"{
            "attributes": {"Agility": ""},
            "edges": {"Odd": "Section=combat,arcane Note=\"+1 Parry\""}
        }"#,
    );
    statforge()
        .args(["--catalog", catalog.to_str().unwrap(), "check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("error: edges 'Odd'"))
        .stderr(predicate::str::contains("1 error(s)"));
}

#[test]
fn missing_catalog_fails() {
    statforge()
        .args(["--catalog", "/nonexistent/catalog.json", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

// ---------------------------------------------------------------------------
// show / validate
// ---------------------------------------------------------------------------

#[test]
fn show_character() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "tova.json", VALID_CHARACTER);
    statforge()
        .args(["show", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tova"))
        .stdout(predicate::str::contains("Fighting"))
        .stdout(predicate::str::contains("d8"))
        .stdout(predicate::str::contains("No unmet prerequisites"));
}

#[test]
fn show_includes_skill_modifiers() {
    let dir = TempDir::new().unwrap();
    let alert = VALID_CHARACTER.replace("\"name\": \"Tova\",", "\"edges.Alertness\": 1,");
    let file = write(&dir, "alert.json", &alert);
    statforge()
        .args(["show", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("d6+2"));
}

#[test]
fn validate_valid_character() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "tova.json", VALID_CHARACTER);
    statforge()
        .args(["validate", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn validate_lists_unmet_facts() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "weakling.json", BRAWNY_WEAKLING);
    statforge()
        .args(["validate", file.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("brawnyEdge"))
        .stdout(predicate::str::contains("attributeAllocation"))
        .stderr(predicate::str::contains("unmet validation fact(s)"));
}

#[test]
fn validate_rejects_malformed_json() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "broken.json", "{ not json");
    statforge()
        .args(["validate", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.json"));
}

// ---------------------------------------------------------------------------
// repair
// ---------------------------------------------------------------------------

#[test]
fn repair_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "weakling.json", BRAWNY_WEAKLING);
    let output = dir.path().join("fixed.json");
    statforge()
        .args([
            "repair",
            file.to_str().unwrap(),
            "--seed",
            "3",
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    let repaired: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert!(repaired.is_object());
}

#[test]
fn repair_is_deterministic_per_seed() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "weakling.json", BRAWNY_WEAKLING);
    let run = || {
        statforge()
            .args(["repair", file.to_str().unwrap(), "--seed", "11"])
            .output()
            .unwrap()
            .stdout
    };
    assert_eq!(run(), run());
}

// ---------------------------------------------------------------------------
// random
// ---------------------------------------------------------------------------

#[test]
fn random_character_is_deterministic() {
    let run = || statforge().args(["random", "--seed", "7"]).output().unwrap().stdout;
    let first = run();
    assert_eq!(first, run());
    let character: serde_json::Value = serde_json::from_slice(&first).unwrap();
    assert!(character.get("name").is_some());
    assert!(character.get("race").is_some());
}

#[test]
fn random_single_category() {
    let output = statforge()
        .args(["random", "--category", "attributes", "--seed", "5"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let character: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let map = character.as_object().unwrap();
    assert!(!map.is_empty());
    assert!(map.keys().all(|k| k.ends_with("Allocation")));
    let spent: f64 = map.values().filter_map(serde_json::Value::as_f64).sum();
    assert_eq!(spent, 5.0);
}

#[test]
fn random_category_keeps_input() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "tova.json", VALID_CHARACTER);
    statforge()
        .args(["random", "--category", "weapons", "--input", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Tova\""))
        .stdout(predicate::str::contains("weapons."));
}

#[test]
fn random_unknown_category_fails() {
    statforge()
        .args(["random", "--category", "spaceships"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("spaceships"));
}

// ---------------------------------------------------------------------------
// notes
// ---------------------------------------------------------------------------

#[test]
fn notes_for_edge() {
    statforge()
        .args(["notes", "Arcane Background"])
        .assert()
        .success()
        .stdout(predicate::str::contains("arcaneNotes.arcaneBackground"))
        .stdout(predicate::str::contains("3 Powers/10 Power Points"))
        .stdout(predicate::str::contains("validationNotes.arcaneBackgroundEdge"))
        .stdout(predicate::str::contains("powerPoints"));
}

#[test]
fn notes_for_unknown_trait() {
    statforge()
        .args(["notes", "Teleportation Mastery"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no trait named"));
}
