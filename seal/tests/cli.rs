//! Tests for the `seal` command line

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const ZOO: &str = r#"
sealed class Mammal(name: String)
class Cat(name: String) : Mammal(name)
class Human(name: String) : Mammal(name)

fn greet(m: Mammal) -> String = when m {
    is Human => "Hello " + m.name,
    is Cat => "Hello " + m.name,
};

fn main() -> String = greet(Cat("Lucy"));
fn other() -> String = greet(Human("Ada"));
"#;

fn seal_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("seal"))
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn help_shows_commands() {
    seal_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("hierarchy"));
}

#[test]
fn check_accepts_exhaustive_when() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "zoo.seal", ZOO);

    seal_cmd()
        .arg("check")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ zoo type checks successfully"));
}

#[test]
fn check_rejects_missing_variant() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "zoo.seal", &ZOO.replace("    is Cat => \"Hello \" + m.name,\n", ""));

    seal_cmd()
        .arg("check")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is Cat"))
        .stderr(predicate::str::contains("not covered"));
}

#[test]
fn run_prints_entry_value() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "zoo.seal", ZOO);

    seal_cmd()
        .arg("run")
        .arg(&file)
        .assert()
        .success()
        .stdout("Hello Lucy\n");

    seal_cmd()
        .args(["run", "--entry", "other"])
        .arg(&file)
        .assert()
        .success()
        .stdout("Hello Ada\n");
}

#[test]
fn run_reports_unknown_entry() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "zoo.seal", ZOO);

    seal_cmd()
        .args(["run", "--entry", "start"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry function `start` not found"));
}

#[test]
fn hierarchy_marks_closed_variant_sets() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "zoo.seal", ZOO);

    seal_cmd()
        .arg("hierarchy")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("sealed class Mammal [zoo] closed {Cat, Human}"))
        .stdout(predicate::str::contains("└── class Human [zoo]"));
}

#[test]
fn project_directory_reports_scope_violation() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Seal.toml", "[package]\nname = \"zoo\"\n");
    write(dir.path(), "src/zoo.seal", ZOO);
    write(dir.path(), "src/pets.seal", "class Dog(name: String) : Mammal(name)\n");

    seal_cmd()
        .arg("check")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dog"))
        .stderr(predicate::str::contains("pets"));
}

#[test]
fn project_lint_level_deny_fails_check() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "Seal.toml",
        "[package]\nname = \"zoo\"\nentry = \"main\"\n\n[lints]\nempty-sealed = \"deny\"\n",
    );
    write(dir.path(), "src/zoo.seal", &format!("{ZOO}\nsealed class Nothing\n"));

    seal_cmd()
        .arg("check")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing"));
}

#[test]
fn project_rejects_unknown_manifest_keys() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Seal.toml", "[package]\nname = \"zoo\"\nedition = \"2024\"\n");
    write(dir.path(), "src/zoo.seal", ZOO);

    seal_cmd()
        .arg("check")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Seal.toml"));
}

#[test]
fn tokens_and_parse_dump_debug_output() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "zoo.seal", ZOO);

    seal_cmd()
        .arg("tokens")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Sealed @ 1..7"));

    seal_cmd()
        .arg("parse")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Sealed\""));
}

#[test]
fn missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    seal_cmd()
        .arg("check")
        .arg(dir.path().join("nowhere.seal"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}
