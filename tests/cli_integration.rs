//! Integration tests for the PassVault CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! Passwords come from the `PASSVAULT_*` environment variables so no
//! prompt is ever shown, and a `.passvault.toml` lowers the PBKDF2 work
//! factor to keep the suite fast.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const MASTER: &str = "Tr0ub4dor&3";

/// Helper: get a Command pointing at the passvault binary.
fn passvault() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("passvault").expect("binary should exist")
}

/// A project directory with a fast config.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tmp.child(".passvault.toml")
        .write_str("kdf_iterations = 10000\n")
        .unwrap();
    tmp
}

/// `passvault` run inside `dir` with the master password set.
fn pv(dir: &TempDir) -> Command {
    let mut cmd = passvault();
    cmd.current_dir(dir.path())
        .env("PASSVAULT_PASSWORD", MASTER)
        .env_remove("PASSVAULT_NEW_PASSWORD")
        .env_remove("PASSVAULT_COLLECTION_SECRET")
        .env_remove("PASSVAULT_NEW_COLLECTION_SECRET");
    cmd
}

fn init(dir: &TempDir) {
    pv(dir).arg("init").assert().success();
}

// ---------------------------------------------------------------------------
// Help and argument handling
// ---------------------------------------------------------------------------

#[test]
fn help_flag_shows_usage() {
    passvault()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Local encrypted vault"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("credential"))
        .stdout(predicate::str::contains("note"))
        .stdout(predicate::str::contains("card"))
        .stdout(predicate::str::contains("collection"))
        .stdout(predicate::str::contains("backup"));
}

#[test]
fn version_flag_shows_version() {
    passvault()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("passvault"));
}

#[test]
fn no_args_shows_help() {
    passvault()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn completions_for_bash() {
    passvault()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("passvault"));
}

// ---------------------------------------------------------------------------
// Vault lifecycle
// ---------------------------------------------------------------------------

#[test]
fn init_creates_vault_and_refuses_twice() {
    let dir = project();
    init(&dir);
    dir.child(".passvault/store/vault.json")
        .assert(predicate::path::exists());

    pv(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_rejects_short_password() {
    let dir = project();
    pv(&dir)
        .env("PASSVAULT_PASSWORD", "short")
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8"));
}

#[test]
fn commands_on_missing_vault_fail() {
    let dir = project();
    pv(&dir)
        .args(["credential", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn wrong_master_password_fails() {
    let dir = project();
    init(&dir);
    pv(&dir)
        .env("PASSVAULT_PASSWORD", "tr0ub4dor&3")
        .arg("unlock")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Authentication failed"));
}

#[test]
fn weak_configured_work_factor_is_rejected() {
    let dir = TempDir::new().unwrap();
    dir.child(".passvault.toml")
        .write_str("kdf_iterations = 10\n")
        .unwrap();
    pv(&dir).arg("init").assert().failure();
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[test]
fn credential_add_show_delete() {
    let dir = project();
    init(&dir);

    pv(&dir)
        .args(["credential", "add", "GitHub", "--username", "octo", "--password", "ghp_123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id 1"));

    pv(&dir)
        .args(["credential", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GitHub"))
        .stdout(predicate::str::contains("ghp_123").not());

    pv(&dir)
        .args(["credential", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ghp_123"));

    pv(&dir)
        .args(["credential", "delete", "1", "--force"])
        .assert()
        .success();

    pv(&dir)
        .args(["credential", "show", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn note_body_is_not_stored_in_plaintext() {
    let dir = project();
    init(&dir);

    pv(&dir)
        .args(["note", "add", "Codes", "--category", "other", "--body", "launch codes"])
        .assert()
        .success();

    let doc = std::fs::read_to_string(dir.path().join(".passvault/store/vault.json")).unwrap();
    assert!(!doc.contains("launch codes"));

    pv(&dir)
        .args(["note", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("launch codes"));
}

#[test]
fn card_with_unknown_field_is_rejected() {
    let dir = project();
    init(&dir);

    pv(&dir)
        .args(["card", "add", "passport", "Mine", "--field", "cvv=123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a Passport field"));

    pv(&dir)
        .args([
            "card", "add", "passport", "Mine",
            "--field", "passportNumber=X12345678",
            "--expires", "2099-01-01",
        ])
        .assert()
        .success();

    pv(&dir)
        .args(["card", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5678"))
        .stdout(predicate::str::contains("X12345678").not());
}

#[test]
fn favorite_and_card_stats_commands() {
    let dir = project();
    init(&dir);
    for title in ["GitHub", "Bank"] {
        pv(&dir)
            .args(["credential", "add", title, "--password", "pw"])
            .assert()
            .success();
    }

    pv(&dir)
        .args(["credential", "favorite", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("now a favorite"));
    pv(&dir)
        .args(["credential", "list", "--favorites"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bank"))
        .stdout(predicate::str::contains("GitHub").not());

    pv(&dir)
        .args([
            "card", "add", "passport", "Old",
            "--field", "passportNumber=X12345678",
            "--expires", "2001-01-01",
        ])
        .assert()
        .success();
    pv(&dir)
        .args(["card", "expired"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Old"));
    pv(&dir)
        .args(["card", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Expired"));
}

// ---------------------------------------------------------------------------
// Collections and files
// ---------------------------------------------------------------------------

#[test]
fn protected_collection_roundtrip() {
    let dir = project();
    init(&dir);
    dir.child("report.txt").write_str("Q3 numbers").unwrap();

    pv(&dir)
        .env("PASSVAULT_NEW_COLLECTION_SECRET", "vaultPass1")
        .args(["collection", "create", "Documents", "--kind", "documents", "--protect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("own secret"));

    pv(&dir)
        .env("PASSVAULT_COLLECTION_SECRET", "vaultPass1")
        .args(["file", "put", "Documents", "report.txt"])
        .assert()
        .success();

    pv(&dir)
        .env("PASSVAULT_COLLECTION_SECRET", "wrong")
        .args(["file", "get", "1", "--output", "out-wrong.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication failed"));
    dir.child("out-wrong.txt").assert(predicate::path::missing());

    pv(&dir)
        .env("PASSVAULT_COLLECTION_SECRET", "vaultPass1")
        .args(["file", "get", "1", "--output", "out.txt"])
        .assert()
        .success();
    dir.child("out.txt").assert("Q3 numbers");
}

// ---------------------------------------------------------------------------
// Backups
// ---------------------------------------------------------------------------

#[test]
fn backup_create_verify_restore() {
    let dir = project();
    init(&dir);
    pv(&dir)
        .args(["credential", "add", "Mail", "--password", "pw-1"])
        .assert()
        .success();

    let doc_path = dir.path().join(".passvault/store/vault.json");
    let before = std::fs::read(&doc_path).unwrap();

    pv(&dir)
        .args(["backup", "create", "-d", "nightly"])
        .assert()
        .success();

    let catalog = std::fs::read_to_string(dir.path().join(".passvault/backups/catalog.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&catalog).unwrap();
    let id = value[0]["id"].as_str().unwrap().to_string();

    // Verify works without the master password.
    passvault()
        .current_dir(dir.path())
        .env_remove("PASSVAULT_PASSWORD")
        .args(["backup", "verify", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("intact"));

    pv(&dir)
        .args(["credential", "delete", "1", "--force"])
        .assert()
        .success();

    pv(&dir)
        .args(["backup", "restore", &id, "--force"])
        .assert()
        .success();
    assert_eq!(std::fs::read(&doc_path).unwrap(), before);

    pv(&dir).args(["backup", "cleanup"]).assert().success();
    dir.child(".passvault/store.before_restore")
        .assert(predicate::path::missing());
}
