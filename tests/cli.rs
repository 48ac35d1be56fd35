use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn affaire(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("affaire").unwrap();
    cmd.current_dir(dir)
        .env_remove("AFFAIRE_DB")
        .env_remove("AFFAIRE_SETTINGS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_task_workflow() {
    let temp_dir = TempDir::new().unwrap();

    affaire(&temp_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));
    assert!(temp_dir.path().join("affaire.db").exists());

    affaire(&temp_dir)
        .args(["add", "buy milk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task #1: buy milk"));

    affaire(&temp_dir)
        .args(["add", "renew passport", "--expires", "2031-05-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("expires at 2031-05-01 00:00"));

    affaire(&temp_dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 [ ] buy milk"))
        .stdout(predicate::str::contains("#2 [ ] renew passport"));

    // no changes given: toggles done
    affaire(&temp_dir)
        .args(["update", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 [x] buy milk"));

    affaire(&temp_dir)
        .args(["list", "--active"])
        .assert()
        .success()
        .stdout(predicate::str::contains("renew passport"))
        .stdout(predicate::str::contains("buy milk").not());

    affaire(&temp_dir)
        .args(["update", "2", "--body", "renew ID card"])
        .assert()
        .success()
        .stdout(predicate::str::contains("renew ID card"));

    affaire(&temp_dir)
        .args(["list", "--search", "card"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#2"))
        .stdout(predicate::str::contains("#1").not());

    affaire(&temp_dir)
        .args(["delete", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted task #1"));

    affaire(&temp_dir)
        .arg("delete")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    affaire(&temp_dir)
        .args(["delete", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 task(s)"));

    affaire(&temp_dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks."));
}

#[test]
fn test_requires_init() {
    let temp_dir = TempDir::new().unwrap();
    affaire(&temp_dir)
        .args(["add", "too early"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("affaire init"));
}

#[test]
fn test_errors_are_reported() {
    let temp_dir = TempDir::new().unwrap();
    affaire(&temp_dir).arg("init").assert().success();

    affaire(&temp_dir)
        .args(["update", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task #42 not found"));

    affaire(&temp_dir)
        .args(["add", "x", "--expires", "someday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid expiry"));
}

#[test]
fn test_db_path_from_env() {
    let temp_dir = TempDir::new().unwrap();
    affaire(&temp_dir)
        .env("AFFAIRE_DB", "custom.db")
        .arg("init")
        .assert()
        .success();
    assert!(temp_dir.path().join("custom.db").exists());
    assert!(!temp_dir.path().join("affaire.db").exists());
}

#[test]
fn test_json_config() {
    let temp_dir = TempDir::new().unwrap();

    affaire(&temp_dir)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No settings."));

    affaire(&temp_dir)
        .args(["config", "set", "theme", "dark"])
        .assert()
        .success();
    assert!(temp_dir.path().join("settings.json").exists());

    affaire(&temp_dir)
        .args(["config", "get", "theme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dark\""));

    affaire(&temp_dir)
        .args(["config", "get", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Setting \"missing\" is not defined"));
}

#[test]
fn test_db_config_seeds_defaults() {
    let temp_dir = TempDir::new().unwrap();

    affaire(&temp_dir)
        .args(["--store", "db", "config", "get", "version"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));

    affaire(&temp_dir)
        .args(["--store", "db", "config", "set", "limit", "5"])
        .assert()
        .success();

    affaire(&temp_dir)
        .args(["--store", "db", "config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("limit = 5"));
    assert!(!temp_dir.path().join("settings.json").exists());
}
