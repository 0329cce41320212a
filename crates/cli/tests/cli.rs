use assert_cmd::Command;
use predicates::prelude::*;

fn shelf(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("shelf").unwrap();
    cmd.current_dir(config_dir)
        .env("SHELF_CONFIG_DIR", config_dir)
        .env_remove("SHELF_ENV")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    shelf(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"));
}

#[test]
fn config_reflects_overrides() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("base.toml"), "[server]\nport = 6060\n").unwrap();

    shelf(dir.path())
        .args(["--database-url", "sqlite::memory:", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"port\": 6060"))
        .stdout(predicate::str::contains("sqlite::memory:"));
}

#[test]
fn migrate_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("books.db").display()
    );

    shelf(dir.path())
        .args(["--database-url", &url, "migrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("applied 1 migration(s)"));

    shelf(dir.path())
        .args(["--database-url", &url, "migrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("applied 0 migration(s)"));
}

#[test]
fn unknown_environment_fails() {
    let dir = tempfile::tempdir().unwrap();
    shelf(dir.path())
        .env("SHELF_ENV", "qa")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported environment"));
}
