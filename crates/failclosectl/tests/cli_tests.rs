//! CLI integration tests
//!
//! Runs the failclosectl binary against configuration and rules files in a
//! temporary directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn workspace(config: &str, rules: Option<&str>) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("failclose.yaml");
    std::fs::write(&config_path, config).unwrap();
    if let Some(rules) = rules {
        std::fs::write(dir.path().join("permissions.yaml"), rules).unwrap();
    }
    (dir, config_path)
}

const CONFIG: &str = r#"
project_name: foobar
permissions_module: permissions.yaml
installed_apps:
  - django.contrib.auth
  - failclose
"#;

fn failclosectl() -> Command {
    let mut cmd = Command::cargo_bin("failclosectl").unwrap();
    cmd.env_remove("FAILCLOSE_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_validate_valid_rules() {
    let (_dir, config) = workspace(CONFIG, Some("rules:\n  failclose: [pretty, ugly]\n  foobar: []\n"));

    failclosectl()
        .arg("--config")
        .arg(&config)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rules OK: 2 app entries"))
        .stdout(predicate::str::contains("foobar: all handlers"));
}

#[test]
fn test_validate_invalid_rules() {
    let (_dir, config) = workspace(CONFIG, Some("rules:\n  shire: [bow, arrow]\n  auth: [login]\n"));

    failclosectl()
        .arg("--config")
        .arg(&config)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("shire"));
}

#[test]
fn test_validate_without_rules_source() {
    let (_dir, config) = workspace("project_name: foobar\n", None);

    failclosectl()
        .arg("--config")
        .arg(&config)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("permissions_module"));
}

#[test]
fn test_project_from_root_urlconf() {
    let (_dir, config) = workspace("root_urlconf: foobar.urls\n", None);

    failclosectl()
        .arg("--config")
        .arg(&config)
        .arg("project")
        .assert()
        .success()
        .stdout("foobar\n");
}

#[test]
fn test_project_from_deep_urlconf_fails() {
    let (_dir, config) = workspace("root_urlconf: foo.bar.urls\n", None);

    failclosectl()
        .arg("--config")
        .arg(&config)
        .arg("project")
        .assert()
        .failure();
}

#[test]
fn test_check_denied_handler() {
    let (_dir, config) = workspace(CONFIG, Some("rules:\n  failclose: [pretty]\n"));

    failclosectl()
        .arg("--config")
        .arg(&config)
        .args(["check", "failclose.tests.urls.ugly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deny"));
}

#[test]
fn test_check_marked_safe_handler_json() {
    let (_dir, config) = workspace(CONFIG, Some("rules:\n  failclose: [pretty]\n"));

    failclosectl()
        .arg("--config")
        .arg(&config)
        .args(["check", "failclose.tests.urls.ugly", "--safe", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"allowed\": true"))
        .stdout(predicate::str::contains("marked safe"));
}

#[test]
fn test_check_with_explicit_rules_file() {
    let (dir, config) = workspace(CONFIG, None);
    let rules = dir.path().join("other.yaml");
    std::fs::write(&rules, "rules:\n  foobar: []\n").unwrap();

    failclosectl()
        .arg("--config")
        .arg(&config)
        .args(["check", "foobar.views.index", "--rules"])
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("App:          foobar"))
        .stdout(predicate::str::contains("allow (app whitelisted)"));
}

#[test]
fn test_check_unknown_app_fails() {
    let (_dir, config) = workspace(CONFIG, Some("rules: {}\n"));

    failclosectl()
        .arg("--config")
        .arg(&config)
        .args(["check", "mordor.views.index"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mordor.views"));
}
