//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

mod common;

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use common::{invalid_config_fixture, valid_config_fixture};

/// Test fixture for configuration testing
struct ConfigFixture {
    _temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self {
            _temp_dir: temp_dir,
            config_path,
        }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }
}

fn config_cmd() -> Command {
    let mut cmd = Command::cargo_bin("executor-state").unwrap();
    for var in [
        "EXECUTOR_STATE_CONFIG",
        "EXECUTOR_STATE_LOG_LEVEL",
        "EXECUTOR_STATE_LOG_FILE",
        "EXECUTOR_STATE_LOG_JSON",
        "EXECUTOR_STATE_CACHE_MAX_ENTRIES",
        "EXECUTOR_STATE_DEBOUNCE_MS",
        "EXECUTOR_STATE_DEMO_DELAY_MS",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("config");
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_empty_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    config_cmd()
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .success();
}

#[test]
fn test_full_config_fixture() {
    config_cmd()
        .arg("validate")
        .arg("--config")
        .arg(valid_config_fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_partial_sections_use_defaults() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[cache]
max_entries = 42
"#,
    );

    config_cmd()
        .arg("show")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("max_entries = 42"))
        .stdout(predicate::str::contains("delay_ms = 300"))
        .stdout(predicate::str::contains("level = \"info\""));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_config_fixture() {
    config_cmd()
        .arg("validate")
        .arg("--config")
        .arg(invalid_config_fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("E102"))
        .stderr(predicate::str::contains("loud"));
}

#[test]
fn test_zero_debounce_delay() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[debounce]
delay_ms = 0
"#,
    );

    config_cmd()
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("delay_ms"));
}

#[test]
fn test_zero_max_files() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[logging]
max_files = 0
"#,
    );

    config_cmd()
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_files"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[cache\nmax_entries = ");

    config_cmd()
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse configuration"));
}

#[test]
fn test_wrong_value_type() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[cache]
max_entries = "many"
"#,
    );

    config_cmd()
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("E101"));
}

// ─────────────────────────────────────────────────────────────────
// Config Show Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_custom() {
    config_cmd()
        .arg("show")
        .arg("--config")
        .arg(valid_config_fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("level = \"debug\""))
        .stdout(predicate::str::contains("max_entries = 16"))
        .stdout(predicate::str::contains("delay_ms = 120"))
        .stdout(predicate::str::contains("delay_ms = 5"));
}

// ─────────────────────────────────────────────────────────────────
// Config Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested").join("new_config.toml");

    config_cmd()
        .arg("init")
        .arg("--path")
        .arg(config_path.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"));

    assert!(config_path.exists());

    config_cmd()
        .arg("validate")
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .assert()
        .success();
}

#[test]
fn test_config_init_refuses_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[cache]\n");

    config_cmd()
        .arg("init")
        .arg("--path")
        .arg(fixture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_init_force_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[cache]\nmax_entries = 987654\n");

    config_cmd()
        .arg("init")
        .arg("--path")
        .arg(fixture.path())
        .arg("--force")
        .assert()
        .success();

    let content = fs::read_to_string(fixture.path()).unwrap();
    assert!(!content.contains("987654"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Variable Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_override_cache_size() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[cache]
max_entries = 10
"#,
    );

    config_cmd()
        .arg("show")
        .arg("--config")
        .arg(fixture.path())
        .env("EXECUTOR_STATE_CACHE_MAX_ENTRIES", "77")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_entries = 77"));
}

#[test]
fn test_env_override_log_level() {
    config_cmd()
        .arg("show")
        .arg("--config")
        .arg(valid_config_fixture())
        .env("EXECUTOR_STATE_LOG_LEVEL", "trace")
        .env("EXECUTOR_STATE_DEBOUNCE_MS", "450")
        .assert()
        .success()
        .stdout(predicate::str::contains("level = \"trace\""))
        .stdout(predicate::str::contains("delay_ms = 450"));
}

#[test]
fn test_env_override_is_validated() {
    config_cmd()
        .arg("validate")
        .env("EXECUTOR_STATE_LOG_LEVEL", "shouting")
        .assert()
        .failure()
        .stderr(predicate::str::contains("shouting"));
}

// ─────────────────────────────────────────────────────────────────
// Path Expansion Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_tilde_expansion() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[logging]
file = "~/executor-state/logs/demo.log"
"#,
    );

    let output = config_cmd()
        .arg("show")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("demo.log"));
    assert!(!stdout.contains("file = \"~"));
}
