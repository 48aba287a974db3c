//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides through the CLI

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Test fixture for configuration testing
struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self { temp_dir, config_path }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("persona-sim").unwrap();
        cmd.current_dir(self.temp_dir.path())
            .env("HOME", self.temp_dir.path())
            .env("XDG_CONFIG_HOME", self.temp_dir.path().join(".config"))
            .env_remove("PERSONA_SIM_CONFIG")
            .env_remove("PERSONA_SIM_MODEL")
            .env_remove("PERSONA_SIM_ROUNDS")
            .env_remove("PERSONA_SIM_LOG_LEVEL");
        cmd
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[generation]
model = "gpt-4o-mini"
"#,
    );

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .success();
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[generation]
base_url = "http://localhost:11434/v1"
api_key = ""
model = "llama3"
timeout_secs = 60
failure_policy = "abort"

[generation.retry]
max_attempts = 5
base_delay_ms = 500
jitter_ms = 500
jitter_growth_ms = 250

[questionnaire]
temperature = 0.4

[dialogue]
rounds = 8
window = 12
combined_window = 10
background_cap = 9
combined_background_cap = 5

[pipeline]
max_parallel_personas = 4
skip_existing = true

[paths]
personas_file = "data/characters.json"
questions_dir = "data/questions"
output_dir = "runs"

[logging]
level = "debug"
json_format = true
"#,
    );

    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("llama3"))
        .stdout(predicate::str::contains("failure_policy = \"abort\""))
        .stdout(predicate::str::contains("max_parallel_personas = 4"))
        .stdout(predicate::str::contains("data/questions"));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_base_url() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[generation]
base_url = "ftp://models.example.com"
"#,
    );

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("http://"));
}

#[test]
fn test_invalid_temperature() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[questionnaire]
temperature = 3.5
"#,
    );

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("temperature"));
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[logging]
level = "chatty"
"#,
    );

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

#[test]
fn test_unknown_failure_policy() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[generation]
failure_policy = "ignore"
"#,
    );

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E101"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[generation\nmodel = ");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("Failed to parse configuration"));
}

// ─────────────────────────────────────────────────────────────────
// Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_creates_file() {
    let fixture = ConfigFixture::new();
    let target = fixture.temp_dir.path().join("new").join("persona-sim.toml");

    fixture
        .cmd()
        .args(["config", "init", "--path", target.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written"));

    let content = fs::read_to_string(&target).unwrap();
    assert!(content.contains("[generation]"));
    assert!(content.contains("failure_policy = \"substitute\""));

    // The generated file must validate as-is
    fixture
        .cmd()
        .args(["config", "validate", "--config", target.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn test_config_init_refuses_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[generation]\n");

    fixture
        .cmd()
        .args(["config", "init", "--path", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_config_init_force_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[generation]\n");

    fixture
        .cmd()
        .args(["config", "init", "--path", fixture.path(), "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(&fixture.config_path).unwrap();
    assert!(content.contains("[dialogue]"));
}

#[test]
fn test_config_found_in_working_directory() {
    let fixture = ConfigFixture::new();
    fs::write(
        fixture.temp_dir.path().join("persona-sim.toml"),
        "[generation]\nmodel = \"from-cwd\"\n",
    )
    .unwrap();

    fixture
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-cwd"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Variable Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_override_model() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[generation]
model = "file-model"
"#,
    );

    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .env("PERSONA_SIM_MODEL", "env-model")
        .assert()
        .success()
        .stdout(predicate::str::contains("env-model"))
        .stdout(predicate::str::contains("file-model").not());
}

#[test]
fn test_env_override_rounds_and_output() {
    let fixture = ConfigFixture::new();

    fixture
        .cmd()
        .args(["config", "show"])
        .env("PERSONA_SIM_ROUNDS", "6")
        .env("PERSONA_SIM_OUTPUT_DIR", "/srv/persona-runs")
        .assert()
        .success()
        .stdout(predicate::str::contains("rounds = 6"))
        .stdout(predicate::str::contains("/srv/persona-runs"));
}

#[test]
fn test_tilde_expansion() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[paths]
output_dir = "~/persona-runs"
"#,
    );

    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("~/persona-runs").not())
        .stdout(predicate::str::contains("persona-runs"));
}
