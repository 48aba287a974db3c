//! End-to-end runs of the batch commands with the offline generator
//!
//! `--dry-run` replaces the API with a fixed reply, so these tests exercise the
//! full persona → questionnaire → session → scoring chain without a network.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("characters.json"),
            r#"{
  "characters": [
    {"name": "Ava Stone", "system_prompt": "You are Ava, 34, a night-shift nurse who sleeps badly."},
    {"name": "Ben", "system_prompt": "You are Ben, 52, recently retired and restless."}
  ]
}"#,
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn out(&self) -> std::path::PathBuf {
        self.path().join("out")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("persona-sim").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env_remove("PERSONA_SIM_CONFIG")
            .env_remove("PERSONA_SIM_ROUNDS")
            .env_remove("PERSONA_SIM_OUTPUT_DIR")
            .env_remove("PERSONA_SIM_PERSONAS_FILE");
        cmd
    }

    fn read_json(&self, relative: &str) -> Value {
        let text = fs::read_to_string(self.out().join(relative)).unwrap();
        serde_json::from_str(&text).unwrap()
    }
}

#[test]
fn test_dry_run_pipeline_writes_every_artifact() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["pipeline", "--dry-run", "--rounds", "2", "--output"])
        .arg(ws.out())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 written, 0 skipped, 0 failed"));

    for tag in ["PHQ9", "GAD7", "ASRM"] {
        for name in ["Ava_Stone", "Ben"] {
            assert!(ws.out().join(tag).join("answers").join(format!("{}.json", name)).exists());
        }
    }

    let session = ws.read_json("combined/friend/Ava_Stone.json");
    assert_eq!(session["persona"], "Ava Stone");
    assert_eq!(session["counterpart"], "friend");
    assert_eq!(session["model"], "dry-run");
    assert_eq!(session["turn_limit"], 2);
    let turns = session["turns"].as_array().unwrap();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0]["role"], "initiator");
    assert_eq!(turns[1]["role"], "persona");
    assert!(session["finished_at"].is_string());

    let sheet = ws.read_json("PHQ9/answers/Ben.json");
    assert_eq!(sheet["scale"], "PHQ9");
    assert_eq!(sheet["common_questions"].as_array().unwrap().len(), 9);
}

#[test]
fn test_skip_existing_resumes_without_rewriting() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["interview", "--scale", "gad7", "--dry-run", "--personas", "Ben", "--output"])
        .arg(ws.out())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 written"));

    ws.cmd()
        .args(["interview", "--scale", "gad7", "--dry-run", "--skip-existing", "--output"])
        .arg(ws.out())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 written, 1 skipped"));
}

#[test]
fn test_unknown_persona_filter_fails() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["interview", "--scale", "asrm", "--dry-run", "--personas", "Zed", "--output"])
        .arg(ws.out())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Zed"));
}

#[test]
fn test_converse_then_score_and_summarize() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["converse", "--scale", "phq9", "--counterpart", "therapist", "--rounds", "3", "--dry-run", "--output"])
        .arg(ws.out())
        .assert()
        .success();

    let session = ws.read_json("PHQ9/therapist/Ben.json");
    assert_eq!(session["turns"].as_array().unwrap().len(), 6);

    // The canned reply picks "Several days" on every item
    ws.cmd()
        .arg("score")
        .arg(ws.out().join("PHQ9/answers/Ben.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Ben - PHQ-9"))
        .stdout(predicate::str::contains("Total: 9 (0 missing)"));

    // A broken sheet becomes an error row instead of failing the batch
    fs::write(ws.out().join("PHQ9/answers/broken.json"), "{\"persona\": \"Broken\"}").unwrap();

    let reports = ws.path().join("reports");
    ws.cmd()
        .arg("summarize")
        .arg(ws.out().join("PHQ9/answers"))
        .arg("--out")
        .arg(&reports)
        .assert()
        .success()
        .stdout(predicate::str::contains("Scored 3 sheets (1 failed)"));

    let summary = fs::read_to_string(reports.join("summary.csv")).unwrap();
    let mut lines = summary.lines();
    assert_eq!(
        lines.next().unwrap(),
        "persona,item1,item2,item3,item4,item5,item6,item7,item8,item9,total,missing,error"
    );
    assert!(summary.contains("Ben,1,1,1,1,1,1,1,1,1,9,0,"));
    assert!(summary.contains("E300"));

    let detail = fs::read_to_string(reports.join("detail.csv")).unwrap();
    assert_eq!(detail.lines().count(), 1 + 2 * 9);
    assert!(reports.join("summary.json").exists());
}

#[test]
fn test_summarize_infers_scale_and_default_output() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["interview", "--scale", "asrm", "--dry-run", "--output"])
        .arg(ws.out())
        .assert()
        .success();

    ws.cmd()
        .arg("summarize")
        .arg(ws.out().join("ASRM/answers"))
        .env("PERSONA_SIM_OUTPUT_DIR", ws.out())
        .assert()
        .success()
        .stdout(predicate::str::contains("ASRM"));

    assert!(ws.out().join("analysis/ASRM/summary.csv").exists());
}
