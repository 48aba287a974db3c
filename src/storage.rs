//! Artifact storage: file naming, output layout and atomic JSON writes.
//!
//! Every artifact is written to a temporary sibling first, synced, then
//! renamed over the destination, so a reader never observes a half-written
//! session or answer sheet.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::dialogue::CounterpartKind;
use crate::error::{Error, Result};
use crate::questionnaire::Scale;

/// Directory name used for sessions seeded from every scale.
pub const COMBINED_DIR: &str = "combined";

/// Directory name for summary exports.
pub const ANALYSIS_DIR: &str = "analysis";

/// Turn an arbitrary display name into a file-system safe stem.
///
/// Alphanumerics (Unicode letters and digits included) and `-`, `_`, `.` are
/// kept, everything else becomes `_`, leading and trailing `.`/`_` are
/// stripped. An empty result becomes `conversation`.
pub fn safe_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = mapped.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "conversation".to_string()
    } else {
        trimmed.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────
// Output Layout
// ─────────────────────────────────────────────────────────────────

/// Where each kind of artifact lives under the output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<SCALE>/answers`
    pub fn answers_dir(&self, scale: Scale) -> PathBuf {
        self.root.join(scale.tag()).join("answers")
    }

    /// `<root>/<SCALE>/answers/<name>.json`
    pub fn answer_sheet(&self, scale: Scale, persona_name: &str) -> PathBuf {
        self.answers_dir(scale).join(json_file(persona_name))
    }

    /// `<root>/<SCALE>/<counterpart>`
    pub fn sessions_dir(&self, scale: Scale, counterpart: CounterpartKind) -> PathBuf {
        self.root.join(scale.tag()).join(counterpart.slug())
    }

    /// `<root>/<SCALE>/<counterpart>/<name>.json`
    pub fn session(&self, scale: Scale, counterpart: CounterpartKind, persona_name: &str) -> PathBuf {
        self.sessions_dir(scale, counterpart).join(json_file(persona_name))
    }

    /// `<root>/combined/<counterpart>/<name>.json`
    pub fn combined_session(&self, counterpart: CounterpartKind, persona_name: &str) -> PathBuf {
        self.root
            .join(COMBINED_DIR)
            .join(counterpart.slug())
            .join(json_file(persona_name))
    }

    /// `<root>/analysis`
    pub fn analysis_dir(&self) -> PathBuf {
        self.root.join(ANALYSIS_DIR)
    }
}

fn json_file(persona_name: &str) -> String {
    format!("{}.json", safe_name(persona_name))
}

// ─────────────────────────────────────────────────────────────────
// Reading / Writing
// ─────────────────────────────────────────────────────────────────

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| Error::malformed(path, e.to_string()))
}

/// Serialize `value` as pretty JSON and write it atomically to `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

/// Write bytes to `path` via a synced temporary sibling and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source| Error::IoWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let tmp_path = temp_path(path);
    let mut tmp_file = File::create(&tmp_path).map_err(io_err)?;
    tmp_file.write_all(bytes).map_err(io_err)?;
    tmp_file.sync_all().map_err(io_err)?;
    drop(tmp_file);

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(e));
    }

    debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}

/// List the `*.json` files directly inside `dir`, sorted by name.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::IoRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}
