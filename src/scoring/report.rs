//! Batch scoring of answer sheets and tabular export.
//!
//! A folder of answer sheets becomes a wide summary (one row per persona)
//! and a long detail table (one row per persona and item). Files that fail
//! to load still get a summary row carrying the error, so a broken file is
//! visible in the output instead of aborting the batch.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::questionnaire::{AnswerSheet, QuestionSet, Scale};
use crate::storage::{self, write_atomic, write_json_atomic};

use super::extractor::{score_record, ExtractedScore};

/// File names written by [`export`].
pub const SUMMARY_CSV: &str = "summary.csv";
pub const DETAIL_CSV: &str = "detail.csv";
pub const SUMMARY_JSON: &str = "summary.json";

/// All items of one sheet, scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSheet {
    pub persona: String,
    pub scale: Scale,
    /// One entry per scale item, in item order
    pub items: Vec<ExtractedScore>,
    /// Sum of the known item scores
    pub total: u32,
    /// Items with no extractable score
    pub missing: usize,
}

impl ScoredSheet {
    pub fn scores(&self) -> Vec<Option<u8>> {
        self.items.iter().map(|item| item.score).collect()
    }
}

/// Score every item of `sheet`.
///
/// Records are mapped to items by question text, then by position. Items with
/// no matching record are reported as unknown.
pub fn score_sheet(sheet: &AnswerSheet, questions: &QuestionSet) -> ScoredSheet {
    let scored: Vec<ExtractedScore> = sheet
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| score_record(questions, index, record))
        .collect();

    let items: Vec<ExtractedScore> = questions
        .scale()
        .items()
        .into_iter()
        .map(|item| {
            scored
                .iter()
                .find(|s| s.question_id == Some(item.id))
                .cloned()
                .unwrap_or_else(|| ExtractedScore {
                    question_id: Some(item.id),
                    question: questions
                        .prompts()
                        .get(item.id as usize - 1)
                        .cloned()
                        .unwrap_or(item.canonical_text),
                    raw_answer: String::new(),
                    score: None,
                })
        })
        .collect();

    let total = items.iter().filter_map(|i| i.score).map(u32::from).sum();
    let missing = items.iter().filter(|i| i.score.is_none()).count();

    ScoredSheet {
        persona: sheet.persona.clone(),
        scale: sheet.scale,
        items,
        total,
        missing,
    }
}

/// Load and score one answer sheet file.
pub fn score_file(path: &Path, questions: &QuestionSet) -> Result<ScoredSheet> {
    let sheet = AnswerSheet::load(path, Some(questions.scale()))?;
    if sheet.scale != questions.scale() {
        return Err(Error::malformed(
            path,
            format!("sheet is {} but {} was requested", sheet.scale, questions.scale()),
        ));
    }
    Ok(score_sheet(&sheet, questions))
}

// ─────────────────────────────────────────────────────────────────
// Folder Summary
// ─────────────────────────────────────────────────────────────────

/// One row of the wide summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRow {
    pub persona: String,
    pub file: PathBuf,
    pub items: Vec<Option<u8>>,
    pub total: Option<u32>,
    pub missing: Option<usize>,
    pub error: Option<String>,
}

/// Result of summarizing a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderSummary {
    pub scale: Scale,
    pub rows: Vec<SummaryRow>,
    #[serde(skip)]
    pub sheets: Vec<ScoredSheet>,
}

impl FolderSummary {
    pub fn failed(&self) -> usize {
        self.rows.iter().filter(|r| r.error.is_some()).count()
    }
}

/// Score every `*.json` sheet in `dir`.
///
/// Rows are sorted by persona name. A file that cannot be loaded yields a row
/// with empty scores and its error message.
pub fn summarize_folder(dir: &Path, questions: &QuestionSet) -> Result<FolderSummary> {
    let files = storage::list_json_files(dir)?;
    let item_count = questions.len();

    let mut rows = Vec::with_capacity(files.len());
    let mut sheets = Vec::with_capacity(files.len());

    for path in files {
        match score_file(&path, questions) {
            Ok(scored) => {
                rows.push(SummaryRow {
                    persona: scored.persona.clone(),
                    file: path,
                    items: scored.scores(),
                    total: Some(scored.total),
                    missing: Some(scored.missing),
                    error: None,
                });
                sheets.push(scored);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Could not score answer sheet");
                let persona = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                rows.push(SummaryRow {
                    persona,
                    file: path,
                    items: vec![None; item_count],
                    total: None,
                    missing: None,
                    error: Some(e.format_for_log()),
                });
            }
        }
    }

    rows.sort_by(|a, b| a.persona.cmp(&b.persona));
    sheets.sort_by(|a, b| a.persona.cmp(&b.persona));

    info!(
        dir = %dir.display(),
        scale = %questions.scale(),
        files = rows.len(),
        "Summarized answer sheets"
    );

    Ok(FolderSummary {
        scale: questions.scale(),
        rows,
        sheets,
    })
}

// ─────────────────────────────────────────────────────────────────
// Export
// ─────────────────────────────────────────────────────────────────

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Wide table: `persona,item1..itemN,total,missing,error`.
pub fn summary_csv(summary: &FolderSummary) -> String {
    let item_count = summary.scale.item_count();
    let mut out = String::from("persona");
    for i in 1..=item_count {
        let _ = write!(out, ",item{}", i);
    }
    out.push_str(",total,missing,error\n");

    for row in &summary.rows {
        out.push_str(&csv_field(&row.persona));
        for i in 0..item_count {
            out.push(',');
            out.push_str(&opt(row.items.get(i).copied().flatten()));
        }
        let _ = writeln!(
            out,
            ",{},{},{}",
            opt(row.total),
            opt(row.missing),
            csv_field(row.error.as_deref().unwrap_or_default())
        );
    }
    out
}

/// Long table: `persona,question_id,question,score,answer`.
pub fn detail_csv(summary: &FolderSummary) -> String {
    let mut out = String::from("persona,question_id,question,score,answer\n");
    for sheet in &summary.sheets {
        for item in &sheet.items {
            let _ = writeln!(
                out,
                "{},{},{},{},{}",
                csv_field(&sheet.persona),
                opt(item.question_id),
                csv_field(&item.question),
                opt(item.score),
                csv_field(&item.raw_answer)
            );
        }
    }
    out
}

/// Write the summary, detail and JSON exports into `out_dir`.
pub fn export(summary: &FolderSummary, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let summary_path = out_dir.join(SUMMARY_CSV);
    let detail_path = out_dir.join(DETAIL_CSV);
    let json_path = out_dir.join(SUMMARY_JSON);

    write_atomic(&summary_path, summary_csv(summary).as_bytes())?;
    write_atomic(&detail_path, detail_csv(summary).as_bytes())?;
    write_json_atomic(&json_path, summary)?;

    info!(out_dir = %out_dir.display(), "Exports written");
    Ok(vec![summary_path, detail_path, json_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn phq_sheet(persona: &str, answers: &[&str]) -> AnswerSheet {
        let mut sheet = AnswerSheet::new(Scale::Phq9, persona, "scripted");
        for (question, answer) in Scale::Phq9.canonical_items().iter().zip(answers) {
            sheet.push(*question, *answer);
        }
        sheet
    }

    #[test]
    fn test_score_sheet_totals_and_missing() {
        let sheet = phq_sheet(
            "Ada",
            &[
                "Several days.",
                "Nearly every day",
                "Score: 2",
                "I like turtles.",
                "Not at all",
                "",
                "[ERROR] Timeout: slow",
                "Occasionally.",
                "No, I don't have any thoughts of hurting myself.",
            ],
        );
        let scored = score_sheet(&sheet, &QuestionSet::canonical(Scale::Phq9));

        assert_eq!(
            scored.scores(),
            vec![Some(1), Some(3), Some(2), None, Some(0), None, None, Some(1), Some(0)]
        );
        assert_eq!(scored.total, 7);
        assert_eq!(scored.missing, 3);
    }

    #[test]
    fn test_short_sheet_reports_missing_items() {
        let sheet = phq_sheet("Ada", &["Several days."]);
        let scored = score_sheet(&sheet, &QuestionSet::canonical(Scale::Phq9));
        assert_eq!(scored.items.len(), 9);
        assert_eq!(scored.missing, 8);
        assert_eq!(scored.items[8].question_id, Some(9));
    }

    #[test]
    fn test_summarize_folder_with_malformed_file() {
        let dir = TempDir::new().unwrap();
        storage::write_json_atomic(
            &dir.path().join("Zed.json"),
            &phq_sheet("Zed", &["Nearly every day"; 9]),
        )
        .unwrap();
        storage::write_json_atomic(
            &dir.path().join("Ada.json"),
            &phq_sheet("Ada", &["Not at all"; 9]),
        )
        .unwrap();
        fs::write(dir.path().join("Broken.json"), json!({"scale": "PHQ9"}).to_string()).unwrap();

        let summary = summarize_folder(dir.path(), &QuestionSet::canonical(Scale::Phq9)).unwrap();
        let personas: Vec<_> = summary.rows.iter().map(|r| r.persona.as_str()).collect();
        assert_eq!(personas, vec!["Ada", "Broken", "Zed"]);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.rows[2].total, Some(27));
        assert_eq!(summary.rows[1].items, vec![None; 9]);
        assert!(summary.rows[1].error.as_deref().unwrap().contains("E300"));

        let csv = summary_csv(&summary);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "persona,item1,item2,item3,item4,item5,item6,item7,item8,item9,total,missing,error"
        );
        assert_eq!(lines[1], "Ada,0,0,0,0,0,0,0,0,0,0,0,");
        assert!(lines[2].starts_with("Broken,,,,,,,,,,,,"));

        let detail = detail_csv(&summary);
        assert_eq!(detail.lines().count(), 1 + 2 * 9);
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a, b"), "\"a, b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_export_writes_three_files() {
        let dir = TempDir::new().unwrap();
        let sheets = dir.path().join("answers");
        storage::write_json_atomic(
            &sheets.join("Ada.json"),
            &phq_sheet("Ada", &["Several days."; 9]),
        )
        .unwrap();

        let summary = summarize_folder(&sheets, &QuestionSet::canonical(Scale::Phq9)).unwrap();
        let out = dir.path().join("analysis");
        let written = export(&summary, &out).unwrap();

        assert_eq!(written.len(), 3);
        let json: serde_json::Value = storage::read_json(&out.join(SUMMARY_JSON)).unwrap();
        assert_eq!(json["scale"], "PHQ9");
        assert_eq!(json["rows"][0]["total"], 9);
    }
}
