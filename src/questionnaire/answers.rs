//! Answer sheets: the persisted result of one questionnaire run.
//!
//! Written as `{scale, persona, model, answered_at, common_questions: [{question, answer}]}`.
//! The reader also accepts the older row shape `{"Consultant": q, "<persona>": a}`
//! under a `"Common Questions"` key, with the persona under `"character"`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::storage;

use super::types::Scale;

const LEGACY_QUESTION_KEY: &str = "Consultant";

/// One question put to a persona and the free-text answer it gave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub answer: String,

    /// Owner of the answer; carried at sheet level on disk.
    #[serde(skip)]
    pub persona_name: String,
}

impl AnswerRecord {
    pub fn new(
        persona_name: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            persona_name: persona_name.into(),
        }
    }
}

/// All answers one persona gave to one scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSheet {
    pub scale: Scale,
    pub persona: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub answered_at: Option<DateTime<Utc>>,
    pub common_questions: Vec<AnswerRecord>,
}

impl AnswerSheet {
    pub fn new(scale: Scale, persona: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            scale,
            persona: persona.into(),
            model: Some(model.into()),
            answered_at: Some(Utc::now()),
            common_questions: Vec::new(),
        }
    }

    pub fn records(&self) -> &[AnswerRecord] {
        &self.common_questions
    }

    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        let record = AnswerRecord::new(self.persona.clone(), question, answer);
        self.common_questions.push(record);
    }

    /// Read a sheet in either the current or the legacy shape.
    ///
    /// `scale_hint` is used when the file does not name its scale.
    pub fn load(path: &Path, scale_hint: Option<Scale>) -> Result<Self> {
        let value: Value = storage::read_json(path)?;
        Self::from_value(path, value, scale_hint)
    }

    fn from_value(path: &Path, value: Value, scale_hint: Option<Scale>) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::malformed(path, "expected a JSON object"))?;

        let scale = match obj.get("scale").and_then(Value::as_str) {
            Some(tag) => tag
                .parse::<Scale>()
                .map_err(|e| Error::malformed(path, e))?,
            None => scale_hint
                .ok_or_else(|| Error::malformed(path, "no `scale` field and no scale given"))?,
        };

        let rows = ["common_questions", "Common Questions"]
            .iter()
            .find_map(|key| obj.get(*key))
            .ok_or_else(|| Error::malformed(path, "missing `common_questions`"))?
            .as_array()
            .ok_or_else(|| Error::malformed(path, "`common_questions` is not a list"))?;

        if rows.is_empty() {
            return Err(Error::EmptyData {
                path: path.to_path_buf(),
                what: "answers",
            });
        }

        let persona = ["persona", "character"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| infer_legacy_persona(rows))
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default();

        let mut common_questions = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let row = row
                .as_object()
                .ok_or_else(|| Error::malformed(path, format!("row {} is not an object", index + 1)))?;
            common_questions.push(parse_row(row, &persona));
        }

        let answered_at = obj
            .get("answered_at")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());

        Ok(Self {
            scale,
            persona,
            model: obj.get("model").and_then(Value::as_str).map(str::to_string),
            answered_at,
            common_questions,
        })
    }
}

fn parse_row(row: &Map<String, Value>, persona: &str) -> AnswerRecord {
    let text = |key: &str| row.get(key).and_then(Value::as_str).map(str::to_string);

    if let Some(question) = text("question") {
        return AnswerRecord::new(persona, question, text("answer").unwrap_or_default());
    }

    let question = text(LEGACY_QUESTION_KEY).unwrap_or_default();
    let answer = text(persona)
        .or_else(|| {
            let mut others = row.iter().filter(|(k, _)| k.as_str() != LEGACY_QUESTION_KEY);
            match (others.next(), others.next()) {
                (Some((_, v)), None) => v.as_str().map(str::to_string),
                _ => None,
            }
        })
        .unwrap_or_default();

    AnswerRecord::new(persona, question, answer)
}

/// The persona key of legacy rows: the single key that is not `Consultant`.
fn infer_legacy_persona(rows: &[Value]) -> Option<String> {
    let row = rows.first()?.as_object()?;
    let mut keys = row.keys().filter(|k| k.as_str() != LEGACY_QUESTION_KEY);
    match (keys.next(), keys.next()) {
        (Some(key), None) if key != "question" && key != "answer" => Some(key.clone()),
        _ => None,
    }
}
