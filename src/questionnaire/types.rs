//! Scales, their items, and optional prompt-text overrides.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Scale
// ─────────────────────────────────────────────────────────────────

/// A supported self-report questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Scale {
    /// Patient Health Questionnaire, depression (9 items, 0-3)
    Phq9,
    /// Generalized Anxiety Disorder, anxiety (7 items, 0-3)
    Gad7,
    /// Altman Self-Rating Mania scale (5 items, 0-4)
    Asrm,
}

const PHQ9_ITEMS: [&str; 9] = [
    "Little interest or pleasure in doing things?",
    "Feeling down, depressed, or hopeless?",
    "Trouble falling or staying asleep, or sleeping too much?",
    "Feeling tired or having little energy?",
    "Poor appetite or overeating?",
    "Feeling bad about yourself - or that you are a failure or have let yourself or your family down?",
    "Trouble concentrating on things, such as reading the newspaper or watching television?",
    "Moving or speaking so slowly that other people could have noticed? Or so fidgety or restless that you have been moving around a lot more than usual?",
    "Thoughts that you would be better off dead, or thoughts of hurting yourself in some way?",
];

const GAD7_ITEMS: [&str; 7] = [
    "Feeling nervous, anxious, or on edge?",
    "Not being able to stop or control worrying?",
    "Worrying too much about different things?",
    "Trouble relaxing?",
    "Being so restless that it is hard to sit still?",
    "Becoming easily annoyed or irritable?",
    "Feeling afraid, as if something awful might happen?",
];

const ASRM_ITEMS: [&str; 5] = [
    "Feeling happier or more cheerful than usual?",
    "Feeling more self-confident than usual?",
    "Needing less sleep than usual?",
    "Talking more than usual?",
    "Being more active than usual, socially, at work, at home, or at school?",
];

const FREQUENCY_OPTIONS: [&str; 4] = [
    "Not at all",
    "Several days",
    "More than half the days",
    "Nearly every day",
];

const MANIA_OPTIONS: [&str; 5] = ["Never", "Rarely", "Sometimes", "Often", "Very Often"];

impl Scale {
    /// Upper-case tag used in background lines and directory names.
    pub fn tag(&self) -> &'static str {
        match self {
            Scale::Phq9 => "PHQ9",
            Scale::Gad7 => "GAD7",
            Scale::Asrm => "ASRM",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Scale::Phq9 => "PHQ-9",
            Scale::Gad7 => "GAD-7",
            Scale::Asrm => "ASRM",
        }
    }

    /// Highest score a single item can take.
    pub fn max_score(&self) -> u8 {
        match self {
            Scale::Phq9 | Scale::Gad7 => 3,
            Scale::Asrm => 4,
        }
    }

    /// Canonical item texts in clinical order.
    pub fn canonical_items(&self) -> &'static [&'static str] {
        match self {
            Scale::Phq9 => &PHQ9_ITEMS,
            Scale::Gad7 => &GAD7_ITEMS,
            Scale::Asrm => &ASRM_ITEMS,
        }
    }

    pub fn item_count(&self) -> usize {
        self.canonical_items().len()
    }

    /// Verbal answer options, index = score.
    pub fn answer_options(&self) -> &'static [&'static str] {
        match self {
            Scale::Phq9 | Scale::Gad7 => &FREQUENCY_OPTIONS,
            Scale::Asrm => &MANIA_OPTIONS,
        }
    }

    /// Instruction appended to every questionnaire prompt.
    pub fn answer_instruction(&self) -> String {
        format!(
            "Please answer briefly and realistically in character.\n\
             Then on a new line, write: Choice: <one of>\n{}.",
            self.answer_options().join(" | ")
        )
    }

    /// Ordered items built from the canonical texts.
    pub fn items(&self) -> Vec<QuestionnaireItem> {
        self.canonical_items()
            .iter()
            .enumerate()
            .map(|(i, text)| QuestionnaireItem {
                id: i as u32 + 1,
                scale: *self,
                canonical_text: (*text).to_string(),
            })
            .collect()
    }

    /// All scales in pipeline order.
    pub fn all() -> &'static [Scale] {
        &[Scale::Phq9, Scale::Gad7, Scale::Asrm]
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "phq9" | "phq" => Ok(Scale::Phq9),
            "gad7" | "gad" => Ok(Scale::Gad7),
            "asrm" => Ok(Scale::Asrm),
            _ => Err(format!(
                "Unknown scale: '{}'. Valid scales: phq9, gad7, asrm",
                s
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Items
// ─────────────────────────────────────────────────────────────────

/// One question of a scale. `id` is 1-based and equals the clinical item number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionnaireItem {
    pub id: u32,
    pub scale: Scale,
    pub canonical_text: String,
}

/// The prompts actually asked for one scale.
///
/// Defaults to the canonical texts. A questions file may replace the prompt
/// wording; its order still defines the item ids.
#[derive(Debug, Clone)]
pub struct QuestionSet {
    scale: Scale,
    prompts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QuestionsFile {
    questions: Vec<QuestionEntry>,
}

#[derive(Debug, Deserialize)]
struct QuestionEntry {
    content: String,
}

impl QuestionSet {
    /// Canonical prompts for `scale`.
    pub fn canonical(scale: Scale) -> Self {
        Self {
            scale,
            prompts: scale.canonical_items().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load prompt overrides from `{"questions": [{"content": ...}]}`.
    pub fn from_file(scale: Scale, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: QuestionsFile = serde_json::from_str(&content)
            .map_err(|e| Error::malformed(path, e.to_string()))?;

        let prompts: Vec<String> = file
            .questions
            .into_iter()
            .map(|q| q.content.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        if prompts.is_empty() {
            return Err(Error::EmptyData {
                path: path.to_path_buf(),
                what: "questions",
            });
        }
        if prompts.len() != scale.item_count() {
            return Err(Error::malformed(
                path,
                format!(
                    "{} has {} items but the file lists {} questions",
                    scale,
                    scale.item_count(),
                    prompts.len()
                ),
            ));
        }

        debug!(scale = %scale, path = %path.display(), "Loaded question overrides");
        Ok(Self { scale, prompts })
    }

    /// Prompts from `<dir>/<SCALE>.json` when present, canonical otherwise.
    pub fn for_scale(scale: Scale, questions_dir: Option<&Path>) -> Result<Self> {
        match questions_dir.map(|dir| dir.join(format!("{}.json", scale.tag()))) {
            Some(path) if path.exists() => Self::from_file(scale, &path),
            _ => Ok(Self::canonical(scale)),
        }
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Item id for a question text: canonical or override match first, `None` if unknown.
    pub fn item_id_for(&self, question: &str) -> Option<u32> {
        let wanted = question.trim();
        self.prompts
            .iter()
            .position(|p| p == wanted)
            .or_else(|| self.scale.canonical_items().iter().position(|c| *c == wanted))
            .map(|i| i as u32 + 1)
    }
}
