//! Free-text answer to ordinal item score.
//!
//! Layers are tried in a fixed order and the first one that produces a value
//! wins:
//!
//! 0. missing, blank or failure-sentinel text is unscoreable
//! 1. explicit numbers ("Score: 2", "PHQ-9: 1", "(2/3)")
//! 2. the scale's verbal anchors, longest phrase first
//! 3. PHQ-9 item 9 risk / denial language
//! 4. fuzzy frequency cues, strongest score first
//!
//! Nothing matching is `None`, never a guessed default.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::gateway::is_sentinel;
use crate::questionnaire::{AnswerRecord, QuestionSet, Scale};

/// PHQ-9 item asking about self-harm.
const SELF_HARM_ITEM: u32 = 9;

/// A scored answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedScore {
    /// 1-based item number, `None` when the question could not be mapped
    pub question_id: Option<u32>,
    pub question: String,
    pub raw_answer: String,
    pub score: Option<u8>,
}

// ─────────────────────────────────────────────────────────────────
// Rule tables
// ─────────────────────────────────────────────────────────────────

struct ScaleRules {
    /// Explicit numeric patterns in priority order; group 1 is the value.
    explicit: Vec<Regex>,
    /// Verbal anchors sorted longest phrase first.
    anchors: Vec<(Regex, u8)>,
    /// Fuzzy cue sets, highest score first.
    cues: Vec<(u8, Vec<Regex>)>,
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid scoring regex pattern")
}

fn explicit_patterns(scale_name: &str, max: u8) -> Vec<Regex> {
    vec![
        re(r"(?i)\bscore\s*[:=]\s*(\d+)\b"),
        re(r"(?i)\brating\s*[:=]\s*(\d+)\b"),
        re(r"(?i)\bchoice\s*[:=]\s*(\d+)\b"),
        re(&format!(r"(?i)\b{}\s*[:=]\s*(\d+)\b", scale_name)),
        re(&format!(r"\(\s*(\d+)\s*/\s*{}\s*\)", max)),
        re(&format!(r"\b(\d+)\s*/\s*{}\b", max)),
    ]
}

fn anchors(phrases: &[(&str, u8)]) -> Vec<(Regex, u8)> {
    let mut sorted = phrases.to_vec();
    sorted.sort_by_key(|(phrase, _)| std::cmp::Reverse(phrase.len()));
    sorted
        .into_iter()
        .map(|(phrase, score)| (re(&format!(r"\b{}\b", regex::escape(phrase))), score))
        .collect()
}

fn cue_set(score: u8, patterns: &[&str]) -> (u8, Vec<Regex>) {
    (score, patterns.iter().map(|p| re(p)).collect())
}

const FREQUENCY_ANCHORS: [(&str, u8); 4] = [
    ("not at all", 0),
    ("several days", 1),
    ("more than half the days", 2),
    ("nearly every day", 3),
];

const MANIA_ANCHORS: [(&str, u8); 5] = [
    ("never", 0),
    ("rarely", 1),
    ("sometimes", 2),
    ("often", 3),
    ("very often", 4),
];

fn frequency_cues() -> Vec<(u8, Vec<Regex>)> {
    vec![
        cue_set(
            3,
            &[
                r"\bnearly every day\b",
                r"\bevery day\b",
                r"\ball the time\b",
                r"\balways\b",
                r"\bconstantly\b",
                r"\balmost every day\b",
                r"\bmost days\b",
            ],
        ),
        cue_set(
            2,
            &[
                r"\bmore than half (the )?days\b",
                r"\boften\b",
                r"\bfrequently\b",
                r"\bpretty often\b",
                r"\ba lot\b",
                r"\bmost of the time\b",
                r"\busually\b",
            ],
        ),
        cue_set(
            1,
            &[
                r"\bseveral days\b",
                r"\bsometimes\b",
                r"\bfrom time to time\b",
                r"\boccasionally\b",
                r"\bsome days\b",
                r"\bkinda\b",
                r"\bkind of\b",
            ],
        ),
        cue_set(
            0,
            &[
                r"\bnot at all\b",
                r"\brarely\b",
                r"\bhardly\b",
                r"\bnot really\b",
                r"\bdon'?t\b.*\b(have|feel|notice)\b",
                r"\bwouldn'?t say\b",
                r"\bno,?\s?not\b",
            ],
        ),
    ]
}

fn mania_cues() -> Vec<(u8, Vec<Regex>)> {
    vec![
        cue_set(
            4,
            &[
                r"\bvery often\b",
                r"\ball the time\b",
                r"\bconstantly\b",
                r"\bnon-?stop\b",
                r"\balways\b",
                r"\bevery (single )?day\b",
                r"\bsevere(ly)?\b",
            ],
        ),
        cue_set(
            3,
            &[
                r"\boften\b",
                r"\bfrequently\b",
                r"\ba lot\b",
                r"\bmost of the time\b",
                r"\busually\b",
                r"\bmarked(ly)?\b",
            ],
        ),
        cue_set(
            2,
            &[
                r"\bsometimes\b",
                r"\bmoderate(ly)?\b",
                r"\bfrom time to time\b",
                r"\boccasionally\b",
                r"\bsome days\b",
            ],
        ),
        cue_set(
            1,
            &[
                r"\brarely\b",
                r"\bslight(ly)?\b",
                r"\bonce in a while\b",
                r"\ba little\b",
                r"\bkind of\b",
                r"\bkinda\b",
                r"\bhardly\b",
            ],
        ),
        cue_set(
            0,
            &[
                r"\bnever\b",
                r"\bnot at all\b",
                r"\bnot really\b",
                r"\bno,?\s?not\b",
                r"\bdon'?t\b.*\b(have|feel|notice)\b",
                r"\bwouldn'?t say\b",
            ],
        ),
    ]
}

static PHQ9_RULES: LazyLock<ScaleRules> = LazyLock::new(|| ScaleRules {
    explicit: explicit_patterns(r"phq[-\s]?9", 3),
    anchors: anchors(&FREQUENCY_ANCHORS),
    cues: frequency_cues(),
});

static GAD7_RULES: LazyLock<ScaleRules> = LazyLock::new(|| ScaleRules {
    explicit: explicit_patterns(r"gad[-\s]?7", 3),
    anchors: anchors(&FREQUENCY_ANCHORS),
    cues: frequency_cues(),
});

static ASRM_RULES: LazyLock<ScaleRules> = LazyLock::new(|| ScaleRules {
    explicit: explicit_patterns(r"asrm", 4),
    anchors: anchors(&MANIA_ANCHORS),
    cues: mania_cues(),
});

/// Risk language for the self-harm item.
static SELF_HARM_RISK: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bwish( i)? (were|was) dead\b",
        r"\b(i )?want to die\b",
        r"\bkill myself\b",
        r"\b(end|ending) (my|their) life\b",
        r"\bsuicidal\b",
        r"\bself-?harm\b",
        r"\bbetter off dead\b",
    ]
    .iter()
    .map(|p| re(p))
    .collect()
});

/// Explicit denial for the self-harm item.
static SELF_HARM_DENIAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bno (thoughts|intent|plans) (of|to) (hurt|harm|kill|hurting|harming|killing) (myself|me)\b",
        r"\bi don'?t (want|plan|intend) to (hurt|harm|kill) myself\b",
        r"\bdon'?t have any (thoughts|intent|plans) (of|to|about) (hurt|harm|kill|hurting|harming|killing) myself\b",
        r"\bwouldn'?t say i want to (hurt|harm|kill) myself\b",
        r"\bnot thinking about (hurting|harming|killing) myself\b",
        r"\bno,? not (really )?(thinking|having thoughts) of (self-?harm|hurting myself|being dead)\b",
        r"\bnever (thought|think) about (hurting|harming|killing) myself\b",
    ]
    .iter()
    .map(|p| re(p))
    .collect()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| re(r"\s+"));

/// Start of the answer's own `Choice:` line, if it has one.
static CHOICE_LINE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bchoice\s*[:=]"));

fn rules_for(scale: Scale) -> &'static ScaleRules {
    match scale {
        Scale::Phq9 => &PHQ9_RULES,
        Scale::Gad7 => &GAD7_RULES,
        Scale::Asrm => &ASRM_RULES,
    }
}

// ─────────────────────────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────────────────────────

/// Lowercase, straighten curly apostrophes, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let straightened: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => '\'',
            other => other,
        })
        .collect();
    WHITESPACE
        .replace_all(straightened.trim(), " ")
        .to_lowercase()
}

/// Best-effort score for one answer, always `None` or within `0..=scale.max_score()`.
pub fn extract_score(answer: Option<&str>, question_id: Option<u32>, scale: Scale) -> Option<u8> {
    let answer = answer?;
    if answer.trim().is_empty() || is_sentinel(answer) {
        return None;
    }

    let rules = rules_for(scale);
    let max = scale.max_score();

    if let Some(score) = explicit_score(&rules.explicit, answer, max) {
        return Some(score);
    }

    let normalized = normalize(answer);

    if let Some(score) = anchor_score(&rules.anchors, &normalized) {
        return Some(score);
    }

    if scale == Scale::Phq9 && question_id == Some(SELF_HARM_ITEM) {
        if any_match(&SELF_HARM_RISK, &normalized) {
            return Some(max);
        }
        if any_match(&SELF_HARM_DENIAL, &normalized) {
            return Some(0);
        }
    }

    rules
        .cues
        .iter()
        .find(|(_, patterns)| any_match(patterns, &normalized))
        .map(|(score, _)| *score)
        .filter(|score| *score <= max)
}

fn explicit_score(patterns: &[Regex], answer: &str, max: u8) -> Option<u8> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(answer)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u8>().ok())
            .filter(|value| *value <= max)
    })
}

/// Anchors on the answer's `Choice:` tail first, then on the whole text.
fn anchor_score(anchors: &[(Regex, u8)], normalized: &str) -> Option<u8> {
    let find = |text: &str| {
        anchors
            .iter()
            .find(|(pattern, _)| pattern.is_match(text))
            .map(|(_, score)| *score)
    };

    CHOICE_LINE
        .find_iter(normalized)
        .last()
        .and_then(|m| find(&normalized[m.end()..]))
        .or_else(|| find(normalized))
}

fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|p| p.is_match(text))
}

/// Score one answer record, mapping its question to an item id through `questions`.
///
/// Questions that match no known text fall back to their position (`index`, 0-based).
pub fn score_record(questions: &QuestionSet, index: usize, record: &AnswerRecord) -> ExtractedScore {
    let question_id = questions.item_id_for(&record.question).or_else(|| {
        let position = index as u32 + 1;
        (index < questions.len()).then_some(position)
    });

    ExtractedScore {
        question_id,
        question: record.question.clone(),
        raw_answer: record.answer.clone(),
        score: extract_score(Some(&record.answer), question_id, questions.scale()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phq(answer: &str, item: u32) -> Option<u8> {
        extract_score(Some(answer), Some(item), Scale::Phq9)
    }

    #[test]
    fn test_missing_and_blank_are_unknown() {
        assert_eq!(extract_score(None, Some(1), Scale::Phq9), None);
        assert_eq!(extract_score(Some(""), Some(1), Scale::Gad7), None);
        assert_eq!(extract_score(Some("   \n "), None, Scale::Asrm), None);
    }

    #[test]
    fn test_sentinel_is_unknown() {
        let sentinel = "[ERROR] Timeout: request timed out (score: 3)";
        assert_eq!(phq(sentinel, 1), None);
    }

    #[test]
    fn test_explicit_number_beats_fuzzy() {
        assert_eq!(phq("I feel okay. Score: 3", 2), Some(3));
        assert_eq!(phq("Always tired, rating: 1", 4), Some(1));
        assert_eq!(phq("Honestly (2/3)", 4), Some(2));
        assert_eq!(phq("I'd put it at 0/3.", 4), Some(0));
        assert_eq!(
            extract_score(Some("GAD-7: 2, I guess"), Some(1), Scale::Gad7),
            Some(2)
        );
        assert_eq!(
            extract_score(Some("ASRM=4"), Some(1), Scale::Asrm),
            Some(4)
        );
    }

    #[test]
    fn test_out_of_range_explicit_falls_through() {
        assert_eq!(phq("Score: 7 but rating: 2", 1), Some(2));
        // No explicit value in range, anchor decides.
        assert_eq!(phq("Score: 9. Several days.", 1), Some(1));
        assert_eq!(
            extract_score(Some("Choice: 4"), Some(1), Scale::Asrm),
            Some(4)
        );
        assert_eq!(phq("Choice: 4", 1), None);
    }

    #[test]
    fn test_anchor_several_days() {
        assert_eq!(phq("Several days, I guess.", 1), Some(1));
        assert_eq!(phq("More than half the days, honestly.", 2), Some(2));
        assert_eq!(phq("NEARLY   every\nday", 3), Some(3));
        assert_eq!(phq("Not at all.", 5), Some(0));
    }

    #[test]
    fn test_longest_anchor_wins() {
        assert_eq!(
            extract_score(Some("Very often, to be honest."), Some(1), Scale::Asrm),
            Some(4)
        );
        assert_eq!(
            extract_score(Some("Often."), Some(1), Scale::Asrm),
            Some(3)
        );
    }

    #[test]
    fn test_choice_line_preferred_for_anchors() {
        let answer = "I never thought of it that way, but yes.\nChoice: Often";
        assert_eq!(extract_score(Some(answer), Some(2), Scale::Asrm), Some(3));

        let answer = "Not at all the way you'd think.\nChoice: Nearly every day";
        assert_eq!(phq(answer, 3), Some(3));
    }

    #[test]
    fn test_anchor_needs_word_boundary() {
        // "often" inside "softened" is not an anchor.
        assert_eq!(
            extract_score(Some("It has softened lately."), Some(1), Scale::Asrm),
            None
        );
    }

    #[test]
    fn test_self_harm_override() {
        assert_eq!(phq("Sometimes I think I'd be better off dead.", 9), Some(3));
        assert_eq!(phq("Sometimes I think I\u{2019}d be better off dead.", 9), Some(3));
        assert_eq!(phq("No, I don't have any thoughts of hurting myself.", 9), Some(0));
        assert_eq!(phq("No thoughts of hurting myself.", 9), Some(0));
    }

    #[test]
    fn test_anchor_is_checked_before_self_harm_override() {
        // An explicit answer option settles item 9 even when risk wording follows.
        assert_eq!(
            phq("Not at all. Though honestly I sometimes want to die.", 9),
            Some(0)
        );
        assert_eq!(phq("Sometimes I want to die.", 9), Some(3));
    }

    #[test]
    fn test_mania_anchor_outranks_stronger_cues() {
        // "never" is read as the answer option even in an emphatic sentence.
        assert_eq!(
            extract_score(
                Some("I've never felt more confident, I'm unstoppable all the time"),
                Some(1),
                Scale::Asrm
            ),
            Some(0)
        );
        assert_eq!(
            extract_score(Some("I'm unstoppable all the time"), Some(1), Scale::Asrm),
            Some(4)
        );
    }

    #[test]
    fn test_override_only_applies_to_item_nine() {
        // Without the override, "sometimes" is a 1-level cue.
        assert_eq!(phq("Sometimes I think I'd be better off dead.", 2), Some(1));
        assert_eq!(
            extract_score(Some("Sometimes I feel better off dead."), Some(9), Scale::Gad7),
            Some(1)
        );
    }

    #[test]
    fn test_fuzzy_cues() {
        assert_eq!(phq("I'm tired all the time.", 4), Some(3));
        assert_eq!(phq("Pretty often, yeah.", 4), Some(2));
        assert_eq!(phq("Occasionally.", 4), Some(1));
        assert_eq!(phq("Not really, no.", 4), Some(0));
        assert_eq!(phq("I don\u{2019}t notice that much.", 4), Some(0));
        assert_eq!(
            extract_score(Some("Just slightly more than usual."), Some(1), Scale::Asrm),
            Some(1)
        );
        assert_eq!(
            extract_score(Some("Non-stop, my mind races."), Some(4), Scale::Asrm),
            Some(4)
        );
    }

    #[test]
    fn test_highest_cue_wins_on_conflict() {
        // Both a 3-level ("always") and a 0-level ("not really") cue are present.
        assert_eq!(phq("Not really, but I always feel a bit flat.", 2), Some(3));
        // 2-level beats 1-level.
        assert_eq!(phq("Sometimes, well, usually.", 2), Some(2));
    }

    #[test]
    fn test_unmatched_text_is_unknown() {
        assert_eq!(phq("I like turtles.", 1), None);
        assert_eq!(
            extract_score(Some("Hard to say."), Some(3), Scale::Asrm),
            None
        );
    }

    #[test]
    fn test_scores_always_in_range() {
        let fragments = [
            "",
            "Score: 2",
            "Score: 4",
            "rating: 12",
            "(3/3)",
            "(4/4)",
            "4/4",
            "PHQ-9: 3",
            "ASRM: 4",
            "never",
            "very often",
            "nearly every day",
            "all the time",
            "non-stop",
            "better off dead",
            "no thoughts of hurting myself",
            "kind of",
            "Choice: Very Often",
            "[ERROR] ServerError: 502",
            "\u{2019}\u{2018}",
            "99/3",
            "-1",
        ];

        for scale in Scale::all() {
            for a in &fragments {
                for b in &fragments {
                    let text = format!("{} {}", a, b);
                    for item in 0..=10 {
                        if let Some(score) = extract_score(Some(&text), Some(item), *scale) {
                            assert!(
                                score <= scale.max_score(),
                                "{:?} gave {} for {:?}",
                                scale,
                                score,
                                text
                            );
                        }
                    }
                    let _ = extract_score(Some(&text), None, *scale);
                }
            }
        }
    }

    #[test]
    fn test_score_record_maps_by_text_then_position() {
        let questions = QuestionSet::canonical(Scale::Phq9);
        let known = AnswerRecord::new(
            "Ada",
            "Thoughts that you would be better off dead, or thoughts of hurting yourself in some way?",
            "Sometimes I think I'd be better off dead.",
        );
        let scored = score_record(&questions, 0, &known);
        assert_eq!(scored.question_id, Some(9));
        assert_eq!(scored.score, Some(3));

        let paraphrased = AnswerRecord::new("Ada", "How is your appetite?", "Several days.");
        let scored = score_record(&questions, 4, &paraphrased);
        assert_eq!(scored.question_id, Some(5));
        assert_eq!(scored.score, Some(1));

        let extra = AnswerRecord::new("Ada", "Bonus question?", "Never.");
        assert_eq!(score_record(&questions, 12, &extra).question_id, None);
    }
}
