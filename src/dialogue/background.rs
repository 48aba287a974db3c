//! Background seeding from earlier questionnaire answers.

use crate::gateway::is_sentinel;
use crate::questionnaire::AnswerSheet;

/// Compact intake summary for the counterpart's opening line.
///
/// For each sheet, in the order given, at most `cap` records are considered.
/// Newlines inside answers are flattened and empty or failed answers are
/// skipped. Each kept record becomes `[TAG] question -> answer`.
pub fn build_background(persona_name: &str, sources: &[&AnswerSheet], cap: usize) -> String {
    let mut lines = vec![format!(
        "Intake summary for {} (from earlier structured questions):",
        persona_name
    )];

    for sheet in sources {
        for record in sheet.records().iter().take(cap) {
            let answer = flatten(&record.answer);
            if answer.is_empty() || is_sentinel(&answer) {
                continue;
            }
            lines.push(format!(
                "[{}] {} -> {}",
                sheet.scale.tag(),
                flatten(&record.question),
                answer
            ));
        }
    }

    lines.join("\n")
}

fn flatten(text: &str) -> String {
    text.replace(['\r', '\n'], " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::Scale;

    fn sheet(scale: Scale, rows: &[(&str, &str)]) -> AnswerSheet {
        let mut sheet = AnswerSheet::new(scale, "Ada", "scripted");
        for (q, a) in rows {
            sheet.push(*q, *a);
        }
        sheet
    }

    #[test]
    fn test_background_lines_in_source_order() {
        let phq = sheet(Scale::Phq9, &[("Q1", "Several days.\nChoice: Several days"), ("Q2", "Never")]);
        let gad = sheet(Scale::Gad7, &[("G1", "Often")]);

        let text = build_background("Ada", &[&phq, &gad], 6);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Intake summary for Ada (from earlier structured questions):");
        assert_eq!(lines[1], "[PHQ9] Q1 -> Several days. Choice: Several days");
        assert_eq!(lines[2], "[PHQ9] Q2 -> Never");
        assert_eq!(lines[3], "[GAD7] G1 -> Often");
    }

    #[test]
    fn test_cap_applies_before_skipping() {
        let phq = sheet(Scale::Phq9, &[("Q1", ""), ("Q2", "yes"), ("Q3", "no")]);
        let text = build_background("Ada", &[&phq], 2);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("[PHQ9] Q2 -> yes"));
    }

    #[test]
    fn test_sentinel_answers_skipped() {
        let asrm = sheet(Scale::Asrm, &[("A1", "[ERROR] Timeout: slow"), ("A2", "Rarely")]);
        let text = build_background("Ada", &[&asrm], 6);
        assert!(!text.contains("[ERROR]"));
        assert!(text.contains("[ASRM] A2 -> Rarely"));
    }
}
