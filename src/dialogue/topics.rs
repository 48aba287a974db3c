//! Topic cues the counterpart weaves into each round.
//!
//! Single-scale sessions rotate through paraphrases of that scale's items,
//! phrased for the counterpart. Multi-scale sessions rotate through short
//! themes from every scale, concatenated in scale order.

use crate::questionnaire::Scale;

use super::profile::CounterpartKind;

const THERAPIST_PHQ9: [&str; 9] = [
    "Have you felt less interested or less able to enjoy things lately?",
    "Have you been feeling down or discouraged more than usual?",
    "How have your sleep patterns been: trouble falling asleep, staying asleep, or sleeping a lot?",
    "How's your energy been? Do you feel tired or run down?",
    "How is your appetite? Eating less than usual or maybe more than usual?",
    "Do you ever find yourself being hard on yourself, feeling like you've let yourself or others down?",
    "How is your focus? Any trouble concentrating on things like reading or watching shows?",
    "Have you noticed yourself moving or speaking more slowly than usual, or feeling unusually restless?",
    "Have you had any thoughts that life isn't worth it or thoughts of harming yourself?",
];

const FRIEND_PHQ9: [&str; 9] = [
    "Have you still been enjoying the things you used to like doing?",
    "Have you felt down or kind of discouraged lately?",
    "How's your sleep been? Are you sleeping okay or tossing at night?",
    "Have you been feeling low on energy or just tired most of the time?",
    "How's your appetite these days? Eating normally or big changes?",
    "Do you find yourself being too hard on yourself lately?",
    "Has it been harder to concentrate on things like reading or shows?",
    "Have you felt more restless or slower than usual?",
    "Do you ever get thoughts like wishing you weren't here?",
];

const GAD7_QUESTIONS: [&str; 7] = [
    "Have you been feeling on edge or tense lately?",
    "Do you ever feel like the worrying just doesn't switch off?",
    "Have you been worrying about lots of different things at once?",
    "Has it been hard to relax or unwind recently?",
    "Do you feel restless, like it's tough to sit still?",
    "Have you noticed you're more irritable than usual?",
    "Do you get that feeling that something bad might happen, even if you can't say why?",
];

const ASRM_QUESTIONS: [&str; 5] = [
    "Lately have you felt extra upbeat or unusually cheerful?",
    "Do you feel way more confident than usual, sometimes even a bit invincible?",
    "How's your sleep? Do you feel like you need less sleep but still have energy?",
    "Have you noticed yourself talking more or feeling a rush to keep talking?",
    "Have you felt extra active or restless, like you can't sit still?",
];

const PHQ9_THEMES: [&str; 9] = [
    "how much you've been enjoying things lately",
    "feeling low, discouraged, or emotionally heavy",
    "how your sleep has been going recently",
    "your energy levels through the day",
    "any changes in how much or how little you're eating",
    "how you've been feeling about yourself",
    "whether it's been hard to focus or think clearly",
    "feeling slowed down or unusually restless",
    "if heavy or dark thoughts have been hovering around",
];

const GAD7_THEMES: [&str; 7] = [
    "feeling tense or on edge",
    "finding yourself worrying about many different things",
    "whether it's been hard to switch your thoughts off",
    "how easy or hard it is to relax lately",
    "feeling so restless it's hard to sit still",
    "feeling more irritable or snappy than usual",
    "worrying that something bad might happen",
];

const ASRM_THEMES: [&str; 5] = [
    "times you might feel unusually upbeat or 'wired'",
    "moments of feeling extra confident or unstoppable",
    "nights where you sleep much less but still feel wired",
    "talking faster or more than usual",
    "taking on lots of projects, spending, or risks",
];

/// Item paraphrases for a single-scale session.
pub fn paraphrases(counterpart: CounterpartKind, scale: Scale) -> &'static [&'static str] {
    match (counterpart, scale) {
        (CounterpartKind::Therapist, Scale::Phq9) => &THERAPIST_PHQ9,
        (CounterpartKind::Friend, Scale::Phq9) => &FRIEND_PHQ9,
        (_, Scale::Gad7) => &GAD7_QUESTIONS,
        (_, Scale::Asrm) => &ASRM_QUESTIONS,
    }
}

/// Short conversational themes for one scale.
pub fn themes(scale: Scale) -> &'static [&'static str] {
    match scale {
        Scale::Phq9 => &PHQ9_THEMES,
        Scale::Gad7 => &GAD7_THEMES,
        Scale::Asrm => &ASRM_THEMES,
    }
}

/// Topic rotation for a session seeded from `scales`.
///
/// One scale uses its paraphrases; several scales use their themes in order.
pub fn for_session(counterpart: CounterpartKind, scales: &[Scale]) -> Vec<String> {
    match scales {
        [single] => paraphrases(counterpart, *single)
            .iter()
            .map(|s| s.to_string())
            .collect(),
        many => many
            .iter()
            .flat_map(|scale| themes(*scale).iter())
            .map(|s| s.to_string())
            .collect(),
    }
}

/// Topic for `round`: rotates through `topics` deterministically.
pub fn topic_for_round(topics: &[String], round: usize) -> Option<&str> {
    if topics.is_empty() {
        return None;
    }
    Some(topics[round % topics.len()].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_scale_uses_paraphrases() {
        let topics = for_session(CounterpartKind::Therapist, &[Scale::Phq9]);
        assert_eq!(topics.len(), 9);
        assert!(topics[0].starts_with("Have you felt less interested"));

        let friend = for_session(CounterpartKind::Friend, &[Scale::Phq9]);
        assert_ne!(topics[0], friend[0]);
    }

    #[test]
    fn test_combined_concatenates_themes_in_order() {
        let topics = for_session(CounterpartKind::Friend, Scale::all());
        assert_eq!(topics.len(), 9 + 7 + 5);
        assert_eq!(topics[9], "feeling tense or on edge");
        assert_eq!(topics[20], "taking on lots of projects, spending, or risks");
    }

    #[test]
    fn test_topic_rotation_is_periodic() {
        let topics: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        for round in 0..12 {
            assert_eq!(topic_for_round(&topics, round), topic_for_round(&topics, round + 3));
        }
        assert_eq!(topic_for_round(&topics, 4), Some("b"));
        assert_eq!(topic_for_round(&[], 1), None);
    }
}
