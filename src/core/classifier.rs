//! Keyword mood classifier for persona replies.

use crate::core::stage::StageTable;
use crate::schema::message::MoodTag;

/// Words that only count once the conversation is in its late bucket.
const LATE_AFFECTION: &[&str] = &["love", "heart", "feel"];
const LATE_SECRECY: &[&str] = &["secret", "confess", "truth"];

const NERVOUS: &[&str] = &["nervous", "shy", "awkward"];
const BOLD_ATTRACTION: &[&str] = &["gorgeous", "hot", "sexy"];
const GENTLE_AFFECTION: &[&str] = &["beautiful", "sweet", "cute"];

/// Maps reply text to a [`MoodTag`] with ordered substring rules.
///
/// Rules are evaluated top to bottom and the first match wins:
///
/// 1. late stage + love/heart/feel → `Romantic`
/// 2. late stage + secret/confess/truth → `Mysterious`
/// 3. nervous/shy/awkward → `Nervous`
/// 4. gorgeous/hot/sexy → `Sassy`
/// 5. beautiful/sweet/cute → `Romantic`
/// 6. anything else → `Flirty`
///
/// Matching is case-insensitive and on substrings, so "hot" also matches
/// "shot".
#[derive(Debug, Clone, Copy, Default)]
pub struct MoodClassifier {
    stages: StageTable,
}

impl MoodClassifier {
    pub fn new(stages: StageTable) -> Self {
        Self { stages }
    }

    pub fn classify(&self, text: &str, stage: u32) -> MoodTag {
        let lower = text.to_lowercase();

        if self.stages.is_late(stage) {
            if contains_any(&lower, LATE_AFFECTION) {
                return MoodTag::Romantic;
            }
            if contains_any(&lower, LATE_SECRECY) {
                return MoodTag::Mysterious;
            }
        }

        if contains_any(&lower, NERVOUS) {
            MoodTag::Nervous
        } else if contains_any(&lower, BOLD_ATTRACTION) {
            MoodTag::Sassy
        } else if contains_any(&lower, GENTLE_AFFECTION) {
            MoodTag::Romantic
        } else {
            MoodTag::Flirty
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LATE: u32 = 6;

    fn classifier() -> MoodClassifier {
        MoodClassifier::new(StageTable::default())
    }

    #[test]
    fn nervous_early() {
        assert_eq!(classifier().classify("I feel so nervous", 0), MoodTag::Nervous);
    }

    #[test]
    fn bold_attraction_is_sassy() {
        assert_eq!(classifier().classify("you're gorgeous", 0), MoodTag::Sassy);
    }

    #[test]
    fn late_love_is_romantic() {
        assert_eq!(
            classifier().classify("I love how you feel", LATE),
            MoodTag::Romantic
        );
    }

    #[test]
    fn love_before_late_stage_is_not_romantic() {
        // No late rules yet, and no other keyword matches.
        assert_eq!(classifier().classify("I love how you think", 5), MoodTag::Flirty);
    }

    #[test]
    fn late_secret_is_mysterious() {
        assert_eq!(
            classifier().classify("Can I tell you a SECRET?", LATE),
            MoodTag::Mysterious
        );
        assert_eq!(classifier().classify("Can I tell you a secret?", 2), MoodTag::Flirty);
    }

    #[test]
    fn late_affection_beats_secrecy() {
        assert_eq!(
            classifier().classify("The truth is my heart is yours", LATE),
            MoodTag::Romantic
        );
    }

    #[test]
    fn nervous_beats_sassy_and_sweet() {
        assert_eq!(
            classifier().classify("So shy around someone this gorgeous and sweet", 0),
            MoodTag::Nervous
        );
    }

    #[test]
    fn gentle_affection_is_romantic() {
        assert_eq!(classifier().classify("That's really sweet of you", 0), MoodTag::Romantic);
    }

    #[test]
    fn default_is_flirty() {
        assert_eq!(classifier().classify("Tell me about your weekend", 0), MoodTag::Flirty);
        assert_eq!(classifier().classify("", LATE), MoodTag::Flirty);
    }

    #[test]
    fn substring_matching_is_preserved() {
        // "photo" contains "hot".
        assert_eq!(classifier().classify("Nice photo", 0), MoodTag::Sassy);
    }

    #[test]
    fn late_threshold_follows_table() {
        let custom = MoodClassifier::new(StageTable {
            mid_at: 1,
            late_at: 2,
            reveal_at: 4,
            early_end_at: 1,
        });
        assert_eq!(custom.classify("my heart", 2), MoodTag::Romantic);
        assert_eq!(custom.classify("my heart", 1), MoodTag::Flirty);
    }
}
