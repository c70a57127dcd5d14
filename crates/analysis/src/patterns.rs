//! Conflict-pattern counters and red-flag markers.
//!
//! Counters feed per-room bookkeeping only; they never decide a verdict.

use calmwire_core::state::ConflictPatterns;
use std::sync::LazyLock;

use crate::pattern_set::{PatternSet, normalize};

static ABSOLUTES: LazyLock<PatternSet> =
    LazyLock::new(|| PatternSet::new(&[r"\b(you always|you never)\b"]));

static YOU_ARE: LazyLock<PatternSet> = LazyLock::new(|| PatternSet::new(&[r"\b(you're|you are|youre)\b"]));

static POSITIVE_CONTEXT: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(friend|best|great|awesome|amazing|wonderful|helpful|kind|love|appreciate|proud|happy|good|fantastic|incredible|well|person)\b",
    ])
});

pub(crate) static NEGATIVE_TRAITS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(wrong|bad|stupid|crazy|irresponsible|useless|terrible|awful|horrible|pathetic|lazy|selfish|rude|mean|inconsiderate|careless)\b",
    ])
});

pub(crate) static INSULTS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(idiot|moron|loser|jerk|liar|joke|failure|deadbeat|psycho|narcissist|fool|clown|disgrace)\b",
        r"\bwaste\s+of\s+(space|air)\b",
    ])
});

pub(crate) static SECOND_PERSON: LazyLock<PatternSet> =
    LazyLock::new(|| PatternSet::new(&[r"\b(you|your|you'?re|you'?ve|you'?d|you'?ll|yourself)\b"]));

static TRIANGULATION: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[r"\b(she told me|he said|the kids)\b", r"\bchild\b.*\bsaid\b"])
});

static RED_FLAGS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\byou\s+(always|never)\b",
        r"\byou('re| are)\s+(so|such|the|a)\b",
        r"\byour\s+fault\b",
        r"\bbecause\s+of\s+you\b",
        r"\b(she|he|they)\s+(said|told)\s+.*\b(you|your)\b",
        r"\bhow\s+could\s+you\b",
        r"\bwhat\s+(is|were)\s+you\s+thinking\b",
    ])
});

/// Flag accusatory and triangulating phrasings in one message.
pub fn detect_conflict_patterns(text: &str) -> ConflictPatterns {
    let text = normalize(text);
    ConflictPatterns {
        accusatory: is_accusatory(&text),
        triangulation: TRIANGULATION.is_match(&text),
    }
}

fn is_accusatory(text: &str) -> bool {
    if ABSOLUTES.is_match(text) {
        return true;
    }
    YOU_ARE.is_match(text) && !POSITIVE_CONTEXT.is_match(text) && NEGATIVE_TRAITS.is_match(text)
}

/// Cheap markers that rule out a local quick-pass: accusatory framings,
/// plus any insult or negative trait in a message addressed to the
/// receiver.
pub fn red_flags(text: &str) -> Vec<String> {
    let text = normalize(text);
    let mut flags = RED_FLAGS.find_all(&text);
    for phrase in personal_attacks(&text) {
        if !flags.contains(&phrase) {
            flags.push(phrase);
        }
    }
    flags
}

/// Insults and negative traits, when the message speaks to "you".
fn personal_attacks(text: &str) -> Vec<String> {
    if !SECOND_PERSON.is_match(text) {
        return Vec::new();
    }
    let mut found = NEGATIVE_TRAITS.find_all(text);
    found.extend(INSULTS.find_all(text));
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolutes_are_accusatory() {
        let p = detect_conflict_patterns("You NEVER let me see the kids on time!");
        assert!(p.accusatory);
        assert!(p.triangulation, "'the kids' counts as triangulation");
    }

    #[test]
    fn negative_judgement_is_accusatory() {
        assert!(detect_conflict_patterns("You're so irresponsible").accusatory);
        assert!(detect_conflict_patterns("you are being selfish again").accusatory);
    }

    #[test]
    fn positive_context_cancels_judgement() {
        // "good" is positive context even next to "bad"
        assert!(!detect_conflict_patterns("You're good at this, the bad weather isn't your fault").accusatory);
        assert!(!detect_conflict_patterns("You are a great dad").accusatory);
    }

    #[test]
    fn reported_speech_is_triangulation() {
        assert!(detect_conflict_patterns("She told me you forgot her lunch").triangulation);
        assert!(detect_conflict_patterns("Our child just said she was hungry").triangulation);
        assert!(!detect_conflict_patterns("Pickup is at 5").triangulation);
    }

    #[test]
    fn neutral_message_has_no_patterns() {
        assert_eq!(
            detect_conflict_patterns("Could we swap weekends? I have a work trip coming up"),
            ConflictPatterns::default()
        );
    }

    #[test]
    fn red_flags_found() {
        assert!(!red_flags("How could you forget again").is_empty());
        assert!(!red_flags("It's your fault").is_empty());
        assert!(red_flags("Can you pick her up at 3pm?").is_empty());
    }

    #[test]
    fn insults_aimed_at_the_receiver_are_red_flags() {
        let flags = red_flags("Can you pick up the kids at 5pm, you useless idiot?");
        assert!(flags.contains(&"useless".to_string()));
        assert!(flags.contains(&"idiot".to_string()));
        assert!(!red_flags("Please send the forms by Friday, you are pathetic.").is_empty());
    }

    #[test]
    fn insults_without_a_second_person_are_not_red_flags() {
        assert!(red_flags("The printer is useless, I'll bring paper copies").is_empty());
    }

    #[test]
    fn all_tables_compile() {
        assert_eq!(RED_FLAGS.len(), 7);
        assert_eq!(INSULTS.len(), 2);
        assert_eq!(SECOND_PERSON.len(), 1);
        assert_eq!(TRIANGULATION.len(), 2);
        assert_eq!(NEGATIVE_TRAITS.len(), 1);
    }
}
