//! AXIOM_001: the child's distress blamed on the receiver, framed as concern.

use calmwire_core::analysis::{AxiomCategory, DetectorContext};
use std::sync::LazyLock;

use super::{Axiom, Evidence, named_children, score};
use crate::pattern_set::PatternSet;

const THRESHOLD: u8 = 75;

static CHILD_REFS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(she|he|they|she's|he's|they're)\b",
        r"\b(the\s+)?(kids?|children?|daughter|son)\b",
        r"\b(our|my|your)\s+(daughter|son|child|kids?|children?)\b",
    ])
});

static NEGATIVE_STATES: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(upset|sad|unhappy|worried|anxious|stressed|crying|struggling|confused|scared|afraid|angry|frustrated|disappointed|hurt|lonely|depressed|withdrawn|quiet)\b",
        r"\bnot\s+(herself|himself)\b",
        r"\b(acting\s+out|having\s+trouble|having\s+problems|not\s+eating|not\s+sleeping|nightmares|clingy|acting\s+different|not\s+doing\s+well)\b",
    ])
});

static RECEIVER_LINKS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(since|after|when)\s+you\b",
        r"\bbecause\s+(of\s+)?you\b",
        r"\bever\s+since\s+you\b",
        r"\b(following|due\s+to|with|about)\s+your\b",
        r"\bat\s+your\s+(house|place)\b",
    ])
});

static SOFTENERS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\bi'm\s+just\b",
        r"\bjust\s+(thought|wanted|letting)\b",
        r"\b(i\s+thought\s+)?you\s+should\s+know\b",
        r"\bi\s+wanted\s+to\s+(let\s+you\s+know|tell\s+you|share)\b",
        r"\bi\s+noticed\b",
        r"\bi'm\s+(worried|concerned)\b",
    ])
});

pub struct DisplacedAccusation;

impl Axiom for DisplacedAccusation {
    fn id(&self) -> &'static str {
        "AXIOM_001"
    }

    fn name(&self) -> &'static str {
        "Displaced Accusation"
    }

    fn category(&self) -> AxiomCategory {
        AxiomCategory::Indirect
    }

    fn intent_impact(&self) -> Option<&'static str> {
        Some("Framed as concern for the child; lands as blame for the child's distress.")
    }

    fn evaluate(&self, text: &str, context: &DetectorContext) -> Option<Evidence> {
        let has_child = CHILD_REFS.is_match(text) || !named_children(text, context).is_empty();
        let states = NEGATIVE_STATES.find_all(text);
        let links = RECEIVER_LINKS.find_all(text);
        if !has_child || states.is_empty() || links.is_empty() {
            return None;
        }

        let confidence = score(&[
            (true, 30),
            (true, 30),
            (true, 25),
            (SOFTENERS.is_match(text), 10),
            (states.len() > 1, 5),
        ]);
        if confidence < THRESHOLD {
            return None;
        }

        let mut patterns = states;
        patterns.extend(links);
        Some(Evidence {
            confidence,
            patterns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern_set::normalize;

    fn eval(text: &str) -> Option<Evidence> {
        DisplacedAccusation.evaluate(&normalize(text), &DetectorContext::default())
    }

    #[test]
    fn concern_with_blame_fires() {
        let evidence = eval("She's been so upset since you moved out").unwrap();
        assert_eq!(evidence.confidence, 85);
        assert!(evidence.patterns.contains(&"since you".to_string()));
    }

    #[test]
    fn softener_and_several_states_raise_confidence() {
        let evidence =
            eval("I'm just letting you know he's anxious and not sleeping after you took him camping")
                .unwrap();
        assert_eq!(evidence.confidence, 100);
    }

    #[test]
    fn concern_without_link_to_receiver_does_not_fire() {
        assert!(eval("She's been upset about her exam").is_none());
    }

    #[test]
    fn link_without_distress_does_not_fire() {
        assert!(eval("He was thrilled when you showed up").is_none());
    }
}
