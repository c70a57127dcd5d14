//! AXIOM_004: agreement used as a setup for criticism ("I understand, but...").

use calmwire_core::analysis::{AxiomCategory, DetectorContext};
use std::sync::LazyLock;

use super::{Axiom, Evidence, score};
use crate::pattern_set::PatternSet;

const THRESHOLD: u8 = 70;

static AGREEMENT: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\bi\s+(agree|understand|know|admit|appreciate)\b",
        r"\bi\s+get\s+(it|that)\b",
        r"\bi\s+hear\s+you\b",
        r"\byou('re|\s+are)\s+right\b",
        r"\bthat's\s+(true|fair|valid)\b",
        r"\bi\s+see\s+(your|the)\s+point\b",
        r"\bi'm\s+not\s+(saying|trying)\b",
        r"\bi'm\s+willing\b",
        r"\b(sure|of\s+course)\b",
    ])
});

static CONTRAST: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(but|however|although|though|yet|still|nevertheless|nonetheless)\b",
    ])
});

static CRITICISM: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\byou\s+(always|never)\b",
        r"\byou\s+(don't|can't|won't|didn't)\b",
        r"\byou\s+(should|need\s+to|have\s+to)\b",
        r"\byou('re|\s+are)\s+(not|never)\b",
        r"\bat\s+least\s+i\b",
        r"\bunlike\s+you\b",
        r"\bi\s+would\s+never\b",
        r"\bthe\s+(kids?|children?)\s+(need|deserve)\b",
    ])
});

static INTENSIFIERS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(always|never|nothing|constantly|repeatedly|again)\b",
        r"\bno\s+one\b",
        r"\bnobody\b",
        r"\bevery\s+time\b",
    ])
});

pub struct WeaponizedAgreement;

impl Axiom for WeaponizedAgreement {
    fn id(&self) -> &'static str {
        "AXIOM_004"
    }

    fn name(&self) -> &'static str {
        "Weaponized Agreement"
    }

    fn category(&self) -> AxiomCategory {
        AxiomCategory::Indirect
    }

    fn intent_impact(&self) -> Option<&'static str> {
        Some("Opens with agreement to appear reasonable; the criticism after the turn is what the receiver hears.")
    }

    fn evaluate(&self, text: &str, _context: &DetectorContext) -> Option<Evidence> {
        let agreement = AGREEMENT.find_all(text);
        let turn = CONTRAST.first_match_end(text)?;
        // Only what follows the turn counts as the real message
        let tail = &text[turn..];
        let criticism = CRITICISM.find_all(tail);
        let intensified = INTENSIFIERS.is_match(tail);

        let confidence = score(&[
            (!agreement.is_empty(), 25),
            (true, 25),
            (!criticism.is_empty(), 25),
            (intensified, 15),
            (criticism.len() > 1, 10),
        ]);
        if confidence < THRESHOLD {
            return None;
        }

        let mut patterns = agreement;
        patterns.extend(criticism);
        Some(Evidence {
            confidence,
            patterns,
        })
    }
}
