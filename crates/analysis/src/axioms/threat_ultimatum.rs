//! AXIOM_D102: explicit threats, ultimatums and legal leverage.

use calmwire_core::analysis::{AxiomCategory, DetectorContext};
use std::sync::LazyLock;

use super::{Axiom, Evidence, score};
use crate::pattern_set::PatternSet;

const MIN_CONFIDENCE: u8 = 45;

static OR_ELSE: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\bor\s+else\b",
        r"\bor\s+i('ll|'m\s+going\s+to|'m\s+gonna|\s+will)\b",
        r"\bor\s+we('ll|'re\s+going\s+to|\s+will)\b",
        r"\bor\s+(we'?ll|you'?ll)\s+(end\s+up|be|have\s+to|need\s+to)\b",
    ])
});

static CONDITIONAL: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\bif\s+you\s+.{1,30}\s+i('ll|'m\s+going\s+to|\s+will)\b",
        r"\bif\s+you\s+.{1,30}\s+we('ll|'re\s+going\s+to|\s+will)\b",
        r"\bif\s+you\s+(don'?t|do\s+not|keep|continue)\b.{1,50}\b(court|lawyer|attorney|police|cops|custody)\b",
    ])
});

static LEGAL: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(going\s+)?(back\s+)?to\s+court\b",
        r"\b(call|contact|get|hire)\s+(my\s+)?(lawyer|attorney)\b",
        r"\b(full\s+)?custody\b.{0,20}\b(take|get|fight\s+for|going\s+to)\b",
        r"\b(take|get|fight\s+for|going\s+to).{0,20}\b(full\s+)?custody\b",
        r"\bmodify\s+(the\s+)?custody\b",
        r"\breport\s+(you|this)\s+to\b",
    ])
});

static THREAT_PHRASES: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\byou('?ll|'?re\s+going\s+to|\s+will)\s+regret\b",
        r"\bkeep\s+it\s+up\b",
        r"\bsee\s+what\s+happens\b",
        r"\bwatch\s+(what\s+happens|yourself|out)\b",
        r"\byou('?ve|'?ll)\s+been\s+warned\b",
        r"\bdon'?t\s+(test|push)\s+me\b",
        r"\bi\s+won'?t\s+hesitate\b",
        r"\bi('?m|'ll\s+be)\s+documenting\b",
        r"\bthis\s+is\s+(being\s+)?documented\b",
        r"\bi('?m|\s+am)\s+keeping\s+records\b",
    ])
});

static CONSEQUENCE: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(neither\s+of\s+us\s+want|you\s+don'?t\s+want)\b",
        r"\bwaste\s+of\s+(time|money)\b",
        r"\bpunish",
    ])
});

pub struct ThreatUltimatum;

impl Axiom for ThreatUltimatum {
    fn id(&self) -> &'static str {
        "AXIOM_D102"
    }

    fn name(&self) -> &'static str {
        "Threat / Ultimatum"
    }

    fn category(&self) -> AxiomCategory {
        AxiomCategory::Direct
    }

    fn intent_impact(&self) -> Option<&'static str> {
        Some("Sender may want leverage or to be taken seriously; the receiver hears coercion and tends to dig in.")
    }

    fn evaluate(&self, text: &str, _context: &DetectorContext) -> Option<Evidence> {
        let or_else = OR_ELSE.find_all(text);
        let conditional = CONDITIONAL.find_all(text);
        let legal = LEGAL.find_all(text);
        let threats = THREAT_PHRASES.find_all(text);
        let consequence = CONSEQUENCE.is_match(text);

        let confidence = score(&[
            (!or_else.is_empty(), 45),
            (!conditional.is_empty(), 40),
            (!legal.is_empty(), 50),
            (!threats.is_empty(), 35),
            (consequence, 10),
            (!or_else.is_empty() && !legal.is_empty(), 20),
        ]);
        if confidence < MIN_CONFIDENCE {
            return None;
        }

        let patterns = or_else
            .into_iter()
            .chain(conditional)
            .chain(legal)
            .chain(threats)
            .collect();
        Some(Evidence {
            confidence,
            patterns,
        })
    }
}
