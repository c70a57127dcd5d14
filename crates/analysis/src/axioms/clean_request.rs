//! AXIOM_D001: a polite, specific, actionable request.

use calmwire_core::analysis::{AxiomCategory, DetectorContext};
use std::sync::LazyLock;

use super::{Axiom, Evidence, score};
use crate::pattern_set::PatternSet;

const THRESHOLD: u8 = 70;

static REQUEST: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(can|could|would|will)\s+you\b",
        r"\bplease\b",
        r"\bwould\s+you\s+be\s+able\b",
        r"\b(is|would)\s+it\s+be\s+possible\b",
        r"\bis\s+it\s+possible\b",
        r"\bdo\s+you\s+mind\b",
        r"\bi\s+need\s+you\s+to\b",
        r"\bi('d|\s+would)\s+appreciate\b",
    ])
});

static ACTION_VERBS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(pick\s+up|pick|drop\s+off|drop|bring|take|get|give|send)\b",
        r"\b(sign|fill\s+out|complete|submit|return)\b",
        r"\b(call|text|email|contact|confirm)\b",
        r"\b(watch|supervise|help|assist)\b",
        r"\b(schedule|arrange|plan|book)\b",
        r"\b(pay|reimburse|split|cover)\b",
    ])
});

static SPECIFICITY: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\bat\s+\d{1,2}(:\d{2})?\s*(am|pm|o'clock)?\b",
        r"\b(on|by|before|after)\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
        r"\b(tomorrow|today|tonight|this\s+weekend)\b",
        r"\b(this|next|on)\s+(week|month)\b",
        r"\bfrom\s+\S+\s+(to|until)\s+\S+",
        r"\b\d{1,2}(:\d{2})?\s*(am|pm)\b",
    ])
});

static DISQUALIFIERS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\byou\s+(always|never)\b",
        r"\byou\s+(should|need\s+to|have\s+to|must)\b",
        r"\byour\s+fault\b",
        r"\bbecause\s+(of\s+)?you\b",
        r"\b(again|as\s+usual|like\s+always)\b",
        r"\bfor\s+once\b",
        r"\bwhy\s+(can't|don't|won't)\s+you\b",
        r"\b(she|he|they)\s+said\b",
    ])
});

pub struct CleanRequest;

impl Axiom for CleanRequest {
    fn id(&self) -> &'static str {
        "AXIOM_D001"
    }

    fn name(&self) -> &'static str {
        "Clean Request"
    }

    fn category(&self) -> AxiomCategory {
        AxiomCategory::Clean
    }

    fn evaluate(&self, text: &str, _context: &DetectorContext) -> Option<Evidence> {
        if DISQUALIFIERS.is_match(text) {
            return None;
        }

        let request = REQUEST.find_all(text);
        let actions = ACTION_VERBS.find_all(text);
        let specifics = SPECIFICITY.find_all(text);

        let confidence = score(&[
            (!request.is_empty(), 40),
            (!actions.is_empty(), 30),
            (!specifics.is_empty(), 20),
            (text.contains('?'), 10),
        ]);
        if confidence < THRESHOLD {
            return None;
        }

        let patterns = request.into_iter().chain(actions).chain(specifics).collect();
        Some(Evidence {
            confidence,
            patterns,
        })
    }
}
