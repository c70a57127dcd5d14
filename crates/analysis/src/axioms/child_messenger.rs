//! AXIOM_010: a complaint about the receiver relayed through the child.

use calmwire_core::analysis::{AxiomCategory, DetectorContext};
use std::sync::LazyLock;

use super::{Axiom, Evidence, named_children, score};
use crate::pattern_set::PatternSet;

const THRESHOLD: u8 = 75;

static CHILD_REFS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(she|he|they)\b",
        r"\b(the\s+)?(kids?|children?|daughter|son)\b",
        r"\b(our|my|your)\s+(daughter|son|child|kids?|children?)\b",
    ])
});

static REPORTING_VERBS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(she|he|they)\s+(said|told|mentioned|asked|complained|cried|was\s+saying)\b",
        r"\b(the\s+)?(kids?|children?)\s+(said|told|mentioned|asked|complained)\b",
        r"\baccording\s+to\s+(her|him|them|the\s+kids?)\b",
        r"\b(she|he|they)\s+told\s+me\b",
        r"\b(she|he|they)\s+(said|says)\s+that\b",
    ])
});

static NEGATIVE_CONTENT: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\byou\s+(forgot|yelled|screamed|didn't|don't|won't|wouldn't|can't|never)\b",
        r"\byou\s+didn't\s+(help|pick|call|come|show)\b",
        r"\byou\s+weren't\s+(there|home|listening)\b",
        r"\b(don't|doesn't)\s+want\s+to\s+(go|stay|be)\s+(to|at|with)\s+(your|you)\b",
        r"\b(scared|afraid|worried)\s+(of|about)\s+you\b",
        r"\byour\s+(house|place)\b",
        r"\bwith\s+you\b",
        r"\byou\s+always\b",
        r"\byou\s+never\b",
    ])
});

static QUOTE_INDICATORS: LazyLock<PatternSet> =
    LazyLock::new(|| PatternSet::new(&[r#"["']"#, r"\bthat\s+you\b", r"\bwhy\s+you\b"]));

const NAMED_VERBS: &[&str] = &["said", "told", "mentioned", "asked", "complained", "cried"];

/// "mia said", "mia told" and so on for each child named in the text.
fn named_reports(text: &str, names: &[String]) -> Vec<String> {
    names
        .iter()
        .flat_map(|name| NAMED_VERBS.iter().map(move |verb| format!("{name} {verb}")))
        .filter(|phrase| text.contains(phrase.as_str()))
        .collect()
}

pub struct ChildMessenger;

impl Axiom for ChildMessenger {
    fn id(&self) -> &'static str {
        "AXIOM_010"
    }

    fn name(&self) -> &'static str {
        "Child as Messenger"
    }

    fn category(&self) -> AxiomCategory {
        AxiomCategory::Indirect
    }

    fn intent_impact(&self) -> Option<&'static str> {
        Some("Sender may mean to pass on the child's feelings; the receiver hears an accusation delivered through the child.")
    }

    fn evaluate(&self, text: &str, context: &DetectorContext) -> Option<Evidence> {
        let named = named_children(text, context);
        let mut verbs = REPORTING_VERBS.find_all(text);
        verbs.extend(named_reports(text, &named));
        let negative = NEGATIVE_CONTENT.find_all(text);
        if verbs.is_empty() || negative.is_empty() {
            return None;
        }

        let mut children = CHILD_REFS.find_all(text);
        children.extend(named);

        let confidence = score(&[
            (!children.is_empty(), 25),
            (true, 30),
            (true, 30),
            (QUOTE_INDICATORS.is_match(text), 10),
            (negative.len() > 1, 5),
        ]);
        if confidence < THRESHOLD {
            return None;
        }

        let mut patterns = verbs;
        patterns.extend(negative);
        Some(Evidence {
            confidence,
            patterns,
        })
    }
}
