//! Pattern pre-filter — the first and cheapest gate.
//!
//! Recognizes messages that never need mediation (greetings, short
//! acknowledgments, narration about third parties, clearly positive
//! messages). A skip short-circuits the whole pipeline before any context
//! is built, cache entry written or inference call made.

use serde::Serialize;
use std::sync::LazyLock;

use crate::pattern_set::{PatternSet, normalize};
use crate::patterns::{INSULTS, NEGATIVE_TRAITS, SECOND_PERSON};

const GREETINGS: &[&str] = &["hi", "hello", "hey", "hi there", "hello there", "hey there"];

const ACKNOWLEDGMENTS: &[&str] = &[
    "thanks",
    "thank you",
    "ok",
    "okay",
    "sure",
    "yes",
    "no",
    "got it",
    "sounds good",
];

static THIRD_PARTY: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\b(my\s+)?(friend|teacher|boss|neighbor|colleague|coworker|brother|sister|mother|father|parent|grandma|grandpa|aunt|uncle|cousin)\b",
    ])
});

static POSITIVE: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"(you're|you are) (my )?(friend|best|great|awesome|amazing|wonderful|the best|so kind|so helpful|so great|incredible|fantastic)",
        r"(love|appreciate|thankful|grateful) (you|that|this)",
        r"(thank|thanks) (you|so much|for)",
        r"good job|well done|nice work|great work|great job",
        r"\bi (love|appreciate|value|admire|respect) (you|this|that|our)",
        r"(you're|you are) (doing )?(great|well|good|amazing|awesome)",
        r"(miss|missed) you",
        r"(proud of|happy for) you",
        r"you're a (great|good|wonderful|amazing) (parent|dad|mom|father|mother|person)",
        r"love (how|when|that) you",
        r"love (it|this) when you",
        r"you (make|made) me (happy|smile|laugh|feel (good|better|loved|special))",
        r"(you're|you are) (so )?(sweet|kind|thoughtful|caring|supportive|helpful)",
    ])
});

static HOSTILE_QUALIFIER: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        r"\byou\s+(always|never)\b",
        r"\b(ruin|ruined|ruining|hate|worst|fault)\b",
    ])
});

/// Why a message was let through without analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Empty,
    Greeting,
    Acknowledgment,
    ThirdParty,
    PositiveSentiment,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Greeting => "greeting",
            Self::Acknowledgment => "acknowledgment",
            Self::ThirdParty => "third_party",
            Self::PositiveSentiment => "positive_sentiment",
        }
    }
}

/// Pre-filter outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefilterVerdict {
    pub should_skip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
}

impl PrefilterVerdict {
    fn skip(reason: SkipReason) -> Self {
        Self {
            should_skip: true,
            reason: Some(reason),
        }
    }

    fn proceed() -> Self {
        Self {
            should_skip: false,
            reason: None,
        }
    }
}

/// Classify a message. Pure; no I/O.
pub fn classify(text: &str) -> PrefilterVerdict {
    let normalized = normalize(text);
    let bare = normalized.trim_end_matches(['.', '!', '?', ' ']);

    if bare.is_empty() {
        return PrefilterVerdict::skip(SkipReason::Empty);
    }
    if GREETINGS.contains(&bare) {
        return PrefilterVerdict::skip(SkipReason::Greeting);
    }
    if ACKNOWLEDGMENTS.contains(&bare) {
        return PrefilterVerdict::skip(SkipReason::Acknowledgment);
    }
    if !SECOND_PERSON.is_match(&normalized)
        && THIRD_PARTY.is_match(&normalized)
        && !is_hostile(&normalized)
    {
        return PrefilterVerdict::skip(SkipReason::ThirdParty);
    }
    if POSITIVE.is_match(&normalized) && !is_hostile(&normalized) {
        return PrefilterVerdict::skip(SkipReason::PositiveSentiment);
    }

    PrefilterVerdict::proceed()
}

/// Vetoes the third-party and positive skips: sarcasm, or a co-parent
/// being run down in the third person.
fn is_hostile(text: &str) -> bool {
    NEGATIVE_TRAITS.is_match(text) || INSULTS.is_match(text) || HOSTILE_QUALIFIER.is_match(text)
}
