//! Analysis verdicts and the structural detector capability.
//!
//! [`AnalysisResult`] is the only thing the delivery layer ever sees. Its
//! `Intervention` arm holds a [`RewritePair`], which can only be built
//! through a validating constructor, so an intervention with missing or
//! duplicate rewrites cannot exist.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::DetectorError;

// ── Verdicts ──────────────────────────────────────────────────────────────

/// What the delivery layer should do with a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisResult {
    /// Deliver unchanged.
    Allow,
    /// Deliver with a short advisory comment attached.
    Comment { text: String },
    /// Withhold and offer the sender two de-escalated rewrites.
    Intervention(Intervention),
}

impl AnalysisResult {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Comment { .. } => "comment",
            Self::Intervention(_) => "intervention",
        }
    }
}

/// A withheld message with coaching and two alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Intervention {
    pub validation: String,
    pub refocus_questions: Vec<String>,
    #[serde(flatten)]
    rewrites: RewritePair,
}

impl Intervention {
    pub fn new(
        validation: impl Into<String>,
        refocus_questions: Vec<String>,
        rewrites: RewritePair,
    ) -> Self {
        Self {
            validation: validation.into(),
            refocus_questions,
            rewrites,
        }
    }

    pub fn rewrites(&self) -> &RewritePair {
        &self.rewrites
    }
}

/// Exactly two rewrites, non-empty, distinct from each other and from the
/// original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewritePair {
    rewrite1: String,
    rewrite2: String,
}

/// Why a proposed rewrite pair was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteRejection {
    Empty,
    DuplicateOfOriginal,
    IdenticalRewrites,
}

impl std::fmt::Display for RewriteRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::Empty => "rewrite is empty",
            Self::DuplicateOfOriginal => "rewrite repeats the original message",
            Self::IdenticalRewrites => "both rewrites are the same",
        };
        f.write_str(reason)
    }
}

impl RewritePair {
    /// Validate two candidate rewrites of `original`.
    ///
    /// Comparison ignores case, surrounding whitespace, runs of inner
    /// whitespace and trailing punctuation.
    pub fn new(
        original: &str,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Result<Self, RewriteRejection> {
        let first = first.into().trim().to_string();
        let second = second.into().trim().to_string();

        if first.is_empty() || second.is_empty() {
            return Err(RewriteRejection::Empty);
        }

        let original_key = comparison_key(original);
        let (k1, k2) = (comparison_key(&first), comparison_key(&second));

        if k1 == original_key || k2 == original_key {
            return Err(RewriteRejection::DuplicateOfOriginal);
        }
        if k1 == k2 {
            return Err(RewriteRejection::IdenticalRewrites);
        }

        Ok(Self {
            rewrite1: first,
            rewrite2: second,
        })
    }

    pub fn first(&self) -> &str {
        &self.rewrite1
    }

    pub fn second(&self) -> &str {
        &self.rewrite2
    }
}

fn comparison_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', '!', '?'])
        .to_lowercase()
}

// ── Structural detector ───────────────────────────────────────────────────

/// Broad family an axiom belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxiomCategory {
    /// Hostility routed through a third party or a disguise.
    Indirect,
    /// Open hostility (threats, ultimatums).
    Direct,
    /// Healthy, structured communication.
    Clean,
}

impl AxiomCategory {
    pub fn is_hostile(self) -> bool {
        !matches!(self, Self::Clean)
    }
}

/// One structural pattern that fired on a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxiomFinding {
    /// Stable identifier, e.g. "AXIOM_010"
    pub axiom_id: String,

    /// Human-readable name, e.g. "Child as Messenger"
    pub name: String,

    pub category: AxiomCategory,

    /// 0–100
    pub confidence: u8,

    /// Matched evidence phrases
    #[serde(default)]
    pub behavioral_patterns: Vec<String>,

    /// One-line reading of intent versus impact, for the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_impact: Option<String>,
}

/// Output of one detector run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorReport {
    pub findings: Vec<AxiomFinding>,

    /// The message is safe to deliver without asking the model.
    pub quick_pass: bool,
}

impl DetectorReport {
    pub fn hostile_findings(&self) -> impl Iterator<Item = &AxiomFinding> {
        self.findings.iter().filter(|f| f.category.is_hostile())
    }
}

/// What the detector is told about the message beyond its text.
#[derive(Debug, Clone, Default)]
pub struct DetectorContext {
    pub child_names: Vec<String>,
    pub sender_id: String,
    pub receiver_id: String,
}

/// Local rule-based structural analysis.
///
/// Optional: the mediator holds an `Option<Arc<dyn Detector>>` and runs it
/// under a hard deadline.
#[async_trait]
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(
        &self,
        text: &str,
        context: &DetectorContext,
    ) -> std::result::Result<DetectorReport, DetectorError>;
}
