//! Structural axioms and the rule-based detector that runs them.
//!
//! Each axiom scores one communication pattern from weighted regex
//! evidence. The detector collects every axiom that clears its threshold
//! and decides whether the message qualifies for a local quick-pass.

mod child_messenger;
mod clean_request;
mod displaced_accusation;
mod threat_ultimatum;
mod weaponized_agreement;

pub use child_messenger::ChildMessenger;
pub use clean_request::CleanRequest;
pub use displaced_accusation::DisplacedAccusation;
pub use threat_ultimatum::ThreatUltimatum;
pub use weaponized_agreement::WeaponizedAgreement;

use async_trait::async_trait;
use calmwire_core::analysis::{
    AxiomCategory, AxiomFinding, Detector, DetectorContext, DetectorReport,
};
use calmwire_core::error::DetectorError;

use crate::pattern_set::{contains_word, normalize};
use crate::patterns::red_flags;

/// What an axiom found in one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub confidence: u8,
    pub patterns: Vec<String>,
}

/// A single structural pattern check.
///
/// `evaluate` receives normalized text and returns evidence only when the
/// axiom's own threshold is met.
pub trait Axiom: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn category(&self) -> AxiomCategory;

    /// How the sender probably means it versus how it lands.
    fn intent_impact(&self) -> Option<&'static str> {
        None
    }

    fn evaluate(&self, text: &str, context: &DetectorContext) -> Option<Evidence>;
}

/// Sum the weights whose condition holds, capped at 100.
pub(crate) fn score(parts: &[(bool, u32)]) -> u8 {
    let total: u32 = parts.iter().filter(|(hit, _)| *hit).map(|(_, w)| w).sum();
    total.min(100) as u8
}

/// Child names from the roster that appear in the text.
pub(crate) fn named_children(text: &str, context: &DetectorContext) -> Vec<String> {
    context
        .child_names
        .iter()
        .filter(|name| contains_word(text, name))
        .map(|name| name.trim().to_lowercase())
        .collect()
}

/// Runs a fixed catalogue of axioms locally. No I/O.
pub struct RuleDetector {
    axioms: Vec<Box<dyn Axiom>>,
}

impl RuleDetector {
    /// The full built-in catalogue.
    pub fn new() -> Self {
        Self {
            axioms: vec![
                Box::new(ChildMessenger),
                Box::new(DisplacedAccusation),
                Box::new(WeaponizedAgreement),
                Box::new(ThreatUltimatum),
                Box::new(CleanRequest),
            ],
        }
    }

    pub fn with_axioms(axioms: Vec<Box<dyn Axiom>>) -> Self {
        Self { axioms }
    }

    pub fn axiom_ids(&self) -> Vec<&'static str> {
        self.axioms.iter().map(|a| a.id()).collect()
    }

    /// Synchronous evaluation; `analyze` wraps this.
    pub fn evaluate(&self, text: &str, context: &DetectorContext) -> DetectorReport {
        let normalized = normalize(text);

        let findings: Vec<AxiomFinding> = self
            .axioms
            .iter()
            .filter_map(|axiom| {
                let evidence = axiom.evaluate(&normalized, context)?;
                Some(AxiomFinding {
                    axiom_id: axiom.id().to_string(),
                    name: axiom.name().to_string(),
                    category: axiom.category(),
                    confidence: evidence.confidence,
                    behavioral_patterns: evidence.patterns,
                    intent_impact: axiom.intent_impact().map(str::to_string),
                })
            })
            .collect();

        let any_clean = findings
            .iter()
            .any(|f| f.category == AxiomCategory::Clean);
        let any_hostile = findings.iter().any(|f| f.category.is_hostile());
        let quick_pass = any_clean && !any_hostile && red_flags(&normalized).is_empty();

        tracing::debug!(
            findings = findings.len(),
            quick_pass,
            "Rule detector evaluated message"
        );

        DetectorReport {
            findings,
            quick_pass,
        }
    }
}

impl Default for RuleDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Detector for RuleDetector {
    fn name(&self) -> &str {
        "rules"
    }

    async fn analyze(
        &self,
        text: &str,
        context: &DetectorContext,
    ) -> Result<DetectorReport, DetectorError> {
        Ok(self.evaluate(text, context))
    }
}
