//! Context capabilities — who is talking, about what, and in what situation.
//!
//! Every source here is optional. A missing provider, a missing field or a
//! failed lookup degrades the prompt; it never fails the analysis.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::{ContextError, EnrichmentError};

/// Profile data for one participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_style: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<String>,

    /// Free-text background the user chose to share
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Profile {
    pub fn is_empty(&self) -> bool {
        self.communication_style.is_none()
            && self.triggers.is_empty()
            && self.goals.is_empty()
            && self.context.is_none()
    }
}

/// Identity → display name and profile fields.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn profile(&self, identity: &str) -> Result<Option<Profile>, ContextError>;
}

/// Hints the host already has at hand when it submits a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SituationalHints {
    /// Pending shared tasks, free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_context: Option<String>,

    /// Earlier messages a participant flagged as hurtful
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flagged_messages: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_role: Option<String>,
}

/// Looks up free-text situational context for a room (custody schedule,
/// recent events). Slow sources belong here, not in the hints.
#[async_trait]
pub trait SituationProvider: Send + Sync {
    async fn situation(
        &self,
        room_id: &str,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<Option<String>, ContextError>;
}

// ── Deeper understanding ──────────────────────────────────────────────────

/// Input to the optional enrichment step.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentInput {
    pub text: String,
    pub sender_name: String,
    pub receiver_name: String,
    /// Already formatted "name: text" lines, oldest first
    pub history: Vec<String>,
    pub relationship_context: Option<String>,
}

/// A reading of what is going on beneath the words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Understanding {
    pub human_nature: String,
    pub relational_dynamics: String,
    pub underlying_needs: String,
    pub context_factors: String,
    pub communication_breakdown: String,
    pub path_forward: String,
}

impl Understanding {
    /// Render as a prompt section; `None` when nothing useful came back.
    pub fn to_prompt_section(&self) -> Option<String> {
        let fields = [
            ("Human nature", &self.human_nature),
            ("Relational dynamics", &self.relational_dynamics),
            ("Underlying needs", &self.underlying_needs),
            ("Context factors", &self.context_factors),
            ("Communication breakdown", &self.communication_breakdown),
            ("Path forward", &self.path_forward),
        ];

        let lines: Vec<String> = fields
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(label, v)| format!("- {label}: {}", v.trim()))
            .collect();

        if lines.is_empty() {
            return None;
        }

        Some(format!(
            "=== DEEPER UNDERSTANDING ===\n{}",
            lines.join("\n")
        ))
    }
}

/// Slow, strictly optional enrichment. Always run under a deadline.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn understand(&self, input: &EnrichmentInput) -> Result<Understanding, EnrichmentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_understanding_renders_nothing() {
        assert!(Understanding::default().to_prompt_section().is_none());
    }

    #[test]
    fn understanding_renders_present_fields_only() {
        let u = Understanding {
            underlying_needs: "Predictability around pickups".into(),
            path_forward: "Agree on a fixed time".into(),
            ..Default::default()
        };
        let section = u.to_prompt_section().unwrap();
        assert!(section.contains("Underlying needs: Predictability"));
        assert!(section.contains("Path forward"));
        assert!(!section.contains("Human nature"));
    }

    #[test]
    fn understanding_parses_camel_case_with_gaps() {
        let u: Understanding =
            serde_json::from_str(r#"{"humanNature":"tired","pathForward":"talk"}"#).unwrap();
        assert_eq!(u.human_nature, "tired");
        assert!(u.context_factors.is_empty());
    }

    #[test]
    fn profile_emptiness_ignores_display_name() {
        let p = Profile {
            display_name: Some("Alex".into()),
            ..Default::default()
        };
        assert!(p.is_empty());
    }
}
