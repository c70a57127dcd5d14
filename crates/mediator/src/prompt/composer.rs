//! Prompt composition — a pure, deterministic template builder.
//!
//! Identical inputs always produce identical prompts: no clock, no
//! randomness. Sections with nothing to say are left out entirely.

use calmwire_core::analysis::AxiomFinding;
use calmwire_core::context::Profile;
use calmwire_core::state::InterventionMemo;

use super::examples::{self, FewShotExample};
use crate::context::ContextBundle;

/// How many prior interventions are shown for anti-repetition.
pub const MAX_PRIOR_INTERVENTIONS: usize = 2;

pub const SYSTEM_PROMPT: &str = "You analyze co-parenting messages and decide: STAY_SILENT, INTERVENE, or COMMENT.

CORE RULES:
1. Language, not emotions - describe phrasing mechanics, never diagnose feelings
2. No diagnostics - never use psychological labels (narcissist, manipulative, etc.)
3. Sender-first - rewrites are what the SENDER could send instead, not receiver responses
4. Child-centric - when children are mentioned, frame around their wellbeing

STAY_SILENT (default) for: polite requests, scheduling, logistics, questions about children, acknowledgments.
INTERVENE only for: clear attacks, blame, contempt, guilt-tripping, weaponizing children.
COMMENT for: brief helpful observations (max 1-2 per conversation).

When INTERVENING, provide JSON with:
- validation: 1-2 sentences normalizing their reaction (specific to their situation)
- refocusQuestions: 3 brief questions to shift from reactivity to responsiveness (from different categories)
- rewrite1 & rewrite2: TWO rewritten versions of their original message (same person, same intent, better words)

JSON only.";

const RESPONSE_FORMAT: &str = r#"Respond with JSON only:
{
  "action": "STAY_SILENT|INTERVENE|COMMENT",
  "escalation": {"riskLevel": "low|medium|high", "confidence": 0-100, "reasons": []},
  "emotion": {"currentEmotion": "neutral|frustrated|defensive", "stressLevel": 0-100},
  "intervention": {
    "validation": "1-2 sentences, specific to their situation",
    "refocusQuestions": ["question 1", "question 2", "question 3"],
    "rewrite1": "The sender's message, rephrased",
    "rewrite2": "A different approach with the same intent",
    "comment": "Only for COMMENT: one brief observation"
  }
}"#;

/// Final prompt pair handed to the inference client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub system: String,
    pub user: String,
}

/// Everything the composer reads.
pub struct PromptInput<'a> {
    pub text: &'a str,
    pub context: &'a ContextBundle,
    pub findings: &'a [AxiomFinding],
    pub recent_interventions: &'a [InterventionMemo],
}

pub struct PromptComposer {
    examples: Vec<FewShotExample>,
}

impl PromptComposer {
    /// One intervention, one stay-silent and the comment example.
    pub fn new() -> Self {
        Self::with_examples(examples::select(1, true))
    }

    pub fn with_examples(examples: Vec<FewShotExample>) -> Self {
        Self { examples }
    }

    pub fn compose(&self, input: &PromptInput<'_>) -> ComposedPrompt {
        let ctx = input.context;
        let mut sections: Vec<String> = Vec::new();

        sections.push("Analyze this co-parenting message. Decide: STAY_SILENT, INTERVENE, or COMMENT.".into());

        let rendered: Vec<String> = self.examples.iter().map(FewShotExample::render).collect();
        if !rendered.is_empty() {
            sections.push(rendered.join("\n\n"));
        }
        sections.push("---".into());

        sections.push(format!(
            "CURRENT MESSAGE FROM {}: \"{}\"",
            ctx.sender_name,
            input.text.trim()
        ));

        if let Some(section) = ctx.understanding.as_ref().and_then(|u| u.to_prompt_section()) {
            sections.push(section);
        }

        sections.push(relationship_section(ctx));

        if let Some(section) = profile_section(ctx) {
            sections.push(section);
        }

        if !ctx.history.is_empty() {
            sections.push(format!(
                "=== CONVERSATION HISTORY ===\n{}\n\nUse specific details from this history (child names, dates, events) in your validation and rewrites.",
                ctx.history.join("\n")
            ));
        }

        sections.push(format!("INFERRED INTENT: {}", ctx.intent.describe()));

        if let Some(section) = findings_section(input.findings) {
            sections.push(section);
        }

        if let Some(section) = prior_interventions_section(input.recent_interventions) {
            sections.push(section);
        }

        sections.push(
            "INSTRUCTIONS:
- Use the context above to make validation and rewrites specific
- validation: 1-2 sentences normalizing their reaction
- refocusQuestions: 3 brief questions from different categories
- rewrite1 & rewrite2: TWO rewritten versions of the sender's message (same person, same intent, better words - NOT receiver responses)"
                .into(),
        );
        sections.push(RESPONSE_FORMAT.into());

        ComposedPrompt {
            system: SYSTEM_PROMPT.to_string(),
            user: sections.join("\n\n"),
        }
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new()
    }
}

fn relationship_section(ctx: &ContextBundle) -> String {
    let mut out = String::from("RELATIONSHIP CONTEXT:\n");
    if let Some(relationships) = &ctx.relationship_context {
        out.push_str(relationships);
        out.push_str("\n\n");
    }
    out.push_str(&format!(
        "{} is messaging {}. These are co-parents sharing children but no longer together.",
        ctx.sender_name, ctx.receiver_name
    ));
    if let Some(situation) = &ctx.situational_context {
        out.push_str(&format!("\n\nSITUATION:\n{situation}"));
    }
    if let Some(tasks) = &ctx.task_context {
        out.push_str(&format!("\n\nACTIVE PARENTING TASKS:\n{tasks}"));
    }
    if !ctx.flagged_messages.is_empty() {
        out.push_str("\n\nPREVIOUSLY FLAGGED MESSAGES:");
        for flagged in &ctx.flagged_messages {
            out.push_str(&format!("\n- \"{}\"", flagged.trim()));
        }
    }
    out
}

fn profile_section(ctx: &ContextBundle) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(profile) = &ctx.sender_profile {
        parts.push(describe_profile(&ctx.sender_name, profile));
    }
    if let Some(profile) = &ctx.receiver_profile {
        parts.push(describe_profile(&ctx.receiver_name, profile));
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!(
        "=== PARTICIPANT CONTEXT ===\n{}\n\nUse this to coach with empathy; never quote it back to the sender.",
        parts.join("\n")
    ))
}

fn describe_profile(name: &str, profile: &Profile) -> String {
    let mut fields = Vec::new();
    if let Some(style) = &profile.communication_style {
        fields.push(format!("communication style: {style}"));
    }
    if !profile.triggers.is_empty() {
        fields.push(format!("triggers: {}", profile.triggers.join(", ")));
    }
    if !profile.goals.is_empty() {
        fields.push(format!("goals: {}", profile.goals.join(", ")));
    }
    if let Some(context) = &profile.context {
        fields.push(format!("background: {}", context.trim()));
    }
    format!("- {name}: {}", fields.join("; "))
}

fn findings_section(findings: &[AxiomFinding]) -> Option<String> {
    if findings.is_empty() {
        return None;
    }
    let lines: Vec<String> = findings
        .iter()
        .map(|f| {
            let mut line = format!("- {} {} ({}% confidence)", f.axiom_id, f.name, f.confidence);
            if !f.behavioral_patterns.is_empty() {
                line.push_str(&format!(": \"{}\"", f.behavioral_patterns.join("\", \"")));
            }
            if let Some(impact) = &f.intent_impact {
                line.push_str(&format!("\n  Intent vs impact: {impact}"));
            }
            line
        })
        .collect();
    Some(format!("=== STRUCTURAL PATTERNS DETECTED ===\n{}", lines.join("\n")))
}

fn prior_interventions_section(memos: &[InterventionMemo]) -> Option<String> {
    let skip = memos.len().saturating_sub(MAX_PRIOR_INTERVENTIONS);
    let lines: Vec<String> = memos
        .iter()
        .skip(skip)
        .map(|memo| {
            let mut line = format!("- Validation: \"{}\"", memo.validation);
            if !memo.refocus_questions.is_empty() {
                line.push_str(&format!("\n  Questions: {}", memo.refocus_questions.join(" | ")));
            }
            line
        })
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(format!(
        "=== RECENT INTERVENTIONS IN THIS ROOM ===\n{}\n\nDo not repeat this wording. Use a different validation angle and different questions.",
        lines.join("\n")
    ))
}
