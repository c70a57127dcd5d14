//! Response interpretation — turns untrusted model output into an
//! [`AnalysisResult`].
//!
//! Prose or code fences around the JSON object are tolerated, and anything
//! that cannot be read as a well-formed verdict becomes `Allow`. This module
//! never returns an error.

use calmwire_core::analysis::{AnalysisResult, Intervention, RewritePair};
use calmwire_core::message::Message;
use calmwire_core::state::InterventionMemo;
use calmwire_memory::ConversationStore;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ModelResponse {
    action: String,
    escalation: Option<Escalation>,
    emotion: Option<Emotion>,
    intervention: Option<ModelIntervention>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Escalation {
    risk_level: Option<String>,
    confidence: Option<f64>,
    reasons: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Emotion {
    current_emotion: Option<String>,
    stress_level: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ModelIntervention {
    validation: Option<String>,
    refocus_questions: Vec<String>,
    rewrite1: Option<String>,
    rewrite2: Option<String>,
    comment: Option<String>,
}

/// What the model asked for, after validation but before throttling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedVerdict {
    StaySilent,
    Comment(String),
    Intervene(Intervention),
    /// Unusable output; carries the reason for the log
    Rejected(String),
}

/// Parse raw model output against the original message text. Pure.
pub fn parse_verdict(raw: &str, original: &str) -> ParsedVerdict {
    let Some(response) =
        first_json_object(raw, |r: &ModelResponse| !r.action.trim().is_empty())
    else {
        return ParsedVerdict::Rejected(if extract_json_object(raw).is_some() {
            "no JSON object with an action in response".into()
        } else {
            "no JSON object in response".into()
        });
    };

    if let Some(escalation) = &response.escalation {
        debug!(
            risk_level = escalation.risk_level.as_deref().unwrap_or("unknown"),
            confidence = escalation.confidence.unwrap_or_default(),
            reasons = escalation.reasons.len(),
            "Model escalation assessment"
        );
    }
    if let Some(emotion) = &response.emotion {
        debug!(
            emotion = emotion.current_emotion.as_deref().unwrap_or("unknown"),
            stress = emotion.stress_level.unwrap_or_default(),
            "Model emotion assessment"
        );
    }

    let action = response
        .action
        .trim()
        .to_ascii_uppercase()
        .replace([' ', '-'], "_");
    let body = response.intervention.unwrap_or_default();

    match action.as_str() {
        "STAY_SILENT" | "ALLOW" => ParsedVerdict::StaySilent,
        "COMMENT" => match body.comment.map(|c| c.trim().to_string()) {
            Some(comment) if !comment.is_empty() => ParsedVerdict::Comment(comment),
            _ => ParsedVerdict::Rejected("COMMENT without comment text".into()),
        },
        "INTERVENE" => {
            let Some(validation) = body
                .validation
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
            else {
                return ParsedVerdict::Rejected("INTERVENE without validation".into());
            };
            let rewrites = match RewritePair::new(
                original,
                body.rewrite1.as_deref().unwrap_or_default(),
                body.rewrite2.as_deref().unwrap_or_default(),
            ) {
                Ok(pair) => pair,
                Err(rejection) => {
                    return ParsedVerdict::Rejected(format!("invalid rewrites: {rejection}"));
                }
            };
            let questions = body
                .refocus_questions
                .into_iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect();
            ParsedVerdict::Intervene(Intervention::new(validation, questions, rewrites))
        }
        other => ParsedVerdict::Rejected(format!("unknown action '{other}'")),
    }
}

/// The first balanced `{...}` object in `raw`, skipping braces inside
/// string literals.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    json_objects(raw).next()
}

/// The first balanced object in `raw` that deserializes as `T` and passes
/// `accept`. A stray brace in surrounding prose does not hide a valid
/// object after it.
pub fn first_json_object<T: DeserializeOwned>(
    raw: &str,
    accept: impl Fn(&T) -> bool,
) -> Option<T> {
    json_objects(raw)
        .filter_map(|candidate| serde_json::from_str::<T>(candidate).ok())
        .find(|value| accept(value))
}

/// Every balanced object candidate, one per opening brace, in order.
fn json_objects(raw: &str) -> impl Iterator<Item = &str> {
    raw.match_indices('{')
        .filter_map(|(start, _)| balanced_object_at(raw, start))
}

fn balanced_object_at(raw: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Applies the per-room rules on top of a parsed verdict: the daily
/// intervention cap and the comment cooldown.
pub struct ResponseInterpreter {
    store: Arc<ConversationStore>,
    max_interventions_per_day: u32,
    comment_cooldown: Duration,
}

impl ResponseInterpreter {
    pub fn new(
        store: Arc<ConversationStore>,
        max_interventions_per_day: u32,
        comment_cooldown: Duration,
    ) -> Self {
        Self {
            store,
            max_interventions_per_day,
            comment_cooldown,
        }
    }

    pub async fn interpret(&self, raw: &str, message: &Message) -> AnalysisResult {
        self.interpret_at(raw, message, Utc::now()).await
    }

    pub async fn interpret_at(
        &self,
        raw: &str,
        message: &Message,
        now: DateTime<Utc>,
    ) -> AnalysisResult {
        let verdict = match parse_verdict(raw, &message.text) {
            ParsedVerdict::StaySilent => AnalysisResult::Allow,
            ParsedVerdict::Rejected(reason) => {
                warn!(
                    room_id = %message.room_id,
                    reason = %reason,
                    "Model response unusable, allowing message"
                );
                AnalysisResult::Allow
            }
            ParsedVerdict::Comment(text) => AnalysisResult::Comment { text },
            ParsedVerdict::Intervene(intervention) => AnalysisResult::Intervention(intervention),
        };
        self.apply_room_rules_at(verdict, message, now).await
    }

    pub async fn apply_room_rules(
        &self,
        verdict: AnalysisResult,
        message: &Message,
    ) -> AnalysisResult {
        self.apply_room_rules_at(verdict, message, Utc::now()).await
    }

    /// Gate a verdict through the room's comment cooldown and daily
    /// intervention cap, recording it when it survives. Used for fresh
    /// verdicts and for verdicts served from the cache alike.
    pub async fn apply_room_rules_at(
        &self,
        verdict: AnalysisResult,
        message: &Message,
        now: DateTime<Utc>,
    ) -> AnalysisResult {
        let room_id = message.room_id.as_str();

        match verdict {
            AnalysisResult::Allow => AnalysisResult::Allow,
            AnalysisResult::Comment { text } => {
                if self
                    .store
                    .claim_comment_slot_at(room_id, self.comment_cooldown, now)
                    .await
                {
                    info!(room_id, "Comment attached");
                    AnalysisResult::Comment { text }
                } else {
                    warn!(
                        room_id,
                        cooldown_secs = self.comment_cooldown.as_secs(),
                        "Comment suppressed by cooldown"
                    );
                    AnalysisResult::Allow
                }
            }
            AnalysisResult::Intervention(intervention) => {
                let memo = InterventionMemo {
                    validation: intervention.validation.clone(),
                    refocus_questions: intervention.refocus_questions.clone(),
                };
                let throttle = self
                    .store
                    .try_record_intervention_at(
                        room_id,
                        self.max_interventions_per_day,
                        Some(memo),
                        now,
                    )
                    .await;
                if throttle.should_throttle {
                    warn!(
                        room_id,
                        recent_count = throttle.recent_count,
                        max_per_day = throttle.max_per_day,
                        "Intervention throttled, allowing message"
                    );
                    return AnalysisResult::Allow;
                }

                info!(
                    room_id,
                    sender_id = %message.sender_id,
                    recent_count = throttle.recent_count,
                    "Intervention surfaced"
                );
                AnalysisResult::Intervention(intervention)
            }
        }
    }
}
