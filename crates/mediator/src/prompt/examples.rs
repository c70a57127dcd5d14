//! Worked examples that calibrate the model's baseline.
//!
//! The prompt always carries at least one intervention and one stay-silent
//! example; teaching by demonstration is cheaper than spelling the rules
//! out in full.

use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleKind {
    Intervene,
    StaySilent,
    Comment,
}

impl ExampleKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Intervene => "INTERVENE",
            Self::StaySilent => "STAY_SILENT",
            Self::Comment => "COMMENT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FewShotExample {
    pub kind: ExampleKind,
    pub message: &'static str,
    pub context: &'static str,
    pub output: Value,
}

impl FewShotExample {
    pub fn render(&self) -> String {
        let output = serde_json::to_string_pretty(&self.output).unwrap_or_default();
        format!(
            "EXAMPLE - {}:\nInput: \"{}\"\nContext: {}\nOutput: {}",
            self.kind.label(),
            self.message,
            self.context,
            output
        )
    }
}

pub fn intervention_examples() -> Vec<FewShotExample> {
    vec![
        FewShotExample {
            kind: ExampleKind::Intervene,
            message: "You never let me see the kids on time!",
            context: "Scheduling conflict about pickup times",
            output: json!({
                "action": "INTERVENE",
                "escalation": {
                    "riskLevel": "medium",
                    "confidence": 85,
                    "reasons": ["absolute statement", "blame language"]
                },
                "intervention": {
                    "validation": "It's frustrating when schedules don't align with your expectations, especially when you've planned your time around seeing the kids.",
                    "refocusQuestions": [
                        "What do you really need from them right now - an apology or just better consistency?",
                        "Could the delay be about their situation, not about you?",
                        "Will this matter in a week, or is there a bigger pattern to address?"
                    ],
                    "rewrite1": "I'd really appreciate sticking to the schedule so I can make the most of my time with them.",
                    "rewrite2": "Could we work together to make sure pickups happen on time? It helps me plan better."
                }
            }),
        },
        FewShotExample {
            kind: ExampleKind::Intervene,
            message: "Tell your dad he needs to pay up or I'm taking you to court",
            context: "Child support payment discussion",
            output: json!({
                "action": "INTERVENE",
                "escalation": {
                    "riskLevel": "high",
                    "confidence": 95,
                    "reasons": ["threat", "using child as messenger", "ultimatum"]
                },
                "intervention": {
                    "validation": "Financial stress creates urgency, and it's natural to want to protect your child's needs. Sending the message through the child puts them in the middle.",
                    "refocusQuestions": [
                        "What outcome would actually help here - payment or acknowledgment?",
                        "Is there a way to raise this directly without involving the child?",
                        "What kind of co-parent do you want to be in this moment?"
                    ],
                    "rewrite1": "I need to discuss the payment schedule with you directly. Can we set up a time to talk about this?",
                    "rewrite2": "Let me handle the money conversations with you directly. Our child doesn't need to be in the middle of this."
                }
            }),
        },
        FewShotExample {
            kind: ExampleKind::Intervene,
            message: "You're such an idiot for changing the schedule without asking",
            context: "Schedule change without consultation",
            output: json!({
                "action": "INTERVENE",
                "escalation": {
                    "riskLevel": "high",
                    "confidence": 90,
                    "reasons": ["name-calling", "contempt", "blame"]
                },
                "intervention": {
                    "validation": "Name-calling shuts down any chance of being heard, so the real concern about schedule changes gets lost.",
                    "refocusQuestions": [
                        "What do you really need - an apology, better communication, or to be included in decisions?",
                        "Could this be about their situation rather than about you?",
                        "Would this phrasing get you included in schedule decisions?"
                    ],
                    "rewrite1": "I'm frustrated that the schedule changed without us discussing it first. Can we talk about how to handle changes going forward?",
                    "rewrite2": "When plans change without checking in, it's hard for me to plan. Could we agree to discuss schedule changes before making them?"
                }
            }),
        },
    ]
}

pub fn stay_silent_examples() -> Vec<FewShotExample> {
    vec![
        FewShotExample {
            kind: ExampleKind::StaySilent,
            message: "Could we swap weekends? I have a work trip coming up",
            context: "Scheduling request",
            output: json!({
                "action": "STAY_SILENT",
                "escalation": {
                    "riskLevel": "low",
                    "confidence": 95,
                    "reasons": ["polite request", "logistics coordination"]
                }
            }),
        },
        FewShotExample {
            kind: ExampleKind::StaySilent,
            message: "Emma mentioned she has a doctor appointment next week. Do you want me to take her or would you prefer to?",
            context: "Medical coordination",
            output: json!({
                "action": "STAY_SILENT",
                "escalation": {
                    "riskLevel": "low",
                    "confidence": 90,
                    "reasons": ["informational", "collaborative question"]
                }
            }),
        },
        FewShotExample {
            kind: ExampleKind::StaySilent,
            message: "I know it's your night but could I pick her up early? She has a school project due",
            context: "Flexible scheduling request",
            output: json!({
                "action": "STAY_SILENT",
                "escalation": {
                    "riskLevel": "low",
                    "confidence": 85,
                    "reasons": ["acknowledges other parent's time", "polite request"]
                }
            }),
        },
    ]
}

pub fn comment_examples() -> Vec<FewShotExample> {
    vec![FewShotExample {
        kind: ExampleKind::Comment,
        message: "I really need you to be more reliable",
        context: "General reliability concern",
        output: json!({
            "action": "COMMENT",
            "escalation": {
                "riskLevel": "low",
                "confidence": 70,
                "reasons": ["vague criticism", "could be more specific"]
            },
            "intervention": {
                "comment": "Being specific about what you need helps: 'I need you to arrive on time for pickups' is clearer than 'be more reliable.'"
            }
        }),
    }]
}

/// `per_kind` intervention and stay-silent examples (at least one each),
/// plus the comment example when `include_comment` is set.
pub fn select(per_kind: usize, include_comment: bool) -> Vec<FewShotExample> {
    let per_kind = per_kind.max(1);
    let mut examples: Vec<FewShotExample> =
        intervention_examples().into_iter().take(per_kind).collect();
    examples.extend(stay_silent_examples().into_iter().take(per_kind));
    if include_comment {
        examples.extend(comment_examples());
    }
    examples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_always_has_both_polarities() {
        let examples = select(0, false);
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].kind, ExampleKind::Intervene);
        assert_eq!(examples[1].kind, ExampleKind::StaySilent);
    }

    #[test]
    fn selection_is_capped_by_catalogue() {
        let examples = select(10, true);
        assert_eq!(examples.len(), 3 + 3 + 1);
    }

    #[test]
    fn intervention_examples_have_distinct_rewrites() {
        for example in intervention_examples() {
            let intervention = &example.output["intervention"];
            let first = intervention["rewrite1"].as_str().unwrap();
            let second = intervention["rewrite2"].as_str().unwrap();
            assert_ne!(first, second);
            assert_ne!(first, example.message);
            assert_eq!(intervention["refocusQuestions"].as_array().unwrap().len(), 3);
        }
    }

    #[test]
    fn render_includes_label_and_json() {
        let rendered = stay_silent_examples()[0].render();
        assert!(rendered.starts_with("EXAMPLE - STAY_SILENT:"));
        assert!(rendered.contains("\"action\": \"STAY_SILENT\""));
    }
}
