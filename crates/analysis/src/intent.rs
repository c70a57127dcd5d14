//! Rough topic/goal guess for a message, handed to the model as a hint.

use serde::Serialize;
use std::sync::LazyLock;

use crate::pattern_set::{PatternSet, normalize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Scheduling,
    Financial,
    Parenting,
    ExtendedFamily,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Request,
    VentFrustration,
    AssertBoundary,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIntent {
    pub topic: Topic,
    pub goal: Goal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_detail: Option<String>,
}

impl UserIntent {
    /// One-line rendering for prompt context.
    pub fn describe(&self) -> String {
        let topic = serde_json::to_value(self.topic)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let goal = serde_json::to_value(self.goal)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        match &self.specific_detail {
            Some(detail) => format!("topic={topic}, goal={goal}, detail={detail}"),
            None => format!("topic={topic}, goal={goal}"),
        }
    }
}

static TIME_MENTION: LazyLock<PatternSet> =
    LazyLock::new(|| PatternSet::new(&[r"\b\d{1,2}(:\d{2})?\s*(am|pm)\b"]));

// Later entries override earlier ones when several topics match.
static TOPICS: LazyLock<Vec<(Topic, PatternSet)>> = LazyLock::new(|| {
    vec![
        (
            Topic::Scheduling,
            PatternSet::new(&[
                r"\b(time|pickup|pick up|drop|dropoff|drop off|schedule|court order)\b",
                r"\b\d{1,2}(:\d{2})?\s*(am|pm)\b",
            ]),
        ),
        (
            Topic::Financial,
            PatternSet::new(&[r"\b(money|pay|paid|owe|owes|expense|expenses|support|cost|costs)\b"]),
        ),
        (
            Topic::Parenting,
            PatternSet::new(&[r"\b(school|homework|bedtime|sick|doctor|discipline)\b"]),
        ),
        (
            Topic::ExtendedFamily,
            PatternSet::new(&[r"\b(mom|dad|mother|father|grandma|grandpa)\b"]),
        ),
    ]
});

static REQUEST: LazyLock<PatternSet> =
    LazyLock::new(|| PatternSet::new(&[r"\b(need|want|please)\b", r"\bcan you\b", r"\?"]));

static VENT: LazyLock<PatternSet> =
    LazyLock::new(|| PatternSet::new(&[r"\byou\b.*\b(always|never|stop|pathetic|power)\b"]));

static BOUNDARY: LazyLock<PatternSet> =
    LazyLock::new(|| PatternSet::new(&[r"\b(court|order|legal)\b"]));

/// Infer what the sender is trying to get across.
pub fn infer_intent(text: &str) -> UserIntent {
    let text = normalize(text);

    let topic = TOPICS
        .iter()
        .filter(|(_, set)| set.is_match(&text))
        .map(|(topic, _)| *topic)
        .last()
        .unwrap_or(Topic::General);

    // Venting outranks a request phrased as a question
    let goal = if VENT.is_match(&text) {
        Goal::VentFrustration
    } else if BOUNDARY.is_match(&text) {
        Goal::AssertBoundary
    } else if REQUEST.is_match(&text) {
        Goal::Request
    } else {
        Goal::Unknown
    };

    let specific_detail = TIME_MENTION.find_all(&text).into_iter().next();

    UserIntent {
        topic,
        goal,
        specific_detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_request_with_time() {
        let intent = infer_intent("Can you do pickup at 5:30pm?");
        assert_eq!(intent.topic, Topic::Scheduling);
        assert_eq!(intent.goal, Goal::Request);
        assert_eq!(intent.specific_detail.as_deref(), Some("5:30pm"));
    }

    #[test]
    fn later_topic_wins() {
        // Mentions both a pickup and the school; parenting comes later in precedence
        let intent = infer_intent("The school pickup changed");
        assert_eq!(intent.topic, Topic::Parenting);
    }

    #[test]
    fn venting_is_detected() {
        let intent = infer_intent("You never let me see the kids on time!");
        assert_eq!(intent.goal, Goal::VentFrustration);
        assert_eq!(intent.topic, Topic::Scheduling);
    }

    #[test]
    fn boundary_assertion() {
        let intent = infer_intent("The court order says alternate weekends.");
        assert_eq!(intent.goal, Goal::AssertBoundary);
    }

    #[test]
    fn unknown_goal_general_topic() {
        let intent = infer_intent("It rained all weekend.");
        assert_eq!(intent.topic, Topic::General);
        assert_eq!(intent.goal, Goal::Unknown);
        assert!(intent.specific_detail.is_none());
    }

    #[test]
    fn describe_is_compact() {
        let intent = infer_intent("Please pay the doctor bill");
        assert_eq!(intent.describe(), "topic=parenting, goal=request");
    }
}
