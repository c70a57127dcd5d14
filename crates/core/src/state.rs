//! Per-room bookkeeping value types shared by the analysis, memory and
//! mediator crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conflict-indicative phrasings found in a single message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictPatterns {
    pub accusatory: bool,
    pub triangulation: bool,
}

impl ConflictPatterns {
    pub fn any(&self) -> bool {
        self.accusatory || self.triangulation
    }
}

/// Running per-room tallies. Monotonic, no decay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCounts {
    pub accusatory: u64,
    pub triangulation: u64,
}

impl PatternCounts {
    pub fn record(&mut self, patterns: ConflictPatterns) {
        if patterns.accusatory {
            self.accusatory += 1;
        }
        if patterns.triangulation {
            self.triangulation += 1;
        }
    }
}

/// What the mediator said last time, so the next intervention can vary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionMemo {
    pub validation: String,
    pub refocus_questions: Vec<String>,
}

/// Answer to "may we intervene again in this room today?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleStatus {
    pub should_throttle: bool,
    pub recent_count: u32,
    pub max_per_day: u32,
    pub last_intervention_time: Option<DateTime<Utc>>,
}
