//! Learning sink — where feedback and accepted rewrites are recorded for an
//! external learning subsystem.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::LearningError;

/// A rewrite the sender chose to send instead of their original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedRewrite {
    pub original: String,
    pub rewrite: String,

    /// Which pattern the rewrite addressed (axiom id or free label)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// A single recorded learning event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LearningEvent {
    InterventionFeedback {
        room_id: String,
        helpful: bool,
        at: DateTime<Utc>,
    },
    AcceptedRewrite {
        sender_id: String,
        rewrite: AcceptedRewrite,
        at: DateTime<Utc>,
    },
}

#[async_trait]
pub trait LearningSink: Send + Sync {
    async fn record(&self, event: LearningEvent) -> Result<(), LearningError>;
}

/// Default sink: writes events to the tracing log and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLearningSink;

#[async_trait]
impl LearningSink for LogLearningSink {
    async fn record(&self, event: LearningEvent) -> Result<(), LearningError> {
        match &event {
            LearningEvent::InterventionFeedback { room_id, helpful, .. } => {
                tracing::info!(room_id = %room_id, helpful, "Intervention feedback recorded");
            }
            LearningEvent::AcceptedRewrite {
                sender_id, rewrite, ..
            } => {
                tracing::info!(
                    sender_id = %sender_id,
                    pattern = rewrite.pattern.as_deref().unwrap_or("unspecified"),
                    "Accepted rewrite recorded"
                );
            }
        }
        Ok(())
    }
}
