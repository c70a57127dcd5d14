//! In-memory learning sink — keeps recorded events for later export or
//! inspection.

use async_trait::async_trait;
use calmwire_core::error::LearningError;
use calmwire_core::learning::{LearningEvent, LearningSink};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Bounded event log. Oldest events are dropped once `max_events` is hit.
pub struct InMemoryLearningLog {
    events: Arc<RwLock<Vec<LearningEvent>>>,
    max_events: usize,
}

impl InMemoryLearningLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            max_events: max_events.max(1),
        }
    }

    pub async fn events(&self) -> Vec<LearningEvent> {
        self.events.read().await.clone()
    }

    /// Remove and return everything recorded so far.
    pub async fn drain(&self) -> Vec<LearningEvent> {
        std::mem::take(&mut *self.events.write().await)
    }
}

impl Default for InMemoryLearningLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl LearningSink for InMemoryLearningLog {
    async fn record(&self, event: LearningEvent) -> Result<(), LearningError> {
        let mut events = self.events.write().await;
        if events.len() >= self.max_events {
            let excess = events.len() + 1 - self.max_events;
            events.drain(..excess);
        }
        events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn feedback(room: &str) -> LearningEvent {
        LearningEvent::InterventionFeedback {
            room_id: room.into(),
            helpful: true,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn records_and_drains() {
        let log = InMemoryLearningLog::default();
        log.record(feedback("a")).await.unwrap();
        log.record(feedback("b")).await.unwrap();
        assert_eq!(log.events().await.len(), 2);
        assert_eq!(log.drain().await.len(), 2);
        assert!(log.events().await.is_empty());
    }

    #[tokio::test]
    async fn oldest_events_dropped_at_capacity() {
        let log = InMemoryLearningLog::new(2);
        for room in ["a", "b", "c"] {
            log.record(feedback(room)).await.unwrap();
        }
        let rooms: Vec<String> = log
            .events()
            .await
            .into_iter()
            .map(|e| match e {
                LearningEvent::InterventionFeedback { room_id, .. } => room_id,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(rooms, vec!["b".to_string(), "c".to_string()]);
    }
}
