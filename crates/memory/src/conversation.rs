//! Per-room conversation state.
//!
//! The store is an explicitly constructed value owned by the host: a map of
//! room id → `Arc<Mutex<ConversationState>>`. The outer `RwLock` is held only
//! long enough to find or create a room; all mutation happens under that
//! room's own mutex, so different rooms never contend.
//!
//! State lives for the lifetime of the process. Multiple processes each keep
//! their own independent copy.

use calmwire_core::message::Message;
use calmwire_core::state::{ConflictPatterns, InterventionMemo, PatternCounts, ThrottleStatus};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Rolling window for the intervention counter.
pub const INTERVENTION_WINDOW_HOURS: i64 = 24;

/// Default and maximum FIFO length per room.
pub const DEFAULT_HISTORY_CAP: usize = 30;

/// How many past interventions are remembered for anti-repetition.
pub const INTERVENTION_MEMO_CAP: usize = 2;

/// Helpful / not helpful counts for a room's interventions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackTally {
    pub helpful: u32,
    pub unhelpful: u32,
}

/// Everything remembered about one room.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub recent_messages: VecDeque<Message>,
    pub pattern_counts: PatternCounts,
    pub last_intervention_time: Option<DateTime<Utc>>,
    pub recent_intervention_count: u32,
    pub last_intervention_reset_time: DateTime<Utc>,
    pub last_comment_time: Option<DateTime<Utc>>,
    pub last_intervention: Option<InterventionMemo>,
    /// Most recent last, at most [`INTERVENTION_MEMO_CAP`]
    pub recent_interventions: VecDeque<InterventionMemo>,
    pub feedback: FeedbackTally,
    history_cap: usize,
}

impl ConversationState {
    pub fn new(now: DateTime<Utc>, history_cap: usize) -> Self {
        Self {
            recent_messages: VecDeque::with_capacity(history_cap),
            pattern_counts: PatternCounts::default(),
            last_intervention_time: None,
            recent_intervention_count: 0,
            last_intervention_reset_time: now,
            last_comment_time: None,
            last_intervention: None,
            recent_interventions: VecDeque::with_capacity(INTERVENTION_MEMO_CAP),
            feedback: FeedbackTally::default(),
            history_cap: history_cap.clamp(1, DEFAULT_HISTORY_CAP),
        }
    }

    /// Append to the FIFO, evicting the oldest beyond the cap.
    pub fn push_message(&mut self, message: Message) {
        while self.recent_messages.len() >= self.history_cap {
            self.recent_messages.pop_front();
        }
        self.recent_messages.push_back(message);
    }

    /// Zero the intervention counter once the window has fully elapsed.
    pub fn roll_window(&mut self, now: DateTime<Utc>) {
        if now - self.last_intervention_reset_time >= TimeDelta::hours(INTERVENTION_WINDOW_HOURS) {
            self.recent_intervention_count = 0;
            self.last_intervention_reset_time = now;
        }
    }

    pub fn record_patterns(&mut self, patterns: ConflictPatterns, now: DateTime<Utc>) {
        self.pattern_counts.record(patterns);
        self.roll_window(now);
    }

    pub fn record_intervention(&mut self, now: DateTime<Utc>, memo: Option<InterventionMemo>) {
        self.roll_window(now);
        self.last_intervention_time = Some(now);
        self.recent_intervention_count += 1;

        if let Some(memo) = memo {
            while self.recent_interventions.len() >= INTERVENTION_MEMO_CAP {
                self.recent_interventions.pop_front();
            }
            self.recent_interventions.push_back(memo.clone());
            self.last_intervention = Some(memo);
        }
    }

    /// Record an intervention only if the room is under `max_per_day`.
    /// The returned status says whether it was refused, and carries the
    /// count after recording.
    pub fn try_record_intervention(
        &mut self,
        now: DateTime<Utc>,
        max_per_day: u32,
        memo: Option<InterventionMemo>,
    ) -> ThrottleStatus {
        self.roll_window(now);
        let status = self.throttle(max_per_day);
        if status.should_throttle {
            return status;
        }
        self.record_intervention(now, memo);
        ThrottleStatus {
            should_throttle: false,
            ..self.throttle(max_per_day)
        }
    }

    pub fn throttle(&self, max_per_day: u32) -> ThrottleStatus {
        ThrottleStatus {
            should_throttle: self.recent_intervention_count >= max_per_day,
            recent_count: self.recent_intervention_count,
            max_per_day,
            last_intervention_time: self.last_intervention_time,
        }
    }

    /// Stamp a comment if none fired within `cooldown`; report whether it did.
    pub fn claim_comment_slot(&mut self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        let allowed = match self.last_comment_time {
            None => true,
            // A negative delta (clock went backwards) counts as "too soon"
            Some(last) => (now - last).to_std().is_ok_and(|elapsed| elapsed >= cooldown),
        };
        if allowed {
            self.last_comment_time = Some(now);
        }
        allowed
    }
}

/// The room → state map.
pub struct ConversationStore {
    rooms: RwLock<HashMap<String, Arc<Mutex<ConversationState>>>>,
    history_cap: usize,
}

impl ConversationStore {
    pub fn new(history_cap: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            history_cap: history_cap.clamp(1, DEFAULT_HISTORY_CAP),
        }
    }

    /// Get or lazily create the state for a room. Idempotent.
    pub async fn initialize(&self, room_id: &str) -> Arc<Mutex<ConversationState>> {
        if let Some(room) = self.rooms.read().await.get(room_id) {
            return Arc::clone(room);
        }

        let mut rooms = self.rooms.write().await;
        Arc::clone(rooms.entry(room_id.to_string()).or_insert_with(|| {
            debug!(room_id, "Initializing conversation state");
            Arc::new(Mutex::new(ConversationState::new(Utc::now(), self.history_cap)))
        }))
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// A copy of a room's state, if the room exists.
    pub async fn snapshot(&self, room_id: &str) -> Option<ConversationState> {
        let room = self.rooms.read().await.get(room_id).cloned()?;
        let state = room.lock().await;
        Some(state.clone())
    }

    pub async fn push_message(&self, message: Message) {
        let room = self.initialize(&message.room_id).await;
        room.lock().await.push_message(message);
    }

    pub async fn recent_messages(&self, room_id: &str) -> Vec<Message> {
        let room = self.initialize(room_id).await;
        let state = room.lock().await;
        state.recent_messages.iter().cloned().collect()
    }

    pub async fn recent_interventions(&self, room_id: &str) -> Vec<InterventionMemo> {
        let room = self.initialize(room_id).await;
        let state = room.lock().await;
        state.recent_interventions.iter().cloned().collect()
    }

    pub async fn update_pattern_counts(&self, room_id: &str, patterns: ConflictPatterns) {
        self.update_pattern_counts_at(room_id, patterns, Utc::now()).await;
    }

    pub async fn update_pattern_counts_at(
        &self,
        room_id: &str,
        patterns: ConflictPatterns,
        now: DateTime<Utc>,
    ) {
        let room = self.initialize(room_id).await;
        room.lock().await.record_patterns(patterns, now);
    }

    pub async fn record_intervention(&self, room_id: &str, memo: Option<InterventionMemo>) {
        self.record_intervention_at(room_id, memo, Utc::now()).await;
    }

    pub async fn record_intervention_at(
        &self,
        room_id: &str,
        memo: Option<InterventionMemo>,
        now: DateTime<Utc>,
    ) {
        let room = self.initialize(room_id).await;
        room.lock().await.record_intervention(now, memo);
    }

    pub async fn try_record_intervention(
        &self,
        room_id: &str,
        max_per_day: u32,
        memo: Option<InterventionMemo>,
    ) -> ThrottleStatus {
        self.try_record_intervention_at(room_id, max_per_day, memo, Utc::now())
            .await
    }

    /// Throttle check and counter increment under one room lock, so
    /// concurrent interventions cannot overshoot the cap.
    pub async fn try_record_intervention_at(
        &self,
        room_id: &str,
        max_per_day: u32,
        memo: Option<InterventionMemo>,
        now: DateTime<Utc>,
    ) -> ThrottleStatus {
        let room = self.initialize(room_id).await;
        room.lock()
            .await
            .try_record_intervention(now, max_per_day, memo)
    }

    pub async fn throttle(&self, room_id: &str, max_per_day: u32) -> ThrottleStatus {
        self.throttle_at(room_id, max_per_day, Utc::now()).await
    }

    pub async fn throttle_at(
        &self,
        room_id: &str,
        max_per_day: u32,
        now: DateTime<Utc>,
    ) -> ThrottleStatus {
        let room = self.initialize(room_id).await;
        let mut state = room.lock().await;
        state.roll_window(now);
        state.throttle(max_per_day)
    }

    pub async fn claim_comment_slot(&self, room_id: &str, cooldown: Duration) -> bool {
        self.claim_comment_slot_at(room_id, cooldown, Utc::now()).await
    }

    pub async fn claim_comment_slot_at(
        &self,
        room_id: &str,
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        let room = self.initialize(room_id).await;
        room.lock().await.claim_comment_slot(now, cooldown)
    }

    /// Tally feedback; returns false when the room never had an intervention.
    pub async fn record_feedback(&self, room_id: &str, helpful: bool) -> bool {
        let room = self.initialize(room_id).await;
        let mut state = room.lock().await;
        if state.last_intervention_time.is_none() {
            return false;
        }
        if helpful {
            state.feedback.helpful += 1;
        } else {
            state.feedback.unhelpful += 1;
        }
        true
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memo(text: &str) -> InterventionMemo {
        InterventionMemo {
            validation: text.into(),
            refocus_questions: vec![],
        }
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let store = ConversationStore::default();
        let a = store.initialize("room-1").await;
        let b = store.initialize("room-1").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.room_count().await, 1);
    }

    #[tokio::test]
    async fn fresh_room_has_clean_state() {
        let store = ConversationStore::default();
        store.initialize("room-1").await;
        let state = store.snapshot("room-1").await.unwrap();
        assert_eq!(state.pattern_counts, PatternCounts::default());
        assert!(state.last_intervention_time.is_none());
        assert_eq!(state.recent_intervention_count, 0);
        assert!(state.last_intervention.is_none());
        assert!(store.snapshot("other").await.is_none());
    }

    #[tokio::test]
    async fn history_is_fifo_capped_at_thirty() {
        let store = ConversationStore::new(100);
        for i in 0..35 {
            store
                .push_message(Message::new("room-1", "alice", format!("msg {i}")))
                .await;
        }
        let history = store.recent_messages("room-1").await;
        assert_eq!(history.len(), 30);
        assert_eq!(history[0].text, "msg 5");
        assert_eq!(history[29].text, "msg 34");
    }

    #[tokio::test]
    async fn pattern_counts_accumulate() {
        let store = ConversationStore::default();
        let accusatory = ConflictPatterns {
            accusatory: true,
            triangulation: false,
        };
        store.update_pattern_counts("room-1", accusatory).await;
        store.update_pattern_counts("room-1", accusatory).await;
        let state = store.snapshot("room-1").await.unwrap();
        assert_eq!(state.pattern_counts.accusatory, 2);
        assert_eq!(state.pattern_counts.triangulation, 0);
    }

    #[tokio::test]
    async fn throttle_engages_at_ten_and_resets_after_window() {
        let store = ConversationStore::default();
        let start = Utc::now();
        store.initialize("room-1").await;

        for i in 0..10 {
            store
                .record_intervention_at("room-1", None, start + TimeDelta::minutes(i))
                .await;
        }
        let status = store.throttle_at("room-1", 10, start + TimeDelta::hours(1)).await;
        assert!(status.should_throttle);
        assert_eq!(status.recent_count, 10);

        let later = start + TimeDelta::hours(25);
        store.record_intervention_at("room-1", None, later).await;
        let status = store.throttle_at("room-1", 10, later).await;
        assert_eq!(status.recent_count, 1);
        assert!(!status.should_throttle);
        assert_eq!(status.last_intervention_time, Some(later));
    }

    #[tokio::test]
    async fn try_record_refuses_at_the_cap() {
        let store = ConversationStore::default();
        let now = Utc::now();
        for _ in 0..9 {
            store.record_intervention_at("room-1", None, now).await;
        }

        let status = store.try_record_intervention_at("room-1", 10, None, now).await;
        assert!(!status.should_throttle);
        assert_eq!(status.recent_count, 10);

        let status = store.try_record_intervention_at("room-1", 10, None, now).await;
        assert!(status.should_throttle);
        assert_eq!(status.recent_count, 10);
    }

    #[tokio::test]
    async fn concurrent_try_record_never_exceeds_the_cap() {
        let store = Arc::new(ConversationStore::default());
        let now = Utc::now();
        for _ in 0..9 {
            store.record_intervention_at("room-1", None, now).await;
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.try_record_intervention_at("room-1", 10, None, now).await
                })
            })
            .collect();
        let mut admitted = 0;
        for handle in handles {
            if !handle.await.unwrap().should_throttle {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
        let status = store.throttle_at("room-1", 10, now).await;
        assert_eq!(status.recent_count, 10);
    }

    #[tokio::test]
    async fn count_does_not_reset_before_window_elapses() {
        let store = ConversationStore::default();
        let start = Utc::now();
        store.initialize("room-1").await;
        store.record_intervention_at("room-1", None, start).await;
        store
            .record_intervention_at("room-1", None, start + TimeDelta::hours(23))
            .await;
        let status = store
            .throttle_at("room-1", 10, start + TimeDelta::hours(23))
            .await;
        assert_eq!(status.recent_count, 2);
    }

    #[tokio::test]
    async fn only_two_intervention_memos_kept() {
        let store = ConversationStore::default();
        for text in ["first", "second", "third"] {
            store.record_intervention("room-1", Some(memo(text))).await;
        }
        let memos = store.recent_interventions("room-1").await;
        assert_eq!(memos, vec![memo("second"), memo("third")]);
        let state = store.snapshot("room-1").await.unwrap();
        assert_eq!(state.last_intervention, Some(memo("third")));
    }

    #[tokio::test]
    async fn comment_slot_respects_cooldown() {
        let store = ConversationStore::default();
        let now = Utc::now();
        let cooldown = Duration::from_secs(60);

        assert!(store.claim_comment_slot_at("room-1", cooldown, now).await);
        assert!(
            !store
                .claim_comment_slot_at("room-1", cooldown, now + TimeDelta::seconds(30))
                .await
        );
        assert!(
            store
                .claim_comment_slot_at("room-1", cooldown, now + TimeDelta::seconds(61))
                .await
        );
        // Rooms are independent
        assert!(
            store
                .claim_comment_slot_at("room-2", cooldown, now + TimeDelta::seconds(62))
                .await
        );
    }

    #[tokio::test]
    async fn feedback_requires_prior_intervention() {
        let store = ConversationStore::default();
        assert!(!store.record_feedback("room-1", true).await);

        store.record_intervention("room-1", Some(memo("v"))).await;
        assert!(store.record_feedback("room-1", true).await);
        assert!(store.record_feedback("room-1", false).await);
        let state = store.snapshot("room-1").await.unwrap();
        assert_eq!(
            state.feedback,
            FeedbackTally {
                helpful: 1,
                unhelpful: 1
            }
        );
    }
}
