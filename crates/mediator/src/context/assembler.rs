//! Context assembly — everything the prompt needs to know about a message
//! beyond its text.
//!
//! Three kinds of input are combined:
//!
//! 1. **Roster and history** (display names, recent turns, relationships)
//!    — already in hand, formatted synchronously
//! 2. **Profiles and situation** — fetched concurrently from optional
//!    providers; a failed lookup is logged and skipped
//! 3. **Deeper understanding** — a slow optional enrichment started first,
//!    bounded by an outer budget, and waited on only briefly once
//!    everything else is ready
//!
//! Correctness never depends on step 3. The assembled bundle is plain data;
//! turning it into text is the prompt composer's job.

use calmwire_analysis::{UserIntent, infer_intent};
use calmwire_core::context::{
    EnrichmentInput, Enricher, Profile, ProfileProvider, SituationProvider, SituationalHints,
    Understanding,
};
use calmwire_core::error::{ContextError, EnrichmentError};
use calmwire_core::message::{Message, RoomRoster};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default number of history turns rendered into the prompt.
pub const DEFAULT_PROMPT_HISTORY: usize = 15;

/// Everything assembled for one message.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub sender_name: String,
    pub receiver_name: String,
    /// "Name: text" lines, oldest first
    pub history: Vec<String>,
    pub relationship_context: Option<String>,
    pub task_context: Option<String>,
    pub situational_context: Option<String>,
    pub flagged_messages: Vec<String>,
    pub sender_profile: Option<Profile>,
    pub receiver_profile: Option<Profile>,
    pub intent: UserIntent,
    pub understanding: Option<Understanding>,
}

/// Borrowed inputs for [`ContextAssembler::build`].
pub struct AssemblyInput<'a> {
    pub message: &'a Message,
    pub receiver_id: &'a str,
    pub history: &'a [Message],
    pub roster: &'a RoomRoster,
    pub hints: &'a SituationalHints,
}

pub struct ContextAssembler {
    profiles: Option<Arc<dyn ProfileProvider>>,
    situation: Option<Arc<dyn SituationProvider>>,
    enricher: Option<Arc<dyn Enricher>>,
    enrichment_budget: Duration,
    enrichment_wait: Duration,
    prompt_history: usize,
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self {
            profiles: None,
            situation: None,
            enricher: None,
            enrichment_budget: Duration::from_millis(3000),
            enrichment_wait: Duration::from_millis(500),
            prompt_history: DEFAULT_PROMPT_HISTORY,
        }
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileProvider>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_situation(mut self, situation: Arc<dyn SituationProvider>) -> Self {
        self.situation = Some(situation);
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Outer budget for the enrichment task and the shorter in-flow wait.
    pub fn with_enrichment_budgets(mut self, budget: Duration, wait: Duration) -> Self {
        self.enrichment_budget = budget;
        self.enrichment_wait = wait.min(budget);
        self
    }

    pub fn with_prompt_history(mut self, turns: usize) -> Self {
        self.prompt_history = turns;
        self
    }

    pub async fn build(&self, input: AssemblyInput<'_>) -> ContextBundle {
        let message = input.message;
        let roster = input.roster;
        let sender_id = message.sender_id.as_str();

        let history = format_history(input.history, message, roster, self.prompt_history);
        let relationship_context = relationship_context(roster, input.hints);

        // Start the slow step first so it overlaps the lookups below
        let enrichment = self.enricher.as_ref().map(|enricher| {
            let enrichment_input = EnrichmentInput {
                text: message.text.clone(),
                sender_name: roster.display_name(sender_id),
                receiver_name: roster.display_name(input.receiver_id),
                history: history.clone(),
                relationship_context: relationship_context.clone(),
            };
            spawn_enrichment(Arc::clone(enricher), enrichment_input, self.enrichment_budget)
        });

        let (sender_profile, receiver_profile, situation) = tokio::join!(
            self.fetch_profile(sender_id),
            self.fetch_profile(input.receiver_id),
            self.fetch_situation(&message.room_id, sender_id, input.receiver_id),
        );

        let understanding = match enrichment {
            Some(handle) => self.await_enrichment(handle, &message.room_id).await,
            None => None,
        };

        let sender_name = display_name(roster, sender_id, sender_profile.as_ref());
        let receiver_name = display_name(roster, input.receiver_id, receiver_profile.as_ref());

        ContextBundle {
            sender_name,
            receiver_name,
            history,
            relationship_context,
            task_context: non_empty(input.hints.task_context.clone()),
            situational_context: situation,
            flagged_messages: input.hints.flagged_messages.clone(),
            sender_profile: sender_profile.filter(|p| !p.is_empty()),
            receiver_profile: receiver_profile.filter(|p| !p.is_empty()),
            intent: infer_intent(&message.text),
            understanding,
        }
    }

    async fn fetch_profile(&self, identity: &str) -> Option<Profile> {
        let provider = self.profiles.as_ref()?;
        log_lookup(provider.profile(identity).await, "profile")
    }

    async fn fetch_situation(&self, room_id: &str, sender_id: &str, receiver_id: &str) -> Option<String> {
        let provider = self.situation.as_ref()?;
        log_lookup(provider.situation(room_id, sender_id, receiver_id).await, "situation")
            .and_then(|s| non_empty(Some(s)))
    }

    /// Give a running enrichment at most `enrichment_wait` more; abandon it
    /// otherwise.
    async fn await_enrichment(
        &self,
        mut handle: JoinHandle<Result<Understanding, EnrichmentError>>,
        room_id: &str,
    ) -> Option<Understanding> {
        match tokio::time::timeout(self.enrichment_wait, &mut handle).await {
            Ok(Ok(Ok(understanding))) => {
                debug!(room_id, "Enrichment available");
                Some(understanding)
            }
            Ok(Ok(Err(e))) => {
                warn!(room_id, error = %e, "Enrichment failed, continuing without it");
                None
            }
            Ok(Err(e)) => {
                warn!(room_id, error = %e, "Enrichment task aborted");
                None
            }
            Err(_) => {
                handle.abort();
                warn!(
                    room_id,
                    wait_ms = self.enrichment_wait.as_millis() as u64,
                    "Enrichment not ready, continuing without it"
                );
                None
            }
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_enrichment(
    enricher: Arc<dyn Enricher>,
    input: EnrichmentInput,
    budget: Duration,
) -> JoinHandle<Result<Understanding, EnrichmentError>> {
    tokio::spawn(async move {
        match tokio::time::timeout(budget, enricher.understand(&input)).await {
            Ok(result) => result,
            Err(_) => Err(EnrichmentError::Timeout {
                timeout_ms: budget.as_millis() as u64,
            }),
        }
    })
}

fn log_lookup<T>(result: Result<Option<T>, ContextError>, source: &str) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(source, error = %e, "Context lookup failed, continuing without it");
            None
        }
    }
}

fn display_name(roster: &RoomRoster, id: &str, profile: Option<&Profile>) -> String {
    profile
        .and_then(|p| p.display_name.clone())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| roster.display_name(id))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// The last `limit` turns before the current message, as "Name: text".
fn format_history(
    history: &[Message],
    current: &Message,
    roster: &RoomRoster,
    limit: usize,
) -> Vec<String> {
    let earlier: Vec<&Message> = history.iter().filter(|m| m.id != current.id).collect();
    let skip = earlier.len().saturating_sub(limit);
    earlier
        .into_iter()
        .skip(skip)
        .map(|m| format!("{}: {}", roster.display_name(&m.sender_id), m.text.trim()))
        .collect()
}

fn relationship_context(roster: &RoomRoster, hints: &SituationalHints) -> Option<String> {
    let mut lines = Vec::new();

    for contact in &roster.contacts {
        let mut line = format!("{} ({})", contact.name, contact.relationship);
        if let Some(notes) = contact.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            line.push_str(&format!(": {}", notes.trim()));
        }
        lines.push(line);
    }
    if let Some(role) = hints.sender_role.as_deref() {
        lines.push(format!("Sender role: {role}"));
    }
    if let Some(role) = hints.receiver_role.as_deref() {
        lines.push(format!("Receiver role: {role}"));
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SlowEnricher, StaticProfiles};
    use calmwire_core::message::{Contact, Participant};

    fn roster() -> RoomRoster {
        RoomRoster::new(vec![
            Participant::new("alex").with_display_name("Alex"),
            Participant::new("sam").with_display_name("Sam"),
        ])
        .with_contacts(vec![Contact {
            name: "Mia".into(),
            relationship: "child".into(),
            notes: Some("age 7".into()),
        }])
    }

    #[test]
    fn history_excludes_current_and_respects_limit() {
        let current = Message::new("room", "alex", "Where are you?");
        let mut history: Vec<Message> = (0..5)
            .map(|i| Message::new("room", if i % 2 == 0 { "alex" } else { "sam" }, format!("msg {i}")))
            .collect();
        history.push(current.clone());

        let lines = format_history(&history, &current, &roster(), 3);
        assert_eq!(lines, vec!["Alex: msg 2", "Sam: msg 3", "Alex: msg 4"]);
    }

    #[tokio::test]
    async fn builds_without_any_providers() {
        let assembler = ContextAssembler::new();
        let message = Message::new("room", "alex", "Can you do pickup at 5pm?");
        let hints = SituationalHints::default();
        let roster = roster();
        let bundle = assembler
            .build(AssemblyInput {
                message: &message,
                receiver_id: "sam",
                history: &[],
                roster: &roster,
                hints: &hints,
            })
            .await;

        assert_eq!(bundle.sender_name, "Alex");
        assert_eq!(bundle.receiver_name, "Sam");
        assert_eq!(bundle.relationship_context.as_deref(), Some("Mia (child): age 7"));
        assert!(bundle.understanding.is_none());
        assert!(bundle.sender_profile.is_none());
        assert_eq!(bundle.intent.specific_detail.as_deref(), Some("5pm"));
    }

    #[tokio::test]
    async fn profile_display_name_overrides_roster() {
        let profiles = StaticProfiles::new().with(
            "sam",
            Profile {
                display_name: Some("Samantha".into()),
                communication_style: Some("direct".into()),
                ..Default::default()
            },
        );
        let assembler = ContextAssembler::new().with_profiles(Arc::new(profiles));
        let message = Message::new("room", "alex", "hello there friend");
        let hints = SituationalHints::default();
        let roster = roster();
        let bundle = assembler
            .build(AssemblyInput {
                message: &message,
                receiver_id: "sam",
                history: &[],
                roster: &roster,
                hints: &hints,
            })
            .await;

        assert_eq!(bundle.receiver_name, "Samantha");
        assert!(bundle.receiver_profile.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn fast_enrichment_is_used() {
        let enricher = SlowEnricher::new(Duration::from_millis(100));
        let assembler = ContextAssembler::new().with_enricher(Arc::new(enricher));
        let message = Message::new("room", "alex", "You never listen");
        let hints = SituationalHints::default();
        let roster = roster();
        let bundle = assembler
            .build(AssemblyInput {
                message: &message,
                receiver_id: "sam",
                history: &[],
                roster: &roster,
                hints: &hints,
            })
            .await;

        assert!(bundle.understanding.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_enrichment_is_abandoned_after_wait() {
        let enricher = SlowEnricher::new(Duration::from_secs(10));
        let assembler = ContextAssembler::new()
            .with_enricher(Arc::new(enricher))
            .with_enrichment_budgets(Duration::from_secs(3), Duration::from_millis(500));
        let message = Message::new("room", "alex", "You never listen");
        let hints = SituationalHints::default();
        let roster = roster();

        let started = tokio::time::Instant::now();
        let bundle = assembler
            .build(AssemblyInput {
                message: &message,
                receiver_id: "sam",
                history: &[],
                roster: &roster,
                hints: &hints,
            })
            .await;

        assert!(bundle.understanding.is_none());
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
