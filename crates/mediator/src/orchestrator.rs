//! The mediation pipeline.
//!
//! Per message, in order:
//!
//! 1. Cache lookup — a hit returns immediately
//! 2. Pattern pre-filter — a skip returns `Allow` (not cached)
//! 3. Structural detector under a hard deadline — a quick-pass returns
//!    `Allow` (not cached)
//! 4. Conflict-pattern counters
//! 5. Context assembly, with optional enrichment inside its budget
//! 6. Prompt composition
//! 7. Inference
//! 8. Interpretation, room bookkeeping and a detached cache write
//! 9. On inference failure, the error policy decides: a typed retryable
//!    error, or `Allow`
//!
//! Only step 9 can produce an error. Every other fault is logged and the
//! pipeline continues in a degraded form.

use calmwire_analysis::{RuleDetector, classify, detect_conflict_patterns};
use calmwire_config::MediatorConfig;
use calmwire_core::analysis::{AnalysisResult, Detector, DetectorContext, DetectorReport};
use calmwire_core::cache::{CacheKey, ResponseCache};
use calmwire_core::context::{Enricher, ProfileProvider, SituationProvider, SituationalHints};
use calmwire_core::error::{DetectorError, InferenceError, MediationError};
use calmwire_core::inference::{InferenceClient, InferenceRequest};
use calmwire_core::learning::{AcceptedRewrite, LearningEvent, LearningSink, LogLearningSink};
use calmwire_core::message::{Message, RoomRoster};
use calmwire_core::state::ThrottleStatus;
use calmwire_memory::{ConversationStore, InMemoryCache, NoopCache};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::context::{AssemblyInput, ContextAssembler};
use crate::enrichment::ModelEnricher;
use crate::error_policy;
use crate::interpreter::ResponseInterpreter;
use crate::prompt::{PromptComposer, PromptInput};

/// One message to analyze, with what the host knows about its room.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub message: Message,
    /// Recent room history, oldest first. Empty means "use what the
    /// mediator has recorded for this room".
    pub history: Vec<Message>,
    pub roster: RoomRoster,
    pub hints: SituationalHints,
}

impl AnalysisRequest {
    pub fn new(message: Message, roster: RoomRoster) -> Self {
        Self {
            message,
            history: Vec::new(),
            roster,
            hints: SituationalHints::default(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_hints(mut self, hints: SituationalHints) -> Self {
        self.hints = hints;
        self
    }
}

/// The orchestrator. `Send + Sync`; share it behind an `Arc`.
pub struct Mediator {
    client: Arc<dyn InferenceClient>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    cache: Arc<dyn ResponseCache>,
    store: Arc<ConversationStore>,
    detector: Option<Arc<dyn Detector>>,
    detector_deadline: Duration,
    assembler: ContextAssembler,
    composer: PromptComposer,
    max_interventions_per_day: u32,
    comment_cooldown: Duration,
    learning: Arc<dyn LearningSink>,
}

impl Mediator {
    /// A mediator with an in-memory cache and store, no detector and no
    /// enrichment.
    pub fn new(client: Arc<dyn InferenceClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 1500,
            temperature: 0.3,
            cache: Arc::new(InMemoryCache::default()),
            store: Arc::new(ConversationStore::default()),
            detector: None,
            detector_deadline: Duration::from_millis(500),
            assembler: ContextAssembler::new(),
            composer: PromptComposer::new(),
            max_interventions_per_day: 10,
            comment_cooldown: Duration::from_secs(60),
            learning: Arc::new(LogLearningSink),
        }
    }

    /// Wire a mediator from configuration around an existing client.
    pub fn from_config(config: &MediatorConfig, client: Arc<dyn InferenceClient>) -> Self {
        let cache: Arc<dyn ResponseCache> = if config.cache.enabled {
            Arc::new(InMemoryCache::new(config.cache.capacity).with_ttl(config.cache.ttl()))
        } else {
            Arc::new(NoopCache)
        };

        let mut assembler = ContextAssembler::new()
            .with_enrichment_budgets(
                config.budgets.enrichment_budget(),
                config.budgets.enrichment_wait(),
            )
            .with_prompt_history(config.history.prompt_history_messages);
        if config.features.enrichment {
            let enricher = ModelEnricher::new(Arc::clone(&client), &config.inference.model);
            assembler = assembler.with_enricher(Arc::new(enricher));
        }

        let mut mediator = Self::new(client, &config.inference.model)
            .with_max_tokens(config.inference.max_tokens)
            .with_temperature(config.inference.temperature)
            .with_cache(cache)
            .with_store(Arc::new(ConversationStore::new(config.history.room_history_cap)))
            .with_detector_deadline(config.budgets.detector_deadline())
            .with_throttle(
                config.throttle.max_interventions_per_day,
                config.throttle.comment_cooldown(),
            );
        mediator.assembler = assembler;

        if config.features.detector {
            mediator = mediator.with_detector(Arc::new(RuleDetector::new()));
        }
        mediator
    }

    /// Build the configured inference client and wire everything around it.
    pub fn connect(config: &MediatorConfig) -> Result<Self, InferenceError> {
        let client = calmwire_providers::build_from_config(&config.inference)?;
        Ok(Self::from_config(config, client))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_store(mut self, store: Arc<ConversationStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_detector_deadline(mut self, deadline: Duration) -> Self {
        self.detector_deadline = deadline;
        self
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileProvider>) -> Self {
        self.assembler = self.assembler.with_profiles(profiles);
        self
    }

    pub fn with_situation(mut self, situation: Arc<dyn SituationProvider>) -> Self {
        self.assembler = self.assembler.with_situation(situation);
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.assembler = self.assembler.with_enricher(enricher);
        self
    }

    pub fn with_enrichment_budgets(mut self, budget: Duration, wait: Duration) -> Self {
        self.assembler = self.assembler.with_enrichment_budgets(budget, wait);
        self
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_throttle(mut self, max_interventions_per_day: u32, comment_cooldown: Duration) -> Self {
        self.max_interventions_per_day = max_interventions_per_day;
        self.comment_cooldown = comment_cooldown;
        self
    }

    pub fn with_learning_sink(mut self, sink: Arc<dyn LearningSink>) -> Self {
        self.learning = sink;
        self
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn client(&self) -> &Arc<dyn InferenceClient> {
        &self.client
    }

    /// Analyze one message.
    ///
    /// Returns an error only for retryable inference failures (rate limit,
    /// network, 5xx). Every other fault yields a well-formed result,
    /// `Allow` by default.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, MediationError> {
        let started = Instant::now();
        let message = &request.message;
        let room_id = message.room_id.as_str();
        let sender_id = message.sender_id.as_str();
        let receiver_id = request.roster.receiver_for(sender_id);
        let key = CacheKey::compute(&message.text, sender_id, &receiver_id);

        // 1. Cache
        match self.cache.get(&key).await {
            Ok(Some(result)) => {
                debug!(
                    room_id,
                    key = %key,
                    kind = result.kind(),
                    elapsed_ms = elapsed_ms(started),
                    "Cache hit"
                );
                // The key carries no room, so cooldown and cap are re-applied here
                return Ok(self.interpreter().apply_room_rules(result, message).await);
            }
            Ok(None) => {}
            Err(e) => warn!(room_id, error = %e, "Cache lookup failed, continuing"),
        }

        // 2. Pre-filter
        let verdict = classify(&message.text);
        if let Some(reason) = verdict.reason.filter(|_| verdict.should_skip) {
            debug!(
                room_id,
                reason = reason.as_str(),
                elapsed_ms = elapsed_ms(started),
                "Pre-filter skip"
            );
            return Ok(AnalysisResult::Allow);
        }

        // 3. Detector
        let detector_context = DetectorContext {
            child_names: request.roster.child_names(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.clone(),
        };
        let report = self.run_detector(&message.text, &detector_context, room_id).await;
        if report.as_ref().is_some_and(|r| r.quick_pass) {
            debug!(room_id, elapsed_ms = elapsed_ms(started), "Quick-pass");
            return Ok(AnalysisResult::Allow);
        }

        // 4. Conflict counters
        self.store
            .update_pattern_counts(room_id, detect_conflict_patterns(&message.text))
            .await;

        // 5. Context
        let history = if request.history.is_empty() {
            self.store.recent_messages(room_id).await
        } else {
            request.history.clone()
        };
        let context = self
            .assembler
            .build(AssemblyInput {
                message,
                receiver_id: &receiver_id,
                history: &history,
                roster: &request.roster,
                hints: &request.hints,
            })
            .await;

        // 6. Prompt
        let recent_interventions = self.store.recent_interventions(room_id).await;
        let findings = report.map(|r| r.findings).unwrap_or_default();
        let prompt = self.composer.compose(&PromptInput {
            text: &message.text,
            context: &context,
            findings: &findings,
            recent_interventions: &recent_interventions,
        });

        // 7. Inference
        debug!(
            room_id,
            sender_id,
            text_len = message.text.len(),
            findings = findings.len(),
            "Requesting inference"
        );
        let response = self
            .client
            .complete(InferenceRequest {
                model: self.model.clone(),
                system: prompt.system,
                user: prompt.user,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            })
            .await;

        match response {
            // 8. Interpret, record, cache
            Ok(response) => {
                let result = self.interpreter().interpret(&response.text, message).await;
                self.write_through(key, result.clone());
                info!(
                    room_id,
                    result = result.kind(),
                    elapsed_ms = elapsed_ms(started),
                    "Message analyzed"
                );
                Ok(result)
            }
            // 9. Error policy
            Err(e) => {
                let category = error_policy::classify(&e);
                match error_policy::to_mediation_error(&e) {
                    Some(surfaced) => {
                        warn!(
                            room_id,
                            category = %category,
                            code = surfaced.code(),
                            error = %e,
                            elapsed_ms = elapsed_ms(started),
                            "Retryable inference failure"
                        );
                        Err(surfaced)
                    }
                    None => {
                        warn!(
                            room_id,
                            category = %category,
                            error = %e,
                            elapsed_ms = elapsed_ms(started),
                            "Inference failed, allowing message unmediated"
                        );
                        Ok(AnalysisResult::Allow)
                    }
                }
            }
        }
    }

    /// Append a delivered message to its room's history.
    pub async fn record_delivered(&self, message: Message) {
        self.store.push_message(message).await;
    }

    pub async fn throttle_status(&self, room_id: &str) -> ThrottleStatus {
        self.store
            .throttle(room_id, self.max_interventions_per_day)
            .await
    }

    /// Record whether the room's last intervention helped.
    pub async fn record_intervention_feedback(&self, room_id: &str, helpful: bool) {
        if !self.store.record_feedback(room_id, helpful).await {
            debug!(room_id, "Feedback for a room without interventions");
        }
        let event = LearningEvent::InterventionFeedback {
            room_id: room_id.to_string(),
            helpful,
            at: Utc::now(),
        };
        if let Err(e) = self.learning.record(event).await {
            warn!(room_id, error = %e, "Failed to record intervention feedback");
        }
    }

    /// Record a rewrite the sender chose to send. Returns false if the
    /// learning sink refused it.
    pub async fn record_accepted_rewrite(&self, sender_id: &str, rewrite: AcceptedRewrite) -> bool {
        let event = LearningEvent::AcceptedRewrite {
            sender_id: sender_id.to_string(),
            rewrite,
            at: Utc::now(),
        };
        match self.learning.record(event).await {
            Ok(()) => true,
            Err(e) => {
                warn!(sender_id, error = %e, "Failed to record accepted rewrite");
                false
            }
        }
    }

    async fn run_detector(
        &self,
        text: &str,
        context: &DetectorContext,
        room_id: &str,
    ) -> Option<DetectorReport> {
        let detector = self.detector.as_ref()?;
        let outcome = tokio::time::timeout(self.detector_deadline, detector.analyze(text, context))
            .await
            .unwrap_or_else(|_| {
                Err(DetectorError::Timeout {
                    timeout_ms: self.detector_deadline.as_millis() as u64,
                })
            });
        match outcome {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(room_id, detector = detector.name(), error = %e, "Detector unavailable, continuing without it");
                None
            }
        }
    }

    fn interpreter(&self) -> ResponseInterpreter {
        ResponseInterpreter::new(
            Arc::clone(&self.store),
            self.max_interventions_per_day,
            self.comment_cooldown,
        )
    }

    /// Detached cache write; failures only reach the log.
    fn write_through(&self, key: CacheKey, result: AnalysisResult) {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            if let Err(e) = cache.set(key, result).await {
                warn!(error = %e, "Cache write failed");
            }
        });
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
