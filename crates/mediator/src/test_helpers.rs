//! Scripted collaborators for exercising the pipeline without a network.
//!
//! Compiled only for unit tests and behind the `test-helpers` feature,
//! which the integration tests under `tests/` enable.

use async_trait::async_trait;
use calmwire_core::analysis::{Detector, DetectorContext, DetectorReport};
use calmwire_core::context::{EnrichmentInput, Enricher, Profile, ProfileProvider, Understanding};
use calmwire_core::error::{ContextError, DetectorError, EnrichmentError, InferenceError};
use calmwire_core::inference::{InferenceClient, InferenceRequest, InferenceResponse, Usage};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Returns scripted texts in order; once exhausted, keeps returning the
/// last one.
pub struct ScriptedInference {
    responses: Vec<String>,
    call_count: AtomicUsize,
    last_request: Mutex<Option<InferenceRequest>>,
}

impl ScriptedInference {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn single(text: impl Into<String>) -> Self {
        Self::new(vec![text.into()])
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<InferenceRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let text = self
            .responses
            .get(n)
            .or_else(|| self.responses.last())
            .cloned()
            .ok_or_else(|| InferenceError::InvalidResponse("no scripted responses".into()))?;

        Ok(InferenceResponse {
            text,
            model: request.model,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }
}

/// Fails every call with the same error.
pub struct FailingInference {
    error: InferenceError,
    call_count: AtomicUsize,
}

impl FailingInference {
    pub fn new(error: InferenceError) -> Self {
        Self {
            error,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for FailingInference {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Never answers.
#[derive(Default)]
pub struct HangingInference;

#[async_trait]
impl InferenceClient for HangingInference {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        std::future::pending().await
    }
}

/// Returns a fixed report.
pub struct FixedDetector {
    report: DetectorReport,
}

impl FixedDetector {
    pub fn new(report: DetectorReport) -> Self {
        Self { report }
    }
}

#[async_trait]
impl Detector for FixedDetector {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn analyze(&self, _text: &str, _context: &DetectorContext) -> Result<DetectorReport, DetectorError> {
        Ok(self.report.clone())
    }
}

/// Never resolves.
#[derive(Default)]
pub struct HangingDetector;

#[async_trait]
impl Detector for HangingDetector {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn analyze(&self, _text: &str, _context: &DetectorContext) -> Result<DetectorReport, DetectorError> {
        std::future::pending().await
    }
}

/// Always errors.
#[derive(Default)]
pub struct BrokenDetector;

#[async_trait]
impl Detector for BrokenDetector {
    fn name(&self) -> &str {
        "broken"
    }

    async fn analyze(&self, _text: &str, _context: &DetectorContext) -> Result<DetectorReport, DetectorError> {
        Err(DetectorError::Failed("rule table unavailable".into()))
    }
}

/// Answers after a fixed delay with a one-field understanding.
pub struct SlowEnricher {
    delay: Duration,
}

impl SlowEnricher {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Enricher for SlowEnricher {
    async fn understand(&self, _input: &EnrichmentInput) -> Result<Understanding, EnrichmentError> {
        tokio::time::sleep(self.delay).await;
        Ok(Understanding {
            underlying_needs: "Predictable time with the children".into(),
            ..Default::default()
        })
    }
}

/// Profiles from a map; unknown identities have none.
#[derive(Default)]
pub struct StaticProfiles {
    profiles: HashMap<String, Profile>,
}

impl StaticProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, identity: &str, profile: Profile) -> Self {
        self.profiles.insert(identity.to_string(), profile);
        self
    }
}

#[async_trait]
impl ProfileProvider for StaticProfiles {
    async fn profile(&self, identity: &str) -> Result<Option<Profile>, ContextError> {
        Ok(self.profiles.get(identity).cloned())
    }
}

// ── Canned model responses ────────────────────────────────────────────────

pub fn stay_silent_json() -> String {
    serde_json::json!({
        "action": "STAY_SILENT",
        "escalation": {"riskLevel": "low", "confidence": 90, "reasons": ["logistics"]}
    })
    .to_string()
}

pub fn comment_json(comment: &str) -> String {
    serde_json::json!({
        "action": "COMMENT",
        "escalation": {"riskLevel": "low", "confidence": 70, "reasons": ["vague criticism"]},
        "intervention": {"comment": comment}
    })
    .to_string()
}

pub fn intervene_json(validation: &str, rewrite1: &str, rewrite2: &str) -> String {
    serde_json::json!({
        "action": "INTERVENE",
        "escalation": {"riskLevel": "medium", "confidence": 85, "reasons": ["absolute statement"]},
        "emotion": {"currentEmotion": "frustrated", "stressLevel": 70},
        "intervention": {
            "validation": validation,
            "refocusQuestions": [
                "What do you need most right now?",
                "Could something else explain the delay?",
                "Will this matter next week?"
            ],
            "rewrite1": rewrite1,
            "rewrite2": rewrite2
        }
    })
    .to_string()
}
