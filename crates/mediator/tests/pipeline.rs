//! End-to-end pipeline behaviour through the public API.

use calmwire_analysis::RuleDetector;
use calmwire_core::analysis::{AnalysisResult, AxiomCategory, AxiomFinding, DetectorReport};
use calmwire_core::error::InferenceError;
use calmwire_core::message::{Message, Participant, RoomRoster};
use calmwire_mediator::test_helpers::{
    FailingInference, FixedDetector, HangingDetector, ScriptedInference, SlowEnricher,
    comment_json, intervene_json, stay_silent_json,
};
use calmwire_mediator::{AnalysisRequest, Mediator};
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

const ROOM: &str = "room-1";

fn roster() -> RoomRoster {
    RoomRoster::new(vec![
        Participant::new("alex").with_display_name("Alex"),
        Participant::new("sam").with_display_name("Sam"),
    ])
}

fn request(text: &str) -> AnalysisRequest {
    AnalysisRequest::new(Message::new(ROOM, "alex", text), roster())
}

fn default_intervention() -> String {
    intervene_json(
        "It makes sense to feel frustrated when pickups slip.",
        "Could we agree on a pickup time that works for both of us?",
        "I'd like more predictable time with the kids. Can we plan pickups together?",
    )
}

// ── Cache ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_message_is_served_from_cache() {
    let client = Arc::new(ScriptedInference::single(stay_silent_json()));
    let mediator = Mediator::new(client.clone(), "test-model");

    let first = mediator
        .analyze(request("Why is the homework folder still missing?"))
        .await
        .unwrap();
    // Let the detached cache write land
    tokio::task::yield_now().await;
    let second = mediator
        .analyze(request("  WHY is the homework folder still missing?  "))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn cached_comment_still_respects_the_cooldown() {
    let client = Arc::new(ScriptedInference::single(comment_json(
        "Naming a specific time makes this easier to answer.",
    )));
    let mediator = Mediator::new(client.clone(), "test-model");
    let text = "I need you to be more reliable about the weekends";

    let first = mediator.analyze(request(text)).await.unwrap();
    tokio::task::yield_now().await;
    let second = mediator.analyze(request(text)).await.unwrap();

    assert_eq!(first.kind(), "comment");
    assert!(second.is_allow());
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn cached_interventions_count_toward_the_daily_cap() {
    let client = Arc::new(ScriptedInference::single(default_intervention()));
    let mediator = Mediator::new(client.clone(), "test-model");
    let text = "You never let me see the kids on time!";

    let mut surfaced = 0;
    for i in 0..15 {
        let result = mediator.analyze(request(text)).await.unwrap();
        if result.kind() == "intervention" {
            surfaced += 1;
        }
        if i == 0 {
            tokio::task::yield_now().await;
        }
    }

    assert_eq!(client.call_count(), 1);
    assert_eq!(surfaced, 10);
    assert_eq!(mediator.throttle_status(ROOM).await.recent_count, 10);
}

#[tokio::test]
async fn cached_intervention_is_recorded_in_the_room_that_hit_it() {
    let client = Arc::new(ScriptedInference::single(default_intervention()));
    let mediator = Mediator::new(client.clone(), "test-model");
    let text = "You never let me see the kids on time!";

    mediator.analyze(request(text)).await.unwrap();
    tokio::task::yield_now().await;
    let other_room = AnalysisRequest::new(Message::new("room-2", "alex", text), roster());
    let again = mediator.analyze(other_room).await.unwrap();

    assert_eq!(again.kind(), "intervention");
    assert_eq!(client.call_count(), 1);
    assert_eq!(mediator.throttle_status(ROOM).await.recent_count, 1);
    assert_eq!(mediator.throttle_status("room-2").await.recent_count, 1);
}

// ── Pre-filter and quick-pass ─────────────────────────────────────────────

#[tokio::test]
async fn every_prefilter_category_skips_inference() {
    let client = Arc::new(ScriptedInference::single(default_intervention()));
    let mediator = Mediator::new(client.clone(), "test-model");

    for text in [
        "hello there",
        "Sounds good!",
        "My sister is visiting this weekend",
        "Thank you for picking them up today",
    ] {
        let result = mediator.analyze(request(text)).await.unwrap();
        assert!(result.is_allow(), "{text}");
    }
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn quick_pass_skips_inference() {
    let client = Arc::new(ScriptedInference::single(default_intervention()));
    let detector = FixedDetector::new(DetectorReport {
        findings: vec![AxiomFinding {
            axiom_id: "AXIOM_D001".into(),
            name: "Clean Request".into(),
            category: AxiomCategory::Clean,
            confidence: 80,
            behavioral_patterns: vec!["can you".into()],
            intent_impact: None,
        }],
        quick_pass: true,
    });
    let mediator =
        Mediator::new(client.clone(), "test-model").with_detector(Arc::new(detector));

    let result = mediator
        .analyze(request("Can you drop off her coat on Friday?"))
        .await
        .unwrap();

    assert!(result.is_allow());
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn rule_detector_findings_reach_the_prompt() {
    let client = Arc::new(ScriptedInference::single(stay_silent_json()));
    let mediator = Mediator::new(client.clone(), "test-model")
        .with_detector(Arc::new(RuleDetector::new()));

    mediator
        .analyze(request("Pick them up by 5 or I'll call my lawyer"))
        .await
        .unwrap();

    let prompt = client.last_request().unwrap();
    assert!(prompt.user.contains("STRUCTURAL PATTERNS DETECTED"));
    assert!(prompt.user.contains("AXIOM_D102"));
}

#[tokio::test]
async fn polite_request_with_an_insult_reaches_inference() {
    let client = Arc::new(ScriptedInference::single(default_intervention()));
    let mediator = Mediator::new(client.clone(), "test-model")
        .with_detector(Arc::new(RuleDetector::new()));

    let result = mediator
        .analyze(request("Can you pick up the kids at 5pm, you useless idiot?"))
        .await
        .unwrap();

    assert_eq!(client.call_count(), 1);
    assert_eq!(result.kind(), "intervention");
}

#[tokio::test(start_paused = true)]
async fn hanging_detector_is_abandoned_at_its_deadline() {
    let client = Arc::new(ScriptedInference::single(stay_silent_json()));
    let mediator = Mediator::new(client.clone(), "test-model")
        .with_detector(Arc::new(HangingDetector))
        .with_detector_deadline(Duration::from_millis(500));

    let started = tokio::time::Instant::now();
    let result = mediator
        .analyze(request("You never let me see the kids on time!"))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(result.is_allow());
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_millis(600));
    assert_eq!(client.call_count(), 1);
    assert!(!client.last_request().unwrap().user.contains("STRUCTURAL PATTERNS"));
}

#[tokio::test(start_paused = true)]
async fn slow_enrichment_is_left_out_of_the_prompt() {
    let client = Arc::new(ScriptedInference::single(stay_silent_json()));
    let mediator = Mediator::new(client.clone(), "test-model")
        .with_enricher(Arc::new(SlowEnricher::new(Duration::from_secs(2))))
        .with_enrichment_budgets(Duration::from_secs(3), Duration::from_millis(500));

    mediator
        .analyze(request("You never let me see the kids on time!"))
        .await
        .unwrap();

    assert!(!client.last_request().unwrap().user.contains("DEEPER UNDERSTANDING"));
}

#[tokio::test(start_paused = true)]
async fn prompt_enrichment_is_included() {
    let client = Arc::new(ScriptedInference::single(stay_silent_json()));
    let mediator = Mediator::new(client.clone(), "test-model")
        .with_enricher(Arc::new(SlowEnricher::new(Duration::from_millis(100))))
        .with_enrichment_budgets(Duration::from_secs(3), Duration::from_millis(500));

    mediator
        .analyze(request("You never let me see the kids on time!"))
        .await
        .unwrap();

    let prompt = client.last_request().unwrap();
    assert!(prompt.user.contains("DEEPER UNDERSTANDING"));
    assert!(prompt.user.contains("Predictable time with the children"));
}

// ── Throttling ────────────────────────────────────────────────────────────

#[tokio::test]
async fn eleventh_intervention_in_a_day_is_downgraded() {
    let client = Arc::new(ScriptedInference::single(default_intervention()));
    let mediator = Mediator::new(client.clone(), "test-model");

    for i in 0..10 {
        let text = format!("You never answer about week {i}!");
        let result = mediator.analyze(request(&text)).await.unwrap();
        assert_eq!(result.kind(), "intervention", "message {i}");
    }

    let status = mediator.throttle_status(ROOM).await;
    assert!(status.should_throttle);
    assert_eq!(status.recent_count, 10);

    let result = mediator
        .analyze(request("You never answer about anything!"))
        .await
        .unwrap();
    assert!(result.is_allow());
    assert_eq!(client.call_count(), 11);
    assert_eq!(mediator.throttle_status(ROOM).await.recent_count, 10);
}

#[tokio::test]
async fn throttle_window_resets_after_a_day() {
    let client = Arc::new(ScriptedInference::single(default_intervention()));
    let mediator = Mediator::new(client, "test-model");
    let store = mediator.store();
    let start = Utc::now();

    for _ in 0..10 {
        store.record_intervention_at(ROOM, None, start).await;
    }
    assert!(store.throttle_at(ROOM, 10, start).await.should_throttle);

    let later = start + TimeDelta::hours(25);
    store.record_intervention_at(ROOM, None, later).await;
    let status = store.throttle_at(ROOM, 10, later).await;

    assert_eq!(status.recent_count, 1);
    assert!(!status.should_throttle);
}

// ── Error policy ──────────────────────────────────────────────────────────

#[tokio::test]
async fn client_errors_fail_open_and_are_not_cached() {
    for error in [
        InferenceError::ApiError {
            status_code: 400,
            message: "bad request".into(),
        },
        InferenceError::AuthenticationFailed("bad key".into()),
        InferenceError::InvalidResponse("no choices".into()),
        InferenceError::NotConfigured("cannot build request: relative URL without a base".into()),
    ] {
        let client = Arc::new(FailingInference::new(error));
        let mediator = Mediator::new(client.clone(), "test-model");
        let text = "You never let me see the kids on time!";

        assert!(mediator.analyze(request(text)).await.unwrap().is_allow());
        tokio::task::yield_now().await;
        assert!(mediator.analyze(request(text)).await.unwrap().is_allow());
        assert_eq!(client.call_count(), 2);
    }
}

#[tokio::test]
async fn retryable_errors_surface_with_codes() {
    let cases = [
        (
            InferenceError::RateLimited {
                retry_after_secs: 12,
            },
            "AI_RATE_LIMIT",
        ),
        (InferenceError::Network("connection refused".into()), "AI_NETWORK"),
        (InferenceError::Timeout("30s elapsed".into()), "AI_NETWORK"),
        (
            InferenceError::ApiError {
                status_code: 503,
                message: "unavailable".into(),
            },
            "AI_SERVER_ERROR",
        ),
    ];

    for (error, code) in cases {
        let mediator = Mediator::new(Arc::new(FailingInference::new(error)), "test-model");
        let err = mediator
            .analyze(request("You never let me see the kids on time!"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), code);
        assert!(err.is_retryable());
    }
}

#[tokio::test]
async fn rate_limit_keeps_retry_hint() {
    let mediator = Mediator::new(
        Arc::new(FailingInference::new(InferenceError::RateLimited {
            retry_after_secs: 12,
        })),
        "test-model",
    );
    let err = mediator
        .analyze(request("You never let me see the kids on time!"))
        .await
        .unwrap_err();
    assert_eq!(err.retry_after_secs(), Some(12));
}

// ── Rewrite validation ────────────────────────────────────────────────────

#[tokio::test]
async fn identical_rewrites_are_downgraded() {
    let text = "You never let me see the kids on time!";
    for response in [
        intervene_json("That sounds hard.", "Can we talk pickups?", "can we talk pickups"),
        intervene_json("That sounds hard.", text, "Can we talk pickups?"),
    ] {
        let client = Arc::new(ScriptedInference::single(response));
        let mediator = Mediator::new(client, "test-model");

        let result = mediator.analyze(request(text)).await.unwrap();

        assert!(result.is_allow());
        assert_eq!(mediator.throttle_status(ROOM).await.recent_count, 0);
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_accusation_gets_intervention() {
    let client = Arc::new(ScriptedInference::single(default_intervention()));
    let mediator = Mediator::new(client.clone(), "test-model")
        .with_detector(Arc::new(RuleDetector::new()));

    let result = mediator
        .analyze(request("You never let me see the kids on time!"))
        .await
        .unwrap();

    let AnalysisResult::Intervention(intervention) = result else {
        panic!("expected an intervention");
    };
    let rewrites = intervention.rewrites();
    assert!(!rewrites.first().is_empty());
    assert!(!rewrites.second().is_empty());
    assert_ne!(rewrites.first(), rewrites.second());
    assert!(!intervention.validation.is_empty());
    assert_eq!(intervention.refocus_questions.len(), 3);
    assert_eq!(client.call_count(), 1);

    let memos = mediator.store().recent_interventions(ROOM).await;
    assert_eq!(memos.len(), 1);
}

#[tokio::test]
async fn scenario_greeting_never_reaches_inference() {
    let client = Arc::new(ScriptedInference::single(default_intervention()));
    let mediator = Mediator::new(client.clone(), "test-model");

    let result = mediator.analyze(request("hi")).await.unwrap();

    assert_eq!(result, AnalysisResult::Allow);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn scenario_second_comment_within_cooldown_is_suppressed() {
    let client = Arc::new(ScriptedInference::single(comment_json(
        "A specific time might make this easier to agree on.",
    )));
    let mediator = Mediator::new(client.clone(), "test-model");

    let first = mediator
        .analyze(request("Whatever, pick a day I guess"))
        .await
        .unwrap();
    let second = mediator
        .analyze(request("Fine. Some weekend then"))
        .await
        .unwrap();

    assert_eq!(first.kind(), "comment");
    assert!(second.is_allow());
    assert_eq!(client.call_count(), 2);
}

// ── Sharing ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn rooms_are_analyzed_concurrently_and_independently() {
    let client = Arc::new(ScriptedInference::single(comment_json("Try naming a day.")));
    let mediator = Arc::new(Mediator::new(client.clone(), "test-model"));

    let handles: Vec<_> = ["room-a", "room-b"]
        .into_iter()
        .map(|room| {
            let mediator = Arc::clone(&mediator);
            tokio::spawn(async move {
                let message = Message::new(room, "alex", format!("Whatever works for {room}"));
                mediator.analyze(AnalysisRequest::new(message, roster())).await
            })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.kind(), "comment");
    }
    assert_eq!(client.call_count(), 2);
}
