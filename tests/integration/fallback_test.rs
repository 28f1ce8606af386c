//! Fallback Chain and Circuit Breaker Tests
//!
//! Covers the manager's selection policy: Nth-provider fallback,
//! exhaustion without over-calling, preference handling, breaker
//! downgrades with probe recovery, embedding capability filtering, and
//! cancellation without quota consumption.

use tokio_util::sync::CancellationToken;

use quillspace_ai::{ManagerConfig, ManagerError, ModelKind};
use quillspace_llm::GenerationRequest;

use crate::support::{fast_config, manager_with, MockOutcome, MockProvider};

#[tokio::test]
async fn test_first_healthy_provider_serves() {
    let p1 = MockProvider::ok("p1", "from p1");
    let p2 = MockProvider::ok("p2", "from p2");
    let (manager, _registry) = manager_with(vec![p1.clone(), p2.clone()], fast_config()).await;

    let (text, log) = manager
        .generate(&GenerationRequest::new("hi"), &CancellationToken::new())
        .await
        .expect("succeeds");

    assert_eq!(text.provider, "p1");
    assert_eq!(log.selected.as_deref(), Some("p1"));
    assert_eq!(p1.calls(), 1);
    assert_eq!(p2.calls(), 0);
}

#[tokio::test]
async fn test_falls_back_to_nth_provider() {
    let p1 = MockProvider::failing("p1", MockOutcome::Unavailable);
    let p2 = MockProvider::failing("p2", MockOutcome::Unavailable);
    let p3 = MockProvider::ok("p3", "from p3");
    let (manager, _registry) =
        manager_with(vec![p1.clone(), p2.clone(), p3.clone()], fast_config()).await;

    let (text, log) = manager
        .generate(&GenerationRequest::new("hi"), &CancellationToken::new())
        .await
        .expect("third provider serves");

    assert_eq!(text.provider, "p3");
    assert_eq!(log.attempts.len(), 2);
    assert_eq!(log.providers_tried(), vec!["p1", "p2"]);
    // Unavailable advances immediately: one call each.
    assert_eq!(p1.calls(), 1);
    assert_eq!(p2.calls(), 1);
    assert_eq!(p3.calls(), 1);
}

#[tokio::test]
async fn test_all_fail_is_exhausted_without_overcalling() {
    let p1 = MockProvider::failing("p1", MockOutcome::Unavailable);
    let p2 = MockProvider::failing("p2", MockOutcome::RateLimited);
    let config = fast_config();
    let retry_budget = 1 + config.same_provider_retries as usize;
    let (manager, _registry) = manager_with(vec![p1.clone(), p2.clone()], config).await;

    let err = manager
        .generate(&GenerationRequest::new("hi"), &CancellationToken::new())
        .await
        .expect_err("everything fails");

    assert!(matches!(err, ManagerError::AllProvidersExhausted { .. }));
    assert!(p1.calls() <= retry_budget);
    assert!(p2.calls() <= retry_budget);
}

#[tokio::test]
async fn test_network_blip_retries_same_provider_once() {
    let p1 = MockProvider::scripted(
        "p1",
        vec![MockOutcome::Network],
        MockOutcome::Ok("recovered".to_string()),
    );
    let (manager, _registry) = manager_with(vec![p1.clone()], fast_config()).await;

    let (text, _log) = manager
        .generate(&GenerationRequest::new("hi"), &CancellationToken::new())
        .await
        .expect("second attempt recovers");

    assert_eq!(text.content, "recovered");
    assert_eq!(p1.calls(), 2);
}

#[tokio::test]
async fn test_all_unavailable_makes_no_calls() {
    let p1 = MockProvider::ok("p1", "never served");
    let p2 = MockProvider::ok("p2", "never served");
    let (manager, registry) = manager_with(vec![p1.clone(), p2.clone()], fast_config()).await;

    registry.mark_unavailable("p1/mock-model").await;
    registry.mark_unavailable("p2/mock-model").await;

    let err = manager
        .generate(&GenerationRequest::new("hi"), &CancellationToken::new())
        .await
        .expect_err("no candidates");

    assert!(matches!(err, ManagerError::AllProvidersExhausted { .. }));
    assert_eq!(p1.calls(), 0);
    assert_eq!(p2.calls(), 0);
}

#[tokio::test]
async fn test_preference_tried_ahead_of_chain() {
    let p1 = MockProvider::ok("p1", "from p1");
    let p2 = MockProvider::ok("p2", "from p2");
    let (manager, _registry) = manager_with(vec![p1.clone(), p2.clone()], fast_config()).await;

    let request = GenerationRequest::new("hi").with_preferred_provider("p2");
    let (text, _log) = manager
        .generate(&request, &CancellationToken::new())
        .await
        .expect("preference serves");

    assert_eq!(text.provider, "p2");
    assert_eq!(p1.calls(), 0);
}

#[tokio::test]
async fn test_unavailable_preference_falls_back_to_chain() {
    let p1 = MockProvider::ok("p1", "from p1");
    let p2 = MockProvider::ok("p2", "from p2");
    let (manager, registry) = manager_with(vec![p1.clone(), p2.clone()], fast_config()).await;

    registry.mark_unavailable("p2/mock-model").await;

    let request = GenerationRequest::new("hi").with_preferred_provider("p2");
    let (text, _log) = manager
        .generate(&request, &CancellationToken::new())
        .await
        .expect("chain serves");

    assert_eq!(text.provider, "p1");
    assert_eq!(p2.calls(), 0);
}

#[tokio::test]
async fn test_breaker_opens_and_probe_recovers() {
    let p1 = MockProvider::failing("p1", MockOutcome::Unavailable);
    let p2 = MockProvider::ok("p2", "from p2");
    let config = ManagerConfig {
        failure_threshold: 2,
        ..fast_config()
    };
    let (manager, registry) = manager_with(vec![p1.clone(), p2.clone()], config).await;
    let token = CancellationToken::new();

    // Two failed invocations trip the breaker for p1.
    for _ in 0..2 {
        let (text, _log) = manager
            .generate(&GenerationRequest::new("hi"), &token)
            .await
            .expect("p2 serves");
        assert_eq!(text.provider, "p2");
    }
    assert!(!registry.is_available("p1", ModelKind::TextGeneration).await);
    assert_eq!(p1.calls(), 2);

    // While open, p1 is never selected.
    manager
        .generate(&GenerationRequest::new("hi"), &token)
        .await
        .expect("p2 serves");
    assert_eq!(p1.calls(), 2);

    // A successful health probe restores selection.
    registry.mark_available("p1/mock-model").await;
    manager
        .generate(&GenerationRequest::new("hi"), &token)
        .await
        .expect("chain serves");
    assert_eq!(p1.calls(), 3);
}

#[tokio::test]
async fn test_embed_skips_text_only_provider() {
    let p1 = MockProvider::text_only("p1", "text only");
    let p2 = MockProvider::ok("p2", "embeddings too");
    let (manager, _registry) = manager_with(vec![p1.clone(), p2.clone()], fast_config()).await;

    let (vector, log) = manager
        .embed("hello", &CancellationToken::new())
        .await
        .expect("capable provider serves");

    assert_eq!(vector.provider, "p2");
    assert_eq!(vector.len(), 4);
    assert_eq!(log.selected.as_deref(), Some("p2"));
    assert_eq!(p1.calls(), 0);
}

#[tokio::test]
async fn test_cancelled_token_short_circuits() {
    let p1 = MockProvider::ok("p1", "never served");
    let (manager, _registry) = manager_with(vec![p1.clone()], fast_config()).await;

    let token = CancellationToken::new();
    token.cancel();

    let err = manager
        .generate(&GenerationRequest::new("hi"), &token)
        .await
        .expect_err("cancelled");

    assert!(matches!(err, ManagerError::Cancelled));
    assert_eq!(p1.calls(), 0);
}

#[tokio::test]
async fn test_success_resets_failure_window() {
    let p1 = MockProvider::scripted(
        "p1",
        vec![
            MockOutcome::Unavailable,
            MockOutcome::Ok("served".to_string()),
            MockOutcome::Unavailable,
        ],
        MockOutcome::Ok("served".to_string()),
    );
    let p2 = MockProvider::ok("p2", "backup");
    let config = ManagerConfig {
        failure_threshold: 2,
        ..fast_config()
    };
    let (manager, registry) = manager_with(vec![p1.clone(), p2.clone()], config).await;
    let token = CancellationToken::new();

    // Failure (1 in window), then success clears the window, then one
    // more failure: still under the threshold, breaker stays closed.
    for _ in 0..3 {
        manager
            .generate(&GenerationRequest::new("hi"), &token)
            .await
            .expect("a provider serves");
    }
    assert!(registry.is_available("p1", ModelKind::TextGeneration).await);
}
