//! Content Generation Workflow Tests
//!
//! Covers the refine loop end-to-end: acceptance on quality, acceptance
//! on the iteration limit, the model-call bound, and failure handling
//! with preserved state.

use tokio_util::sync::CancellationToken;

use quillspace_ai::{ContentError, ContentStage, ContentWorkflow, ContentWorkflowConfig};
use quillspace_llm::GenerationRequest;

use crate::support::{fast_config, manager_with, MockOutcome, MockProvider};

const PROMPT: &str = "explain rust ownership and borrowing";

/// A draft that scores 1.0 against the rubric: full keyword coverage,
/// over forty words, several sentences.
const STRONG_DRAFT: &str = "Rust ownership gives every value a single owner. \
    Borrowing lets other code read or mutate the value temporarily without \
    taking ownership of it. When the owner goes out of scope the value is \
    dropped and its memory reclaimed. The compiler checks every borrow at \
    compile time, so programs explain their memory use statically and stay \
    safe without a garbage collector.";

fn workflow_config() -> ContentWorkflowConfig {
    ContentWorkflowConfig {
        quality_threshold: 0.8,
        max_iterations: 3,
    }
}

#[tokio::test]
async fn test_strong_first_draft_finalizes_immediately() {
    let provider = MockProvider::ok("mock", STRONG_DRAFT);
    let (manager, _registry) = manager_with(vec![provider.clone()], fast_config()).await;
    let workflow = ContentWorkflow::new(manager, workflow_config());

    let result = workflow
        .run(GenerationRequest::new(PROMPT), CancellationToken::new())
        .await
        .expect("finalizes");

    assert_eq!(result.attempts, 1);
    assert!(result.score >= 0.8);
    assert!(!result.reached_iteration_limit);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_weak_draft_refines_then_finalizes() {
    let provider = MockProvider::scripted(
        "mock",
        vec![MockOutcome::Ok("ok".to_string())],
        MockOutcome::Ok(STRONG_DRAFT.to_string()),
    );
    let (manager, _registry) = manager_with(vec![provider.clone()], fast_config()).await;
    let workflow = ContentWorkflow::new(manager, workflow_config());

    let result = workflow
        .run(GenerationRequest::new(PROMPT), CancellationToken::new())
        .await
        .expect("finalizes");

    assert_eq!(result.attempts, 2);
    assert!(result.score >= 0.8);
    assert!(!result.reached_iteration_limit);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_iteration_limit_finalizes_with_low_score() {
    let provider = MockProvider::ok("mock", "meh");
    let (manager, _registry) = manager_with(vec![provider.clone()], fast_config()).await;
    let workflow = ContentWorkflow::new(manager, workflow_config());

    let result = workflow
        .run(GenerationRequest::new(PROMPT), CancellationToken::new())
        .await
        .expect("iteration limit is not a failure");

    assert_eq!(result.attempts, 3);
    assert!(result.score < 0.8);
    assert!(result.reached_iteration_limit);
    // Terminates within max_iterations + 1 model calls.
    assert!(provider.calls() <= 4);
}

#[tokio::test]
async fn test_provider_exhaustion_preserves_state() {
    let provider = MockProvider::failing("mock", MockOutcome::Unavailable);
    let (manager, _registry) = manager_with(vec![provider], fast_config()).await;
    let workflow = ContentWorkflow::new(manager, workflow_config());

    let err = workflow
        .run(GenerationRequest::new(PROMPT), CancellationToken::new())
        .await
        .expect_err("fails");

    match &err {
        ContentError::Exhausted { state, log } => {
            assert_eq!(state.stage, ContentStage::Failed);
            assert_eq!(state.attempts, 0);
            assert!(state.draft.is_none());
            assert!(!log.attempts.is_empty());
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_mid_refine_preserves_first_draft() {
    let provider = MockProvider::scripted(
        "mock",
        vec![MockOutcome::Ok("ok".to_string())],
        MockOutcome::Unavailable,
    );
    let (manager, _registry) = manager_with(vec![provider], fast_config()).await;
    let workflow = ContentWorkflow::new(manager, workflow_config());

    let err = workflow
        .run(GenerationRequest::new(PROMPT), CancellationToken::new())
        .await
        .expect_err("refine call fails");

    match &err {
        ContentError::Exhausted { state, .. } => {
            assert_eq!(state.stage, ContentStage::Failed);
            assert_eq!(state.attempts, 1);
            assert_eq!(state.draft.as_deref(), Some("ok"));
            assert!(state.feedback.is_some());
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_maps_to_cancelled() {
    let provider = MockProvider::ok("mock", STRONG_DRAFT);
    let (manager, _registry) = manager_with(vec![provider.clone()], fast_config()).await;
    let workflow = ContentWorkflow::new(manager, workflow_config());

    let token = CancellationToken::new();
    token.cancel();

    let err = workflow
        .run(GenerationRequest::new(PROMPT), token)
        .await
        .expect_err("cancelled");

    assert!(matches!(err, ContentError::Cancelled { .. }));
    assert_eq!(provider.calls(), 0);
}
