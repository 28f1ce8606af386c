//! Request Router Tests
//!
//! Exercises the router's operations over mock-backed services:
//! generation, analysis post-processing, querying, embedding, and the
//! read-only registry introspection.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use quillspace_ai::{
    AnalysisType, ContentWorkflow, ContentWorkflowConfig, HealthState, ModelRegistry,
    QueryRequest, QueryWorkflow, QueryWorkflowConfig, RequestRouter, SchemaDescription,
    SqlSafetyValidator, TableSchema,
};
use quillspace_llm::GenerationRequest;

use crate::support::{fast_config, manager_with, MockOutcome, MockProvider};

async fn router_over(provider: Arc<MockProvider>) -> (RequestRouter, Arc<ModelRegistry>) {
    let (manager, registry) = manager_with(vec![provider], fast_config()).await;
    let router = RequestRouter::new(
        manager.clone(),
        registry.clone(),
        // Accept-anything content config keeps these tests about routing.
        ContentWorkflow::new(
            manager.clone(),
            ContentWorkflowConfig {
                quality_threshold: 0.0,
                max_iterations: 1,
            },
        ),
        QueryWorkflow::new(
            manager,
            Arc::new(SqlSafetyValidator::default()),
            QueryWorkflowConfig::default(),
        ),
    );
    (router, registry)
}

#[tokio::test]
async fn test_generate_returns_workflow_result() {
    let provider = MockProvider::ok("mock", "a perfectly fine draft");
    let (router, _registry) = router_over(provider).await;

    let result = router
        .generate(GenerationRequest::new("write"), CancellationToken::new())
        .await
        .expect("finalizes");

    assert_eq!(result.content, "a perfectly fine draft");
    assert_eq!(result.attempts, 1);
}

#[tokio::test]
async fn test_analyze_keywords_post_processing() {
    let provider = MockProvider::ok("mock", "- ownership\n- borrowing, lifetimes\n\n");
    let (router, _registry) = router_over(provider).await;

    let result = router
        .analyze("some document", AnalysisType::Keywords, CancellationToken::new())
        .await
        .expect("analysis succeeds");

    assert_eq!(result.items, vec!["ownership", "borrowing", "lifetimes"]);
    assert_eq!(result.analysis_type, AnalysisType::Keywords);
}

#[tokio::test]
async fn test_analyze_summary_has_no_items() {
    let provider = MockProvider::ok("mock", "A short summary.");
    let (router, _registry) = router_over(provider).await;

    let result = router
        .analyze("some document", AnalysisType::Summary, CancellationToken::new())
        .await
        .expect("analysis succeeds");

    assert_eq!(result.output, "A short summary.");
    assert!(result.items.is_empty());
}

#[tokio::test]
async fn test_query_routes_through_pipeline() {
    let provider = MockProvider::scripted(
        "mock",
        vec![
            MockOutcome::Ok("users".to_string()),
            MockOutcome::Ok("SELECT id FROM users WHERE id = 1".to_string()),
            MockOutcome::Ok("Reads one user.".to_string()),
            MockOutcome::Ok(String::new()),
        ],
        MockOutcome::Ok("unused".to_string()),
    );
    let (router, _registry) = router_over(provider).await;

    let schema = SchemaDescription::new(vec![TableSchema::new("users", vec!["id", "name"])]);
    let result = router
        .query(QueryRequest::new("find user one", schema), CancellationToken::new())
        .await
        .expect("query completes");

    assert!(result.sql.is_some());
    assert_eq!(result.explanation, "Reads one user.");
}

#[tokio::test]
async fn test_embed_returns_vector() {
    let provider = MockProvider::ok("mock", "unused");
    let (router, _registry) = router_over(provider).await;

    let vector = router
        .embed("hello", CancellationToken::new())
        .await
        .expect("embedding succeeds");

    assert_eq!(vector.len(), 4);
}

#[tokio::test]
async fn test_list_models_and_health_transitions() {
    let provider = MockProvider::ok("mock", "unused");
    let (router, registry) = router_over(provider).await;

    let models = router.list_models().await;
    assert_eq!(models.len(), 2); // generation + embedding descriptors

    let health = router.health().await;
    assert_eq!(health.status, HealthState::Ok);
    assert_eq!(health.available, 2);

    registry.mark_unavailable("mock/mock-model").await;
    assert_eq!(router.health().await.status, HealthState::Degraded);

    registry.mark_unavailable("mock/mock-embed").await;
    assert_eq!(router.health().await.status, HealthState::Unavailable);
}
