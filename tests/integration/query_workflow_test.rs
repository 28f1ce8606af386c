//! Database Query Workflow Tests
//!
//! Drives the full pipeline with scripted model output: the happy path,
//! the safety gate scenarios from the requirements, the parse-retry
//! budget, and the non-fatal alternatives stage.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use quillspace_ai::{
    QueryError, QueryRequest, QueryWorkflow, QueryWorkflowConfig, SafetyCode, SchemaDescription,
    SqlSafetyValidator, TableSchema,
};

use crate::support::{fast_config, manager_with, MockOutcome, MockProvider};

fn users_schema() -> SchemaDescription {
    SchemaDescription::new(vec![TableSchema::new(
        "users",
        vec!["id", "name", "email", "created_at"],
    )])
}

async fn workflow(provider: Arc<MockProvider>) -> QueryWorkflow {
    let (manager, _registry) = manager_with(vec![provider], fast_config()).await;
    QueryWorkflow::new(
        manager,
        Arc::new(SqlSafetyValidator::default()),
        QueryWorkflowConfig::default(),
    )
}

fn ok(text: &str) -> MockOutcome {
    MockOutcome::Ok(text.to_string())
}

#[tokio::test]
async fn test_show_all_users_scenario() {
    let provider = MockProvider::scripted(
        "mock",
        vec![
            ok("tables: users; columns: id, name, email, created_at"),
            ok("```sql\nSELECT id, name, email, created_at FROM users WHERE id > 0 LIMIT 100;\n```"),
            ok("Lists every user with their name, email, and signup date."),
            ok("SELECT name FROM users WHERE id > 0 LIMIT 100; SELECT email FROM users WHERE id > 0 LIMIT 100"),
        ],
        ok("unused"),
    );
    let workflow = workflow(provider).await;

    let result = workflow
        .run(
            &QueryRequest::new("show all users", users_schema()),
            &CancellationToken::new(),
        )
        .await
        .expect("pipeline completes");

    let sql = result.sql.expect("sql returned");
    assert!(sql.to_lowercase().contains("from users"));
    assert!(!result.explanation.is_empty());
    assert!(!result.safety_flags.iter().any(|f| f.is_critical()));
    assert_eq!(result.alternatives.len(), 2);
}

#[tokio::test]
async fn test_delete_without_where_is_withheld() {
    let provider = MockProvider::scripted(
        "mock",
        vec![ok("users"), ok("DELETE FROM users")],
        ok("unused"),
    );
    let workflow = workflow(provider).await;

    let result = workflow
        .run(
            &QueryRequest::new("delete inactive users", users_schema()),
            &CancellationToken::new(),
        )
        .await
        .expect("blocked result is still a result");

    assert!(result.sql.is_none());
    assert!(result.is_blocked());
    let flag = result
        .safety_flags
        .iter()
        .find(|f| f.code == SafetyCode::DeleteWithoutWhere)
        .expect("names the missing WHERE clause");
    assert!(flag.message.contains("WHERE"));
    assert!(result.explanation.contains("withheld"));
    assert!(result.alternatives.is_empty());
}

#[tokio::test]
async fn test_parse_error_feeds_back_and_recovers() {
    let provider = MockProvider::scripted(
        "mock",
        vec![
            ok("users"),
            ok("SELEC id FRM users"),
            ok("SELECT id FROM users WHERE id = 1"),
            ok("Reads one user row."),
            ok(""),
        ],
        ok("unused"),
    );
    let workflow = workflow(provider.clone()).await;

    let result = workflow
        .run(
            &QueryRequest::new("find user one", users_schema()),
            &CancellationToken::new(),
        )
        .await
        .expect("second candidate parses");

    assert_eq!(result.sql.as_deref(), Some("SELECT id FROM users WHERE id = 1"));
    assert!(result.alternatives.is_empty());
}

#[tokio::test]
async fn test_two_parse_failures_fail_generation() {
    let provider = MockProvider::scripted(
        "mock",
        vec![ok("users"), ok("SELEC nope"), ok("still not sql")],
        ok("unused"),
    );
    let workflow = workflow(provider).await;

    let err = workflow
        .run(
            &QueryRequest::new("find users", users_schema()),
            &CancellationToken::new(),
        )
        .await
        .expect_err("generation fails");

    assert!(matches!(err, QueryError::SqlGenerationFailed { .. }));
}

#[tokio::test]
async fn test_unsafe_alternatives_are_dropped() {
    let provider = MockProvider::scripted(
        "mock",
        vec![
            ok("users"),
            ok("SELECT id FROM users WHERE id = 1"),
            ok("Reads one user."),
            // One safe alternative, one unbounded DELETE smuggled in.
            ok("SELECT name FROM users WHERE id = 1; DELETE FROM users"),
        ],
        ok("unused"),
    );
    let workflow = workflow(provider).await;

    let result = workflow
        .run(
            &QueryRequest::new("find user one", users_schema()),
            &CancellationToken::new(),
        )
        .await
        .expect("completes");

    assert_eq!(result.alternatives.len(), 1);
    assert!(result.alternatives[0].contains("SELECT name"));
}

#[tokio::test]
async fn test_returned_sql_reparses() {
    let provider = MockProvider::scripted(
        "mock",
        vec![
            ok("users"),
            ok("SELECT email FROM users WHERE created_at > '2024-01-01' LIMIT 20"),
            ok("Recent signups."),
            ok(""),
        ],
        ok("unused"),
    );
    let workflow = workflow(provider).await;

    let result = workflow
        .run(
            &QueryRequest::new("recent signups", users_schema()),
            &CancellationToken::new(),
        )
        .await
        .expect("completes");

    let validator = SqlSafetyValidator::default();
    let statements = validator
        .parse(result.sql.as_deref().expect("sql returned"))
        .expect("returned sql re-parses");
    assert_eq!(statements.len(), 1);
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let provider = MockProvider::ok("mock", "unused");
    let workflow = workflow(provider.clone()).await;

    let err = workflow
        .run(
            &QueryRequest::new("   ", users_schema()),
            &CancellationToken::new(),
        )
        .await
        .expect_err("rejected");

    assert!(matches!(err, QueryError::Rejected(_)));
    assert_eq!(provider.calls(), 0);
}
