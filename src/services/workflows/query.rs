//! Database Query Workflow
//!
//! Linear pipeline turning a natural-language query into vetted SQL:
//! analyze intent, generate SQL against the implicated schema subset,
//! validate syntax (one regeneration with the parse error fed back),
//! run the safety gate, explain, and optionally propose alternatives.
//!
//! The safety gate is an early exit: a critical flag withholds the SQL
//! entirely and the caller receives the flags instead.

use std::sync::Arc;

use sqlparser::ast::{SetExpr, Statement, TableFactor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use quillspace_llm::GenerationRequest;

use crate::models::query::{QueryRequest, QueryResult, SafetyFlag, SchemaDescription};
use crate::services::manager::{ManagerError, ModelManager, SelectionLog};
use crate::services::safety::SqlSafetyValidator;

/// Workflow tuning.
#[derive(Debug, Clone)]
pub struct QueryWorkflowConfig {
    /// Maximum number of alternative formulations to return
    pub max_alternatives: usize,
}

impl Default for QueryWorkflowConfig {
    fn default() -> Self {
        Self { max_alternatives: 2 }
    }
}

/// Errors surfaced to the router. Unsafe SQL is not among them: the
/// safety gate produces a successful `QueryResult` with `sql` withheld.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The model could not produce parseable SQL within the retry budget
    #[error("sql generation failed: {detail}")]
    SqlGenerationFailed { detail: String },

    /// Every provider in the chain failed at some pipeline stage
    #[error("query workflow failed: all providers exhausted")]
    Exhausted { log: SelectionLog },

    /// The request was rejected before or during generation
    #[error("invalid query request: {0}")]
    Rejected(String),

    /// The caller cancelled
    #[error("query workflow cancelled")]
    Cancelled,
}

impl From<ManagerError> for QueryError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::AllProvidersExhausted { log } => QueryError::Exhausted { log },
            ManagerError::InvalidRequest(message) => QueryError::Rejected(message),
            ManagerError::Cancelled => QueryError::Cancelled,
        }
    }
}

/// The database query workflow driver.
pub struct QueryWorkflow {
    manager: Arc<ModelManager>,
    validator: Arc<SqlSafetyValidator>,
    config: QueryWorkflowConfig,
}

impl QueryWorkflow {
    /// Create a workflow over the given manager and validator.
    pub fn new(
        manager: Arc<ModelManager>,
        validator: Arc<SqlSafetyValidator>,
        config: QueryWorkflowConfig,
    ) -> Self {
        Self {
            manager,
            validator,
            config,
        }
    }

    /// Run the pipeline to completion.
    pub async fn run(
        &self,
        request: &QueryRequest,
        token: &CancellationToken,
    ) -> Result<QueryResult, QueryError> {
        if request.query.trim().is_empty() {
            return Err(QueryError::Rejected("query text is empty".to_string()));
        }
        if request.schema.tables.is_empty() {
            return Err(QueryError::Rejected(
                "schema description has no tables".to_string(),
            ));
        }

        // Stage 1: analyze intent.
        let intent_prompt = analyze_intent_prompt(&request.query, &request.schema);
        let (intent, _log) = self
            .manager
            .generate(&GenerationRequest::new(intent_prompt), token)
            .await?;
        let implicated = reconcile_intent(&intent.content, &request.schema, &request.query);
        let scoped = request.schema.subset(&implicated);
        debug!(tables = ?scoped.table_names(), "intent analysis complete");

        // Stage 2 + 3: generate SQL, re-generating once on a parse error.
        let sql = self.generate_valid_sql(&request.query, &scoped, token).await?;

        // Stage 4: safety gate.
        let flags = self.validator.validate(&sql, &request.schema);
        if flags.iter().any(SafetyFlag::is_critical) {
            info!(flags = flags.len(), "query blocked by safety gate");
            return Ok(QueryResult {
                sql: None,
                explanation: blocked_explanation(&flags),
                alternatives: Vec::new(),
                safety_flags: flags,
            });
        }

        // Stage 5: explain.
        let explain_prompt = explain_prompt(&sql);
        let (explain, _log) = self
            .manager
            .generate(&GenerationRequest::new(explain_prompt), token)
            .await?;
        let explanation = if explain.content.trim().is_empty() {
            // Model declined to explain; derive a description from the AST.
            self.validator
                .parse(&sql)
                .ok()
                .map(|statements| describe_statements(&statements))
                .unwrap_or_else(|| "Executes the generated statement.".to_string())
        } else {
            explain.content.trim().to_string()
        };

        // Stage 6: alternatives (non-fatal).
        let alternatives = self
            .alternatives(&request.query, &scoped, &sql, &request.schema, token)
            .await;

        Ok(QueryResult {
            sql: Some(sql),
            explanation,
            alternatives,
            safety_flags: flags,
        })
    }

    /// Generate SQL and ensure it parses, feeding the parse error back
    /// for one regeneration before giving up.
    async fn generate_valid_sql(
        &self,
        query: &str,
        scoped: &SchemaDescription,
        token: &CancellationToken,
    ) -> Result<String, QueryError> {
        let prompt = generate_sql_prompt(query, scoped);
        let (first, _log) = self
            .manager
            .generate(&GenerationRequest::new(prompt), token)
            .await?;
        let candidate = extract_sql(&first.content);

        let parse_error = match self.parse_nonempty(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(detail) => detail,
        };

        warn!(error = %parse_error, "generated SQL failed to parse, regenerating");
        let retry_prompt = regenerate_sql_prompt(query, scoped, &parse_error);
        let (second, _log) = self
            .manager
            .generate(&GenerationRequest::new(retry_prompt), token)
            .await?;
        let candidate = extract_sql(&second.content);

        match self.parse_nonempty(&candidate) {
            Ok(()) => Ok(candidate),
            Err(detail) => Err(QueryError::SqlGenerationFailed { detail }),
        }
    }

    fn parse_nonempty(&self, sql: &str) -> Result<(), String> {
        if sql.trim().is_empty() {
            return Err("model produced no SQL statement".to_string());
        }
        match self.validator.parse(sql) {
            Ok(statements) if !statements.is_empty() => Ok(()),
            Ok(_) => Err("model produced no SQL statement".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Propose up to `max_alternatives` reformulations. Any failure here
    /// is non-fatal and shrinks the list, possibly to empty.
    async fn alternatives(
        &self,
        query: &str,
        scoped: &SchemaDescription,
        primary: &str,
        full_schema: &SchemaDescription,
        token: &CancellationToken,
    ) -> Vec<String> {
        if self.config.max_alternatives == 0 {
            return Vec::new();
        }

        let prompt = alternatives_prompt(query, scoped, primary, self.config.max_alternatives);
        let response = match self
            .manager
            .generate(&GenerationRequest::new(prompt), token)
            .await
        {
            Ok((text, _log)) => text.content,
            Err(err) => {
                debug!(error = %err, "alternative generation failed, returning none");
                return Vec::new();
            }
        };

        let mut alternatives = Vec::new();
        for line in response.split(';') {
            if alternatives.len() >= self.config.max_alternatives {
                break;
            }
            let candidate = extract_sql(line);
            if candidate.is_empty()
                || candidate.eq_ignore_ascii_case(primary)
                || alternatives.contains(&candidate)
            {
                continue;
            }
            if self.parse_nonempty(&candidate).is_err() {
                continue;
            }
            let flags = self.validator.validate(&candidate, full_schema);
            if flags.iter().any(SafetyFlag::is_critical) {
                continue;
            }
            alternatives.push(candidate);
        }
        alternatives
    }
}

// ============================================================================
// Prompt builders
// ============================================================================

fn analyze_intent_prompt(query: &str, schema: &SchemaDescription) -> String {
    format!(
        "Given this database schema:\n{}\n\nWhich tables and columns are needed \
         to answer the question below? List only their names.\n\nQuestion: {}",
        schema.describe(),
        query
    )
}

fn generate_sql_prompt(query: &str, scoped: &SchemaDescription) -> String {
    format!(
        "Write a single SQL statement answering the question below. Use only \
         these tables and columns:\n{}\n\nQuestion: {}\n\nOutput the SQL only.",
        scoped.describe(),
        query
    )
}

fn regenerate_sql_prompt(query: &str, scoped: &SchemaDescription, parse_error: &str) -> String {
    format!(
        "The previous SQL failed to parse: {}\n\nWrite a corrected single SQL \
         statement answering the question below. Use only these tables and \
         columns:\n{}\n\nQuestion: {}\n\nOutput the SQL only.",
        parse_error,
        scoped.describe(),
        query
    )
}

fn explain_prompt(sql: &str) -> String {
    format!(
        "Explain in one or two plain-English sentences what this SQL does:\n{}",
        sql
    )
}

fn alternatives_prompt(
    query: &str,
    scoped: &SchemaDescription,
    primary: &str,
    count: usize,
) -> String {
    format!(
        "Propose up to {} alternative SQL statements for the question below, \
         different from this one:\n{}\n\nSchema:\n{}\n\nQuestion: {}\n\n\
         Separate statements with semicolons; output SQL only.",
        count,
        primary,
        scoped.describe(),
        query
    )
}

// ============================================================================
// Pure helpers
// ============================================================================

/// Extract the SQL statement from a model response: strip code fences
/// and leading prose, keep from the first SQL keyword on, drop a
/// trailing semicolon.
pub fn extract_sql(text: &str) -> String {
    let mut cleaned = text.trim();
    if let Some(stripped) = cleaned.strip_prefix("```sql") {
        cleaned = stripped;
    } else if let Some(stripped) = cleaned.strip_prefix("```") {
        cleaned = stripped;
    }
    if let Some(stripped) = cleaned.strip_suffix("```") {
        cleaned = stripped;
    }
    let cleaned = cleaned.trim();

    let lower = cleaned.to_lowercase();
    let start = ["select", "insert", "update", "delete", "with"]
        .iter()
        .filter_map(|kw| lower.find(kw))
        .min();

    let sql = match start.and_then(|idx| cleaned.get(idx..)) {
        Some(tail) => tail,
        None => return String::new(),
    };
    sql.trim().trim_end_matches(';').trim().to_string()
}

/// Intersect the intent response with the schema; fall back to keyword
/// matching against the query itself, then to the whole schema.
pub fn reconcile_intent(
    response: &str,
    schema: &SchemaDescription,
    query: &str,
) -> Vec<String> {
    let response_lower = response.to_lowercase();
    let mut implicated: Vec<String> = schema
        .tables
        .iter()
        .filter(|t| response_lower.contains(&t.name.to_lowercase()))
        .map(|t| t.name.clone())
        .collect();

    if implicated.is_empty() {
        let query_lower = query.to_lowercase();
        implicated = schema
            .tables
            .iter()
            .filter(|t| query_lower.contains(&t.name.to_lowercase()))
            .map(|t| t.name.clone())
            .collect();
    }

    if implicated.is_empty() {
        implicated = schema.tables.iter().map(|t| t.name.clone()).collect();
    }
    implicated
}

/// Explanation for a blocked result. Names the violated rules without
/// reproducing the statement.
fn blocked_explanation(flags: &[SafetyFlag]) -> String {
    let reasons: Vec<&str> = flags
        .iter()
        .filter(|f| f.is_critical())
        .map(|f| f.message.as_str())
        .collect();
    format!(
        "The generated statement was withheld by safety validation: {}",
        reasons.join("; ")
    )
}

/// Deterministic fallback description derived from the parsed statement.
fn describe_statements(statements: &[Statement]) -> String {
    let Some(first) = statements.first() else {
        return "Executes the generated statement.".to_string();
    };
    match first {
        Statement::Query(query) => {
            let mut tables = Vec::new();
            if let SetExpr::Select(select) = query.body.as_ref() {
                for item in &select.from {
                    if let TableFactor::Table { name, .. } = &item.relation {
                        if let Some(ident) = name.0.last() {
                            tables.push(ident.value.clone());
                        }
                    }
                }
            }
            if tables.is_empty() {
                "Reads rows matching the request.".to_string()
            } else {
                format!("Reads rows from {}.", tables.join(", "))
            }
        }
        Statement::Insert { .. } => "Inserts new rows.".to_string(),
        Statement::Update { .. } => "Updates matching rows.".to_string(),
        Statement::Delete(_) => "Deletes matching rows.".to_string(),
        _ => "Executes the generated statement.".to_string(),
    }
}
