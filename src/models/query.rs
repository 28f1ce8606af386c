//! Query Request/Response Models
//!
//! Types exchanged with the database query workflow, including the
//! schema description the caller supplies and the safety flags the
//! validator raises.

use serde::{Deserialize, Serialize};

/// A single table in the caller-supplied schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Column names
    pub columns: Vec<String>,
    /// Approximate row count, when the caller knows it. Unknown counts
    /// are treated as large by the unbounded-scan heuristic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approx_rows: Option<u64>,
}

impl TableSchema {
    /// Create a table schema from a name and column list.
    pub fn new(name: impl Into<String>, columns: Vec<&str>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(|c| c.to_string()).collect(),
            approx_rows: None,
        }
    }

    /// Attach an approximate row count.
    pub fn with_approx_rows(mut self, rows: u64) -> Self {
        self.approx_rows = Some(rows);
        self
    }

    /// Case-insensitive column membership test.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// The schema the natural-language query is answered against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub tables: Vec<TableSchema>,
}

impl SchemaDescription {
    /// Create a schema description from tables.
    pub fn new(tables: Vec<TableSchema>) -> Self {
        Self { tables }
    }

    /// Case-insensitive table lookup.
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// All table names.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Subset of this schema restricted to the named tables. Falls back
    /// to the full schema when no named table matches.
    pub fn subset(&self, names: &[String]) -> SchemaDescription {
        let tables: Vec<TableSchema> = self
            .tables
            .iter()
            .filter(|t| names.iter().any(|n| n.eq_ignore_ascii_case(&t.name)))
            .cloned()
            .collect();
        if tables.is_empty() {
            self.clone()
        } else {
            SchemaDescription { tables }
        }
    }

    /// Render the schema for inclusion in a prompt.
    pub fn describe(&self) -> String {
        self.tables
            .iter()
            .map(|t| format!("table {} ({})", t.name, t.columns.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A natural-language query request. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The natural-language query
    pub query: String,
    /// Schema the query is answered against
    pub schema: SchemaDescription,
}

impl QueryRequest {
    /// Create a query request.
    pub fn new(query: impl Into<String>, schema: SchemaDescription) -> Self {
        Self {
            query: query.into(),
            schema,
        }
    }
}

/// Severity of a safety flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSeverity {
    /// Surfaced but does not block the result
    Warning,
    /// Blocks the SQL from being returned
    Critical,
}

/// Machine-readable safety rule identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyCode {
    DropStatement,
    TruncateStatement,
    DeleteWithoutWhere,
    UpdateWithoutWhere,
    UnknownTable,
    UnknownColumn,
    WildcardSelect,
    UnboundedScan,
}

/// A single finding from the safety validator.
///
/// Messages name the violated rule and, at most, an identifier — never
/// the statement text itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyFlag {
    pub severity: FlagSeverity,
    pub code: SafetyCode,
    pub message: String,
}

impl SafetyFlag {
    /// Create a critical flag.
    pub fn critical(code: SafetyCode, message: impl Into<String>) -> Self {
        Self {
            severity: FlagSeverity::Critical,
            code,
            message: message.into(),
        }
    }

    /// Create a warning flag.
    pub fn warning(code: SafetyCode, message: impl Into<String>) -> Self {
        Self {
            severity: FlagSeverity::Warning,
            code,
            message: message.into(),
        }
    }

    /// Whether this flag blocks the result.
    pub fn is_critical(&self) -> bool {
        self.severity == FlagSeverity::Critical
    }
}

/// Result of the database query workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Generated SQL. `None` when a critical safety flag was raised.
    pub sql: Option<String>,
    /// Natural-language explanation of the SQL (or of the block)
    pub explanation: String,
    /// Alternative formulations (0-2); empty on any generation trouble
    pub alternatives: Vec<String>,
    /// Safety flags raised by the validator; never silently dropped
    pub safety_flags: Vec<SafetyFlag>,
}

impl QueryResult {
    /// Whether the result was withheld by the safety gate.
    pub fn is_blocked(&self) -> bool {
        self.sql.is_none() && self.safety_flags.iter().any(SafetyFlag::is_critical)
    }
}
