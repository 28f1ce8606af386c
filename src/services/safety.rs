//! SQL Safety Validator
//!
//! Deterministic, non-model-based inspection of generated SQL. Pure and
//! side-effect-free so the rule set is unit-testable against a fixed
//! statement corpus, independent of any workflow.
//!
//! Two layers run over every statement:
//!
//! 1. A raw-text layer: comments stripped, whitespace collapsed,
//!    case-folded, then matched against the critical patterns. This
//!    catches obfuscated variants the parser may normalize away or
//!    reject.
//! 2. An AST layer (`sqlparser`, generic dialect): statement-shape
//!    checks (DELETE/UPDATE without WHERE) and schema checks (unknown
//!    tables/columns, wildcard projections, unbounded scans).
//!
//! Flag messages name the violated rule and at most an identifier —
//! never the statement text itself.

use regex::Regex;
use sqlparser::ast::{
    Expr, FromTable, Query, Select, SelectItem, SetExpr, Statement, TableFactor, TableWithJoins,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserError};
use std::collections::HashMap;

use crate::models::query::{SafetyCode, SafetyFlag, SchemaDescription};

/// Validator tuning.
#[derive(Debug, Clone)]
pub struct SafetyConfig {
    /// Row-count heuristic above which an unbounded scan draws a warning.
    /// Tables with unknown row counts are treated as exceeding it.
    pub scan_warn_rows: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            scan_warn_rows: 10_000,
        }
    }
}

/// Pure SQL safety validator.
pub struct SqlSafetyValidator {
    config: SafetyConfig,
    dialect: GenericDialect,
    re_drop: Regex,
    re_truncate: Regex,
    re_delete: Regex,
    re_update: Regex,
    re_where: Regex,
}

impl SqlSafetyValidator {
    /// Create a validator with the given tuning.
    pub fn new(config: SafetyConfig) -> Self {
        Self {
            config,
            dialect: GenericDialect {},
            re_drop: Regex::new(r"\bdrop\s+(table|database|schema|view|index)\b")
                .expect("valid drop pattern"),
            re_truncate: Regex::new(r"\btruncate\b").expect("valid truncate pattern"),
            re_delete: Regex::new(r"\bdelete\s+from\b").expect("valid delete pattern"),
            re_update: Regex::new(r"\bupdate\s+\S+\s+set\b").expect("valid update pattern"),
            re_where: Regex::new(r"\bwhere\b").expect("valid where pattern"),
        }
    }

    /// Parse SQL with the same parser the query workflow's syntax stage
    /// uses, so every returned statement is known to re-parse.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, ParserError> {
        Parser::parse_sql(&self.dialect, sql)
    }

    /// Validate SQL against the schema. Returns all flags raised,
    /// critical first; an empty vector means the statement is clean.
    pub fn validate(&self, sql: &str, schema: &SchemaDescription) -> Vec<SafetyFlag> {
        let mut flags = Vec::new();

        let normalized = normalize_sql(sql);
        for statement_text in normalized.split(';') {
            self.raw_scan(statement_text, &mut flags);
        }

        if let Ok(statements) = self.parse(sql) {
            for statement in &statements {
                self.check_statement(statement, schema, &mut flags);
            }
        }

        dedupe(&mut flags);
        flags.sort_by_key(|f| if f.is_critical() { 0 } else { 1 });
        flags
    }

    /// Raw-text layer over one normalized statement.
    fn raw_scan(&self, statement: &str, flags: &mut Vec<SafetyFlag>) {
        if self.re_drop.is_match(statement) {
            flags.push(SafetyFlag::critical(
                SafetyCode::DropStatement,
                "DROP statement is not permitted",
            ));
        }
        if self.re_truncate.is_match(statement) {
            flags.push(SafetyFlag::critical(
                SafetyCode::TruncateStatement,
                "TRUNCATE statement is not permitted",
            ));
        }
        if self.re_delete.is_match(statement) && !self.re_where.is_match(statement) {
            flags.push(SafetyFlag::critical(
                SafetyCode::DeleteWithoutWhere,
                "DELETE statement has no WHERE clause",
            ));
        }
        if self.re_update.is_match(statement) && !self.re_where.is_match(statement) {
            flags.push(SafetyFlag::critical(
                SafetyCode::UpdateWithoutWhere,
                "UPDATE statement has no WHERE clause",
            ));
        }
    }

    /// AST layer over one parsed statement.
    fn check_statement(
        &self,
        statement: &Statement,
        schema: &SchemaDescription,
        flags: &mut Vec<SafetyFlag>,
    ) {
        match statement {
            Statement::Drop { .. } => {
                flags.push(SafetyFlag::critical(
                    SafetyCode::DropStatement,
                    "DROP statement is not permitted",
                ));
            }
            Statement::Truncate { .. } => {
                flags.push(SafetyFlag::critical(
                    SafetyCode::TruncateStatement,
                    "TRUNCATE statement is not permitted",
                ));
            }
            Statement::Delete(delete) => {
                if delete.selection.is_none() {
                    flags.push(SafetyFlag::critical(
                        SafetyCode::DeleteWithoutWhere,
                        "DELETE statement has no WHERE clause",
                    ));
                }
                let from = match &delete.from {
                    FromTable::WithFromKeyword(tables) => tables,
                    FromTable::WithoutKeyword(tables) => tables,
                };
                for table in from {
                    self.check_table_factor(&table.relation, schema, flags);
                }
            }
            Statement::Update {
                table, selection, ..
            } => {
                if selection.is_none() {
                    flags.push(SafetyFlag::critical(
                        SafetyCode::UpdateWithoutWhere,
                        "UPDATE statement has no WHERE clause",
                    ));
                }
                self.check_table_factor(&table.relation, schema, flags);
            }
            Statement::Query(query) => {
                self.check_query(query, schema, flags);
            }
            _ => {}
        }
    }

    fn check_query(&self, query: &Query, schema: &SchemaDescription, flags: &mut Vec<SafetyFlag>) {
        if let SetExpr::Select(select) = query.body.as_ref() {
            self.check_select(select, query.limit.is_none(), schema, flags);
        }
    }

    fn check_select(
        &self,
        select: &Select,
        no_limit: bool,
        schema: &SchemaDescription,
        flags: &mut Vec<SafetyFlag>,
    ) {
        // Aliases of known tables; derived tables map to None so their
        // columns are exempt from schema checks.
        let mut aliases: HashMap<String, Option<String>> = HashMap::new();
        let mut referenced: Vec<String> = Vec::new();

        for table in &select.from {
            self.collect_tables(table, schema, flags, &mut aliases, &mut referenced);
        }

        // Wildcard projections.
        for item in &select.projection {
            if matches!(
                item,
                SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(_, _)
            ) {
                flags.push(SafetyFlag::warning(
                    SafetyCode::WildcardSelect,
                    "wildcard projection (SELECT *) returns every column",
                ));
            }
        }

        // Column references in projection and WHERE.
        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                    self.check_expr(expr, schema, &aliases, &referenced, flags);
                }
                _ => {}
            }
        }
        if let Some(selection) = &select.selection {
            self.check_expr(selection, schema, &aliases, &referenced, flags);
        }

        // Unbounded scan heuristic.
        if no_limit && select.selection.is_none() {
            let biggest = referenced
                .iter()
                .map(|name| {
                    schema
                        .table(name)
                        .and_then(|t| t.approx_rows)
                        .unwrap_or(u64::MAX)
                })
                .max();
            if matches!(biggest, Some(rows) if rows > self.config.scan_warn_rows) {
                flags.push(SafetyFlag::warning(
                    SafetyCode::UnboundedScan,
                    "full-table scan with no WHERE or LIMIT on a large table",
                ));
            }
        }
    }

    fn collect_tables(
        &self,
        table: &TableWithJoins,
        schema: &SchemaDescription,
        flags: &mut Vec<SafetyFlag>,
        aliases: &mut HashMap<String, Option<String>>,
        referenced: &mut Vec<String>,
    ) {
        self.collect_table_factor(&table.relation, schema, flags, aliases, referenced);
        for join in &table.joins {
            self.collect_table_factor(&join.relation, schema, flags, aliases, referenced);
        }
    }

    fn collect_table_factor(
        &self,
        factor: &TableFactor,
        schema: &SchemaDescription,
        flags: &mut Vec<SafetyFlag>,
        aliases: &mut HashMap<String, Option<String>>,
        referenced: &mut Vec<String>,
    ) {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let table_name = name
                    .0
                    .last()
                    .map(|ident| ident.value.clone())
                    .unwrap_or_default();
                if schema.table(&table_name).is_none() {
                    flags.push(SafetyFlag::critical(
                        SafetyCode::UnknownTable,
                        format!("references unknown table '{}'", table_name),
                    ));
                } else {
                    referenced.push(table_name.clone());
                }
                let key = alias
                    .as_ref()
                    .map(|a| a.name.value.clone())
                    .unwrap_or_else(|| table_name.clone());
                aliases.insert(key.to_lowercase(), Some(table_name));
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                self.check_query(subquery, schema, flags);
                if let Some(alias) = alias {
                    aliases.insert(alias.name.value.to_lowercase(), None);
                }
            }
            _ => {}
        }
    }

    fn check_table_factor(
        &self,
        factor: &TableFactor,
        schema: &SchemaDescription,
        flags: &mut Vec<SafetyFlag>,
    ) {
        let mut aliases = HashMap::new();
        let mut referenced = Vec::new();
        self.collect_table_factor(factor, schema, flags, &mut aliases, &mut referenced);
    }

    /// Recursively check column identifiers inside an expression.
    fn check_expr(
        &self,
        expr: &Expr,
        schema: &SchemaDescription,
        aliases: &HashMap<String, Option<String>>,
        referenced: &[String],
        flags: &mut Vec<SafetyFlag>,
    ) {
        match expr {
            Expr::Identifier(ident) => {
                let column = &ident.value;
                let known = referenced.iter().any(|table| {
                    schema
                        .table(table)
                        .map(|t| t.has_column(column))
                        .unwrap_or(false)
                });
                if !known && !referenced.is_empty() {
                    flags.push(SafetyFlag::critical(
                        SafetyCode::UnknownColumn,
                        format!("references unknown column '{}'", column),
                    ));
                }
            }
            Expr::CompoundIdentifier(parts) => {
                if parts.len() >= 2 {
                    let qualifier = parts[0].value.to_lowercase();
                    let column = &parts[parts.len() - 1].value;
                    match aliases.get(&qualifier) {
                        Some(Some(table)) => {
                            let known = schema
                                .table(table)
                                .map(|t| t.has_column(column))
                                .unwrap_or(false);
                            if !known {
                                flags.push(SafetyFlag::critical(
                                    SafetyCode::UnknownColumn,
                                    format!("references unknown column '{}'", column),
                                ));
                            }
                        }
                        Some(None) => {} // derived table, columns unknowable
                        None => {
                            flags.push(SafetyFlag::critical(
                                SafetyCode::UnknownTable,
                                format!("references unknown table '{}'", parts[0].value),
                            ));
                        }
                    }
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                self.check_expr(left, schema, aliases, referenced, flags);
                self.check_expr(right, schema, aliases, referenced, flags);
            }
            Expr::UnaryOp { expr, .. } | Expr::Nested(expr) => {
                self.check_expr(expr, schema, aliases, referenced, flags);
            }
            Expr::IsNull(expr) | Expr::IsNotNull(expr) => {
                self.check_expr(expr, schema, aliases, referenced, flags);
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.check_expr(expr, schema, aliases, referenced, flags);
                self.check_expr(low, schema, aliases, referenced, flags);
                self.check_expr(high, schema, aliases, referenced, flags);
            }
            Expr::InList { expr, list, .. } => {
                self.check_expr(expr, schema, aliases, referenced, flags);
                for item in list {
                    self.check_expr(item, schema, aliases, referenced, flags);
                }
            }
            Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
                self.check_expr(expr, schema, aliases, referenced, flags);
                self.check_expr(pattern, schema, aliases, referenced, flags);
            }
            Expr::InSubquery { expr, subquery, .. } => {
                self.check_expr(expr, schema, aliases, referenced, flags);
                self.check_query(subquery, schema, flags);
            }
            Expr::Subquery(query) => {
                self.check_query(query, schema, flags);
            }
            _ => {}
        }
    }
}

impl Default for SqlSafetyValidator {
    fn default() -> Self {
        Self::new(SafetyConfig::default())
    }
}

/// Strip SQL comments, collapse whitespace, and case-fold.
fn normalize_sql(sql: &str) -> String {
    let mut stripped = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
                stripped.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                stripped.push(' ');
            }
            _ => stripped.push(c),
        }
    }

    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drop duplicate flags (same code and message), keeping first occurrence.
fn dedupe(flags: &mut Vec<SafetyFlag>) {
    let mut seen: Vec<(SafetyCode, String)> = Vec::new();
    flags.retain(|flag| {
        let key = (flag.code, flag.message.clone());
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}
