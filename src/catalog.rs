//! Optional advisory validation of generated SQL against a known catalog.
//!
//! The catalog is an externally supplied table → column map; the loader does
//! not populate it. Validation never blocks or rewrites the SQL; it only
//! collects human-readable findings, including parse failures.

use std::collections::{BTreeMap, HashSet};
use std::ops::ControlFlow;

use sqlparser::ast::{visit_expressions, visit_relations, Expr, Statement};
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect};
use sqlparser::parser::Parser;

use crate::sqltext;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<String, HashSet<String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table and its columns; names are normalized to lowercase.
    pub fn with_table<S: AsRef<str>>(mut self, table: &str, columns: &[S]) -> Self {
        let cols = columns
            .iter()
            .map(|c| c.as_ref().to_lowercase())
            .collect::<HashSet<_>>();
        self.tables.insert(table.to_lowercase(), cols);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Check every statement in `sql` and return advisory findings:
    /// parse failures, unknown tables, unknown columns. An empty catalog
    /// validates nothing.
    ///
    /// Table aliases are not resolved, so aliased references can show up
    /// as unknown tables; findings are advisory, never authoritative.
    pub fn validate(&self, sql: &str, dialect: &str) -> Vec<String> {
        let mut findings = Vec::new();
        if self.tables.is_empty() {
            return findings;
        }
        let dialect = dialect_for(dialect);
        for stmt_text in sqltext::split_statements(sql) {
            let parsed = match Parser::parse_sql(dialect.as_ref(), &stmt_text) {
                Ok(parsed) => parsed,
                Err(err) => {
                    findings.push(format!("invalid syntax: {err}"));
                    continue;
                }
            };
            for stmt in &parsed {
                self.check_tables(stmt, &mut findings);
                self.check_columns(stmt, &mut findings);
            }
        }
        findings
    }

    fn check_tables(&self, stmt: &Statement, findings: &mut Vec<String>) {
        let _ = visit_relations(stmt, |relation| {
            if let Some(ident) = relation.0.last() {
                let table = ident.value.to_lowercase();
                if !self.tables.contains_key(&table) {
                    findings.push(format!("table not in schema: {table}"));
                }
            }
            ControlFlow::<()>::Continue(())
        });
    }

    fn check_columns(&self, stmt: &Statement, findings: &mut Vec<String>) {
        let _ = visit_expressions(stmt, |expr| {
            match expr {
                Expr::Identifier(ident) => {
                    let column = ident.value.to_lowercase();
                    if !self.has_column_anywhere(&column) {
                        findings.push(format!(
                            "column '{column}' not in schema (unqualified)"
                        ));
                    }
                }
                Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                    let column = parts[parts.len() - 1].value.to_lowercase();
                    let table = parts[parts.len() - 2].value.to_lowercase();
                    match self.tables.get(&table) {
                        None => findings.push(format!("table not in schema: {table}")),
                        Some(cols) if !cols.contains(&column) => findings
                            .push(format!("column '{table}.{column}' not in schema")),
                        Some(_) => {}
                    }
                }
                _ => {}
            }
            ControlFlow::<()>::Continue(())
        });
    }

    fn has_column_anywhere(&self, column: &str) -> bool {
        self.tables.values().any(|cols| cols.contains(column))
    }
}

fn dialect_for(name: &str) -> Box<dyn Dialect> {
    match name.to_lowercase().as_str() {
        "mysql" => Box::new(MySqlDialect {}),
        _ => Box::new(GenericDialect {}),
    }
}
