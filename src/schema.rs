//! Schema loading and relevance-based context selection.
//!
//! Schemas are plain `.sql` files in a directory; each becomes a minified
//! text blob plus a best-effort set of the table names it touches. The
//! collection is loaded once at startup and never mutated afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::error::Result;
use crate::sqltext;

/// Characters reserved per selected schema for its `-- SCHEMA:` header.
pub const SCHEMA_ENTRY_OVERHEAD: usize = 100;

lazy_static! {
    static ref CREATE_TABLE_RE: Regex =
        Regex::new(r#"(?i)\bCREATE\s+TABLE\s+[`"]?([A-Za-z0-9_]+)[`"]?"#).unwrap();
    static ref ALTER_TABLE_RE: Regex =
        Regex::new(r#"(?i)\bALTER\s+TABLE\s+[`"]?([A-Za-z0-9_]+)[`"]?"#).unwrap();
    static ref DML_TABLE_RE: Regex =
        Regex::new(r#"(?i)\b(?:INSERT\s+INTO|UPDATE|DELETE\s+FROM)\s+[`"]?([A-Za-z0-9_]+)[`"]?"#)
            .unwrap();
}

/// Extract the table names referenced by DDL/DML statements.
///
/// This is a fixed pattern-matching heuristic, not a parse: it does not see
/// subqueries or CTEs and may over- or under-match. Good enough to rank
/// schemas against a question.
pub fn extract_tables(sql: &str) -> HashSet<String> {
    let mut tables = HashSet::new();
    for re in [&*CREATE_TABLE_RE, &*ALTER_TABLE_RE, &*DML_TABLE_RE] {
        for caps in re.captures_iter(sql) {
            if let Some(name) = caps.get(1) {
                tables.insert(name.as_str().to_lowercase());
            }
        }
    }
    tables
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub text: String,
    pub tables: HashSet<String>,
}

impl Schema {
    /// Textual relevance of this schema to a question: +3 when the schema
    /// name appears in the question, +2 per mentioned table.
    pub fn score(&self, question: &str) -> i64 {
        let q = question.to_lowercase();
        let mut score = 0;
        if q.contains(&self.name.to_lowercase()) {
            score += 3;
        }
        score += 2 * self.tables.iter().filter(|t| q.contains(t.as_str())).count() as i64;
        score
    }
}

/// The immutable collection of loaded schemas.
#[derive(Debug, Default)]
pub struct SchemaStore {
    schemas: Vec<Schema>,
}

impl SchemaStore {
    /// Scan `dir` for `.sql` files. A missing directory is created and
    /// yields an empty store; the operator is expected to add files.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!("schema directory '{}' created, waiting for .sql files", dir.display());
            return Ok(Self::default());
        }

        let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());

        let mut schemas = Vec::new();
        for entry in entries {
            let path = entry.path();
            let is_sql = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("sql"));
            if !is_sql {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = fs::read_to_string(&path)?;
            let text = sqltext::minify_sql(&raw);
            let tables = extract_tables(&text);
            info!(
                "schema loaded: {} (tables: {})",
                stem,
                tables.iter().sorted().join(", ")
            );
            schemas.push(Schema {
                name: stem.to_string(),
                text,
                tables,
            });
        }
        Ok(Self { schemas })
    }

    pub fn from_schemas(schemas: Vec<Schema>) -> Self {
        Self { schemas }
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// Concatenate the most relevant schemas for `question`, bounded by
    /// `max_chars`.
    ///
    /// Candidates are ordered by descending score, then ascending size so
    /// more of them fit. A candidate that would blow the budget is skipped
    /// outright, never truncated. The first candidate is the exception: it
    /// is always accepted, so when any schema exists the context is never
    /// empty, even if that sole pick overshoots the budget.
    pub fn schema_context(&self, question: &str, max_chars: usize) -> String {
        if self.schemas.is_empty() {
            return String::new();
        }

        let mut ordered: Vec<&Schema> = self.schemas.iter().collect();
        ordered.sort_by_key(|s| (-s.score(question), s.text.len()));

        let mut selected: Vec<&Schema> = Vec::new();
        let mut total = 0usize;
        for schema in ordered {
            if total + schema.text.len() + SCHEMA_ENTRY_OVERHEAD > max_chars
                && !selected.is_empty()
            {
                continue;
            }
            total += schema.text.len();
            selected.push(schema);
        }

        selected
            .iter()
            .map(|s| format!("-- SCHEMA: {}\n{}\n", s.name, s.text))
            .join("\n")
    }
}
