//! Prompt construction, the Ollama chat call, and response post-processing.
//!
//! The backend's response shape is not trusted: extraction tries a closed
//! set of shapes in fixed priority and always yields some string. Malformed
//! model output is never an error; it degrades to best-effort formatting.

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::catalog::Catalog;
use crate::config::GenOptions;
use crate::error::Result;
use crate::sqltext;

/// Markers after which the model is explaining itself instead of answering.
const EXPLANATION_MARKERS: [&str; 4] = [
    "Explicación:",
    "Razonamiento:",
    "\n\nExplicación",
    "\nExplicación",
];

lazy_static! {
    static ref FENCE_RE: Regex = Regex::new(r"(?is)^```(?:sql)?\s*|\s*```$").unwrap();
    static ref CONTENT_RE: Regex = Regex::new(r#"(?s)content="(.*)""#).unwrap();
    static ref CONTENT_TAIL_RE: Regex = Regex::new(r#"";\s*\w+="#).unwrap();
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// One generator per mode: SQL and theory sessions get independently
/// configured instances instead of sharing ambient globals.
pub struct QueryGenerator {
    client: reqwest::Client,
    host: String,
    model: String,
    options: GenOptions,
    dialect: String,
    sql_only: bool,
    catalog: Option<Catalog>,
}

impl QueryGenerator {
    pub fn new(host: &str, model: &str, options: GenOptions, dialect: &str, sql_only: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            model: model.to_string(),
            options,
            dialect: dialect.to_string(),
            sql_only,
            catalog: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    fn system_prompt(&self) -> String {
        let mut parts = vec![
            "Eres un generador de SQL.".to_string(),
            format!("Dialecto objetivo: {}.", self.dialect),
            "Responde SOLAMENTE con sentencias SQL válidas (terminadas en ';').".to_string(),
            "No incluyas explicaciones, razones, ni texto fuera de SQL.".to_string(),
            "Usa sintaxis clara, JOINs explícitos y alias cortos si hacen falta.".to_string(),
            "Evita funciones no vistas en clase si la consulta puede resolverse con SQL básico."
                .to_string(),
        ];
        if self.sql_only {
            parts.push("ESTRICTO: Solo SQL, sin comentarios ni bloques de markdown.".to_string());
        }
        parts.join(" ")
    }

    /// Send the prompt to the backend and return the cleaned answer.
    ///
    /// No timeout and no retry: a backend failure, including a non-success
    /// HTTP status, propagates to the caller. In strict-SQL mode the answer
    /// goes through the full SQL pipeline; otherwise only fences are
    /// stripped and the prose is trimmed.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let system = self.system_prompt();
        let messages = vec![
            ChatMessage { role: "system", content: &system },
            ChatMessage { role: "user", content: prompt },
        ];
        let body = json!({
            "model": &self.model,
            "messages": messages,
            "stream": false,
            "options": &self.options,
        });

        debug!(host = %self.host, model = %self.model, "calling chat backend");
        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let raw = response.text().await?;

        let content = extract_content(&raw);
        if self.sql_only {
            Ok(postprocess_sql(&content))
        } else {
            Ok(strip_markdown_fences(&content).trim().to_string())
        }
    }

    /// Advisory catalog validation of already-generated SQL. Empty unless a
    /// catalog was supplied.
    pub fn validate(&self, sql: &str) -> Vec<String> {
        match &self.catalog {
            Some(catalog) => catalog.validate(sql, &self.dialect),
            None => Vec::new(),
        }
    }
}

/// Pull the assistant text out of whatever the backend returned.
///
/// Shapes are tried in fixed priority, each failing silently to the next,
/// so this always returns some string:
/// 1. JSON object with `message.content`
/// 2. typed chat-response object
/// 3. a bare JSON string body
/// 4. repr-style `content="..."` fallback
/// 5. the raw body itself
pub fn extract_content(raw: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        if let Some(content) = value
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
        {
            return content.to_string();
        }
        if let Ok(parsed) = serde_json::from_value::<ChatResponse>(value.clone()) {
            return parsed.message.content;
        }
        if let Some(text) = value.as_str() {
            return text.to_string();
        }
    }
    if let Some(caps) = CONTENT_RE.captures(raw) {
        if let Some(captured) = caps.get(1) {
            let captured = captured.as_str();
            // Some reprs run on with `"; tool_calls=...`; keep what precedes.
            return CONTENT_TAIL_RE
                .split(captured)
                .next()
                .unwrap_or(captured)
                .to_string();
        }
    }
    raw.to_string()
}

/// Remove a leading/trailing markdown fence, optionally tagged `sql`.
pub fn strip_markdown_fences(text: &str) -> String {
    FENCE_RE.replace_all(text.trim(), "").trim().to_string()
}

/// Drop everything from the first explanation marker onwards.
pub fn cut_explanations(text: &str) -> String {
    let mut text = text.to_string();
    for marker in EXPLANATION_MARKERS {
        if let Some(idx) = text.find(marker) {
            text.truncate(idx);
            text = text.trim().to_string();
        }
    }
    text
}

/// Clean model output down to formatted SQL: fences off, explanations cut,
/// statements split and reformatted with a guaranteed trailing semicolon.
/// If no statement boundary is found the whole text becomes one statement.
pub fn postprocess_sql(text: &str) -> String {
    let text = strip_markdown_fences(text);
    let text = cut_explanations(&text);
    // Cutting an explanation can expose a dangling closing fence.
    let text = strip_markdown_fences(&text);

    let statements = sqltext::split_statements(&text);
    if statements.is_empty() {
        return sqltext::format_statement(&text);
    }
    statements
        .iter()
        .map(|s| sqltext::format_statement(s))
        .join("\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences_with_and_without_tag() {
        assert_eq!(strip_markdown_fences("```sql\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(strip_markdown_fences("```\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(strip_markdown_fences("SELECT 1;"), "SELECT 1;");
    }

    #[test]
    fn test_cut_explanations_truncates_at_first_marker() {
        let text = "SELECT 1;\n\nExplicación: porque sí.";
        assert_eq!(cut_explanations(text), "SELECT 1;");
        let text = "SELECT 1;\nRazonamiento: detalle.";
        assert_eq!(cut_explanations(text), "SELECT 1;");
    }

    #[test]
    fn test_extract_content_from_chat_object() {
        let raw = r#"{"model":"m","message":{"role":"assistant","content":"SELECT 1;"}}"#;
        assert_eq!(extract_content(raw), "SELECT 1;");
    }

    #[test]
    fn test_extract_content_from_bare_json_string() {
        assert_eq!(extract_content(r#""SELECT 1;""#), "SELECT 1;");
    }

    #[test]
    fn test_extract_content_from_repr_fallback() {
        let raw = r#"Message(role=assistant, content="SELECT 1;"; tool_calls=[])"#;
        assert_eq!(extract_content(raw), "SELECT 1;");
    }

    #[test]
    fn test_extract_content_returns_raw_as_last_resort() {
        assert_eq!(extract_content("ni json ni repr"), "ni json ni repr");
    }
}
