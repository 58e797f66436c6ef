//! Runtime configuration: backend location, prompt budgets and the
//! per-mode sampling options sent to Ollama.
//!
//! Everything can be overridden from the environment (a `.env` file is
//! honored via `dotenv`); CLI flags override the environment in `main`.

use std::env;
use std::path::PathBuf;

use serde::Serialize;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5-coder:1.5b";
pub const DEFAULT_SCHEMA_DIR: &str = "schemas";
pub const DEFAULT_CONTEXT_PATH: &str = "instructor_context.txt";
pub const DEFAULT_DIALECT: &str = "MySQL";

/// Character budget for the schema context embedded in SQL-mode prompts.
pub const DEFAULT_MAX_SCHEMA_CHARS: usize = 4000;

/// Output-token caps: enough for 2-3 SQL statements, more room for prose.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 256;
pub const DEFAULT_THEORY_MAX_OUTPUT_TOKENS: u32 = 800;

/// Generation options forwarded verbatim as the Ollama `options` record.
#[derive(Debug, Clone, Serialize)]
pub struct GenOptions {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl GenOptions {
    /// Near-deterministic sampling for SQL generation, with stop sequences
    /// that cut the model off when it starts explaining itself.
    pub fn sql_defaults(num_predict: u32) -> Self {
        Self {
            temperature: 0.05,
            top_k: 40,
            top_p: 0.8,
            num_predict,
            stop: Some(vec![
                "Explicación:".to_string(),
                "Razonamiento:".to_string(),
                "\n\nExplicación".to_string(),
            ]),
        }
    }

    /// Slightly looser sampling for theory answers; no stop sequences.
    pub fn theory_defaults(num_predict: u32) -> Self {
        Self {
            temperature: 0.2,
            top_k: 50,
            top_p: 0.9,
            num_predict,
            stop: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub model: String,
    pub schema_dir: PathBuf,
    pub context_path: PathBuf,
    pub dialect: String,
    pub strict_sql_only: bool,
    pub allow_theory: bool,
    pub validate_sql: bool,
    pub max_schema_chars: usize,
    pub sql_options: GenOptions,
    pub theory_options: GenOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            schema_dir: PathBuf::from(DEFAULT_SCHEMA_DIR),
            context_path: PathBuf::from(DEFAULT_CONTEXT_PATH),
            dialect: DEFAULT_DIALECT.to_string(),
            strict_sql_only: true,
            allow_theory: true,
            validate_sql: false,
            max_schema_chars: DEFAULT_MAX_SCHEMA_CHARS,
            sql_options: GenOptions::sql_defaults(DEFAULT_MAX_OUTPUT_TOKENS),
            theory_options: GenOptions::theory_defaults(DEFAULT_THEORY_MAX_OUTPUT_TOKENS),
        }
    }
}

impl Config {
    /// Build a config from the defaults plus any recognized environment
    /// variables. Unparseable values fall back to the default silently.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = env::var("OLLAMA_HOST") {
            cfg.host = v;
        }
        if let Ok(v) = env::var("OLLAMA_MODEL") {
            cfg.model = v;
        }
        if let Ok(v) = env::var("DB_SCHEMA_DIR") {
            cfg.schema_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("INSTRUCTOR_CONTEXT_PATH") {
            cfg.context_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SQL_DIALECT") {
            cfg.dialect = v;
        }
        if let Some(v) = env_parse("MAX_SCHEMA_CHARS") {
            cfg.max_schema_chars = v;
        }
        if let Some(v) = env_parse("MAX_OUTPUT_TOKENS") {
            cfg.sql_options.num_predict = v;
        }
        if let Some(v) = env_parse("THEORY_MAX_OUTPUT_TOKENS") {
            cfg.theory_options.num_predict = v;
        }
        if let Some(v) = env_parse("STRICT_SQL_ONLY") {
            cfg.strict_sql_only = v;
        }
        if let Some(v) = env_parse("ALLOW_THEORY_MODE") {
            cfg.allow_theory = v;
        }
        if let Some(v) = env_parse("VALIDATE_SQL") {
            cfg.validate_sql = v;
        }
        cfg
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_defaults_carry_stop_sequences() {
        let opts = GenOptions::sql_defaults(DEFAULT_MAX_OUTPUT_TOKENS);
        let stops = opts.stop.expect("SQL mode must have stop sequences");
        assert!(stops.iter().any(|s| s.starts_with("Explicación")));
        assert_eq!(opts.num_predict, 256);
    }

    #[test]
    fn test_theory_defaults_have_no_stops() {
        let opts = GenOptions::theory_defaults(DEFAULT_THEORY_MAX_OUTPUT_TOKENS);
        assert!(opts.stop.is_none());
        assert_eq!(opts.num_predict, 800);
    }

    #[test]
    fn test_options_serialize_skips_missing_stop() {
        let json = serde_json::to_value(GenOptions::theory_defaults(10)).unwrap();
        assert!(json.get("stop").is_none());
        assert_eq!(json["num_predict"], 10);
    }
}
