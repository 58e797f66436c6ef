//! Interactive chat loop: mode handling, meta-commands and per-turn timing.
//!
//! One turn is strictly sequential: read a line, call the backend, print.
//! The only state carried across turns is the mode flag; the schema store
//! is read-only after startup. A backend failure is not caught here: it
//! propagates and ends the session.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;

use tracing::warn;

use crate::error::Result;
use crate::generator::QueryGenerator;
use crate::schema::SchemaStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sql,
    Theory,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Sql => "SQL",
            Mode::Theory => "TEORÍA",
        }
    }
}

/// Read the instructor-context file; a missing or unreadable file is a
/// soft condition that leaves the SQL prompt without style examples.
pub fn load_instructor_context(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            warn!("instructor context '{}' not loaded: {}", path.display(), err);
            String::new()
        }
    }
}

/// SQL-mode user content: instructor examples, the question, the selected
/// schema context and a dialect directive.
pub fn sql_prompt(
    instructor_context: &str,
    question: &str,
    schema_context: &str,
    dialect: &str,
) -> String {
    format!(
        "{instructor_context}\n\n\
         Pregunta: {question}\n\n\
         Esquemas (referencia):\n{schema_context}\n\n\
         Responde SOLO con SQL válido de {dialect}, sin explicación."
    )
    .trim()
    .to_string()
}

/// Theory-mode user content. The instructor context is deliberately left
/// out: it pushes the model back towards emitting SQL.
pub fn theory_prompt(question: &str, dialect: &str) -> String {
    format!(
        "Pregunta teórica de Bases de Datos:\n{question}\n\n\
         Responde como profesor: breve, claro y orientado a examen. \
         Usa viñetas cuando ayude y ejemplos simples. \
         No generes SQL salvo que lo pida explícitamente. Si lo piden, usa {dialect}."
    )
}

pub struct Session {
    pub store: SchemaStore,
    pub gen_sql: QueryGenerator,
    /// Present only when theory mode is permitted by configuration.
    pub gen_theory: Option<QueryGenerator>,
    pub instructor_context: String,
    pub dialect: String,
    pub max_schema_chars: usize,
    pub validate_sql: bool,
    pub mode: Mode,
}

impl Session {
    pub async fn run(&mut self) -> Result<()> {
        println!("Listo. Modo actual: {}", self.mode.label());
        println!(
            "Comandos rápidos: ':sql' (modo SQL), ':teoria' (modo teoría), \
             ':modo' (ver modo), 'salir' (terminar)."
        );
        println!("Escribe tu pedido.\n");

        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            print!("Tú: ");
            io::stdout().flush()?;
            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            let question = line.trim();
            if question.is_empty() {
                continue;
            }

            match question.to_lowercase().as_str() {
                "salir" | "exit" | "quit" => {
                    println!("¡Hasta luego!");
                    break;
                }
                ":sql" => {
                    self.mode = Mode::Sql;
                    println!("→ Modo cambiado a SQL.");
                    continue;
                }
                ":teoria" => {
                    if self.gen_theory.is_some() {
                        self.mode = Mode::Theory;
                        println!("→ Modo cambiado a TEORÍA.");
                    } else {
                        println!("→ El modo teoría no está habilitado.");
                    }
                    continue;
                }
                ":modo" => {
                    println!("→ Modo actual: {}", self.mode.label());
                    continue;
                }
                _ => {}
            }

            let start = Instant::now();
            let response = self.answer(question).await?;
            println!("\n--- Respuesta ---\n");
            println!("{response}");
            println!(
                "\n--- Tiempo de respuesta: {:.2} segundos ---\n",
                start.elapsed().as_secs_f64()
            );
        }
        Ok(())
    }

    async fn answer(&self, question: &str) -> Result<String> {
        match (self.mode, &self.gen_theory) {
            (Mode::Theory, Some(gen)) => gen.generate(&theory_prompt(question, &self.dialect)).await,
            _ => {
                let schema_context = self.store.schema_context(question, self.max_schema_chars);
                let prompt = sql_prompt(
                    &self.instructor_context,
                    question,
                    &schema_context,
                    &self.dialect,
                );
                let sql = self.gen_sql.generate(&prompt).await?;
                if self.validate_sql {
                    for finding in self.gen_sql.validate(&sql) {
                        println!("[AVISO VALIDACIÓN] {finding}");
                    }
                }
                Ok(sql)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_prompt_embeds_all_sections() {
        let prompt = sql_prompt(
            "-- ejemplos del instructor",
            "¿cuántos estudiantes hay?",
            "-- SCHEMA: escuela\nCREATE TABLE estudiantes (id INT);",
            "MySQL",
        );
        assert!(prompt.starts_with("-- ejemplos del instructor"));
        assert!(prompt.contains("Pregunta: ¿cuántos estudiantes hay?"));
        assert!(prompt.contains("-- SCHEMA: escuela"));
        assert!(prompt.contains("SQL válido de MySQL"));
    }

    #[test]
    fn test_sql_prompt_without_instructor_context_is_trimmed() {
        let prompt = sql_prompt("", "pregunta", "ctx", "MySQL");
        assert!(prompt.starts_with("Pregunta: pregunta"));
    }

    #[test]
    fn test_theory_prompt_mentions_dialect_but_discourages_sql() {
        let prompt = theory_prompt("¿qué es una clave foránea?", "MySQL");
        assert!(prompt.contains("¿qué es una clave foránea?"));
        assert!(prompt.contains("No generes SQL"));
        assert!(prompt.contains("MySQL"));
    }
}
