use std::collections::HashSet;
use std::fs;

use sql_tutor::schema::{extract_tables, Schema, SchemaStore};
use tempfile::tempdir;

fn schema(name: &str, text: &str, tables: &[&str]) -> Schema {
    Schema {
        name: name.to_string(),
        text: text.to_string(),
        tables: tables.iter().map(|t| t.to_string()).collect::<HashSet<_>>(),
    }
}

#[test]
fn test_non_sql_files_yield_empty_store() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notas.txt"), "no es un esquema").unwrap();
    fs::write(dir.path().join("README.md"), "# docs").unwrap();

    let store = SchemaStore::load(dir.path()).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_missing_directory_is_created_and_empty() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("schemas");
    assert!(!target.exists());

    let store = SchemaStore::load(&target).unwrap();
    assert!(store.is_empty());
    assert!(target.exists());
}

#[test]
fn test_load_minifies_and_indexes_tables() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("escuela.sql"),
        "-- tablas de la escuela\ncreate table estudiantes (id INT);\n",
    )
    .unwrap();

    let store = SchemaStore::load(dir.path()).unwrap();
    assert_eq!(store.len(), 1);
    let loaded = &store.schemas()[0];
    assert_eq!(loaded.name, "escuela");
    assert!(loaded.text.contains("CREATE TABLE estudiantes"));
    assert!(!loaded.text.contains("tablas de la escuela"));
    assert!(loaded.tables.contains("estudiantes"));
}

#[test]
fn test_matching_schema_outranks_and_sorts_first() {
    // Two schemas identical except that only one can match the question.
    let store = SchemaStore::from_schemas(vec![
        schema("otros", "CREATE TABLE ajenos (id INT);", &["ajenos"]),
        schema("escuela", "CREATE TABLE estudiantes (id INT);", &["estudiantes"]),
    ]);

    let ctx = store.schema_context("¿cuántos estudiantes hay?", 4000);
    let escuela_at = ctx.find("-- SCHEMA: escuela").unwrap();
    let otros_at = ctx.find("-- SCHEMA: otros").unwrap();
    assert!(escuela_at < otros_at, "matched schema must come first");
}

#[test]
fn test_budget_skips_oversized_candidates_entirely() {
    let small = "CREATE TABLE a (id INT);";
    let big = "x".repeat(500);
    let store = SchemaStore::from_schemas(vec![
        schema("chico", small, &[]),
        schema("grande", &big, &[]),
    ]);

    let ctx = store.schema_context("sin coincidencias", 200);
    assert!(ctx.contains("-- SCHEMA: chico"));
    assert!(!ctx.contains("-- SCHEMA: grande"), "oversized schema must be skipped, not truncated");
    assert!(ctx.len() <= 200);
}

#[test]
fn test_first_candidate_accepted_even_when_oversized() {
    // Named invariant: the context is never empty while any schema exists,
    // even if the sole pick overshoots the budget.
    let big = "x".repeat(500);
    let store = SchemaStore::from_schemas(vec![schema("grande", &big, &[])]);

    let ctx = store.schema_context("cualquier pregunta", 100);
    assert!(ctx.contains("-- SCHEMA: grande"));
    assert!(ctx.len() > 100);
}

#[test]
fn test_empty_store_gives_empty_context() {
    let store = SchemaStore::from_schemas(Vec::new());
    assert_eq!(store.schema_context("pregunta", 4000), "");
}

#[test]
fn test_students_schema_selected_for_spanish_question() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("students.sql"),
        "CREATE TABLE students (id INT, name VARCHAR(50));",
    )
    .unwrap();

    let store = SchemaStore::load(dir.path()).unwrap();
    let ctx = store.schema_context("muéstrame los nombres de los estudiantes", 4000);
    assert!(ctx.contains("-- SCHEMA: students"));
    assert!(ctx.contains("CREATE TABLE students"));
}

#[test]
fn test_extract_tables_handles_quoted_identifiers() {
    let tables = extract_tables("INSERT INTO `notas` VALUES (1); UPDATE \"cursos\" SET x = 1;");
    assert!(tables.contains("notas"));
    assert!(tables.contains("cursos"));
}
