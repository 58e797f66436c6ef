use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sql_tutor::config::Config;
use sql_tutor::generator::QueryGenerator;
use sql_tutor::schema::SchemaStore;
use sql_tutor::session::{self, Mode, Session};

#[derive(Parser)]
#[command(name = "sql-tutor")]
#[command(about = "Chat de terminal que convierte preguntas en SQL usando un modelo local (Ollama)")]
struct Args {
    /// Host del backend Ollama (por defecto OLLAMA_HOST o localhost:11434)
    #[arg(long)]
    host: Option<String>,

    /// Identificador del modelo
    #[arg(long)]
    model: Option<String>,

    /// Directorio con los archivos .sql de esquema
    #[arg(long)]
    schema_dir: Option<PathBuf>,

    /// Archivo de contexto del instructor (ejemplos y estilo SQL)
    #[arg(long)]
    context_file: Option<PathBuf>,

    /// Comienza en modo teoría y omite la pregunta inicial
    #[arg(long)]
    teoria: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut cfg = Config::from_env();
    if let Some(host) = args.host {
        cfg.host = host;
    }
    if let Some(model) = args.model {
        cfg.model = model;
    }
    if let Some(dir) = args.schema_dir {
        cfg.schema_dir = dir;
    }
    if let Some(path) = args.context_file {
        cfg.context_path = path;
    }

    println!("=== Chat SQL (modo SQL-ONLY / Teoría) ===\n");

    let store = SchemaStore::load(&cfg.schema_dir)?;
    if store.is_empty() {
        bail!(
            "no se encontraron archivos .sql en '{}'; el programa terminará",
            cfg.schema_dir.display()
        );
    }

    let instructor_context = session::load_instructor_context(&cfg.context_path);
    if instructor_context.is_empty() {
        println!(
            "No se encontró {} o está vacío (se usará solo el prompt base).",
            cfg.context_path.display()
        );
    } else {
        println!(
            "Contexto del instructor cargado desde {}.",
            cfg.context_path.display()
        );
    }

    println!("\nEsquemas cargados: {:?}", store.names());

    let gen_sql = QueryGenerator::new(
        &cfg.host,
        &cfg.model,
        cfg.sql_options.clone(),
        &cfg.dialect,
        cfg.strict_sql_only,
    );
    let gen_theory = cfg.allow_theory.then(|| {
        QueryGenerator::new(
            &cfg.host,
            &cfg.model,
            cfg.theory_options.clone(),
            &cfg.dialect,
            false,
        )
    });

    let mode = if args.teoria && cfg.allow_theory {
        Mode::Theory
    } else if cfg.allow_theory {
        if ask_theory_mode()? {
            Mode::Theory
        } else {
            Mode::Sql
        }
    } else {
        Mode::Sql
    };

    let mut session = Session {
        store,
        gen_sql,
        gen_theory,
        instructor_context,
        dialect: cfg.dialect.clone(),
        max_schema_chars: cfg.max_schema_chars,
        validate_sql: cfg.validate_sql,
        mode,
    };
    session.run().await?;
    Ok(())
}

fn ask_theory_mode() -> Result<bool> {
    print!("¿Activar modo teoría? (s/n): ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("s"))
}
