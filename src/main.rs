//! filterql CLI
//!
//! Command-line interface for the filter compiler:
//! - Compile a single input to a query document
//! - Interactive console
//! - List catalog fields
//! - Generate a default config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use filterql::catalog::{load_mapping, FieldCatalog};
use filterql::config::{generate_default_config, Config, LoggingConfig};
use filterql::query::{QueryEngine, QueryError};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "filterql")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile filter expressions into search-engine query documents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Index mapping document, overrides the configured one
    #[arg(short, long, global = true)]
    pub mapping: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile one input, e.g. 'age > 30 and status = active; size = 5'
    Compile {
        /// Filter expression with optional `; key = value` options
        input: String,
    },

    /// Read inputs from stdin until `quit`
    Repl,

    /// List catalog fields
    Fields,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config.logging);

    let mapping = cli.mapping.as_deref().or(config.catalog.mapping_path.as_deref());

    match cli.command {
        Commands::Compile { input } => {
            let engine = build_engine(mapping, &config)?;
            match engine.compile(&input) {
                Ok(compiled) => println!("{}", serde_json::to_string_pretty(&compiled)?),
                Err(e) => {
                    println!("{}", serde_json::to_string_pretty(&e.report())?);
                    std::process::exit(1);
                }
            }
        }

        Commands::Repl => {
            let engine = build_engine(mapping, &config)?;
            run_repl(&engine)?;
        }

        Commands::Fields => {
            let catalog = load_catalog(mapping)?;

            println!("{:<40} {:<14} {}", "Field", "Type", "Indexed");
            println!("{}", "-".repeat(62));
            for (path, entry) in catalog.fields() {
                println!(
                    "{:<40} {:<14} {}",
                    path,
                    entry.field_type.as_deref().unwrap_or("-"),
                    if entry.indexed { "yes" } else { "no" }
                );
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &content)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", content);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("filterql={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_catalog(mapping: Option<&Path>) -> anyhow::Result<FieldCatalog> {
    let Some(path) = mapping else {
        bail!("No mapping configured; pass --mapping or set FILTERQL_MAPPING");
    };

    load_mapping(path).with_context(|| format!("Failed to load mapping {:?}", path))
}

fn build_engine(mapping: Option<&Path>, config: &Config) -> anyhow::Result<QueryEngine> {
    let catalog = load_catalog(mapping)?;
    tracing::info!("Catalog has {} fields", catalog.len());

    Ok(QueryEngine::new(Arc::new(catalog)).with_defaults(config.defaults.clone()))
}

fn run_repl(engine: &QueryEngine) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("Enter a filter, or 'quit' to exit.");
    loop {
        print!("filterql> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match engine.compile(input) {
            Ok(compiled) => println!("{}", serde_json::to_string_pretty(&compiled)?),
            Err(e) => print_error(&e),
        }
    }

    Ok(())
}

fn print_error(error: &QueryError) {
    println!("Error Code: {}", error.code());
    println!("Message: {}", error);
}
