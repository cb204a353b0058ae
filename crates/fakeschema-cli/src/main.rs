mod run;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use fakeschema_core::{
    Error as CoreError, ModelCatalog, catalog_json_schema, validate_catalog, validate_catalog_json,
};
use fakeschema_generate::output::{write_models_csv, write_rows_json};
use fakeschema_generate::{GenerateOptions, GenerationEngine, GenerationError, GeneratorRegistry};
use run::{RunConfig, init_logging, start_run, write_json};
use settings::{CliSettings, LogFormat, OutputFormat};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("run error: {0}")]
    Run(#[from] run::RunError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "fakeschema", version, about = "Relational fake data from model catalogs")]
struct Cli {
    /// Settings file (defaults to ./fakeschema.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Console log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run generation passes and write rows plus a report to a run directory.
    Generate(GenerateArgs),
    /// Print the field dependency graph and generation order.
    Order(CatalogArgs),
    /// Check a catalog against the JSON Schema and the semantic rules.
    Validate(CatalogArgs),
    /// List the built-in leaf producers.
    Generators,
    /// Print the catalog JSON Schema.
    Schema,
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// Model catalog JSON file.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Models to register; defaults to the catalog's `register` list.
    #[arg(long = "model", value_name = "MODEL")]
    models: Vec<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    /// Number of passes (one row per model each).
    #[arg(long)]
    passes: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    /// Anchor date for `*_this_year` producers (YYYY-MM-DD).
    #[arg(long)]
    today: Option<NaiveDate>,
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = CliSettings::load(cli.config.as_deref())?;
    let log_format = cli
        .log_format
        .or(settings.log_format)
        .unwrap_or_default();

    match cli.command {
        Command::Generate(args) => run_generate(args, &settings, log_format),
        Command::Order(args) => {
            init_logging(log_format, settings.log_level(), None)?;
            run_order(args, &settings)
        }
        Command::Validate(args) => {
            init_logging(log_format, settings.log_level(), None)?;
            run_validate(args, &settings)
        }
        Command::Generators => {
            let registry = GeneratorRegistry::new();
            for id in registry.generator_ids() {
                println!("{id}");
            }
            Ok(())
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&catalog_json_schema()?)?);
            Ok(())
        }
    }
}

fn catalog_path(args: &CatalogArgs, settings: &CliSettings) -> Result<PathBuf, CliError> {
    args.catalog
        .clone()
        .or_else(|| settings.catalog.clone())
        .ok_or_else(|| {
            CliError::InvalidConfig("a catalog is required (--catalog or settings)".to_string())
        })
}

/// Read a catalog and run both validation layers on it.
fn load_catalog(path: &Path) -> Result<ModelCatalog, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    validate_catalog_json(&json)?;
    let catalog: ModelCatalog = serde_json::from_value(json)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn build_engine(
    options: GenerateOptions,
    catalog: ModelCatalog,
    models: &[String],
) -> Result<GenerationEngine, CliError> {
    if models.is_empty() {
        if catalog.register.is_empty() {
            return Err(CliError::InvalidConfig(
                "no models to register: pass --model or set `register` in the catalog".to_string(),
            ));
        }
        return Ok(GenerationEngine::from_catalog(options, catalog)?);
    }

    let mut engine = GenerationEngine::with_catalog(options, catalog);
    for model in models {
        engine.register_model(model)?;
    }
    Ok(engine)
}

fn run_generate(
    args: GenerateArgs,
    settings: &CliSettings,
    log_format: LogFormat,
) -> Result<(), CliError> {
    let catalog_path = catalog_path(&args.catalog, settings)?;
    let catalog = load_catalog(&catalog_path)?;

    let defaults = GenerateOptions::default();
    let options = GenerateOptions {
        seed: args.seed.or(settings.seed).unwrap_or(defaults.seed),
        passes: args.passes.or(settings.passes).unwrap_or(defaults.passes),
        today: args.today.or(settings.today),
    };
    let format = args.format.or(settings.format).unwrap_or_default();
    let run_dir = args
        .run_dir
        .or_else(|| settings.run_dir.clone())
        .unwrap_or_else(|| PathBuf::from("runs"));

    let config = RunConfig {
        run_id: Uuid::new_v4().to_string(),
        started_at: chrono::Utc::now(),
        catalog: catalog_path,
        models: args.catalog.models.clone(),
        seed: options.seed,
        passes: options.passes,
        format: format!("{format:?}").to_lowercase(),
    };
    let paths = start_run(&run_dir, &config)?;
    init_logging(log_format, settings.log_level(), Some(&paths.logs_path))?;

    tracing::info!(
        event = "run_started",
        run_id = %config.run_id,
        seed = options.seed,
        passes = options.passes
    );
    let timer = Instant::now();

    let mut engine = build_engine(options, catalog, &args.catalog.models)?;
    let outcome = engine.run();

    let mut report = engine.report();
    report.run_id = config.run_id.clone();
    write_json(&paths.report_path, &report)?;

    if let Err(err) = outcome {
        tracing::warn!(event = "run_failed", error = %err);
        return Err(err.into());
    }

    let bytes = match format {
        OutputFormat::Json => write_rows_json(&paths.rows_path, engine.registry())?,
        OutputFormat::Csv => write_models_csv(&paths.root, engine.registry())?.1,
    };

    tracing::info!(
        event = "run_finished",
        status = "success",
        bytes_written = bytes,
        duration_ms = timer.elapsed().as_millis() as u64
    );
    println!("run_dir={}", paths.root.display());
    Ok(())
}

fn run_order(args: CatalogArgs, settings: &CliSettings) -> Result<(), CliError> {
    let catalog = load_catalog(&catalog_path(&args, settings)?)?;
    let mut engine = build_engine(GenerateOptions::default(), catalog, &args.models)?;
    let report = engine.graph_report()?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(cycle) = report.cycle {
        return Err(GenerationError::CyclicDependency(cycle).into());
    }
    Ok(())
}

fn run_validate(args: CatalogArgs, settings: &CliSettings) -> Result<(), CliError> {
    let path = catalog_path(&args, settings)?;
    let catalog = load_catalog(&path)?;
    tracing::info!(
        event = "catalog_valid",
        path = %path.display(),
        models = catalog.models.len()
    );
    println!("ok: {} models", catalog.models.len());
    Ok(())
}
