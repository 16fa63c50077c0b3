mod registry;
mod workspace;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use registry::{
    RunContext, RunOptions, init_console_logging, init_run_logging, start_run, write_report,
};
use thiserror::Error;
use toydata_generate::{
    FileSink, GenerateOptions, GenerationEngine, GenerationError, OutputFormat, ResponseGenerator,
    WriterOptions, prepare_schema,
};
use toydata_notation::{ValidationReport, parse_schema};
use uuid::Uuid;
use workspace::{ConfigLocation, ConfigSearch, DEFAULT_CONFIG, Settings, load_settings};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("workspace error: {0}")]
    Workspace(#[from] workspace::WorkspaceError),
    #[error("{0}")]
    Generation(#[from] GenerationError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema is invalid:\n{0}")]
    InvalidSchema(ValidationReport),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "toydata", version, about = "Toydata CLI")]
struct Cli {
    /// Settings file (defaults to ./toydata.toml when present).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate every table of a config into files.
    Generate(GenerateArgs),
    /// Parse a config and report every notation error.
    Validate(SchemaArgs),
    /// Generate one response payload for an object or response type.
    Respond(RespondArgs),
    /// List configs visible from the current directory.
    ListConfigs,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Config name or path.
    #[arg(value_name = "CONFIG", default_value = DEFAULT_CONFIG)]
    config: String,
    /// Directory of object template files.
    #[arg(long)]
    objects: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Destination directory (defaults to `data/` inside the run directory).
    #[arg(long)]
    dest: Option<PathBuf>,
    /// Output format: columnar (parquet, the default), delimited (csv), json or ld-json.
    #[arg(long)]
    format: Option<OutputFormat>,
    /// Partition column, repeatable.
    #[arg(long = "partition", value_name = "COLUMN")]
    partitions: Vec<String>,
    /// Replace existing output files.
    #[arg(long, default_value_t = false)]
    overwrite: bool,
    /// Keep rows already written for a table that fails.
    #[arg(long, default_value_t = false)]
    partial_writes: bool,
    /// Run seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Rows handed to the writer per batch.
    #[arg(long)]
    batch_size: Option<usize>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RespondArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Object reference (`core.user`) or legacy response type (`user_detail`).
    #[arg(long = "object", value_name = "RESPONSE")]
    response: String,
    /// Route parameter as NAME=VALUE, repeatable.
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,
    /// Route path echoed by generic responses.
    #[arg(long, default_value = "/")]
    path: String,
    /// Response seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;

    match cli.command {
        Command::Generate(args) => run_generate(args, &settings),
        Command::Validate(args) => run_validate(args, &settings),
        Command::Respond(args) => run_respond(args, &settings),
        Command::ListConfigs => run_list_configs(&settings),
    }
}

fn run_generate(args: GenerateArgs, settings: &Settings) -> Result<(), CliError> {
    let GenerateArgs {
        schema,
        dest,
        format,
        partitions,
        overwrite,
        partial_writes,
        seed,
        batch_size,
        run_dir,
    } = args;

    let location = locate(&schema.config, settings)?;
    let objects_dir = objects_dir(&schema, settings, &location);

    let run_id = Uuid::new_v4().to_string();
    let generate = GenerateOptions {
        seed: seed.or(settings.seed),
        run_id: Some(run_id.clone()),
        batch_size: batch_size.or(settings.batch_size).unwrap_or(1000),
        ..GenerateOptions::default()
    };
    if generate.batch_size == 0 {
        return Err(CliError::InvalidConfig(
            "batch size must be at least 1".to_string(),
        ));
    }

    let run_dir = run_dir
        .or_else(|| settings.run_dir.clone())
        .unwrap_or_else(|| PathBuf::from("runs"));
    let mut run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        run_dir,
        options: RunOptions {
            config: location.name.clone(),
            config_path: location.path.clone(),
            objects_dir: objects_dir.clone(),
            generate,
            writer: WriterOptions::new(
                PathBuf::new(),
                format.or(settings.format).unwrap_or_default(),
            ),
        },
    };
    run_ctx.options.writer.dest = dest.unwrap_or_else(|| run_ctx.run_root().join("data"));
    run_ctx.options.writer.partition_columns = partitions;
    run_ctx.options.writer.overwrite_allowed = overwrite;
    run_ctx.options.writer.partial_writes = partial_writes;

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        config = %location.name,
        source = %location.source,
    );
    let timer = Instant::now();

    let schema = location.load(objects_dir.as_deref())?;
    let parsed = prepare_schema(&schema)?;
    tracing::info!(event = "schema_parsed", tables = parsed.tables.len());

    let mut sink = FileSink::new(run_ctx.options.writer.clone())?;
    let engine = GenerationEngine::new(run_ctx.options.generate.clone());
    let report = match engine.run_with_sink(&parsed, &mut sink) {
        Ok(report) => report,
        Err(GenerationError::Failed(report)) => {
            write_report(&run_paths, &report)?;
            tracing::warn!(
                event = "run_finished",
                status = "failed",
                failures = report.failures.len(),
                duration_ms = timer.elapsed().as_millis() as u64,
            );
            for failure in &report.failures {
                eprintln!(
                    "{}: {} ({})",
                    failure.table,
                    failure.message,
                    failure.field.as_deref().unwrap_or("-")
                );
            }
            return Err(GenerationError::Failed(report).into());
        }
        Err(err) => return Err(err.into()),
    };

    write_report(&run_paths, &report)?;
    tracing::info!(
        event = "run_finished",
        status = "success",
        duration_ms = timer.elapsed().as_millis() as u64,
    );

    println!("run_dir={}", run_paths.root.display());
    println!("dest={}", run_ctx.options.writer.dest.display());
    for (table, target) in report.tables.iter().zip(sink.written()) {
        println!(
            "{}\t{} rows\t{}",
            table.table,
            table.rows_generated,
            target.display()
        );
    }
    Ok(())
}

fn run_validate(args: SchemaArgs, settings: &Settings) -> Result<(), CliError> {
    init_console_logging()?;
    let location = locate(&args.config, settings)?;
    let objects_dir = objects_dir(&args, settings, &location);
    let schema = location.load(objects_dir.as_deref())?;

    match parse_schema(&schema) {
        Ok(parsed) => {
            for warning in &parsed.warnings {
                println!("warning {} at {}: {}", warning.code, warning.path, warning.message);
            }
            println!(
                "{} is valid: {} config, {} shared, {} tables, {} objects",
                location.describe(),
                parsed.config.len(),
                parsed.shared.len(),
                parsed.tables.len(),
                parsed.objects.len()
            );
            Ok(())
        }
        Err(report) => Err(CliError::InvalidSchema(report)),
    }
}

fn run_respond(args: RespondArgs, settings: &Settings) -> Result<(), CliError> {
    init_console_logging()?;
    let location = locate(&args.schema.config, settings)?;
    let objects_dir = objects_dir(&args.schema, settings, &location);
    let schema = location.load(objects_dir.as_deref())?;
    let parsed = prepare_schema(&schema)?;

    let options = GenerateOptions {
        seed: args.seed.or(settings.seed),
        ..GenerateOptions::default()
    };
    let generator = ResponseGenerator::new(&parsed, options)?;
    let params: BTreeMap<String, String> = args.params.into_iter().collect();
    let payload = generator.respond_to(&args.response, &params, &args.path)?;

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_list_configs(settings: &Settings) -> Result<(), CliError> {
    let search = ConfigSearch::standard(&settings.config_dirs);
    let configs = search.available()?;
    if configs.is_empty() {
        println!("no configs found");
        return Ok(());
    }
    for config in configs {
        println!("{}\t{}\t{}", config.source, config.name, config.describe());
    }
    Ok(())
}

fn locate(config: &str, settings: &Settings) -> Result<ConfigLocation, CliError> {
    Ok(ConfigSearch::standard(&settings.config_dirs).find(config)?)
}

/// Flag, then settings, then the config's sibling `objects/` directory.
fn objects_dir(args: &SchemaArgs, settings: &Settings, location: &ConfigLocation) -> Option<PathBuf> {
    args.objects
        .clone()
        .or_else(|| settings.objects_dir.clone())
        .or_else(|| location.objects_dir())
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("parameter name is empty in `{raw}`"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn params_split_on_the_first_equals_sign() {
        assert_eq!(
            parse_param("filter=a=b"),
            Ok(("filter".to_string(), "a=b".to_string()))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn generate_flags_parse() {
        let cli = Cli::try_parse_from([
            "toydata",
            "generate",
            "shop",
            "--format",
            "ld-json",
            "--partition",
            "region",
            "--seed",
            "9",
        ])
        .expect("parse");
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.schema.config, "shop");
        assert_eq!(args.format, Some(OutputFormat::LdJson));
        assert_eq!(args.partitions, vec!["region".to_string()]);
        assert_eq!(args.seed, Some(9));
    }

    #[test]
    fn bundled_default_config_generates() {
        let location = ConfigSearch::standard(&[])
            .find(DEFAULT_CONFIG)
            .expect("bundled config");
        let schema = location.load(None).expect("schema");
        let parsed = prepare_schema(&schema).expect("parsed");
        let dataset = GenerationEngine::new(GenerateOptions::default().with_seed(3))
            .run(&parsed)
            .expect("generate");
        assert!(!dataset.tables.is_empty());

        let generator =
            ResponseGenerator::new(&parsed, GenerateOptions::default().with_seed(3)).expect("responses");
        let payload = generator
            .respond_to("user_detail", &BTreeMap::new(), "/users/1")
            .expect("payload");
        assert!(payload.get("id").is_some());
    }
}
