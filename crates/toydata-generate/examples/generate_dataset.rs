use std::env;
use std::path::PathBuf;

use toydata_core::{load_objects_dir, load_schema_file};
use toydata_generate::{
    FileSink, GenerateOptions, GenerationEngine, OutputFormat, WriterOptions, prepare_schema,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut schema_path: Option<PathBuf> = None;
    let mut objects_dir: Option<PathBuf> = None;
    let mut out_dir = PathBuf::from("out");
    let mut format = OutputFormat::Delimited;
    let mut seed: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--objects" => objects_dir = args.next().map(PathBuf::from),
            "--out" => out_dir = args.next().map(PathBuf::from).ok_or("missing --out path")?,
            "--format" => format = args.next().ok_or("missing --format value")?.parse()?,
            "--seed" => seed = Some(args.next().ok_or("missing --seed value")?.parse()?),
            _ => {
                if schema_path.is_none() {
                    schema_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let schema_path = schema_path.ok_or("missing schema path")?;
    let mut schema = load_schema_file(&schema_path)?;
    if let Some(dir) = objects_dir {
        schema = schema.with_objects(load_objects_dir(&dir)?);
    }
    let parsed = prepare_schema(&schema)?;

    let options = GenerateOptions {
        seed,
        ..GenerateOptions::default()
    };
    let mut sink = FileSink::new(WriterOptions::new(&out_dir, format))?;
    let report = GenerationEngine::new(options).run_with_sink(&parsed, &mut sink)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
