use std::fs::{OpenOptions, create_dir_all};
use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use toydata_generate::{GenerateOptions, GenerationReport, WriterOptions};

use crate::workspace::write_json_atomic;

use super::RegistryResult;

/// Serializable options of a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub config: String,
    /// `None` for a bundled config.
    pub config_path: Option<PathBuf>,
    pub objects_dir: Option<PathBuf>,
    pub generate: GenerateOptions,
    pub writer: WriterOptions,
}

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub run_dir: PathBuf,
    pub options: RunOptions,
}

impl RunContext {
    /// `<run_dir>/<timestamp>__run_<uuid>`.
    pub fn run_root(&self) -> PathBuf {
        let timestamp = self.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
        self.run_dir
            .join(format!("{timestamp}__run_{}", self.run_id))
    }
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub cli_version: String,
    pub options: RunOptions,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let root = ctx.run_root();
    create_dir_all(&root)?;

    let paths = RunPaths {
        config_path: root.join("config.json"),
        logs_path: root.join("logs.ndjson"),
        report_path: root.join("generation_report.json"),
        root,
    };

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        options: ctx.options.clone(),
        git: collect_git_info(),
    };
    write_json_atomic(&paths.config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.logs_path)?;

    Ok(paths)
}

pub fn write_report(paths: &RunPaths, report: &GenerationReport) -> RegistryResult<()> {
    write_json_atomic(&paths.report_path, report)?;
    Ok(())
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use toydata_generate::OutputFormat;

    use super::*;

    fn context(run_dir: &Path) -> RunContext {
        let run_id = uuid::Uuid::new_v4().to_string();
        RunContext {
            run_id: run_id.clone(),
            started_at: Utc::now(),
            run_dir: run_dir.to_path_buf(),
            options: RunOptions {
                config: "blog".to_string(),
                config_path: Some(PathBuf::from("configs/blog.yaml")),
                objects_dir: None,
                generate: GenerateOptions::default().with_seed(1).with_run_id(run_id),
                writer: WriterOptions::new(run_dir.join("data"), OutputFormat::Delimited),
            },
        }
    }

    #[test]
    fn run_directory_holds_config_logs_and_report() {
        let run_dir =
            std::env::temp_dir().join(format!("toydata_runs_{}", uuid::Uuid::new_v4()));
        let ctx = context(&run_dir);
        let paths = start_run(&ctx).expect("start run");

        let name = paths
            .root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .expect("run dir name");
        assert!(name.ends_with(&format!("__run_{}", ctx.run_id)));
        assert!(paths.logs_path.exists());

        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.config_path).expect("read"))
                .expect("json");
        assert_eq!(config["run_id"], ctx.run_id.as_str());
        assert_eq!(config["options"]["generate"]["seed"], 1);
        assert_eq!(config["options"]["writer"]["format"], "delimited");

        let schema = toydata_core::load_schema_str("tables:\n  t[2]:\n    id: UNIQUE[int]\n")
            .expect("schema");
        let parsed = toydata_generate::prepare_schema(&schema).expect("parsed");
        let dataset = toydata_generate::GenerationEngine::new(ctx.options.generate.clone())
            .run(&parsed)
            .expect("run");
        write_report(&paths, &dataset.report).expect("write report");
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.report_path).expect("read"))
                .expect("json");
        assert_eq!(report["run_id"], config["run_id"]);
        std::fs::remove_dir_all(run_dir).ok();
    }
}
