mod atomic;
mod discovery;
mod settings;

pub use atomic::write_json_atomic;
pub use discovery::{ConfigLocation, ConfigSearch, DEFAULT_CONFIG};
pub use settings::{Settings, load_settings};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("schema error: {0}")]
    Schema(#[from] toydata_core::Error),
    #[error("settings file not found: {}", .0.display())]
    MissingSettings(PathBuf),
    #[error("config `{name}` not found (searched {} and the bundled configs)", format_dirs(.searched))]
    ConfigNotFound { name: String, searched: Vec<PathBuf> },
    #[error("invalid workspace state: {0}")]
    Invalid(String),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

fn format_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|dir| dir.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
