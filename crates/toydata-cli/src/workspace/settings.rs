use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use toydata_generate::OutputFormat;

use super::{WorkspaceError, WorkspaceResult};

/// Settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "toydata.toml";

/// Defaults for CLI runs. Every key is optional and flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub objects_dir: Option<PathBuf>,
    pub run_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub batch_size: Option<usize>,
    pub seed: Option<u64>,
    /// Extra directories searched for configs, after the local one.
    pub config_dirs: Vec<PathBuf>,
}

impl Settings {
    pub fn from_toml(content: &str) -> WorkspaceResult<Self> {
        let settings: Settings = toml::from_str(content)?;
        if settings.batch_size == Some(0) {
            return Err(WorkspaceError::Invalid(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(settings)
    }
}

/// Load an explicit settings file, or `./toydata.toml` when present.
pub fn load_settings(explicit: Option<&Path>) -> WorkspaceResult<Settings> {
    let path = match explicit {
        Some(path) if !path.exists() => {
            return Err(WorkspaceError::MissingSettings(path.to_path_buf()));
        }
        Some(path) => path.to_path_buf(),
        None => {
            let local = PathBuf::from(SETTINGS_FILE);
            if !local.exists() {
                return Ok(Settings::default());
            }
            local
        }
    };

    let content = std::fs::read_to_string(&path)?;
    Settings::from_toml(&content)
}
