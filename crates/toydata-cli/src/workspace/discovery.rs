//! Config lookup by name.
//!
//! A config name resolves, in order, to an existing file path, then
//! `./toydata_configs/<name>.yaml|.yml`, then each settings `config_dirs`
//! entry, then the configs compiled into the binary.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use toydata_core::{
    DataSchema, ObjectFile, load_object_str, load_objects_dir, load_schema_file, load_schema_str,
};

use super::{WorkspaceError, WorkspaceResult};

/// Project-local config directory.
pub const LOCAL_CONFIG_DIR: &str = "toydata_configs";

/// Config used when none is named.
pub const DEFAULT_CONFIG: &str = "blog";

const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Configs shipped inside the binary: `(name, yaml)`.
const BUNDLED_CONFIGS: [(&str, &str); 1] = [("blog", include_str!("../../configs/blog.yaml"))];

/// Object files shipped with the bundled configs: `(namespace, yaml)`.
const BUNDLED_OBJECTS: [(&str, &str); 1] =
    [("core", include_str!("../../configs/objects/core.yaml"))];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Path,
    Local,
    Settings,
    Bundled,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSource::Path => "path",
            ConfigSource::Local => "local",
            ConfigSource::Settings => "settings",
            ConfigSource::Bundled => "bundled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigLocation {
    pub name: String,
    pub source: ConfigSource,
    /// File on disk; `None` for a bundled config.
    pub path: Option<PathBuf>,
}

impl ConfigLocation {
    fn bundled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            source: ConfigSource::Bundled,
            path: None,
        }
    }

    /// Sibling `objects/` directory of the config, when present.
    pub fn objects_dir(&self) -> Option<PathBuf> {
        let dir = self.path.as_ref()?.parent()?.join("objects");
        dir.is_dir().then_some(dir)
    }

    /// File path, or `bundled:<name>`.
    pub fn describe(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => format!("bundled:{}", self.name),
        }
    }

    /// Load the config with the objects in `objects_dir`. A bundled config
    /// without one gets the bundled objects.
    pub fn load(&self, objects_dir: Option<&Path>) -> WorkspaceResult<DataSchema> {
        let schema = match &self.path {
            Some(path) => load_schema_file(path)?,
            None => load_schema_str(bundled_yaml(&self.name)?)?,
        };
        let objects = match (objects_dir, &self.path) {
            (Some(dir), _) => load_objects_dir(dir)?,
            (None, None) => bundled_objects()?,
            (None, Some(_)) => Vec::new(),
        };
        Ok(schema.with_objects(objects))
    }
}

fn bundled_yaml(name: &str) -> WorkspaceResult<&'static str> {
    BUNDLED_CONFIGS
        .iter()
        .find(|(bundled, _)| *bundled == name)
        .map(|(_, yaml)| *yaml)
        .ok_or_else(|| WorkspaceError::Invalid(format!("no bundled config named `{name}`")))
}

fn bundled_objects() -> WorkspaceResult<Vec<ObjectFile>> {
    BUNDLED_OBJECTS
        .iter()
        .map(|(namespace, yaml)| Ok(load_object_str(namespace, yaml)?))
        .collect()
}

/// Ordered list of directories searched for configs, ahead of the bundled ones.
#[derive(Debug, Clone)]
pub struct ConfigSearch {
    dirs: Vec<(ConfigSource, PathBuf)>,
}

impl ConfigSearch {
    pub fn new(local: PathBuf, extra: &[PathBuf]) -> Self {
        let mut dirs = vec![(ConfigSource::Local, local)];
        dirs.extend(
            extra
                .iter()
                .map(|dir| (ConfigSource::Settings, dir.clone())),
        );
        Self { dirs }
    }

    /// Local directory, then settings directories.
    pub fn standard(config_dirs: &[PathBuf]) -> Self {
        Self::new(PathBuf::from(LOCAL_CONFIG_DIR), config_dirs)
    }

    pub fn find(&self, name: &str) -> WorkspaceResult<ConfigLocation> {
        let direct = Path::new(name);
        if direct.is_file() {
            return Ok(ConfigLocation {
                name: stem(direct),
                source: ConfigSource::Path,
                path: Some(direct.to_path_buf()),
            });
        }

        let base = strip_extension(name);
        for (source, dir) in &self.dirs {
            for ext in EXTENSIONS {
                let path = dir.join(format!("{base}.{ext}"));
                if path.is_file() {
                    return Ok(ConfigLocation {
                        name: base.to_string(),
                        source: *source,
                        path: Some(path),
                    });
                }
            }
        }

        if BUNDLED_CONFIGS.iter().any(|(bundled, _)| *bundled == base) {
            return Ok(ConfigLocation::bundled(base));
        }

        Err(WorkspaceError::ConfigNotFound {
            name: name.to_string(),
            searched: self.dirs.iter().map(|(_, dir)| dir.clone()).collect(),
        })
    }

    /// Every config in search order; a name shadowed by an earlier directory
    /// is still listed under its own source.
    pub fn available(&self) -> WorkspaceResult<Vec<ConfigLocation>> {
        let mut found = Vec::new();
        for (source, dir) in &self.dirs {
            if !dir.is_dir() {
                continue;
            }
            let mut paths = Vec::new();
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                let is_config = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| EXTENSIONS.contains(&ext));
                if is_config && path.is_file() {
                    paths.push(path);
                }
            }
            paths.sort();
            found.extend(paths.into_iter().map(|path| ConfigLocation {
                name: stem(&path),
                source: *source,
                path: Some(path),
            }));
        }
        found.extend(
            BUNDLED_CONFIGS
                .iter()
                .map(|(name, _)| ConfigLocation::bundled(name)),
        );
        Ok(found)
    }
}

fn strip_extension(name: &str) -> &str {
    EXTENSIONS
        .iter()
        .find_map(|ext| name.strip_suffix(&format!(".{ext}")))
        .unwrap_or(name)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}
