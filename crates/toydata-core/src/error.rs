use thiserror::Error;

/// Core error type shared across toydata crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema tree violates structural invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// YAML could not be parsed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Reading a schema or object file failed.
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for results returned by toydata crates.
pub type Result<T> = std::result::Result<T, Error>;
