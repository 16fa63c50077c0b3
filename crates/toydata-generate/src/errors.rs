use std::fmt;

use thiserror::Error;
use toydata_notation::{NotationError, ObjectKey, ValidationReport};

use crate::model::GenerationReport;

/// Scope a reference is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Config,
    Shared,
    Object,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReferenceKind::Config => "config variable",
            ReferenceKind::Shared => "shared column",
            ReferenceKind::Object => "object",
        };
        f.write_str(label)
    }
}

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Notation(#[from] NotationError),
    #[error("invalid schema: {0}")]
    InvalidSchema(ValidationReport),
    #[error("undefined {kind} `{name}`")]
    UndefinedReference { kind: ReferenceKind, name: String },
    #[error("cyclic object reference: {}", format_cycle(.cycle))]
    CyclicObjectReference { cycle: Vec<ObjectKey> },
    #[error("invalid cardinality: {0}")]
    InvalidCardinality(String),
    #[error("cannot resolve row count of `{table}`: no count clause and no shared column to infer it from")]
    RowCountResolution { table: String },
    #[error("table `{table}`, field `{field}`, row {row}: {source}")]
    Field {
        table: String,
        field: String,
        row: u64,
        #[source]
        source: Box<GenerationError>,
    },
    #[error("generation failed: {} table(s) failed", .0.failures.len())]
    Failed(Box<GenerationReport>),
    #[error("unsupported feature: {0}")]
    Unsupported(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl GenerationError {
    pub(crate) fn undefined(kind: ReferenceKind, name: impl Into<String>) -> Self {
        GenerationError::UndefinedReference {
            kind,
            name: name.into(),
        }
    }

    /// Stable code recorded in run reports.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Notation(err) => err.code(),
            GenerationError::InvalidSchema(_) => "invalid_schema",
            GenerationError::UndefinedReference { .. } => "undefined_reference",
            GenerationError::CyclicObjectReference { .. } => "cyclic_object_reference",
            GenerationError::InvalidCardinality(_) => "invalid_cardinality",
            GenerationError::RowCountResolution { .. } => "row_count_resolution",
            GenerationError::Field { source, .. } => source.code(),
            GenerationError::Failed(_) => "generation_failed",
            GenerationError::Unsupported(_) => "unsupported",
            GenerationError::Io(_) => "io",
            GenerationError::Json(_) => "json",
            GenerationError::Csv(_) => "csv",
            GenerationError::Arrow(_) => "arrow",
            GenerationError::Parquet(_) => "parquet",
        }
    }

    /// Innermost error, unwrapping field context.
    pub fn root_cause(&self) -> &GenerationError {
        match self {
            GenerationError::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn format_cycle(cycle: &[ObjectKey]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" → ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_names_every_hop() {
        let err = GenerationError::CyclicObjectReference {
            cycle: vec![
                ObjectKey::new("core", "a"),
                ObjectKey::new("core", "b"),
                ObjectKey::new("core", "a"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "cyclic object reference: core.a → core.b → core.a"
        );
    }

    #[test]
    fn field_errors_report_the_inner_code() {
        let err = GenerationError::Field {
            table: "posts".into(),
            field: "author_id".into(),
            row: 0,
            source: Box::new(GenerationError::undefined(ReferenceKind::Shared, "user_id")),
        };
        assert_eq!(err.code(), "undefined_reference");
        assert!(err.to_string().contains("undefined shared column `user_id`"));
    }
}
