//! Dataset generation for toydata schemas.
//!
//! Runs a parsed schema through four ordered phases (config, shared columns,
//! object registry, tables), streaming each table to a [`TableSink`] in
//! bounded batches. Also exposes the single-record [`ResponseGenerator`] used
//! to answer mock API routes.

pub mod context;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod model;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod response;
pub mod sink;
pub mod value;

pub use engine::{GenerationEngine, prepare_schema};
pub use errors::{GenerationError, ReferenceKind};
pub use model::{GenerateOptions, GenerationIssue, GenerationReport, Phase, TableReport};
pub use output::{FileSink, OutputFormat, WriterOptions};
pub use registry::{FieldKind, FieldPlan, ObjectRegistry};
pub use response::ResponseGenerator;
pub use sink::{GeneratedDataset, GeneratedTable, MemorySink, TableSink};
pub use value::{GeneratedValue, Row};
