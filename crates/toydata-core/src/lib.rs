//! Core contracts and helpers for toydata.
//!
//! This crate defines the raw schema tree (config, shared columns, tables and
//! object template files) exactly as it was declared, the YAML loader that
//! builds it, and structural validation shared by the notation parser and the
//! CLI. Nothing here interprets the field notation itself.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{Error, Result};
pub use loader::{
    load_object_file, load_object_str, load_objects_dir, load_schema_file, load_schema_str,
    parse_object_file,
};
pub use schema::{
    ConfigEntry, DataSchema, FieldEntry, FieldValue, ObjectEntry, ObjectFile, SharedEntry,
    TableEntry,
};
pub use validation::{is_config_name, validate_schema};

/// Key of the optional base-object reference inside a table definition.
pub const OBJECT_KEY: &str = "object";
