//! Field notation for toydata schemas.
//!
//! Turns notation strings such as `CHOOSE[[a,b,c]][n]`, `UNIQUE[int]` or
//! `[[object.core.user]][2]` into typed [`Directive`] values, and parses a
//! whole [`toydata_core::DataSchema`] into a [`ParsedSchema`], collecting every
//! notation error before any generation starts.

pub mod errors;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod validate;

pub use errors::{IssueSeverity, NotationError, ValidationIssue, ValidationReport};
pub use model::{
    ChoiceSource, ConstantRef, CountSpec, Directive, EntryKey, ObjectKey, RawType, UniqueKind,
    Verb, Vocabulary,
};
pub use parser::{parse_directive, parse_entry_key, parse_object_key};
pub use validate::{
    ConfigVariable, FieldSpec, ObjectTemplate, ParsedSchema, SharedSpec, TableSpec, parse_schema,
};
