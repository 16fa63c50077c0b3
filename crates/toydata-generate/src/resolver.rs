//! Reference resolution.
//!
//! Config variables are substituted eagerly wherever a count or a whole
//! directive names one. Shared columns stay lazy: they are looked up by name
//! only when a row actually needs them, from the columns materialized so far.

use std::collections::BTreeMap;

use toydata_notation::{ConfigVariable, CountSpec, Directive, ParsedSchema};

use crate::errors::{GenerationError, ReferenceKind};
use crate::value::GeneratedValue;

/// Config variables of a run, immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTable {
    values: BTreeMap<String, i64>,
}

impl ConfigTable {
    pub fn new(variables: &[ConfigVariable]) -> Self {
        Self {
            values: variables
                .iter()
                .map(|variable| (variable.name.clone(), variable.value))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Result<i64, GenerationError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| GenerationError::undefined(ReferenceKind::Config, name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check that every config variable the schema mentions is defined.
    pub fn check_references(&self, schema: &ParsedSchema) -> Result<(), GenerationError> {
        let counts = schema
            .shared
            .iter()
            .map(|shared| &shared.rows)
            .chain(schema.tables.iter().map(|table| &table.rows));
        for rows in counts {
            if let Some(CountSpec::Config(name)) = rows {
                self.get(name)?;
            }
        }

        let directives = schema
            .shared
            .iter()
            .map(|shared| &shared.directive)
            .chain(
                schema
                    .tables
                    .iter()
                    .flat_map(|table| table.fields.iter().map(|field| &field.directive)),
            )
            .chain(
                schema
                    .objects
                    .iter()
                    .flat_map(|object| object.fields.iter().map(|field| &field.directive)),
            );
        for directive in directives {
            for name in directive.config_refs() {
                self.get(name)?;
            }
        }
        Ok(())
    }
}

/// A materialized shared column.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedColumn {
    pub name: String,
    pub values: Vec<GeneratedValue>,
}

/// Shared columns in materialization order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedStore {
    columns: Vec<SharedColumn>,
}

impl SharedStore {
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<GeneratedValue>) {
        self.columns.push(SharedColumn {
            name: name.into(),
            values,
        });
    }

    pub fn get(&self, name: &str) -> Result<&[GeneratedValue], GenerationError> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.values.as_slice())
            .ok_or_else(|| GenerationError::undefined(ReferenceKind::Shared, name))
    }

    /// Value of `name` aligned to `row`: index `row % len`.
    pub fn aligned(&self, name: &str, row: u64) -> Result<GeneratedValue, GenerationError> {
        let values = self.get(name)?;
        if values.is_empty() {
            return Err(GenerationError::InvalidCardinality(format!(
                "shared column `{name}` is empty"
            )));
        }
        let index = (row % values.len() as u64) as usize;
        Ok(values[index].clone())
    }

    pub fn columns(&self) -> &[SharedColumn] {
        &self.columns
    }
}

/// Read-only lookup scope handed to generators.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub config: &'a ConfigTable,
    pub shared: &'a SharedStore,
}

/// Number of values one directive invocation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// No count clause: one scalar.
    Single,
    /// `[N]` or `[[CONFIG]]`: a list of exactly N values.
    Fixed(usize),
    /// `[n]`: a list whose length is drawn per invocation.
    Random,
}

impl Cardinality {
    pub fn resolve(count: Option<&CountSpec>, config: &ConfigTable) -> Result<Self, GenerationError> {
        match count {
            None => Ok(Cardinality::Single),
            Some(CountSpec::Random) => Ok(Cardinality::Random),
            Some(spec) => Ok(Cardinality::Fixed(resolve_count(spec, config)? as usize)),
        }
    }

    pub fn of(directive: &Directive, config: &ConfigTable) -> Result<Self, GenerationError> {
        Self::resolve(directive.count.as_ref(), config)
    }
}

/// Resolve a literal or config count to a positive integer.
pub fn resolve_count(spec: &CountSpec, config: &ConfigTable) -> Result<u64, GenerationError> {
    match spec {
        CountSpec::Literal(value) => Ok(*value),
        CountSpec::Config(name) => {
            let value = config.get(name)?;
            if value <= 0 {
                return Err(GenerationError::InvalidCardinality(format!(
                    "config variable {name} is {value}; counts must be at least 1"
                )));
            }
            Ok(value as u64)
        }
        CountSpec::Random => Err(GenerationError::InvalidCardinality(
            "`n` is not a fixed count".to_string(),
        )),
    }
}
