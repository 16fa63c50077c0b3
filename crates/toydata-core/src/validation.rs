use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::{DataSchema, FieldEntry};

/// Validate structural consistency of a schema tree.
///
/// This checks:
/// - config names are SCREAMING_CASE and unique
/// - object namespaces are unique and object names unique per namespace
/// - field names are unique within each object and table
///
/// Shared column and table names are checked after their keys are parsed.
pub fn validate_schema(schema: &DataSchema) -> Result<()> {
    let mut config_names = BTreeSet::new();
    for entry in &schema.config {
        if !is_config_name(&entry.name) {
            return Err(Error::InvalidSchema(format!(
                "config name '{}' must be SCREAMING_CASE",
                entry.name
            )));
        }
        if !config_names.insert(entry.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate config name: {}",
                entry.name
            )));
        }
    }

    let mut namespaces = BTreeSet::new();
    for file in &schema.objects {
        if !namespaces.insert(file.namespace.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate object namespace: {}",
                file.namespace
            )));
        }

        let mut names = BTreeSet::new();
        for object in &file.objects {
            if !names.insert(object.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate object name: {}.{}",
                    file.namespace, object.name
                )));
            }
            ensure_unique_fields(&object.fields, &format!("{}.{}", file.namespace, object.name))?;
        }
    }

    for table in &schema.tables {
        ensure_unique_fields(&table.fields, &table.key)?;
    }

    Ok(())
}

/// Config variables are named in SCREAMING_CASE (`NB_USERS`).
pub fn is_config_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn ensure_unique_fields(fields: &[FieldEntry], owner: &str) -> Result<()> {
    let mut seen = BTreeSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate field name: {owner}.{}",
                field.name
            )));
        }
    }
    Ok(())
}
