use std::fs;
use std::path::Path;

use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::schema::{
    ConfigEntry, DataSchema, FieldEntry, FieldValue, ObjectEntry, ObjectFile, SharedEntry,
    TableEntry,
};
use crate::OBJECT_KEY;

/// Parse a schema document.
///
/// Recognized sections are `config`, `shared`, `tables` and an optional inline
/// `objects` section (`namespace -> name -> fields`). Any other top-level key
/// is ignored so API description files load unchanged.
pub fn load_schema_str(yaml: &str) -> Result<DataSchema> {
    let root: Value = serde_yaml::from_str(yaml)?;
    let root = match root {
        Value::Null => return Ok(DataSchema::default()),
        Value::Mapping(map) => map,
        _ => {
            return Err(Error::InvalidSchema(
                "schema document must be a mapping".to_string(),
            ));
        }
    };

    let mut schema = DataSchema::default();
    for (key, value) in &root {
        let section = key_string(key, "/")?;
        match section.as_str() {
            "config" => schema.config = parse_config(value)?,
            "shared" => schema.shared = parse_shared(value)?,
            "tables" => schema.tables = parse_tables(value)?,
            "objects" => {
                for (namespace, objects) in section_mapping(value, "/objects")? {
                    let namespace = key_string(namespace, "/objects")?;
                    schema.objects.push(parse_object_file(&namespace, objects)?);
                }
            }
            _ => {}
        }
    }

    Ok(schema)
}

/// Read and parse a schema file.
pub fn load_schema_file(path: &Path) -> Result<DataSchema> {
    load_schema_str(&read_file(path)?)
}

/// Read one object template file; the namespace is the file stem.
pub fn load_object_file(path: &Path) -> Result<ObjectFile> {
    let namespace = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            Error::InvalidSchema(format!("cannot derive namespace from {}", path.display()))
        })?;
    load_object_str(&namespace, &read_file(path)?)
}

/// Parse object templates from YAML text under `namespace`.
pub fn load_object_str(namespace: &str, yaml: &str) -> Result<ObjectFile> {
    let root: Value = serde_yaml::from_str(yaml)?;
    parse_object_file(namespace, &root)
}

/// Load every `*.yaml` / `*.yml` file in a directory, sorted by file name.
pub fn load_objects_dir(dir: &Path) -> Result<Vec<ObjectFile>> {
    let entries = fs::read_dir(dir).map_err(|source| Error::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    paths.iter().map(|path| load_object_file(path)).collect()
}

/// Build an object file from an already parsed YAML value.
pub fn parse_object_file(namespace: &str, value: &Value) -> Result<ObjectFile> {
    let path = format!("/objects/{namespace}");
    let mut objects = Vec::new();
    for (name, fields) in section_mapping(value, &path)? {
        let name = key_string(name, &path)?;
        let fields = parse_fields(fields, &format!("{path}/{name}"), false)?.0;
        objects.push(ObjectEntry { name, fields });
    }

    Ok(ObjectFile {
        namespace: namespace.to_string(),
        objects,
    })
}

fn parse_config(value: &Value) -> Result<Vec<ConfigEntry>> {
    let mut entries = Vec::new();
    for (name, raw) in section_mapping(value, "/config")? {
        let name = key_string(name, "/config")?;
        let value = match raw {
            Value::Number(number) => number.as_i64(),
            _ => None,
        }
        .ok_or_else(|| {
            Error::InvalidSchema(format!("/config/{name}: config values must be integers"))
        })?;
        entries.push(ConfigEntry { name, value });
    }
    Ok(entries)
}

fn parse_shared(value: &Value) -> Result<Vec<SharedEntry>> {
    let mut entries = Vec::new();
    for (key, spec) in section_mapping(value, "/shared")? {
        let key = key_string(key, "/shared")?;
        let spec = field_value(spec, &format!("/shared/{key}"))?;
        entries.push(SharedEntry { key, spec });
    }
    Ok(entries)
}

fn parse_tables(value: &Value) -> Result<Vec<TableEntry>> {
    let mut entries = Vec::new();
    for (key, body) in section_mapping(value, "/tables")? {
        let key = key_string(key, "/tables")?;
        let (fields, object) = parse_fields(body, &format!("/tables/{key}"), true)?;
        entries.push(TableEntry {
            key,
            object,
            fields,
        });
    }
    Ok(entries)
}

/// Parse a field mapping; when `allow_object` is set the `object` key is
/// extracted as the base-object reference instead of a field.
fn parse_fields(
    value: &Value,
    path: &str,
    allow_object: bool,
) -> Result<(Vec<FieldEntry>, Option<String>)> {
    let mut fields = Vec::new();
    let mut object = None;

    for (name, raw) in section_mapping(value, path)? {
        let name = key_string(name, path)?;
        if allow_object && name == OBJECT_KEY {
            let Value::String(reference) = raw else {
                return Err(Error::InvalidSchema(format!(
                    "{path}/{OBJECT_KEY}: base object reference must be a string"
                )));
            };
            object = Some(reference.clone());
            continue;
        }
        let value = field_value(raw, &format!("{path}/{name}"))?;
        fields.push(FieldEntry { name, value });
    }

    Ok((fields, object))
}

fn field_value(value: &Value, path: &str) -> Result<FieldValue> {
    match value {
        Value::String(text) => Ok(FieldValue::Notation(text.clone())),
        Value::Null => Ok(FieldValue::Literal(serde_json::Value::Null)),
        Value::Bool(flag) => Ok(FieldValue::Literal(serde_json::Value::Bool(*flag))),
        Value::Number(number) => {
            let literal = if let Some(int) = number.as_i64() {
                serde_json::Value::from(int)
            } else if let Some(uint) = number.as_u64() {
                serde_json::Value::from(uint)
            } else {
                number
                    .as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| {
                        Error::InvalidSchema(format!("{path}: non-finite number literal"))
                    })?
            };
            Ok(FieldValue::Literal(literal))
        }
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => Err(Error::InvalidSchema(
            format!("{path}: field values must be notation strings or scalars"),
        )),
    }
}

/// Empty sections (`tables:` with no body) are treated as empty mappings.
fn section_mapping<'a>(value: &'a Value, path: &str) -> Result<Vec<(&'a Value, &'a Value)>> {
    match value {
        Value::Mapping(map) => Ok(map.iter().collect()),
        Value::Null => Ok(Vec::new()),
        _ => Err(Error::InvalidSchema(format!("{path}: expected a mapping"))),
    }
}

fn key_string(key: &Value, path: &str) -> Result<String> {
    match key {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        _ => Err(Error::InvalidSchema(format!("{path}: keys must be strings"))),
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}
