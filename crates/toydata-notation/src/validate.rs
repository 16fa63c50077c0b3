use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use toydata_core::{DataSchema, FieldEntry, FieldValue, OBJECT_KEY, validate_schema};

use crate::errors::{IssueSeverity, NotationError, ValidationIssue, ValidationReport};
use crate::model::{CountSpec, Directive, ObjectKey};
use crate::parser::{parse_directive, parse_entry_key, parse_object_key};

/// Schema with every key and directive parsed, ready for generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedSchema {
    pub config: Vec<ConfigVariable>,
    pub shared: Vec<SharedSpec>,
    pub tables: Vec<TableSpec>,
    pub objects: Vec<ObjectTemplate>,
    /// Non-fatal issues found while parsing.
    #[serde(skip)]
    pub warnings: Vec<ValidationIssue>,
}

impl ParsedSchema {
    pub fn config_value(&self, name: &str) -> Option<i64> {
        self.config
            .iter()
            .find(|variable| variable.name == name)
            .map(|variable| variable.value)
    }

    pub fn object(&self, key: &ObjectKey) -> Option<&ObjectTemplate> {
        self.objects.iter().find(|object| &object.key == key)
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|table| table.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigVariable {
    pub name: String,
    pub value: i64,
}

/// Shared column definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedSpec {
    pub name: String,
    pub rows: Option<CountSpec>,
    pub directive: Directive,
}

/// Table definition: row count, optional base object and field layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpec {
    pub name: String,
    pub rows: Option<CountSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<ObjectKey>,
    /// Overrides and extensions layered over the base object.
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectTemplate {
    pub key: ObjectKey,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub directive: Directive,
}

/// Parse and validate a whole schema tree.
///
/// Every notation failure is collected; any error rejects the schema.
pub fn parse_schema(schema: &DataSchema) -> Result<ParsedSchema, ValidationReport> {
    let mut report = ValidationReport::default();

    if let Err(err) = validate_schema(schema) {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "invalid_schema",
            "/",
            err.to_string(),
            None,
        ));
        return Err(report);
    }

    let config = schema
        .config
        .iter()
        .map(|entry| ConfigVariable {
            name: entry.name.clone(),
            value: entry.value,
        })
        .collect();

    let shared = parse_shared(schema, &mut report);
    let tables = parse_tables(schema, &mut report);
    let objects = parse_objects(schema, &mut report);

    if !report.is_ok() {
        return Err(report);
    }

    let mut parsed = ParsedSchema {
        config,
        shared,
        tables,
        objects,
        warnings: Vec::new(),
    };
    warn_unused_config(&parsed, &mut report);
    parsed.warnings = report.warnings;

    Ok(parsed)
}

fn parse_shared(schema: &DataSchema, report: &mut ValidationReport) -> Vec<SharedSpec> {
    let mut shared = Vec::new();
    let mut names = HashSet::new();

    for entry in &schema.shared {
        let path = format!("/shared/{}", entry.key);
        let Some(key) = record(report, &path, parse_entry_key(&entry.key)) else {
            continue;
        };
        if !names.insert(key.name.clone()) {
            report.push_error(duplicate_name(&path, "shared column", &key.name));
            continue;
        }
        let Some(directive) = record(report, &path, directive_for(&entry.spec)) else {
            continue;
        };
        shared.push(SharedSpec {
            name: key.name,
            rows: key.rows,
            directive,
        });
    }

    shared
}

fn parse_tables(schema: &DataSchema, report: &mut ValidationReport) -> Vec<TableSpec> {
    let mut tables = Vec::new();
    let mut names = HashSet::new();

    for entry in &schema.tables {
        let path = format!("/tables/{}", entry.key);
        let Some(key) = record(report, &path, parse_entry_key(&entry.key)) else {
            continue;
        };
        let path = format!("/tables/{}", key.name);
        if !names.insert(key.name.clone()) {
            report.push_error(duplicate_name(&path, "table", &key.name));
            continue;
        }

        let base = match &entry.object {
            Some(reference) => record(
                report,
                &format!("{path}/{OBJECT_KEY}"),
                parse_object_key(reference),
            ),
            None => None,
        };

        let fields = parse_fields(&entry.fields, &path, report);
        tables.push(TableSpec {
            name: key.name,
            rows: key.rows,
            base,
            fields,
        });
    }

    tables
}

fn parse_objects(schema: &DataSchema, report: &mut ValidationReport) -> Vec<ObjectTemplate> {
    let mut objects = Vec::new();
    for file in &schema.objects {
        for object in &file.objects {
            let path = format!("/objects/{}/{}", file.namespace, object.name);
            let fields = parse_fields(&object.fields, &path, report);
            objects.push(ObjectTemplate {
                key: ObjectKey::new(file.namespace.clone(), object.name.clone()),
                fields,
            });
        }
    }
    objects
}

fn parse_fields(
    fields: &[FieldEntry],
    owner_path: &str,
    report: &mut ValidationReport,
) -> Vec<FieldSpec> {
    let mut parsed = Vec::new();
    for field in fields {
        let path = format!("{owner_path}/fields/{}", field.name);
        if field.name == OBJECT_KEY {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "reserved_field",
                path,
                format!("`{OBJECT_KEY}` is reserved for the base object reference"),
                Some("rename the field".to_string()),
            ));
            continue;
        }
        if let Some(directive) = record(report, &path, directive_for(&field.value)) {
            parsed.push(FieldSpec {
                name: field.name.clone(),
                directive,
            });
        }
    }
    parsed
}

fn directive_for(value: &FieldValue) -> Result<Directive, NotationError> {
    match value {
        FieldValue::Notation(notation) => parse_directive(notation),
        FieldValue::Literal(literal) => Ok(Directive::literal(literal.clone())),
    }
}

fn record<T>(
    report: &mut ValidationReport,
    path: &str,
    result: Result<T, NotationError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            let hint = match &err {
                NotationError::Syntax { .. } => None,
                NotationError::InvalidCardinality { .. } => {
                    Some("counts must be a positive integer, `n` or [[CONFIG]]".to_string())
                }
            };
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                err.code(),
                path,
                err.to_string(),
                hint,
            ));
            None
        }
    }
}

fn duplicate_name(path: &str, kind: &str, name: &str) -> ValidationIssue {
    ValidationIssue::new(
        IssueSeverity::Error,
        "duplicate_name",
        path,
        format!("duplicate {kind} name: {name}"),
        None,
    )
}

fn warn_unused_config(schema: &ParsedSchema, report: &mut ValidationReport) {
    let mut used = BTreeSet::new();
    for shared in &schema.shared {
        mark_count(&shared.rows, &mut used);
        mark_directive(&shared.directive, &mut used);
    }
    for table in &schema.tables {
        mark_count(&table.rows, &mut used);
        for field in &table.fields {
            mark_directive(&field.directive, &mut used);
        }
    }
    for object in &schema.objects {
        for field in &object.fields {
            mark_directive(&field.directive, &mut used);
        }
    }

    for variable in &schema.config {
        if !used.contains(variable.name.as_str()) {
            report.push_warning(ValidationIssue::new(
                IssueSeverity::Warning,
                "unused_config",
                format!("/config/{}", variable.name),
                format!("config variable {} is never referenced", variable.name),
                None,
            ));
        }
    }
}

fn mark_count<'a>(rows: &'a Option<CountSpec>, used: &mut BTreeSet<&'a str>) {
    if let Some(CountSpec::Config(name)) = rows {
        used.insert(name.as_str());
    }
}

fn mark_directive<'a>(directive: &'a Directive, used: &mut BTreeSet<&'a str>) {
    used.extend(directive.config_refs());
}

#[cfg(test)]
mod tests {
    use super::*;
    use toydata_core::{ObjectEntry, ObjectFile, SharedEntry, TableEntry};

    fn table(key: &str, fields: Vec<FieldEntry>) -> TableEntry {
        TableEntry {
            key: key.to_string(),
            object: None,
            fields,
        }
    }

    #[test]
    fn collects_every_notation_error() {
        let schema = DataSchema {
            tables: vec![
                table("users[[10]]", vec![]),
                table(
                    "posts[3]",
                    vec![
                        FieldEntry::notation("tags", "CHOOSE[[a,b]"),
                        FieldEntry::notation("score", "CHOOSE[[1-5]][0]"),
                    ],
                ),
            ],
            ..DataSchema::default()
        };

        let report = parse_schema(&schema).expect_err("invalid");
        let paths: Vec<&str> = report.errors.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/tables/users[[10]]",
                "/tables/posts/fields/tags",
                "/tables/posts/fields/score"
            ]
        );
        assert_eq!(report.errors[2].code, "invalid_cardinality");
    }

    #[test]
    fn rejects_duplicates_and_reserved_fields() {
        let schema = DataSchema {
            shared: vec![
                SharedEntry {
                    key: "user_id[3]".into(),
                    spec: FieldValue::Notation("UNIQUE[int]".into()),
                },
                SharedEntry {
                    key: "user_id[5]".into(),
                    spec: FieldValue::Notation("UNIQUE[int]".into()),
                },
            ],
            objects: vec![ObjectFile {
                namespace: "core".into(),
                objects: vec![ObjectEntry {
                    name: "user".into(),
                    fields: vec![FieldEntry::notation("object", "NAME")],
                }],
            }],
            ..DataSchema::default()
        };

        let report = parse_schema(&schema).expect_err("invalid");
        assert!(report.find_error("duplicate_name").is_some());
        let reserved = report.find_error("reserved_field").expect("reserved");
        assert_eq!(reserved.path, "/objects/core/user/fields/object");
    }

    #[test]
    fn warns_about_unused_config() {
        let schema = DataSchema {
            config: vec![
                toydata_core::ConfigEntry {
                    name: "NB_USERS".into(),
                    value: 5,
                },
                toydata_core::ConfigEntry {
                    name: "NB_UNUSED".into(),
                    value: 1,
                },
            ],
            tables: vec![table(
                "users[[NB_USERS]]",
                vec![FieldEntry::notation("id", "UNIQUE[int]")],
            )],
            ..DataSchema::default()
        };

        let parsed = parse_schema(&schema).expect("valid");
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].path, "/config/NB_UNUSED");
        assert_eq!(
            parsed.tables[0].rows,
            Some(CountSpec::Config("NB_USERS".into()))
        );
    }

    #[test]
    fn literal_fields_become_literal_directives() {
        let schema = DataSchema {
            tables: vec![table(
                "flags[1]",
                vec![FieldEntry {
                    name: "enabled".into(),
                    value: FieldValue::Literal(serde_json::Value::Bool(true)),
                }],
            )],
            ..DataSchema::default()
        };
        let parsed = parse_schema(&schema).expect("valid");
        assert_eq!(
            parsed.tables[0].fields[0].directive,
            Directive::literal(serde_json::Value::Bool(true))
        );
    }
}
