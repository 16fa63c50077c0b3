use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Top-level schema tree for a generation run.
///
/// Every section is kept as an ordered list because declaration order is
/// meaningful: shared columns resolve strictly top to bottom and tables are
/// generated in the order they were declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataSchema {
    /// Named integer constants (`NB_USERS: 5`).
    #[serde(default)]
    pub config: Vec<ConfigEntry>,
    /// Columns materialized once and referenced by tables.
    #[serde(default)]
    pub shared: Vec<SharedEntry>,
    /// Tables to generate.
    #[serde(default)]
    pub tables: Vec<TableEntry>,
    /// Object template files, one namespace per file.
    #[serde(default)]
    pub objects: Vec<ObjectFile>,
}

impl DataSchema {
    /// Attach object template files loaded separately from the main schema.
    pub fn with_objects(mut self, objects: Vec<ObjectFile>) -> Self {
        self.objects.extend(objects);
        self
    }

    pub fn config_value(&self, name: &str) -> Option<i64> {
        self.config
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value)
    }

    pub fn object_file(&self, namespace: &str) -> Option<&ObjectFile> {
        self.objects.iter().find(|file| file.namespace == namespace)
    }
}

/// A config variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConfigEntry {
    pub name: String,
    pub value: i64,
}

/// A shared column as declared: raw `name[count]` key and its directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SharedEntry {
    pub key: String,
    pub spec: FieldValue,
}

/// A table as declared: raw `name[count]` key, optional base object and fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TableEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

/// Object templates loaded from one file; the namespace is the file stem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectFile {
    pub namespace: String,
    #[serde(default)]
    pub objects: Vec<ObjectEntry>,
}

impl ObjectFile {
    pub fn object(&self, name: &str) -> Option<&ObjectEntry> {
        self.objects.iter().find(|object| object.name == name)
    }
}

/// A single object template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

/// A named field with its unparsed specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldEntry {
    pub name: String,
    pub value: FieldValue,
}

impl FieldEntry {
    pub fn notation(name: impl Into<String>, notation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Notation(notation.into()),
        }
    }
}

/// Raw field specification.
///
/// String values carry notation; any other YAML scalar is a literal that is
/// emitted unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Notation(String),
    Literal(serde_json::Value),
}
