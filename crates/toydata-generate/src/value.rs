use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Generated value for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<GeneratedValue>),
    Record(Row),
}

impl GeneratedValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[GeneratedValue]> {
        match self {
            GeneratedValue::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Row> {
        match self {
            GeneratedValue::Record(row) => Some(row),
            _ => None,
        }
    }

    /// Scalars print bare, nested values as JSON text.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        match self {
            GeneratedValue::Null => Ok(String::new()),
            GeneratedValue::Bool(value) => Ok(value.to_string()),
            GeneratedValue::Int(value) => Ok(value.to_string()),
            GeneratedValue::Float(value) => Ok(value.to_string()),
            GeneratedValue::Text(value) => Ok(value.clone()),
            GeneratedValue::List(_) | GeneratedValue::Record(_) => serde_json::to_string(self),
        }
    }
}

impl From<&Value> for GeneratedValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => GeneratedValue::Null,
            Value::Bool(flag) => GeneratedValue::Bool(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(int) => GeneratedValue::Int(int),
                None => number
                    .as_f64()
                    .map(GeneratedValue::Float)
                    .unwrap_or(GeneratedValue::Null),
            },
            Value::String(text) => GeneratedValue::Text(text.clone()),
            Value::Array(items) => GeneratedValue::List(items.iter().map(Into::into).collect()),
            Value::Object(map) => {
                let mut row = Row::with_capacity(map.len());
                for (name, item) in map {
                    row.push(name.clone(), item.into());
                }
                GeneratedValue::Record(row)
            }
        }
    }
}

impl Serialize for GeneratedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GeneratedValue::Null => serializer.serialize_none(),
            GeneratedValue::Bool(value) => serializer.serialize_bool(*value),
            GeneratedValue::Int(value) => serializer.serialize_i64(*value),
            GeneratedValue::Float(value) => serializer.serialize_f64(*value),
            GeneratedValue::Text(value) => serializer.serialize_str(value),
            GeneratedValue::List(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            GeneratedValue::Record(row) => row.serialize(serializer),
        }
    }
}

/// One record: field values in composed field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, GeneratedValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a field, replacing the value of an existing field of that name.
    pub fn push(&mut self, name: impl Into<String>, value: GeneratedValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&GeneratedValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Remove a field and return its value.
    pub fn take(&mut self, name: &str) -> Option<GeneratedValue> {
        let index = self.fields.iter().position(|(field, _)| field == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeneratedValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_serialize_in_field_order() {
        let mut profile = Row::new();
        profile.push("city", GeneratedValue::Text("Tokyo".into()));

        let mut row = Row::new();
        row.push("zeta", GeneratedValue::Int(1));
        row.push("alpha", GeneratedValue::Bool(true));
        row.push("profile", GeneratedValue::Record(profile));
        row.push(
            "tags",
            GeneratedValue::List(vec![GeneratedValue::Text("api".into())]),
        );

        let json = serde_json::to_string(&row).expect("serialize");
        assert_eq!(
            json,
            r#"{"zeta":1,"alpha":true,"profile":{"city":"Tokyo"},"tags":["api"]}"#
        );
    }

    #[test]
    fn nested_values_render_as_json_text() {
        let list = GeneratedValue::List(vec![GeneratedValue::Int(1), GeneratedValue::Int(2)]);
        assert_eq!(list.to_text().expect("text"), "[1,2]");
        assert_eq!(GeneratedValue::Null.to_text().expect("text"), "");
        assert_eq!(GeneratedValue::Float(12.5).to_text().expect("text"), "12.5");
    }

    #[test]
    fn push_replaces_existing_fields_in_place() {
        let mut row = Row::new();
        row.push("id", GeneratedValue::Int(1));
        row.push("name", GeneratedValue::Text("a".into()));
        row.push("id", GeneratedValue::Int(2));
        assert_eq!(row.names().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(row.get("id"), Some(&GeneratedValue::Int(2)));
    }
}
