use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::builder::{BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::ArrowWriter;

use crate::errors::GenerationError;
use crate::value::{GeneratedValue, Row};

use super::CountingWriter;

/// Rows per record batch handed to the parquet encoder.
const ROWS_PER_BATCH: usize = 8192;

/// Parquet writer.
///
/// Rows are held until the file is finished so each column gets one type for
/// the whole file, and no file handle is open in between. Columns are ordered
/// by first appearance; integer columns become `Int64`, numeric ones
/// `Float64`, boolean ones `Boolean`, everything else `Utf8` with nested
/// values as JSON text.
pub(crate) struct ColumnarWriter {
    path: PathBuf,
    rows: Vec<Row>,
}

impl ColumnarWriter {
    pub fn create(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            rows: Vec::new(),
        }
    }

    pub fn write_rows(&mut self, rows: &[Row]) {
        self.rows.extend_from_slice(rows);
    }

    pub fn finish(self) -> Result<u64, GenerationError> {
        let columns = infer_columns(&self.rows);
        let schema: SchemaRef = Arc::new(Schema::new(
            columns
                .iter()
                .map(|(name, kind)| Field::new(name.as_str(), kind.data_type(), true))
                .collect::<Vec<_>>(),
        ));

        let file = BufWriter::new(File::create(&self.path)?);
        let mut writer = ArrowWriter::try_new(CountingWriter::new(file), schema.clone(), None)?;
        for chunk in self.rows.chunks(ROWS_PER_BATCH) {
            writer.write(&record_batch(&schema, &columns, chunk)?)?;
        }
        let mut counting = writer.into_inner()?;
        counting.flush()?;
        Ok(counting.bytes_written())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
}

impl ColumnKind {
    fn of(value: &GeneratedValue) -> Self {
        match value {
            GeneratedValue::Null => ColumnKind::Null,
            GeneratedValue::Bool(_) => ColumnKind::Bool,
            GeneratedValue::Int(_) => ColumnKind::Int,
            GeneratedValue::Float(_) => ColumnKind::Float,
            GeneratedValue::Text(_) | GeneratedValue::List(_) | GeneratedValue::Record(_) => {
                ColumnKind::Text
            }
        }
    }

    fn merge(self, other: ColumnKind) -> Self {
        match (self, other) {
            (kind, ColumnKind::Null) | (ColumnKind::Null, kind) => kind,
            (left, right) if left == right => left,
            (ColumnKind::Int, ColumnKind::Float) | (ColumnKind::Float, ColumnKind::Int) => {
                ColumnKind::Float
            }
            _ => ColumnKind::Text,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            ColumnKind::Bool => DataType::Boolean,
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Null | ColumnKind::Text => DataType::Utf8,
        }
    }
}

fn infer_columns(rows: &[Row]) -> Vec<(String, ColumnKind)> {
    let mut columns: Vec<(String, ColumnKind)> = Vec::new();
    for row in rows {
        for (name, value) in row.iter() {
            let kind = ColumnKind::of(value);
            match columns.iter_mut().find(|(column, _)| column == name) {
                Some((_, current)) => *current = current.merge(kind),
                None => columns.push((name.to_string(), kind)),
            }
        }
    }
    columns
}

fn record_batch(
    schema: &SchemaRef,
    columns: &[(String, ColumnKind)],
    rows: &[Row],
) -> Result<RecordBatch, GenerationError> {
    let arrays = columns
        .iter()
        .map(|(name, kind)| column_array(name, *kind, rows))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RecordBatch::try_new(schema.clone(), arrays)?)
}

fn column_array(name: &str, kind: ColumnKind, rows: &[Row]) -> Result<ArrayRef, GenerationError> {
    let values = rows.iter().map(|row| row.get(name));

    let array: ArrayRef = match kind {
        ColumnKind::Bool => {
            let mut builder = BooleanBuilder::with_capacity(rows.len());
            for value in values {
                match value {
                    Some(GeneratedValue::Bool(flag)) => builder.append_value(*flag),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Int => {
            let mut builder = Int64Builder::with_capacity(rows.len());
            for value in values {
                builder.append_option(value.and_then(GeneratedValue::as_i64));
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Float => {
            let mut builder = Float64Builder::with_capacity(rows.len());
            for value in values {
                match value {
                    Some(GeneratedValue::Int(int)) => builder.append_value(*int as f64),
                    Some(GeneratedValue::Float(float)) => builder.append_value(*float),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Null | ColumnKind::Text => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    None | Some(GeneratedValue::Null) => builder.append_null(),
                    Some(other) => builder.append_value(other.to_text()?),
                }
            }
            Arc::new(builder.finish())
        }
    };
    Ok(array)
}
