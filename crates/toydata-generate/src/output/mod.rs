//! File writers behind the [`TableSink`] contract.
//!
//! Tables land at `<dest>/<table>.<ext>`, or under a hive layout
//! `<dest>/<table>/<col>=<value>/part-00000.<ext>` when partition columns are
//! configured. Row formats stream as batches arrive; a partitioned table
//! keeps at most one partition file open at a time. Every writer counts the
//! bytes it persists.

mod columnar;
mod delimited;
mod json;
mod part;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::GenerationError;
use crate::sink::TableSink;
use crate::value::{GeneratedValue, Row};

use self::columnar::ColumnarWriter;
use self::delimited::DelimitedWriter;
use self::json::{JsonArrayWriter, JsonLinesWriter};

/// Directory name used for null partition values.
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

const PART_FILE_STEM: &str = "part-00000";

/// Physical file format of a written table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "parquet")]
    Columnar,
    #[serde(alias = "csv")]
    Delimited,
    Json,
    #[serde(alias = "ldjson", alias = "jsonl")]
    LdJson,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Columnar,
        OutputFormat::Delimited,
        OutputFormat::Json,
        OutputFormat::LdJson,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Columnar => "parquet",
            OutputFormat::Delimited => "csv",
            OutputFormat::Json => "json",
            OutputFormat::LdJson => "ld-json",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Columnar => "columnar",
            OutputFormat::Delimited => "delimited",
            OutputFormat::Json => "json",
            OutputFormat::LdJson => "ld-json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "columnar" | "parquet" => Ok(OutputFormat::Columnar),
            "delimited" | "csv" => Ok(OutputFormat::Delimited),
            "json" => Ok(OutputFormat::Json),
            "ld-json" | "ldjson" | "jsonl" => Ok(OutputFormat::LdJson),
            other => Err(format!(
                "unknown output format `{other}` (expected columnar, delimited, json or ld-json)"
            )),
        }
    }
}

/// Where and how tables are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriterOptions {
    pub dest: PathBuf,
    pub format: OutputFormat,
    #[serde(default)]
    pub partition_columns: Vec<String>,
    #[serde(default)]
    pub overwrite_allowed: bool,
    /// Keep the rows already written for a table that fails.
    #[serde(default)]
    pub partial_writes: bool,
}

impl WriterOptions {
    pub fn new(dest: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            dest: dest.into(),
            format,
            partition_columns: Vec::new(),
            overwrite_allowed: false,
            partial_writes: false,
        }
    }

    /// Target of an unpartitioned table, or root directory of a partitioned one.
    pub fn table_target(&self, table: &str) -> PathBuf {
        if self.partition_columns.is_empty() {
            self.dest
                .join(format!("{table}.{}", self.format.extension()))
        } else {
            self.dest.join(table)
        }
    }
}

/// Byte-counting wrapper around an output stream.
pub(crate) struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

enum FileWriter {
    Columnar(ColumnarWriter),
    Delimited(DelimitedWriter),
    Json(JsonArrayWriter),
    LdJson(JsonLinesWriter),
}

impl FileWriter {
    fn create(path: &Path, format: OutputFormat) -> Result<Self, GenerationError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match format {
            OutputFormat::Delimited => Ok(FileWriter::Delimited(DelimitedWriter::create(path)?)),
            OutputFormat::Json => Ok(FileWriter::Json(JsonArrayWriter::create(path)?)),
            OutputFormat::LdJson => Ok(FileWriter::LdJson(JsonLinesWriter::create(path)?)),
            OutputFormat::Columnar => Ok(FileWriter::Columnar(ColumnarWriter::create(path))),
        }
    }

    fn write_rows(&mut self, rows: &[Row]) -> Result<(), GenerationError> {
        match self {
            FileWriter::Columnar(writer) => {
                writer.write_rows(rows);
                Ok(())
            }
            FileWriter::Delimited(writer) => writer.write_rows(rows),
            FileWriter::Json(writer) => writer.write_rows(rows),
            FileWriter::LdJson(writer) => writer.write_rows(rows),
        }
    }

    /// Close the file handle until the next write.
    fn release(&mut self) -> Result<(), GenerationError> {
        match self {
            FileWriter::Columnar(_) => Ok(()),
            FileWriter::Delimited(writer) => writer.release(),
            FileWriter::Json(writer) => writer.release(),
            FileWriter::LdJson(writer) => writer.release(),
        }
    }

    /// Flush and close, returning the bytes written.
    fn finish(self) -> Result<u64, GenerationError> {
        match self {
            FileWriter::Columnar(writer) => writer.finish(),
            FileWriter::Delimited(writer) => writer.finish(),
            FileWriter::Json(writer) => writer.finish(),
            FileWriter::LdJson(writer) => writer.finish(),
        }
    }
}

struct OpenTable {
    name: String,
    target: PathBuf,
    writers: BTreeMap<PathBuf, FileWriter>,
}

/// [`TableSink`] writing each table to files under a destination directory.
pub struct FileSink {
    options: WriterOptions,
    open: Option<OpenTable>,
    bytes: u64,
    written: Vec<PathBuf>,
}

impl fmt::Debug for FileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSink")
            .field("options", &self.options)
            .field("open", &self.open.as_ref().map(|table| &table.name))
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl FileSink {
    pub fn new(options: WriterOptions) -> Result<Self, GenerationError> {
        fs::create_dir_all(&options.dest)?;
        Ok(Self {
            options,
            open: None,
            bytes: 0,
            written: Vec::new(),
        })
    }

    /// Targets of every table finished so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn open_table(&mut self, table: &str) -> Result<&mut OpenTable, GenerationError> {
        match self.open.as_mut() {
            Some(open) if open.name == table => Ok(open),
            _ => Err(GenerationError::Unsupported(format!(
                "table `{table}` is not open for writing"
            ))),
        }
    }

    /// Split partition values off `row` and return the file it belongs to.
    fn partition_path(
        &self,
        target: &Path,
        row: &Row,
    ) -> Result<(PathBuf, Row), GenerationError> {
        let mut rest = row.clone();
        let mut dir = target.to_path_buf();
        for column in &self.options.partition_columns {
            let value = rest.take(column).ok_or_else(|| {
                GenerationError::Unsupported(format!(
                    "partition column `{column}` is missing from the row"
                ))
            })?;
            dir.push(format!("{column}={}", partition_segment(column, &value)?));
        }
        dir.push(format!("{PART_FILE_STEM}.{}", self.options.format.extension()));
        Ok((dir, rest))
    }
}

impl TableSink for FileSink {
    fn begin_table(&mut self, table: &str, rows_planned: u64) -> Result<(), GenerationError> {
        if let Some(open) = &self.open {
            return Err(GenerationError::Unsupported(format!(
                "table `{}` is still open",
                open.name
            )));
        }

        let target = self.options.table_target(table);
        if target.exists() {
            if !self.options.overwrite_allowed {
                return Err(GenerationError::Io(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", target.display()),
                )));
            }
            remove_path(&target)?;
        }

        let mut writers = BTreeMap::new();
        if self.options.partition_columns.is_empty() {
            writers.insert(
                target.clone(),
                FileWriter::create(&target, self.options.format)?,
            );
        }

        debug!(table, rows_planned, target = %target.display(), "table file opened");
        self.open = Some(OpenTable {
            name: table.to_string(),
            target,
            writers,
        });
        Ok(())
    }

    fn write_batch(&mut self, table: &str, rows: &[Row]) -> Result<(), GenerationError> {
        let format = self.options.format;
        if self.options.partition_columns.is_empty() {
            let open = self.open_table(table)?;
            let target = open.target.clone();
            let Some(writer) = open.writers.get_mut(&target) else {
                return Err(GenerationError::Unsupported(format!(
                    "table `{table}` has no open writer"
                )));
            };
            return writer.write_rows(rows);
        }

        let target = self.open_table(table)?.target.clone();
        let mut groups: BTreeMap<PathBuf, Vec<Row>> = BTreeMap::new();
        for row in rows {
            let (path, rest) = self.partition_path(&target, row)?;
            groups.entry(path).or_default().push(rest);
        }

        let open = self.open_table(table)?;
        for (path, rows) in groups {
            let writer = match open.writers.entry(path) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let writer = FileWriter::create(entry.key(), format)?;
                    entry.insert(writer)
                }
            };
            writer.write_rows(&rows)?;
            writer.release()?;
        }
        Ok(())
    }

    fn finish_table(&mut self, table: &str) -> Result<(), GenerationError> {
        self.open_table(table)?;
        let Some(open) = self.open.take() else {
            return Ok(());
        };

        let files = open.writers.len();
        let mut bytes = 0_u64;
        for writer in open.writers.into_values() {
            bytes = bytes.saturating_add(writer.finish()?);
        }
        self.bytes = self.bytes.saturating_add(bytes);

        info!(
            table = %open.name,
            files,
            bytes,
            target = %open.target.display(),
            "table written"
        );
        self.written.push(open.target);
        Ok(())
    }

    fn abort_table(&mut self, table: &str) -> Result<(), GenerationError> {
        self.open_table(table)?;
        let Some(open) = self.open.take() else {
            return Ok(());
        };

        if self.options.partial_writes {
            let mut bytes = 0_u64;
            for writer in open.writers.into_values() {
                bytes = bytes.saturating_add(writer.finish()?);
            }
            self.bytes = self.bytes.saturating_add(bytes);
            warn!(table = %open.name, bytes, "partial table kept");
            self.written.push(open.target);
            return Ok(());
        }

        drop(open.writers);
        if open.target.exists() {
            remove_path(&open.target)?;
        }
        warn!(table = %open.name, target = %open.target.display(), "partial table removed");
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

fn partition_segment(column: &str, value: &GeneratedValue) -> Result<String, GenerationError> {
    let text = match value {
        GeneratedValue::Null => return Ok(DEFAULT_PARTITION.to_string()),
        GeneratedValue::List(_) | GeneratedValue::Record(_) => {
            return Err(GenerationError::Unsupported(format!(
                "partition column `{column}` holds a nested value"
            )));
        }
        other => other.to_text()?,
    };
    if text.is_empty() {
        return Ok(DEFAULT_PARTITION.to_string());
    }
    Ok(escape_segment(&text))
}

/// Percent-encode characters that would break a `col=value` directory name.
fn escape_segment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '/' | '\\' | '=' | '%' | ':' => out.push_str(&format!("%{:02X}", ch as u32)),
            _ => out.push(ch),
        }
    }
    out
}

fn remove_path(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_from_both_spellings() {
        assert_eq!("csv".parse::<OutputFormat>(), Ok(OutputFormat::Delimited));
        assert_eq!("ld-json".parse::<OutputFormat>(), Ok(OutputFormat::LdJson));
        assert_eq!("parquet".parse::<OutputFormat>(), Ok(OutputFormat::Columnar));
        assert!("xml".parse::<OutputFormat>().is_err());
        for format in OutputFormat::ALL {
            assert_eq!(format.as_str().parse::<OutputFormat>(), Ok(format));
        }
    }

    #[test]
    fn partition_segments_are_escaped() {
        assert_eq!(
            partition_segment("c", &GeneratedValue::Text("a/b=c".into())).expect("segment"),
            "a%2Fb%3Dc"
        );
        assert_eq!(
            partition_segment("c", &GeneratedValue::Null).expect("segment"),
            DEFAULT_PARTITION
        );
        assert!(partition_segment("c", &GeneratedValue::List(Vec::new())).is_err());
    }
}
