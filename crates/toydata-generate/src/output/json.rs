use std::io::Write;
use std::path::Path;

use crate::errors::GenerationError;
use crate::value::Row;

use super::part::PartFile;

/// A JSON array written one element per line as rows arrive.
pub(crate) struct JsonArrayWriter {
    file: PartFile,
    rows: u64,
}

impl JsonArrayWriter {
    pub fn create(path: &Path) -> Result<Self, GenerationError> {
        Ok(Self {
            file: PartFile::create(path)?,
            rows: 0,
        })
    }

    pub fn write_rows(&mut self, rows: &[Row]) -> Result<(), GenerationError> {
        for row in rows {
            let separator: &[u8] = if self.rows == 0 { b"[\n  " } else { b",\n  " };
            self.file.write_all(separator)?;
            serde_json::to_writer(&mut self.file, row)?;
            self.rows += 1;
        }
        Ok(())
    }

    pub fn release(&mut self) -> Result<(), GenerationError> {
        Ok(self.file.release()?)
    }

    /// Close the array; reopens a released file for the closing bracket.
    pub fn finish(mut self) -> Result<u64, GenerationError> {
        let closing: &[u8] = if self.rows == 0 { b"[]\n" } else { b"\n]\n" };
        self.file.write_all(closing)?;
        Ok(self.file.finish()?)
    }
}

/// Line-delimited JSON: one object per line.
pub(crate) struct JsonLinesWriter {
    file: PartFile,
}

impl JsonLinesWriter {
    pub fn create(path: &Path) -> Result<Self, GenerationError> {
        Ok(Self {
            file: PartFile::create(path)?,
        })
    }

    pub fn write_rows(&mut self, rows: &[Row]) -> Result<(), GenerationError> {
        for row in rows {
            serde_json::to_writer(&mut self.file, row)?;
            self.file.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn release(&mut self) -> Result<(), GenerationError> {
        Ok(self.file.release()?)
    }

    pub fn finish(self) -> Result<u64, GenerationError> {
        Ok(self.file.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::GeneratedValue;

    fn temp_file(ext: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("toydata_json_{}.{ext}", uuid::Uuid::new_v4()))
    }

    fn row(id: i64) -> Row {
        let mut row = Row::new();
        row.push("id", GeneratedValue::Int(id));
        row.push("name", GeneratedValue::Text(format!("user {id}")));
        row
    }

    #[test]
    fn array_output_survives_released_batches() {
        let path = temp_file("json");
        let mut writer = JsonArrayWriter::create(&path).expect("create");
        writer.write_rows(&[row(1)]).expect("row");
        writer.release().expect("release");
        writer.write_rows(&[row(2)]).expect("row");
        writer.release().expect("release");
        writer.finish().expect("finish");

        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("[\n  {\"id\":1,\"name\":\"user 1\"}"));
        let parsed: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn empty_array_is_still_valid_json() {
        let path = temp_file("json");
        let writer = JsonArrayWriter::create(&path).expect("create");
        assert_eq!(writer.finish().expect("finish"), 3);
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "[]\n");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn lines_output_has_one_object_per_line() {
        let path = temp_file("ld-json");
        let mut writer = JsonLinesWriter::create(&path).expect("create");
        let rows: Vec<Row> = (0..3).map(row).collect();
        writer.write_rows(&rows).expect("rows");
        let bytes = writer.finish().expect("finish");

        let text = std::fs::read_to_string(&path).expect("read");
        assert_eq!(bytes, text.len() as u64);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "{\"id\":2,\"name\":\"user 2\"}");
        std::fs::remove_file(path).ok();
    }
}
