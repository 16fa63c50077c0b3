use std::path::Path;

use crate::errors::GenerationError;
use crate::value::Row;

use super::part::PartFile;

/// Streaming CSV writer.
///
/// The header is taken from the first row; later rows are laid out by header
/// name, with missing fields left empty. Nested values are written as JSON
/// text.
pub(crate) struct DelimitedWriter {
    file: PartFile,
    header: Option<Vec<String>>,
}

impl DelimitedWriter {
    pub fn create(path: &Path) -> Result<Self, GenerationError> {
        Ok(Self {
            file: PartFile::create(path)?,
            header: None,
        })
    }

    pub fn write_rows(&mut self, rows: &[Row]) -> Result<(), GenerationError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut self.file);

        for row in rows {
            if self.header.is_none() {
                let names: Vec<String> = row.names().map(str::to_string).collect();
                writer.write_record(&names)?;
                self.header = Some(names);
            }
            let Some(header) = &self.header else {
                continue;
            };
            let record = header
                .iter()
                .map(|name| match row.get(name) {
                    Some(value) => value.to_text(),
                    None => Ok(String::new()),
                })
                .collect::<Result<Vec<_>, _>>()?;
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn release(&mut self) -> Result<(), GenerationError> {
        Ok(self.file.release()?)
    }

    pub fn finish(self) -> Result<u64, GenerationError> {
        Ok(self.file.finish()?)
    }
}
