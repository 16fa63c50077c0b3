use crate::errors::GenerationError;
use crate::model::GenerationReport;
use crate::value::Row;

/// Receiver of generated tables, fed in bounded batches.
///
/// Calls for one table always arrive as `begin_table`, any number of
/// `write_batch`, then exactly one of `finish_table` or `abort_table`.
pub trait TableSink {
    fn begin_table(&mut self, table: &str, rows_planned: u64) -> Result<(), GenerationError>;

    fn write_batch(&mut self, table: &str, rows: &[Row]) -> Result<(), GenerationError>;

    fn finish_table(&mut self, table: &str) -> Result<(), GenerationError>;

    /// Drop whatever was written for a table that failed mid-generation.
    fn abort_table(&mut self, table: &str) -> Result<(), GenerationError>;

    /// Total bytes persisted so far.
    fn bytes_written(&self) -> u64 {
        0
    }
}

/// Rows of one generated table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedTable {
    pub name: String,
    pub rows: Vec<Row>,
}

/// Every generated table, in declaration order, with the run report.
#[derive(Debug, Clone)]
pub struct GeneratedDataset {
    pub tables: Vec<GeneratedTable>,
    pub report: GenerationReport,
}

impl GeneratedDataset {
    pub fn table(&self, name: &str) -> Option<&GeneratedTable> {
        self.tables.iter().find(|table| table.name == name)
    }
}

/// Sink that keeps every table in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Vec<GeneratedTable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_tables(self) -> Vec<GeneratedTable> {
        self.tables
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut GeneratedTable, GenerationError> {
        self.tables
            .iter_mut()
            .rev()
            .find(|generated| generated.name == table)
            .ok_or_else(|| {
                GenerationError::Unsupported(format!("table {table} was never started"))
            })
    }
}

impl TableSink for MemorySink {
    fn begin_table(&mut self, table: &str, rows_planned: u64) -> Result<(), GenerationError> {
        self.tables.push(GeneratedTable {
            name: table.to_string(),
            rows: Vec::with_capacity(rows_planned.min(1 << 16) as usize),
        });
        Ok(())
    }

    fn write_batch(&mut self, table: &str, rows: &[Row]) -> Result<(), GenerationError> {
        self.table_mut(table)?.rows.extend_from_slice(rows);
        Ok(())
    }

    fn finish_table(&mut self, _table: &str) -> Result<(), GenerationError> {
        Ok(())
    }

    fn abort_table(&mut self, table: &str) -> Result<(), GenerationError> {
        self.tables.retain(|generated| generated.name != table);
        Ok(())
    }
}
