use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Options for the generation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Run seed; a random one is drawn and reported when absent.
    pub seed: Option<u64>,
    /// Run id recorded in the report; a fresh uuid when absent.
    pub run_id: Option<String>,
    /// First value produced by every `UNIQUE[int]` scope.
    pub unique_int_base: i64,
    /// Upper bound of `[n]` cardinality for `CHOOSE` over a range.
    pub range_choice_cap: u64,
    /// Rows handed to the sink per batch.
    pub batch_size: usize,
    /// Earliest day produced by `DATE`.
    pub date_min: NaiveDate,
    /// Latest day produced by `DATE`, inclusive.
    pub date_max: NaiveDate,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            seed: None,
            run_id: None,
            unique_int_base: 1000,
            range_choice_cap: 5,
            batch_size: 1000,
            date_min: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            date_max: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
        }
    }
}

impl GenerateOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}

/// Ordered phases of a run. Each completes before the next starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    LoadConfig,
    MaterializeShared,
    RegisterObjects,
    GenerateTables,
}

/// Summary of a generated table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows_requested: u64,
    pub rows_generated: u64,
    pub batches: u64,
    pub duration_ms: u64,
}

/// Structured failure of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub code: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
    pub message: String,
}

/// Report for a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub phases_completed: Vec<Phase>,
    pub tables: Vec<TableReport>,
    pub failures: Vec<GenerationIssue>,
    pub verb_usage: BTreeMap<String, u64>,
    pub bytes_written: u64,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64) -> Self {
        Self {
            run_id,
            seed,
            phases_completed: Vec::new(),
            tables: Vec::new(),
            failures: Vec::new(),
            verb_usage: BTreeMap::new(),
            bytes_written: 0,
            duration_ms: 0,
        }
    }

    pub fn complete_phase(&mut self, phase: Phase) {
        self.phases_completed.push(phase);
    }

    pub fn record_verb_usage(&mut self, verb: &str, count: u64) {
        *self.verb_usage.entry(verb.to_string()).or_insert(0) += count;
    }

    pub fn record_failure(&mut self, issue: GenerationIssue) {
        self.failures.push(issue);
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|table| table.table == name)
    }
}
