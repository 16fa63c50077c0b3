use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use toydata_core::DataSchema;
use toydata_notation::{ParsedSchema, SharedSpec, TableSpec, parse_schema};

use crate::context::{GenerationContext, shared_stream, table_stream};
use crate::errors::GenerationError;
use crate::generators;
use crate::model::{GenerateOptions, GenerationIssue, GenerationReport, Phase, TableReport};
use crate::registry::{FieldKind, FieldPlan, ObjectRegistry};
use crate::resolver::{Cardinality, ConfigTable, Scope, SharedStore, resolve_count};
use crate::sink::{GeneratedDataset, MemorySink, TableSink};
use crate::value::{GeneratedValue, Row};

/// Parse a raw schema tree, rejecting it on any notation error.
pub fn prepare_schema(schema: &DataSchema) -> Result<ParsedSchema, GenerationError> {
    let parsed = parse_schema(schema).map_err(GenerationError::InvalidSchema)?;
    for issue in &parsed.warnings {
        warn!(code = %issue.code, path = %issue.path, message = %issue.message, "schema warning");
    }
    Ok(parsed)
}

/// Entry point for generating datasets from a parsed schema.
#[derive(Debug, Clone, Default)]
pub struct GenerationEngine {
    options: GenerateOptions,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    /// Generate every table in memory.
    pub fn run(&self, schema: &ParsedSchema) -> Result<GeneratedDataset, GenerationError> {
        let mut sink = MemorySink::new();
        let report = self.run_with_sink(schema, &mut sink)?;
        Ok(GeneratedDataset {
            tables: sink.into_tables(),
            report,
        })
    }

    /// Generate every table, handing rows to `sink` in `batch_size` chunks.
    ///
    /// A table that fails is aborted on the sink and recorded in the report;
    /// later tables still run. Any recorded failure makes the run fail with
    /// [`GenerationError::Failed`].
    pub fn run_with_sink(
        &self,
        schema: &ParsedSchema,
        sink: &mut dyn TableSink,
    ) -> Result<GenerationReport, GenerationError> {
        let start = Instant::now();
        let seed = self.options.seed.unwrap_or_else(rand::random);
        let run_id = self
            .options
            .run_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut report = GenerationReport::new(run_id.clone(), seed);
        let mut ctx = GenerationContext::new(seed, self.options.clone());

        info!(
            run_id = %run_id,
            seed,
            config = schema.config.len(),
            shared = schema.shared.len(),
            objects = schema.objects.len(),
            tables = schema.tables.len(),
            "generation started"
        );

        let sources = match Sources::prepare(schema, &mut ctx, &mut report) {
            Ok(sources) => sources,
            Err(err) => {
                warn!(run_id = %run_id, error = %err, "generation failed");
                return Err(err);
            }
        };

        for table in &schema.tables {
            match self.generate_table(table, &sources, &mut ctx, sink, &mut report) {
                Ok(table_report) => report.tables.push(table_report),
                Err(err) => {
                    let issue = issue_for_table(&table.name, &err);
                    warn!(
                        run_id = %run_id,
                        code = %issue.code,
                        table = %table.name,
                        field = issue.field.as_deref().unwrap_or(""),
                        row = issue.row.unwrap_or(0),
                        message = %issue.message,
                        "table failed"
                    );
                    report.record_failure(issue);
                }
            }
        }
        report.complete_phase(Phase::GenerateTables);

        report.bytes_written = sink.bytes_written();
        report.duration_ms = start.elapsed().as_millis() as u64;

        if !report.is_success() {
            warn!(
                run_id = %run_id,
                failures = report.failures.len(),
                "generation failed"
            );
            return Err(GenerationError::Failed(Box::new(report)));
        }

        info!(
            run_id = %run_id,
            tables = report.tables.len(),
            duration_ms = report.duration_ms,
            bytes_written = report.bytes_written,
            "generation completed"
        );
        Ok(report)
    }

    fn generate_table(
        &self,
        table: &TableSpec,
        sources: &Sources,
        ctx: &mut GenerationContext,
        sink: &mut dyn TableSink,
        report: &mut GenerationReport,
    ) -> Result<TableReport, GenerationError> {
        let table_start = Instant::now();
        ctx.enter_stream(&table_stream(&table.name));

        let fields = sources.registry.compose_table(table)?;
        let scope = sources.scope();
        let rows = resolve_row_count(table, &fields, scope)?;

        info!(
            table = %table.name,
            rows,
            fields = fields.len(),
            "generating table"
        );

        sink.begin_table(&table.name, rows)?;
        let builder = RecordBuilder::new(&table.name, table_stream(&table.name), scope);
        let mut usage = BTreeMap::new();
        let outcome = self
            .stream_rows(&builder, &fields, rows, ctx, sink, &mut usage)
            .and_then(|batches| sink.finish_table(&table.name).map(|()| batches));
        for (verb, count) in usage {
            report.record_verb_usage(verb, count);
        }

        let batches = match outcome {
            Ok(batches) => batches,
            Err(err) => {
                if let Err(abort_err) = sink.abort_table(&table.name) {
                    warn!(table = %table.name, error = %abort_err, "abort failed");
                }
                return Err(err);
            }
        };

        let duration_ms = table_start.elapsed().as_millis() as u64;
        info!(
            table = %table.name,
            rows_generated = rows,
            batches,
            duration_ms,
            "table generated"
        );

        Ok(TableReport {
            table: table.name.clone(),
            rows_requested: rows,
            rows_generated: rows,
            batches,
            duration_ms,
        })
    }

    fn stream_rows(
        &self,
        builder: &RecordBuilder<'_>,
        fields: &[FieldPlan],
        rows: u64,
        ctx: &mut GenerationContext,
        sink: &mut dyn TableSink,
        usage: &mut BTreeMap<&'static str, u64>,
    ) -> Result<u64, GenerationError> {
        let batch_size = self.options.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size.min(rows as usize));
        let mut batches = 0_u64;

        for row in 0..rows {
            batch.push(builder.build(fields, row, ctx, usage)?);
            if batch.len() == batch_size {
                sink.write_batch(builder.table, &batch)?;
                batches += 1;
                debug!(table = %builder.table, batch = batches, rows = batch.len(), "batch written");
                batch.clear();
            }
        }
        if !batch.is_empty() {
            sink.write_batch(builder.table, &batch)?;
            batches += 1;
            debug!(table = %builder.table, batch = batches, rows = batch.len(), "batch written");
        }

        Ok(batches)
    }
}

/// Config, shared columns and object registry of a run, built in phase order.
#[derive(Debug, Clone)]
pub(crate) struct Sources {
    pub config: ConfigTable,
    pub shared: SharedStore,
    pub registry: ObjectRegistry,
}

impl Sources {
    /// Run `LOAD_CONFIG`, `MATERIALIZE_SHARED` and `REGISTER_OBJECTS`.
    pub fn prepare(
        schema: &ParsedSchema,
        ctx: &mut GenerationContext,
        report: &mut GenerationReport,
    ) -> Result<Self, GenerationError> {
        let config = ConfigTable::new(&schema.config);
        config.check_references(schema)?;
        report.complete_phase(Phase::LoadConfig);
        info!(variables = config.len(), "config loaded");

        let shared = materialize_shared(&schema.shared, &config, ctx, report)?;
        report.complete_phase(Phase::MaterializeShared);

        let registry = ObjectRegistry::new(&schema.objects);
        registry.verify()?;
        report.complete_phase(Phase::RegisterObjects);
        info!(objects = registry.len(), "objects registered");

        Ok(Self {
            config,
            shared,
            registry,
        })
    }

    pub fn scope(&self) -> Scope<'_> {
        Scope {
            config: &self.config,
            shared: &self.shared,
        }
    }
}

/// Materialize shared columns strictly in declaration order.
fn materialize_shared(
    specs: &[SharedSpec],
    config: &ConfigTable,
    ctx: &mut GenerationContext,
    report: &mut GenerationReport,
) -> Result<SharedStore, GenerationError> {
    let mut store = SharedStore::default();

    for spec in specs {
        let stream = shared_stream(&spec.name);
        ctx.enter_stream(&stream);

        let rows = match (&spec.rows, spec.directive.shared_ref()) {
            (Some(count), _) => resolve_count(count, config)?,
            (None, Some(source)) => store.get(source)?.len() as u64,
            (None, None) => {
                return Err(GenerationError::RowCountResolution {
                    table: spec.name.clone(),
                });
            }
        };

        let scope = Scope {
            config,
            shared: &store,
        };
        let values = (0..rows)
            .map(|row| generators::generate(&spec.directive, row, &stream, scope, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        report.record_verb_usage(spec.directive.verb.label(), rows);

        info!(shared = %spec.name, rows, "shared column materialized");
        store.insert(spec.name.clone(), values);
    }

    Ok(store)
}

/// Explicit count, or the length of the first bare shared reference.
fn resolve_row_count(
    table: &TableSpec,
    fields: &[FieldPlan],
    scope: Scope<'_>,
) -> Result<u64, GenerationError> {
    if let Some(count) = &table.rows {
        return resolve_count(count, scope.config);
    }
    let Some(source) = fields.iter().find_map(FieldPlan::shared_ref) else {
        return Err(GenerationError::RowCountResolution {
            table: table.name.clone(),
        });
    };
    Ok(scope.shared.get(source)?.len() as u64)
}

/// Builds records from a composed field list.
pub(crate) struct RecordBuilder<'a> {
    /// Name reported in field errors.
    table: &'a str,
    /// Prefix of the UNIQUE counter scope of every field.
    counter_prefix: String,
    scope: Scope<'a>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(table: &'a str, counter_prefix: String, scope: Scope<'a>) -> Self {
        Self {
            table,
            counter_prefix,
            scope,
        }
    }

    pub fn build(
        &self,
        fields: &[FieldPlan],
        row: u64,
        ctx: &mut GenerationContext,
        usage: &mut BTreeMap<&'static str, u64>,
    ) -> Result<Row, GenerationError> {
        self.build_at(fields, "", row, ctx, usage)
    }

    fn build_at(
        &self,
        fields: &[FieldPlan],
        parent: &str,
        row: u64,
        ctx: &mut GenerationContext,
        usage: &mut BTreeMap<&'static str, u64>,
    ) -> Result<Row, GenerationError> {
        let mut record = Row::with_capacity(fields.len());
        for field in fields {
            let path = if parent.is_empty() {
                field.name.clone()
            } else {
                format!("{parent}.{}", field.name)
            };
            let value = self
                .field_value(field, &path, row, ctx, usage)
                .map_err(|err| self.wrap(err, &path, row))?;
            record.push(field.name.clone(), value);
        }
        Ok(record)
    }

    fn field_value(
        &self,
        field: &FieldPlan,
        path: &str,
        row: u64,
        ctx: &mut GenerationContext,
        usage: &mut BTreeMap<&'static str, u64>,
    ) -> Result<GeneratedValue, GenerationError> {
        match &field.kind {
            FieldKind::Value(directive) => {
                *usage.entry(directive.verb.label()).or_insert(0) += 1;
                let counter_scope = format!("{}.{path}", self.counter_prefix);
                generators::generate(directive, row, &counter_scope, self.scope, ctx)
            }
            FieldKind::Nested { count, fields, .. } => {
                *usage.entry("object_ref").or_insert(0) += 1;
                let count = match Cardinality::resolve(count.as_ref(), self.scope.config)? {
                    Cardinality::Single => {
                        let record = self.build_at(fields, path, row, ctx, usage)?;
                        return Ok(GeneratedValue::Record(record));
                    }
                    Cardinality::Fixed(count) => count,
                    Cardinality::Random => {
                        let max = ctx.options().range_choice_cap.max(1);
                        rand::Rng::random_range(ctx.rng(), 1..=max) as usize
                    }
                };
                let records = (0..count)
                    .map(|_| {
                        self.build_at(fields, path, row, ctx, usage)
                            .map(GeneratedValue::Record)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(GeneratedValue::List(records))
            }
        }
    }

    fn wrap(&self, err: GenerationError, path: &str, row: u64) -> GenerationError {
        match err {
            GenerationError::Field { .. } => err,
            other => GenerationError::Field {
                table: self.table.to_string(),
                field: path.to_string(),
                row,
                source: Box::new(other),
            },
        }
    }
}

fn issue_for_table(table: &str, err: &GenerationError) -> GenerationIssue {
    let (field, row, message) = match err {
        GenerationError::Field {
            field, row, source, ..
        } => (Some(field.clone()), Some(*row), source.to_string()),
        other => (None, None, other.to_string()),
    };
    GenerationIssue {
        code: err.code().to_string(),
        table: table.to_string(),
        field,
        row,
        message,
    }
}

#[cfg(test)]
mod tests {
    use toydata_core::load_schema_str;

    use super::*;

    fn parsed(yaml: &str) -> ParsedSchema {
        prepare_schema(&load_schema_str(yaml).expect("yaml")).expect("schema")
    }

    fn engine(seed: u64) -> GenerationEngine {
        GenerationEngine::new(GenerateOptions::default().with_seed(seed))
    }

    #[derive(Default)]
    struct CountingSink {
        batches: Vec<(String, usize)>,
        finished: Vec<String>,
        aborted: Vec<String>,
    }

    impl TableSink for CountingSink {
        fn begin_table(&mut self, _table: &str, _rows: u64) -> Result<(), GenerationError> {
            Ok(())
        }

        fn write_batch(&mut self, table: &str, rows: &[Row]) -> Result<(), GenerationError> {
            self.batches.push((table.to_string(), rows.len()));
            Ok(())
        }

        fn finish_table(&mut self, table: &str) -> Result<(), GenerationError> {
            self.finished.push(table.to_string());
            Ok(())
        }

        fn abort_table(&mut self, table: &str) -> Result<(), GenerationError> {
            self.aborted.push(table.to_string());
            Ok(())
        }
    }

    #[test]
    fn phases_complete_in_order() {
        let schema = parsed("tables:\n  t[1]:\n    a: int\n");
        let dataset = engine(1).run(&schema).expect("run");
        assert_eq!(
            dataset.report.phases_completed,
            vec![
                Phase::LoadConfig,
                Phase::MaterializeShared,
                Phase::RegisterObjects,
                Phase::GenerateTables
            ]
        );
        assert_eq!(dataset.report.seed, 1);
    }

    #[test]
    fn reports_carry_the_callers_run_id() {
        let schema = parsed("tables:\n  t[2]:\n    id: UNIQUE[int]\n");
        let options = GenerateOptions::default()
            .with_seed(4)
            .with_run_id("run-fixed");
        let dataset = GenerationEngine::new(options).run(&schema).expect("run");
        assert_eq!(dataset.report.run_id, "run-fixed");

        let fresh = engine(4).run(&schema).expect("run");
        assert!(uuid::Uuid::parse_str(&fresh.report.run_id).is_ok());
    }

    #[test]
    fn streams_tables_in_bounded_batches() {
        let schema = parsed("tables:\n  t[25]:\n    id: UNIQUE[int]\n");
        let options = GenerateOptions {
            batch_size: 10,
            ..GenerateOptions::default().with_seed(3)
        };
        let mut sink = CountingSink::default();
        let report = GenerationEngine::new(options)
            .run_with_sink(&schema, &mut sink)
            .expect("run");
        assert_eq!(
            sink.batches,
            vec![("t".into(), 10), ("t".into(), 10), ("t".into(), 5)]
        );
        assert_eq!(sink.finished, vec!["t".to_string()]);
        assert_eq!(report.tables[0].batches, 3);
    }

    #[test]
    fn batched_and_in_memory_runs_agree() {
        let yaml = "tables:\n  t[30]:\n    tags: CHOOSE[[a,b,c]][n]\n    when: DATE\n";
        let schema = parsed(yaml);
        let whole = engine(5).run(&schema).expect("run");
        let options = GenerateOptions {
            batch_size: 7,
            ..GenerateOptions::default().with_seed(5)
        };
        let batched = GenerationEngine::new(options).run(&schema).expect("run");
        assert_eq!(whole.tables, batched.tables);
    }

    #[test]
    fn failing_table_is_aborted_and_siblings_continue() {
        let yaml = "tables:\n  broken[3]:\n    who: \"[[missing]]\"\n  fine[2]:\n    id: UNIQUE[int]\n";
        let schema = parsed(yaml);
        let mut sink = CountingSink::default();
        let err = engine(9)
            .run_with_sink(&schema, &mut sink)
            .expect_err("must fail");

        assert_eq!(sink.aborted, vec!["broken".to_string()]);
        assert_eq!(sink.finished, vec!["fine".to_string()]);
        let GenerationError::Failed(report) = err else {
            panic!("expected aggregated failure");
        };
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.code, "undefined_reference");
        assert_eq!(failure.table, "broken");
        assert_eq!(failure.field.as_deref(), Some("who"));
        assert_eq!(failure.row, Some(0));
        assert_eq!(report.tables.len(), 1);
    }

    #[test]
    fn shared_columns_resolve_in_declaration_order_only() {
        let yaml = "shared:\n  a[2]: \"[[b]]\"\n  b[2]: UNIQUE[int]\n";
        let schema = parsed(yaml);
        assert!(matches!(
            engine(1).run(&schema),
            Err(GenerationError::UndefinedReference { .. })
        ));
    }

    #[test]
    fn undefined_config_fails_before_generation() {
        let yaml = "tables:\n  t[[NB_MISSING]]:\n    id: int\n";
        let schema = parsed(yaml);
        let mut sink = CountingSink::default();
        let err = engine(1)
            .run_with_sink(&schema, &mut sink)
            .expect_err("undefined config");
        assert!(matches!(err, GenerationError::UndefinedReference { .. }));
        assert!(sink.batches.is_empty());
    }

    #[test]
    fn nested_unique_counters_use_the_field_path() {
        let yaml = r#"
tables:
  users[3]:
    object: core.user
objects:
  core:
    profile:
      id: UNIQUE[int]
    user:
      id: UNIQUE[int]
      profile: "[[object.core.profile]]"
"#;
        let dataset = engine(2).run(&parsed(yaml)).expect("run");
        let users = dataset.table("users").expect("users");
        let ids: Vec<i64> = users
            .rows
            .iter()
            .filter_map(|row| row.get("id").and_then(GeneratedValue::as_i64))
            .collect();
        let profile_ids: Vec<i64> = users
            .rows
            .iter()
            .filter_map(|row| row.get("profile").and_then(GeneratedValue::as_record))
            .filter_map(|profile| profile.get("id").and_then(GeneratedValue::as_i64))
            .collect();
        assert_eq!(ids, vec![1000, 1001, 1002]);
        assert_eq!(profile_ids, vec![1000, 1001, 1002]);
    }
}
