//! Single-record generation for mock API responses.

use std::collections::BTreeMap;

use tracing::{debug, info};

use toydata_notation::{ObjectKey, ParsedSchema, parse_object_key};

use crate::context::{GenerationContext, hash_seed};
use crate::engine::{RecordBuilder, Sources};
use crate::errors::{GenerationError, ReferenceKind};
use crate::model::{GenerateOptions, GenerationReport};
use crate::value::{GeneratedValue, Row};

/// Number of distinct row indexes a parameter set can map to.
const ROW_INDEX_SPAN: u64 = 1000;

/// Fixed timestamp carried by generic fallback responses.
const GENERIC_TIMESTAMP: &str = "2024-01-15T10:30:00Z";

/// Response type names that predate object references.
const LEGACY_RESPONSES: &[(&str, &str)] = &[
    ("api_info", "core.api_info"),
    ("user_list", "core.user_list"),
    ("user_detail", "core.user"),
    ("user_profile", "core.user_profile"),
    ("user_permissions", "core.user_permissions"),
    ("user_posts", "core.user_posts"),
    ("user_settings", "core.user_settings"),
    ("user_private", "core.user_private"),
    ("post_list", "core.post_list"),
    ("post_detail", "core.post"),
    ("admin_dashboard", "core.admin_dashboard"),
    ("admin_detail", "core.admin"),
    ("admin_dangerous", "core.admin_dangerous"),
    ("system_config", "core.system_config"),
    ("health_check", "core.health_check"),
];

/// Object reference a legacy response type maps to.
pub fn legacy_object(response_type: &str) -> Option<&'static str> {
    LEGACY_RESPONSES
        .iter()
        .find(|(legacy, _)| *legacy == response_type)
        .map(|(_, object)| *object)
}

/// Row index of a parameter set: FNV-1a of the sorted pairs, or 0 when empty.
pub fn row_index(params: &BTreeMap<String, String>) -> u64 {
    if params.is_empty() {
        return 0;
    }
    let joined = params
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    hash_seed(0, &joined) % ROW_INDEX_SPAN
}

/// Generates one record per request from composed object templates.
///
/// Config, shared columns and the object registry are built once; every
/// request then gets its own random stream, so identical requests produce
/// identical payloads for a given seed.
#[derive(Debug, Clone)]
pub struct ResponseGenerator {
    seed: u64,
    options: GenerateOptions,
    sources: Sources,
}

impl ResponseGenerator {
    pub fn new(schema: &ParsedSchema, options: GenerateOptions) -> Result<Self, GenerationError> {
        let seed = options.seed.unwrap_or_else(rand::random);
        let mut ctx = GenerationContext::new(seed, options.clone());
        let mut report = GenerationReport::new(uuid::Uuid::new_v4().to_string(), seed);
        let sources = Sources::prepare(schema, &mut ctx, &mut report)?;
        info!(
            seed,
            objects = sources.registry.len(),
            shared = sources.shared.columns().len(),
            "response generator ready"
        );
        Ok(Self {
            seed,
            options,
            sources,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Every object key that can be requested.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectKey> {
        self.sources.registry.keys()
    }

    /// Generate one record of `object_ref` for a request carrying `params`.
    ///
    /// A parameter named like a top-level field replaces that field's value
    /// with the parameter text.
    pub fn respond(
        &self,
        object_ref: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Row, GenerationError> {
        let key = parse_object_key(object_ref)?;
        let fields = self.sources.registry.compose(&key, &[])?;

        let row = row_index(params);
        let stream = format!("response:{key}");
        let mut ctx =
            GenerationContext::new(self.seed, self.options.clone()).with_counter_start(row);
        ctx.enter_stream(&format!("{stream}#{row}"));

        let label = key.to_string();
        let builder = RecordBuilder::new(&label, stream, self.sources.scope());
        let mut usage = BTreeMap::new();
        let mut record = builder.build(&fields, row, &mut ctx, &mut usage)?;

        for (name, value) in params {
            if record.get(name).is_some() {
                record.push(name.clone(), GeneratedValue::Text(value.clone()));
            }
        }

        debug!(object = %key, row, fields = record.len(), "response generated");
        Ok(record)
    }

    /// Resolve a route's response type and generate its payload.
    ///
    /// Dotted names are tried as object references first, then legacy names
    /// are mapped onto `core` objects. Anything left gets a generic payload.
    pub fn respond_to(
        &self,
        response_type: &str,
        params: &BTreeMap<String, String>,
        path: &str,
    ) -> Result<Row, GenerationError> {
        if response_type.contains('.') {
            match self.respond(response_type, params) {
                Err(err) if is_missing_object(&err) => {}
                outcome => return outcome,
            }
        }
        if let Some(object) = legacy_object(response_type) {
            match self.respond(object, params) {
                Err(err) if is_missing_object(&err) => {}
                outcome => return outcome,
            }
        }
        debug!(response_type, path, "generic response");
        Ok(generic_response(response_type, params, path))
    }
}

fn is_missing_object(err: &GenerationError) -> bool {
    matches!(
        err,
        GenerationError::Notation(_)
            | GenerationError::UndefinedReference {
                kind: ReferenceKind::Object,
                ..
            }
    )
}

/// Payload for response types with no matching object.
pub fn generic_response(response_type: &str, params: &BTreeMap<String, String>, path: &str) -> Row {
    let mut echoed = Row::with_capacity(params.len());
    for (name, value) in params {
        echoed.push(name.clone(), GeneratedValue::Text(value.clone()));
    }

    let mut row = Row::with_capacity(5);
    row.push(
        "message",
        GeneratedValue::Text(format!("Generic response for {response_type}")),
    );
    row.push("path", GeneratedValue::Text(path.to_string()));
    row.push("params", GeneratedValue::Record(echoed));
    row.push("data", GeneratedValue::Text("dummy_data".to_string()));
    row.push("timestamp", GeneratedValue::Text(GENERIC_TIMESTAMP.to_string()));
    row
}
