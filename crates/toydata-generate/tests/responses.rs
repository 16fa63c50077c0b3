use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use toydata_core::{load_objects_dir, load_schema_file};
use toydata_generate::{GenerateOptions, GeneratedValue, GenerationError, ResponseGenerator, prepare_schema};

fn generator(seed: u64) -> ResponseGenerator {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let schema = load_schema_file(&dir.join("blog.yaml"))
        .expect("load blog.yaml")
        .with_objects(load_objects_dir(&dir.join("objects")).expect("load objects"));
    let parsed = prepare_schema(&schema).expect("valid schema");
    ResponseGenerator::new(&parsed, GenerateOptions::default().with_seed(seed)).expect("generator")
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

#[test]
fn identical_requests_get_identical_payloads() {
    let generator = generator(8);
    let request = params(&[("user_id", "3")]);
    let first = generator.respond("core.user_profile", &request).expect("first");
    let second = generator.respond("core.user_profile", &request).expect("second");
    assert_eq!(first, second);

    let other = generator
        .respond("core.user_profile", &params(&[("user_id", "4")]))
        .expect("other");
    assert_eq!(first.names().collect::<Vec<_>>(), other.names().collect::<Vec<_>>());
}

#[test]
fn nested_objects_compose_into_records_and_lists() {
    let generator = generator(9);
    let profile = generator
        .respond("core.user_profile", &BTreeMap::new())
        .expect("profile");
    let nested = profile
        .get("profile")
        .and_then(GeneratedValue::as_record)
        .expect("nested profile");
    assert_eq!(
        nested.names().collect::<Vec<_>>(),
        vec!["location", "theme", "languages"]
    );
    assert_eq!(nested.get("languages").and_then(GeneratedValue::as_list).map(<[_]>::len), Some(2));

    let list = generator
        .respond("[[object.core.user_list]]", &BTreeMap::new())
        .expect("user list");
    let users = list.get("users").and_then(GeneratedValue::as_list).expect("users");
    assert_eq!(users.len(), 3);
    assert!(users.iter().all(|user| user.as_record().is_some()));
}

#[test]
fn shared_references_align_on_the_request_row() {
    let generator = generator(10);
    let empty = generator.respond("core.user", &BTreeMap::new()).expect("user");
    assert_eq!(empty.get("id").and_then(GeneratedValue::as_i64), Some(1000));
}

#[test]
fn unique_counters_start_at_the_request_row() {
    let generator = generator(12);
    let seen: HashSet<i64> = (0..20)
        .map(|page| {
            generator
                .respond("core.post", &params(&[("page", &page.to_string())]))
                .expect("post")
        })
        .filter_map(|post| post.get("id").and_then(GeneratedValue::as_i64))
        .collect();
    assert!(seen.len() > 1);
    assert!(seen.iter().all(|id| (1000..2000).contains(id)));
}

#[test]
fn matching_params_override_top_level_fields() {
    let generator = generator(13);
    let user = generator
        .respond("core.user", &params(&[("name", "ada"), ("unused", "x")]))
        .expect("user");
    assert_eq!(user.get("name").and_then(GeneratedValue::as_str), Some("ada"));
    assert!(user.get("unused").is_none());
}

#[test]
fn response_types_fall_back_through_legacy_names() {
    let generator = generator(14);
    let health = generator
        .respond_to("health_check", &BTreeMap::new(), "/health")
        .expect("health");
    assert_eq!(health.get("status").and_then(GeneratedValue::as_str), Some("healthy"));
    assert_eq!(health.get("version").and_then(GeneratedValue::as_str), Some("2.0"));

    let detail = generator
        .respond_to("user_detail", &params(&[("id", "1")]), "/users/1")
        .expect("user detail");
    assert!(detail.get("job").is_some());

    let generic = generator
        .respond_to("core.missing", &params(&[("id", "1")]), "/missing/1")
        .expect("generic");
    assert_eq!(
        generic.get("message").and_then(GeneratedValue::as_str),
        Some("Generic response for core.missing")
    );
    assert_eq!(generic.get("path").and_then(GeneratedValue::as_str), Some("/missing/1"));
}

#[test]
fn unknown_objects_are_errors_when_requested_directly() {
    let generator = generator(15);
    let err = generator
        .respond("core.missing", &BTreeMap::new())
        .expect_err("missing object");
    assert!(matches!(err, GenerationError::UndefinedReference { .. }));
}
