use schemars::schema_for;
use toydata_core::DataSchema;

fn main() {
    let schema = schema_for!(DataSchema);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}
