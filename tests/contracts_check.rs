mod common;

use common::{TestEnv, ADMIN_EMAIL};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

fn load_schema(name: &str) -> Value {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let raw = fs::read_to_string(root.join("docs/contracts").join(name)).expect("read schema");
    serde_json::from_str(&raw).expect("parse schema")
}

fn validate(schema_name: &str, data: &Value) {
    let schema = load_schema(schema_name);
    let validator = JSONSchema::compile(&schema).expect("compile schema");
    let msgs: Vec<String> = match validator.validate(data) {
        Ok(()) => return,
        Err(errors) => errors.map(|e| e.to_string()).collect(),
    };
    panic!("schema validation failed: {}", msgs.join(" | "));
}

#[test]
fn contracts_check() {
    let env = TestEnv::seeded();

    let fo = env.submit("negativo", "Ana Reis", "Atraso na formatura");
    validate("observation.schema.json", &fo);
    let fo_id = fo["id"].as_str().expect("fo id").to_string();

    let judged = env.run_json(&["judge", "record", &fo_id, "--punishment", "Advertência"]);
    validate("observation.schema.json", &judged);

    env.sign_in(ADMIN_EMAIL);
    let closed = env.run_json(&["control", "close"]);
    validate("close_report.schema.json", &closed);

    let controls = env.run_json(&["control", "list"]);
    validate("control_list.schema.json", &controls);

    let summary = env.run_json(&["stats", "summary"]);
    validate("stats_summary.schema.json", &summary);
}

#[test]
fn error_envelope_contract() {
    let env = TestEnv::new();
    let out = env
        .cmd()
        .args(["--json", "control", "resume", "CD-20260101-000000"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let envelope: Value = serde_json::from_slice(&out).expect("valid json");
    validate("error.schema.json", &envelope);
    assert_eq!(envelope["error"]["code"], "AUTH");
}
