use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("protoschema-cli-test-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn protoschema() -> Command {
    Command::cargo_bin("protoschema").unwrap()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn version_flag() {
    let output = protoschema().arg("--version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn generate_writes_documents_and_rust_module() {
    let out = temp_dir();
    protoschema()
        .arg("generate")
        .arg(fixture("users.yaml"))
        .arg("--output")
        .arg(&out)
        .arg("--no-timestamp")
        .assert()
        .success();

    let dir = out.join("users/v1");
    for name in [
        "users.v1.User.schema.json",
        "users.v1.User.Address.schema.json",
        "google.protobuf.Timestamp.schema.json",
        "user_jsonschema.rs",
    ] {
        assert!(dir.join(name).exists(), "missing {name}");
    }
    assert!(!dir.join("users.v1.Internal.schema.json").exists());

    let user: Value =
        serde_json::from_str(&fs::read_to_string(dir.join("users.v1.User.schema.json")).unwrap())
            .unwrap();
    assert_eq!(user["$ref"], "#/$defs/users.v1.User");
    assert_eq!(user["$defs"]["users.v1.User"]["title"], "User");
    assert_eq!(
        user["$defs"]["users.v1.User"]["properties"]["manager"]["$ref"],
        "#/$defs/users.v1.User"
    );

    let rust = fs::read_to_string(dir.join("user_jsonschema.rs")).unwrap();
    assert!(rust.starts_with("// Code generated by protoschema. DO NOT EDIT."));
    assert!(rust.contains("// Source: users/v1/user.proto"));
    assert!(!rust.contains("Generated on"));
    assert!(rust.contains("pub fn User_Address_json_schema() -> Schema {"));
    assert!(rust.contains("pub fn user_google_protobuf_Timestamp_json_schema() -> Schema {"));
}

#[test]
fn generate_emit_json_only() {
    let out = temp_dir();
    protoschema()
        .args(["generate", "--emit", "json", "--output"])
        .arg(&out)
        .arg(fixture("users.yaml"))
        .assert()
        .success();

    let dir = out.join("users/v1");
    assert!(dir.join("users.v1.User.schema.json").exists());
    assert!(!dir.join("user_jsonschema.rs").exists());
}

#[test]
fn generate_accepts_glob_patterns() {
    let out = temp_dir();
    let pattern = format!("{}/tests/fixtures/us*.yaml", env!("CARGO_MANIFEST_DIR"));
    protoschema()
        .args(["generate", &pattern, "--emit", "rust", "--output"])
        .arg(&out)
        .assert()
        .success();
    assert!(out.join("users/v1/user_jsonschema.rs").exists());
}

#[test]
fn generate_isolates_failing_units() {
    let out = temp_dir();
    let output = protoschema()
        .arg("generate")
        .arg(fixture("mixed.yaml"))
        .arg("--output")
        .arg(&out)
        .arg("--json")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["generated"], 1);
    assert_eq!(report["failed"], 1);

    let units = report["units"].as_array().unwrap();
    let broken = units
        .iter()
        .find(|u| u["source"] == "broken/v1/broken.proto")
        .unwrap();
    assert_eq!(broken["status"], "failed");
    assert!(broken["error"]
        .as_str()
        .unwrap()
        .contains("broken.v1.Order.code"));

    assert!(out.join("good/v1/good.v1.Item.schema.json").exists());
    assert!(!out.join("broken/v1").exists());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 of 2 unit(s) failed"));
}

#[test]
fn list_reports_origins() {
    let output = protoschema()
        .args(["list", "--json"])
        .arg(fixture("users.yaml"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let units = stdout_json(&output);
    let units = units.as_array().unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0]["source"], "users/v1/user.proto");

    let types: Vec<(String, String)> = units[0]["types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| {
            (
                t["name"].as_str().unwrap().to_string(),
                t["origin"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert!(types.contains(&("users.v1.User".to_string(), "local".to_string())));
    assert!(types.contains(&("users.v1.User.Address".to_string(), "local".to_string())));
    assert!(types.contains(&("google.protobuf.Timestamp".to_string(), "shared".to_string())));
    assert!(!types.iter().any(|(name, _)| name == "users.v1.Internal"));
}

#[test]
fn show_prints_ref_as_root_schema() {
    let output = protoschema()
        .arg("show")
        .arg(fixture("users.yaml"))
        .arg("users.v1.User.Address")
        .arg("--compact")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim().lines().count(), 1);
    let schema: Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(schema["$ref"], "#/$defs/users.v1.User.Address");
    assert_eq!(
        schema["$defs"]["users.v1.User.Address"]["required"],
        serde_json::json!(["city"])
    );
}

#[test]
fn show_rejects_unknown_and_opted_out_types() {
    for (type_name, expected) in [
        ("users.v1.Nope", "Unknown message type: users.v1.Nope"),
        ("users.v1.Internal", "opts out of generation"),
    ] {
        let output = protoschema()
            .arg("show")
            .arg(fixture("users.yaml"))
            .arg(type_name)
            .output()
            .unwrap();
        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains(expected), "{stderr}");
    }
}

#[test]
fn check_passes_clean_input() {
    let output = protoschema()
        .arg("check")
        .arg(fixture("users.yaml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("All options and references resolve"));
}

#[test]
fn check_reports_malformed_options() {
    let output = protoschema()
        .arg("check")
        .arg(fixture("mixed.yaml"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Errors (1):"), "{stdout}");
    assert!(stdout.contains("field broken.v1.Order.code"));
}

#[test]
fn missing_input_fails() {
    let output = protoschema()
        .args(["list", "/nonexistent/users.yaml"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("File not found"));
}
