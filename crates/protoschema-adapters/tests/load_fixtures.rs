//! Load the fixture inputs and compile them end to end.

use pretty_assertions::assert_eq;
use protoschema_adapters::{detect_format, load, InputFormat};
use protoschema_core::{compile_all, CompiledUnit, GeneratorConfig, Origin, Schema};
use serde_json::{json, Value};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn compile_single(name: &str) -> CompiledUnit {
    let set = load(&fixture(name)).unwrap();
    let mut units = compile_all(&set, &GeneratorConfig::default());
    assert_eq!(units.len(), 1, "only user.proto is a target");
    let (path, result) = units.remove(0);
    assert_eq!(path, "users/v1/user.proto");
    result.unwrap().expect("user.proto generates")
}

fn validator(root: &Schema) -> jsonschema::Validator {
    let schema = serde_json::to_value(root).unwrap();
    jsonschema::options()
        .with_draft(jsonschema::Draft::Draft202012)
        .build(&schema)
        .unwrap()
}

#[test]
fn test_fixture_formats_are_detected() {
    assert_eq!(detect_format(&fixture("users.yaml")), InputFormat::Manifest);
    assert_eq!(
        detect_format(&fixture("users.descriptor.json")),
        InputFormat::DescriptorSet
    );
}

#[test]
fn test_manifest_unit_contents() {
    let unit = compile_single("users.yaml");
    assert_eq!(unit.stem, "user");
    assert_eq!(unit.rust_file_name(), "user_jsonschema.rs");

    let user = unit.get("users.v1.User").unwrap();
    assert_eq!(user.ident, "User");
    assert_eq!(user.origin, Origin::Local);
    assert_eq!(unit.get("users.v1.User.Address").unwrap().ident, "User_Address");

    let ts = unit.get("google.protobuf.Timestamp").unwrap();
    assert_eq!(ts.origin, Origin::Shared);
    assert_eq!(ts.ident, "user_google_protobuf_Timestamp");

    assert!(unit.get("users.v1.AuditLog").is_none());
    assert!(unit.get("users.v1.User.AttributesEntry").is_none());
}

#[test]
fn test_manifest_user_schema() {
    let unit = compile_single("users.yaml");
    let root = serde_json::to_value(&unit.get("users.v1.User").unwrap().root).unwrap();

    assert_eq!(root["$ref"], json!("#/$defs/users.v1.User"));
    let defs: Vec<&str> = root["$defs"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(
        defs,
        vec![
            "google.protobuf.Timestamp",
            "users.v1.User",
            "users.v1.User.Address"
        ]
    );

    let user = &root["$defs"]["users.v1.User"];
    assert_eq!(user["title"], json!("User"));
    assert_eq!(user["description"], json!("A registered account."));
    assert!(user["properties"].get("password_hash").is_none());
    assert_eq!(user["properties"]["id"]["pattern"], json!("^u_[a-z0-9]+$"));
    assert_eq!(user["properties"]["id"]["description"], json!("Stable identifier."));
    assert_eq!(user["properties"]["role"]["enum"], json!([0, 1, 2]));
    assert_eq!(
        user["properties"]["friends"]["items"],
        json!({"$ref": "#/$defs/users.v1.User"})
    );
    assert_eq!(user["properties"]["friends"]["maxItems"], json!(100));
    assert_eq!(user["properties"]["avatar"]["contentEncoding"], json!("base64"));
    assert_eq!(user["properties"]["avatar"]["contentMediaType"], json!("image/png"));

    let required: Vec<&str> = user["required"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(
        required,
        vec!["id", "display_name", "role", "address", "created_at", "avatar"]
    );
    assert_eq!(
        user["oneOf"],
        json!([{"required": ["email"]}, {"required": ["phone"]}])
    );
}

#[test]
fn test_manifest_schema_validates_documents() {
    let unit = compile_single("users.yaml");
    let v = validator(&unit.get("users.v1.User").unwrap().root);

    let friend = json!({
        "id": "u_friend",
        "display_name": "Friend",
        "role": 1,
        "address": {"street": "1 Main St", "city": "Oslo"},
        "created_at": {"seconds": 1700000000, "nanos": 0},
        "avatar": "aGVsbG8=",
        "phone": "+4712345678"
    });
    let mut user = json!({
        "id": "u_1",
        "display_name": "Ada",
        "role": 2,
        "address": {"street": "2 Side St", "city": "Bergen", "postal_code": "5003"},
        "friends": [friend],
        "created_at": {"seconds": 1700000000, "nanos": 5},
        "email": "ada@example.com",
        "attributes": {"team": "core"},
        "scores": {"1": 0.5, "-2": 1.0},
        "avatar": "aGVsbG8="
    });
    assert!(v.is_valid(&user));

    let mut bad_key = user.clone();
    bad_key["scores"] = json!({"abc": 1.0});
    assert!(!v.is_valid(&bad_key));

    let mut bad_id = user.clone();
    bad_id["id"] = json!("U-1");
    assert!(!v.is_valid(&bad_id));

    let mut bad_role = user.clone();
    bad_role["role"] = json!(7);
    assert!(!v.is_valid(&bad_role));

    let mut bad_friend = user.clone();
    bad_friend["friends"][0]["address"] = json!({"city": "Oslo"});
    assert!(!v.is_valid(&bad_friend));

    user["phone"] = json!("+4712345678");
    assert!(!v.is_valid(&user), "email and phone are exclusive");
}

#[test]
fn test_descriptor_set_unit_contents() {
    let unit = compile_single("users.descriptor.json");
    let user = unit.get("users.v1.User").unwrap();
    assert_eq!(user.origin, Origin::Local);
    assert_eq!(
        unit.get("google.protobuf.Timestamp").map(|t| t.origin),
        Some(Origin::Shared)
    );
    assert!(unit.get("users.v1.User.LabelsEntry").is_none());

    let root = serde_json::to_value(&user.root).unwrap();
    let shape = &root["$defs"]["users.v1.User"];
    assert_eq!(shape["title"], json!("User"));
    assert_eq!(shape["properties"]["tags"]["uniqueItems"], json!(true));
    assert_eq!(shape["properties"]["tags"]["maxItems"], json!(10));
    assert_eq!(
        shape["properties"]["labels"]["additionalProperties"]["type"],
        json!("string")
    );
    assert_eq!(
        shape["required"],
        json!(["id", "address", "created_at"])
    );
}

#[test]
fn test_descriptor_set_schema_validates_documents() {
    let unit = compile_single("users.descriptor.json");
    let v = validator(&unit.get("users.v1.User").unwrap().root);

    let user = json!({
        "id": "u_1",
        "address": {"city": "Oslo"},
        "tags": ["a", "b"],
        "created_at": {"seconds": 1, "nanos": 0},
        "labels": {"env": "prod"},
        "flags": {"true": "on", "false": "off"}
    });
    assert!(v.is_valid(&user));

    let mut dup_tags = user.clone();
    dup_tags["tags"] = json!(["a", "a"]);
    assert!(!v.is_valid(&dup_tags));

    let mut bad_flag = user.clone();
    bad_flag["flags"] = json!({"yes": "on"});
    assert!(!v.is_valid(&bad_flag));

    let mut missing = user;
    missing.as_object_mut().unwrap().remove("address");
    assert!(!v.is_valid(&missing));
}

#[test]
fn test_generated_rust_module() {
    let unit = compile_single("users.yaml");
    let config = GeneratorConfig {
        include_timestamp: false,
        ..GeneratorConfig::default()
    };
    let src = unit.rust_source(&config);
    assert!(src.contains("// Source: users/v1/user.proto"));
    assert!(!src.contains("Generated on"));
    assert!(src.contains("pub fn User_json_schema() -> Schema {"));
    assert!(src.contains("pub fn User_Address_json_schema_with_defs(defs: &mut Definitions) -> Schema {"));
    assert!(src.contains("pub fn user_google_protobuf_Timestamp_json_schema() -> Schema {"));
    assert!(src.contains("user_google_protobuf_Timestamp_json_schema_with_defs(defs)"));

    let docs = unit.documents().unwrap();
    let names: Vec<&str> = docs.iter().map(|(name, _)| name.as_str()).collect();
    assert!(names.contains(&"users.v1.User.schema.json"));
    assert!(names.contains(&"google.protobuf.Timestamp.schema.json"));
}
