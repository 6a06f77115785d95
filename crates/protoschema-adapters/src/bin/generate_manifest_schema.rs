use schemars::schema_for;
use schemars::JsonSchema;
use std::fs;
use std::path::{Path, PathBuf};

use protoschema_adapters::manifest::Manifest;
use protoschema_core::{FieldSchemaOptions, FileSchemaOptions, MessageSchemaOptions};

fn write_schema<T: JsonSchema>(
    out_dir: &Path,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema_for!(T);
    let json = serde_json::to_string_pretty(&schema)?;
    fs::write(out_dir.join(format!("{name}.json")), json)?;
    Ok(())
}

fn schema_output_dir() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.join("../../schema")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(schema_output_dir);
    fs::create_dir_all(&out_dir)?;

    write_schema::<Manifest>(&out_dir, "manifest")?;
    write_schema::<FileSchemaOptions>(&out_dir, "file_options")?;
    write_schema::<MessageSchemaOptions>(&out_dir, "message_options")?;
    write_schema::<FieldSchemaOptions>(&out_dir, "field_options")?;

    Ok(())
}
