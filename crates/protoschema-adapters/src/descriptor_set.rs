//! Descriptor set adapter.
//!
//! Reads protojson-encoded `FileDescriptorSet` documents, e.g. the output of
//! `buf build -o image.json`, and `CodeGeneratorRequest` documents
//! (`fileToGenerate` + `protoFile`).
//!
//! Schema options live in extensions. protojson writes an extension under its
//! bracketed full name, so a field option looks like:
//!
//! ```json
//! "options": {"[acme.options.v1.field]": {"jsonSchema": {"maxLength": 64}}}
//! ```
//!
//! Any bracketed key ending in `.file`, `.message` or `.field` (matching the
//! scope) whose value carries a `jsonSchema` object is taken as the overlay.

use crate::{Adapter, InputFormat};
use anyhow::{Context, Result};
use protoschema_core::{
    Cardinality, Comments, DescriptorSet, EnumDescriptor, EnumValueDescriptor, FieldDescriptor,
    FieldKind, FileDescriptor, MessageDescriptor, OneofDescriptor, UnsupportedField,
    UnsupportedKind,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

// ============================================================================
// Public API
// ============================================================================

/// Adapter for protojson descriptor sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorSetAdapter;

impl Adapter for DescriptorSetAdapter {
    fn format(&self) -> InputFormat {
        InputFormat::DescriptorSet
    }

    fn load_str(&self, text: &str) -> Result<DescriptorSet> {
        let raw: RawDescriptorSet =
            serde_json::from_str(text).context("Invalid descriptor set JSON")?;
        convert(raw)
    }
}

fn convert(raw: RawDescriptorSet) -> Result<DescriptorSet> {
    let files = raw
        .file
        .into_iter()
        .chain(raw.proto_file)
        .map(convert_file)
        .collect::<Result<Vec<_>>>()?;
    Ok(DescriptorSet::new(files, raw.file_to_generate))
}

// ============================================================================
// Raw protojson descriptor types
// ============================================================================

// Field names follow descriptor.proto's protojson (lowerCamelCase) names.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawDescriptorSet {
    file: Vec<RawFile>,
    proto_file: Vec<RawFile>,
    file_to_generate: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawFile {
    name: String,
    package: String,
    message_type: Vec<RawMessage>,
    enum_type: Vec<RawEnum>,
    options: Option<Value>,
    source_code_info: Option<RawSourceCodeInfo>,
    /// Empty for proto2; protoc omits it there
    syntax: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawMessage {
    name: String,
    field: Vec<RawField>,
    nested_type: Vec<RawMessage>,
    enum_type: Vec<RawEnum>,
    oneof_decl: Vec<RawOneof>,
    options: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawField {
    name: String,
    number: u32,
    label: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<Value>,
    type_name: Option<String>,
    oneof_index: Option<usize>,
    proto3_optional: bool,
    options: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOneof {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawEnum {
    name: String,
    value: Vec<RawEnumValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEnumValue {
    name: String,
    number: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSourceCodeInfo {
    location: Vec<RawLocation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawLocation {
    path: Vec<i32>,
    leading_comments: Option<String>,
}

// ============================================================================
// Conversion
// ============================================================================

// Path components in SourceCodeInfo, from descriptor.proto field numbers.
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;

const LABEL_OPTIONAL: i64 = 1;
const LABEL_REPEATED: i64 = 3;

struct FileContext<'a> {
    path: &'a str,
    comments: HashMap<Vec<i32>, String>,
    /// `optional` fields carry explicit presence without proto3Optional
    proto2: bool,
}

impl FileContext<'_> {
    fn comments_at(&self, path: &[i32]) -> Comments {
        Comments::new(self.comments.get(path).cloned().unwrap_or_default())
    }
}

fn convert_file(raw: RawFile) -> Result<FileDescriptor> {
    let comments = raw
        .source_code_info
        .map(|info| {
            info.location
                .into_iter()
                .filter_map(|l| l.leading_comments.map(|c| (l.path, c)))
                .collect()
        })
        .unwrap_or_default();
    let ctx = FileContext {
        path: &raw.name,
        comments,
        proto2: raw.syntax.is_empty() || raw.syntax == "proto2",
    };

    let messages = raw
        .message_type
        .iter()
        .enumerate()
        .map(|(i, m)| convert_message(&ctx, &raw.package, m, vec![FILE_MESSAGE_TYPE, i as i32]))
        .collect::<Result<Vec<_>>>()?;
    let enums = raw
        .enum_type
        .iter()
        .enumerate()
        .map(|(i, e)| convert_enum(&ctx, &raw.package, e, vec![FILE_ENUM_TYPE, i as i32]))
        .collect();

    debug!(file = %raw.name, messages = messages.len(), "converted descriptor file");
    Ok(FileDescriptor {
        path: raw.name.clone(),
        package: raw.package.clone(),
        messages,
        enums,
        options: schema_overlay(raw.options.as_ref(), "file"),
    })
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn convert_message(
    ctx: &FileContext<'_>,
    scope: &str,
    raw: &RawMessage,
    path: Vec<i32>,
) -> Result<MessageDescriptor> {
    let full_name = qualify(scope, &raw.name);
    let child_path = |kind: i32, idx: usize| {
        let mut p = path.clone();
        p.extend([kind, idx as i32]);
        p
    };

    let nested = raw
        .nested_type
        .iter()
        .enumerate()
        .map(|(i, m)| convert_message(ctx, &full_name, m, child_path(MESSAGE_NESTED_TYPE, i)))
        .collect::<Result<Vec<_>>>()?;
    let map_entries: Vec<&str> = nested
        .iter()
        .filter(|m| m.map_entry)
        .map(|m| m.full_name.as_str())
        .collect();

    let mut synthetic = vec![false; raw.oneof_decl.len()];
    let mut fields = Vec::with_capacity(raw.field.len());
    let mut unsupported = Vec::new();
    for (i, f) in raw.field.iter().enumerate() {
        let kind = match parse_kind(f.kind.as_ref()) {
            Ok(kind) => kind,
            Err(UnsupportedKind(kind)) => {
                warn!(message = %full_name, field = %f.name, %kind, "unsupported field kind");
                unsupported.push(UnsupportedField {
                    name: f.name.clone(),
                    number: f.number,
                    kind,
                });
                continue;
            }
        };
        let type_name = f
            .type_name
            .as_deref()
            .map(|t| t.strip_prefix('.').unwrap_or(t).to_string());
        let label = parse_label(f.label.as_ref());
        let repeated = label == Some(LABEL_REPEATED);
        let is_map = repeated
            && kind == FieldKind::Message
            && type_name
                .as_deref()
                .is_some_and(|t| map_entries.contains(&t));

        let oneof = match f.oneof_index {
            Some(idx) => {
                let decl = raw.oneof_decl.get(idx).with_context(|| {
                    format!("{full_name}.{}: oneofIndex {idx} out of range", f.name)
                })?;
                if f.proto3_optional {
                    synthetic[idx] = true;
                }
                Some(decl.name.clone())
            }
            None => None,
        };

        fields.push(FieldDescriptor {
            name: f.name.clone(),
            number: f.number,
            kind,
            cardinality: if is_map {
                Cardinality::Map
            } else if repeated {
                Cardinality::List
            } else {
                Cardinality::Singular
            },
            type_name,
            oneof,
            optional: f.proto3_optional
                || (ctx.proto2 && label == Some(LABEL_OPTIONAL) && f.oneof_index.is_none()),
            comments: ctx.comments_at(&child_path(MESSAGE_FIELD, i)),
            options: schema_overlay(f.options.as_ref(), "field"),
        });
    }

    let map_entry = raw
        .options
        .as_ref()
        .and_then(|o| o.get("mapEntry"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(MessageDescriptor {
        name: raw.name.clone(),
        full_name: full_name.clone(),
        file: ctx.path.to_string(),
        fields,
        nested,
        enums: raw
            .enum_type
            .iter()
            .enumerate()
            .map(|(i, e)| convert_enum(ctx, &full_name, e, child_path(MESSAGE_ENUM_TYPE, i)))
            .collect(),
        oneofs: raw
            .oneof_decl
            .iter()
            .zip(synthetic)
            .map(|(o, synthetic)| OneofDescriptor {
                name: o.name.clone(),
                synthetic,
            })
            .collect(),
        map_entry,
        comments: ctx.comments_at(&path),
        options: schema_overlay(raw.options.as_ref(), "message"),
        unsupported,
    })
}

fn convert_enum(ctx: &FileContext<'_>, scope: &str, raw: &RawEnum, path: Vec<i32>) -> EnumDescriptor {
    EnumDescriptor {
        name: raw.name.clone(),
        full_name: qualify(scope, &raw.name),
        values: raw
            .value
            .iter()
            .map(|v| EnumValueDescriptor {
                name: v.name.clone(),
                number: v.number,
            })
            .collect(),
        comments: ctx.comments_at(&path),
    }
}

/// `type` is an enum name in protojson (`TYPE_STRING`) but may be a number.
fn parse_kind(value: Option<&Value>) -> Result<FieldKind, UnsupportedKind> {
    match value {
        Some(Value::String(s)) => s.parse(),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(FieldKind::from_type_code)
            .unwrap_or_else(|| Err(UnsupportedKind(n.to_string()))),
        Some(other) => Err(UnsupportedKind(other.to_string())),
        None => Err(UnsupportedKind("<missing>".to_string())),
    }
}

fn parse_label(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::String(s) => match s.as_str() {
            "LABEL_OPTIONAL" => Some(1),
            "LABEL_REQUIRED" => Some(2),
            "LABEL_REPEATED" => Some(LABEL_REPEATED),
            _ => None,
        },
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Find the schema overlay among an options object's extension keys.
fn schema_overlay(options: Option<&Value>, scope: &str) -> Option<Value> {
    let suffix = format!(".{scope}]");
    let obj = options?.as_object()?;
    for (key, value) in obj {
        if !(key.starts_with('[') && key.ends_with(&suffix)) {
            continue;
        }
        match value.get("jsonSchema").or_else(|| value.get("json_schema")) {
            Some(overlay) => return Some(overlay.clone()),
            None => warn!(extension = %key, "extension without a jsonSchema object ignored"),
        }
    }
    None
}
