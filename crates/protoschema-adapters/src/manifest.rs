//! Manifest adapter.
//!
//! A manifest is a compact YAML or JSON description of proto files:
//!
//! ```yaml
//! files:
//!   - path: users/v1/user.proto
//!     package: users.v1
//!     options: {generate: true}
//!     messages:
//!       - name: User
//!         comment: |
//!           A user
//!
//!           Someone with an account.
//!         fields:
//!           - {name: id, type: string}
//!           - {name: tags, type: string, label: repeated}
//!           - {name: home, type: Address}
//!           - {name: labels, map: {key: string, value: string}}
//!       - name: Address
//!         fields:
//!           - {name: city, type: string, options: {minLength: 1}}
//! ```
//!
//! Type names resolve the way protoc resolves them: innermost scope first,
//! then each enclosing scope out to the root. A leading dot makes a name
//! fully qualified.

use crate::{Adapter, InputFormat};
use anyhow::Result;
use protoschema_core::{
    Cardinality, Comments, DescriptorSet, EnumDescriptor, EnumValueDescriptor, FieldDescriptor,
    FieldKind, FileDescriptor, MessageDescriptor, OneofDescriptor, MAP_KEY_NUMBER,
    MAP_VALUE_NUMBER,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Public API
// ============================================================================

/// Adapter for YAML/JSON manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestAdapter;

impl Adapter for ManifestAdapter {
    fn format(&self) -> InputFormat {
        InputFormat::Manifest
    }

    fn load_str(&self, text: &str) -> Result<DescriptorSet> {
        // YAML is a superset of JSON, so one parser covers both spellings.
        let manifest: Manifest = serde_yaml::from_str(text)?;
        Ok(convert(&manifest)?)
    }
}

/// Errors in a manifest's structure.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{field}: unknown type '{name}'")]
    UnknownType { field: String, name: String },

    #[error("{field}: map key type '{key}' must be an integer kind, bool or string")]
    InvalidMapKey { field: String, key: String },

    #[error("{field}: {reason}")]
    FieldShape { field: String, reason: &'static str },

    #[error("Type {0} is declared more than once")]
    DuplicateType(String),
}

/// Convert a parsed manifest into a descriptor set.
pub fn convert(manifest: &Manifest) -> Result<DescriptorSet, ManifestError> {
    let mut names = HashMap::new();
    for file in &manifest.files {
        for message in &file.messages {
            declare_message(&mut names, &file.package, message)?;
        }
        for e in &file.enums {
            declare(&mut names, qualify(&file.package, &e.name), Declared::Enum)?;
        }
    }

    let files = manifest
        .files
        .iter()
        .map(|file| {
            let resolver = Resolver { names: &names };
            let messages = file
                .messages
                .iter()
                .map(|m| resolver.message(file, &file.package, m))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(file = %file.path, messages = messages.len(), "converted manifest file");
            Ok(FileDescriptor {
                path: file.path.clone(),
                package: file.package.clone(),
                messages,
                enums: file
                    .enums
                    .iter()
                    .map(|e| enum_descriptor(&file.package, e))
                    .collect(),
                options: file.options.clone(),
            })
        })
        .collect::<Result<Vec<_>, ManifestError>>()?;

    Ok(DescriptorSet::new(files, manifest.targets.clone()))
}

// ============================================================================
// Manifest format types
// ============================================================================

/// Top-level manifest document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// File paths to generate for; empty means all files
    #[serde(default)]
    pub targets: Vec<String>,
    pub files: Vec<ManifestFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ManifestFile {
    /// Path of the proto file, e.g. `users/v1/user.proto`
    pub path: String,
    #[serde(default)]
    pub package: String,
    /// File-level schema options, e.g. `{generate: true}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
    #[serde(default)]
    pub messages: Vec<ManifestMessage>,
    #[serde(default)]
    pub enums: Vec<ManifestEnum>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ManifestMessage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Message-level schema options, e.g. `{generate: false}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
    #[serde(default)]
    pub fields: Vec<ManifestField>,
    /// Nested message types
    #[serde(default)]
    pub messages: Vec<ManifestMessage>,
    #[serde(default)]
    pub enums: Vec<ManifestEnum>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ManifestField {
    pub name: String,
    /// Defaults to the field's 1-based position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    /// Scalar keyword (`int32`, `string`, ...) or a message/enum name
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    /// Declares a `map<key, value>` field instead of `type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<ManifestMap>,
    /// Name of the oneof group this field belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneof: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Field-level schema options, e.g. `{maxLength: 64}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Optional,
    Repeated,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ManifestMap {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ManifestEnum {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub values: Vec<ManifestEnumValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ManifestEnumValue {
    pub name: String,
    pub number: i32,
}

// ============================================================================
// Name resolution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declared {
    Message,
    Enum,
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn declare(
    names: &mut HashMap<String, Declared>,
    full_name: String,
    kind: Declared,
) -> Result<(), ManifestError> {
    if names.insert(full_name.clone(), kind).is_some() {
        return Err(ManifestError::DuplicateType(full_name));
    }
    Ok(())
}

fn declare_message(
    names: &mut HashMap<String, Declared>,
    scope: &str,
    message: &ManifestMessage,
) -> Result<(), ManifestError> {
    let full_name = qualify(scope, &message.name);
    for nested in &message.messages {
        declare_message(names, &full_name, nested)?;
    }
    for e in &message.enums {
        declare(names, qualify(&full_name, &e.name), Declared::Enum)?;
    }
    for field in &message.fields {
        if field.map.is_some() {
            declare(names, qualify(&full_name, &entry_name(&field.name)), Declared::Message)?;
        }
    }
    declare(names, full_name, Declared::Message)
}

/// `labels` -> `LabelsEntry`, `by_id` -> `ByIdEntry`.
fn entry_name(field: &str) -> String {
    let camel: String = field
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    format!("{camel}Entry")
}

fn scalar_kind(name: &str) -> Option<FieldKind> {
    name.parse::<FieldKind>()
        .ok()
        .filter(|k| !k.is_message() && *k != FieldKind::Enum)
}

struct Resolver<'a> {
    names: &'a HashMap<String, Declared>,
}

impl Resolver<'_> {
    /// Resolve a type reference made from inside `scope`.
    fn resolve(&self, scope: &str, name: &str) -> Option<(String, Declared)> {
        if let Some(absolute) = name.strip_prefix('.') {
            return self
                .names
                .get(absolute)
                .map(|kind| (absolute.to_string(), *kind));
        }
        let mut scope = scope;
        loop {
            let candidate = qualify(scope, name);
            if let Some(kind) = self.names.get(&candidate) {
                return Some((candidate, *kind));
            }
            if scope.is_empty() {
                return None;
            }
            scope = scope.rsplit_once('.').map(|(outer, _)| outer).unwrap_or("");
        }
    }

    /// Kind and referenced type name for a `type` string.
    fn kind_of(
        &self,
        scope: &str,
        field: &str,
        name: &str,
    ) -> Result<(FieldKind, Option<String>), ManifestError> {
        if let Some(kind) = scalar_kind(name) {
            return Ok((kind, None));
        }
        match self.resolve(scope, name) {
            Some((full_name, Declared::Message)) => Ok((FieldKind::Message, Some(full_name))),
            Some((full_name, Declared::Enum)) => Ok((FieldKind::Enum, Some(full_name))),
            None => Err(ManifestError::UnknownType {
                field: field.to_string(),
                name: name.to_string(),
            }),
        }
    }

    fn message(
        &self,
        file: &ManifestFile,
        scope: &str,
        raw: &ManifestMessage,
    ) -> Result<MessageDescriptor, ManifestError> {
        let full_name = qualify(scope, &raw.name);
        let mut nested = raw
            .messages
            .iter()
            .map(|m| self.message(file, &full_name, m))
            .collect::<Result<Vec<_>, _>>()?;

        let mut fields = Vec::with_capacity(raw.fields.len());
        let mut oneofs: Vec<OneofDescriptor> = Vec::new();
        for (idx, f) in raw.fields.iter().enumerate() {
            let label = format!("{full_name}.{}", f.name);
            let number = f.number.unwrap_or(idx as u32 + 1);
            let mut field = match (&f.type_name, &f.map) {
                (Some(_), Some(_)) => {
                    return Err(ManifestError::FieldShape {
                        field: label,
                        reason: "declares both 'type' and 'map'",
                    })
                }
                (None, None) => {
                    return Err(ManifestError::FieldShape {
                        field: label,
                        reason: "needs either 'type' or 'map'",
                    })
                }
                (Some(type_name), None) => {
                    let (kind, target) = self.kind_of(&full_name, &label, type_name)?;
                    FieldDescriptor {
                        type_name: target,
                        cardinality: match f.label {
                            Some(Label::Repeated) => Cardinality::List,
                            _ => Cardinality::Singular,
                        },
                        ..FieldDescriptor::new(&f.name, number, kind)
                    }
                }
                (None, Some(map)) => {
                    if f.label.is_some() {
                        return Err(ManifestError::FieldShape {
                            field: label,
                            reason: "map fields cannot carry a label",
                        });
                    }
                    let entry = self.map_entry(file, &full_name, &label, &f.name, map)?;
                    let field = FieldDescriptor {
                        type_name: Some(entry.full_name.clone()),
                        cardinality: Cardinality::Map,
                        ..FieldDescriptor::new(&f.name, number, FieldKind::Message)
                    };
                    nested.push(entry);
                    field
                }
            };

            if f.label == Some(Label::Optional) {
                if f.oneof.is_some() {
                    return Err(ManifestError::FieldShape {
                        field: label,
                        reason: "optional fields cannot belong to a oneof",
                    });
                }
                let synthetic = format!("_{}", f.name);
                field.optional = true;
                field.oneof = Some(synthetic.clone());
                oneofs.push(OneofDescriptor {
                    name: synthetic,
                    synthetic: true,
                });
            } else if let Some(group) = &f.oneof {
                if field.cardinality != Cardinality::Singular {
                    return Err(ManifestError::FieldShape {
                        field: label,
                        reason: "oneof members must be singular",
                    });
                }
                field.oneof = Some(group.clone());
                if !oneofs.iter().any(|o| &o.name == group) {
                    oneofs.push(OneofDescriptor {
                        name: group.clone(),
                        synthetic: false,
                    });
                }
            }

            field.comments = Comments::new(f.comment.clone().unwrap_or_default());
            field.options = f.options.clone();
            fields.push(field);
        }

        Ok(MessageDescriptor {
            name: raw.name.clone(),
            full_name: full_name.clone(),
            file: file.path.clone(),
            fields,
            nested,
            enums: raw
                .enums
                .iter()
                .map(|e| enum_descriptor(&full_name, e))
                .collect(),
            oneofs,
            map_entry: false,
            comments: Comments::new(raw.comment.clone().unwrap_or_default()),
            options: raw.options.clone(),
            unsupported: Vec::new(),
        })
    }

    /// The synthetic `<Name>Entry` type for a map field.
    fn map_entry(
        &self,
        file: &ManifestFile,
        owner: &str,
        label: &str,
        field: &str,
        map: &ManifestMap,
    ) -> Result<MessageDescriptor, ManifestError> {
        let key = scalar_kind(&map.key)
            .filter(|k| k.is_integer() || matches!(k, FieldKind::Bool | FieldKind::String))
            .ok_or_else(|| ManifestError::InvalidMapKey {
                field: label.to_string(),
                key: map.key.clone(),
            })?;
        let (value_kind, value_type) = self.kind_of(owner, label, &map.value)?;
        let name = entry_name(field);
        Ok(MessageDescriptor {
            full_name: qualify(owner, &name),
            name,
            file: file.path.clone(),
            fields: vec![
                FieldDescriptor::new("key", MAP_KEY_NUMBER, key),
                FieldDescriptor {
                    type_name: value_type,
                    ..FieldDescriptor::new("value", MAP_VALUE_NUMBER, value_kind)
                },
            ],
            nested: Vec::new(),
            enums: Vec::new(),
            oneofs: Vec::new(),
            map_entry: true,
            comments: Comments::default(),
            options: None,
            unsupported: Vec::new(),
        })
    }
}

fn enum_descriptor(scope: &str, raw: &ManifestEnum) -> EnumDescriptor {
    EnumDescriptor {
        name: raw.name.clone(),
        full_name: qualify(scope, &raw.name),
        values: raw
            .values
            .iter()
            .map(|v| EnumValueDescriptor {
                name: v.name.clone(),
                number: v.number,
            })
            .collect(),
        comments: Comments::new(raw.comment.clone().unwrap_or_default()),
    }
}
