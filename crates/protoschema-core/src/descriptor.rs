//! Read-only descriptor model.
//!
//! Front ends (see `protoschema-adapters`) translate their native input into
//! these types. The core never mutates them; it only walks them through the
//! [`DescriptorPool`] trait, so any other descriptor source can be plugged in
//! by implementing that trait.

use crate::{SynthResult, SynthesisError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Field number of the key inside a synthetic map-entry message.
pub const MAP_KEY_NUMBER: u32 = 1;

/// Field number of the value inside a synthetic map-entry message.
pub const MAP_VALUE_NUMBER: u32 = 2;

/// The closed set of protobuf field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    Int32,
    Sint32,
    Uint32,
    Fixed32,
    Sfixed32,
    Int64,
    Sint64,
    Uint64,
    Fixed64,
    Sfixed64,
    Float,
    Double,
    String,
    Bytes,
    Enum,
    Message,
    Group,
}

impl FieldKind {
    /// All kinds, in `descriptor.proto` declaration order.
    pub const ALL: [FieldKind; 18] = [
        FieldKind::Double,
        FieldKind::Float,
        FieldKind::Int64,
        FieldKind::Uint64,
        FieldKind::Int32,
        FieldKind::Fixed64,
        FieldKind::Fixed32,
        FieldKind::Bool,
        FieldKind::String,
        FieldKind::Group,
        FieldKind::Message,
        FieldKind::Bytes,
        FieldKind::Uint32,
        FieldKind::Enum,
        FieldKind::Sfixed32,
        FieldKind::Sfixed64,
        FieldKind::Sint32,
        FieldKind::Sint64,
    ];

    /// Convert a `FieldDescriptorProto.Type` code.
    pub fn from_type_code(code: i32) -> Result<Self, UnsupportedKind> {
        let kind = match code {
            1 => FieldKind::Double,
            2 => FieldKind::Float,
            3 => FieldKind::Int64,
            4 => FieldKind::Uint64,
            5 => FieldKind::Int32,
            6 => FieldKind::Fixed64,
            7 => FieldKind::Fixed32,
            8 => FieldKind::Bool,
            9 => FieldKind::String,
            10 => FieldKind::Group,
            11 => FieldKind::Message,
            12 => FieldKind::Bytes,
            13 => FieldKind::Uint32,
            14 => FieldKind::Enum,
            15 => FieldKind::Sfixed32,
            16 => FieldKind::Sfixed64,
            17 => FieldKind::Sint32,
            18 => FieldKind::Sint64,
            _ => return Err(UnsupportedKind(code.to_string())),
        };
        Ok(kind)
    }

    /// The proto keyword for this kind (`"int32"`, `"message"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int32 => "int32",
            FieldKind::Sint32 => "sint32",
            FieldKind::Uint32 => "uint32",
            FieldKind::Fixed32 => "fixed32",
            FieldKind::Sfixed32 => "sfixed32",
            FieldKind::Int64 => "int64",
            FieldKind::Sint64 => "sint64",
            FieldKind::Uint64 => "uint64",
            FieldKind::Fixed64 => "fixed64",
            FieldKind::Sfixed64 => "sfixed64",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Enum => "enum",
            FieldKind::Message => "message",
            FieldKind::Group => "group",
        }
    }

    /// Whether the kind is one of the ten integer kinds.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldKind::Int32
                | FieldKind::Sint32
                | FieldKind::Uint32
                | FieldKind::Fixed32
                | FieldKind::Sfixed32
                | FieldKind::Int64
                | FieldKind::Sint64
                | FieldKind::Uint64
                | FieldKind::Fixed64
                | FieldKind::Sfixed64
        )
    }

    /// Whether values of this kind reference a message type.
    pub fn is_message(&self) -> bool {
        matches!(self, FieldKind::Message | FieldKind::Group)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A kind name or code that is not part of the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported field kind: {0}")]
pub struct UnsupportedKind(pub String);

impl UnsupportedKind {
    /// Attach the declaring type and field.
    pub fn at(self, type_name: &str, field: &str) -> SynthesisError {
        SynthesisError::UnsupportedFieldKind {
            type_name: type_name.to_string(),
            field: field.to_string(),
            kind: self.0,
        }
    }
}

impl FromStr for FieldKind {
    type Err = UnsupportedKind;

    /// Accepts proto keywords (`int32`) and descriptor enum names (`TYPE_INT32`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.strip_prefix("TYPE_").unwrap_or(s).to_ascii_lowercase();
        FieldKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == lowered)
            .ok_or_else(|| UnsupportedKind(s.to_string()))
    }
}

/// Field cardinality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Singular,
    /// `repeated` field that is not a map
    List,
    /// `map<K, V>`; `type_name` names the synthetic entry message
    Map,
}

/// Documentation attached to a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comments {
    /// Leading comment text, without comment markers
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub leading: String,
}

impl Comments {
    pub fn new(leading: impl Into<String>) -> Self {
        Self {
            leading: leading.into(),
        }
    }
}

/// A field of a message type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: u32,
    pub kind: FieldKind,
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Fully-qualified referenced type for message, group, enum and map fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Name of the containing oneof, synthetic or not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneof: Option<String>,
    /// Declared with the `optional` keyword
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub comments: Comments,
    /// Raw field-level option overlay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl FieldDescriptor {
    /// A singular field with no reference, comments or options.
    pub fn new(name: impl Into<String>, number: u32, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            number,
            kind,
            cardinality: Cardinality::Singular,
            type_name: None,
            oneof: None,
            optional: false,
            comments: Comments::default(),
            options: None,
        }
    }

    pub fn is_list(&self) -> bool {
        self.cardinality == Cardinality::List
    }

    pub fn is_map(&self) -> bool {
        self.cardinality == Cardinality::Map
    }
}

/// A field whose kind is outside the supported set.
///
/// Kept on the declaring message so only the units that reach it fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedField {
    pub name: String,
    pub number: u32,
    /// Kind name or code as it appeared in the input
    pub kind: String,
}

/// A oneof declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneofDescriptor {
    pub name: String,
    /// Synthesized by protoc for a proto3 `optional` field
    #[serde(default)]
    pub synthetic: bool,
}

/// A value of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub number: i32,
}

/// An enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub name: String,
    pub full_name: String,
    pub values: Vec<EnumValueDescriptor>,
    #[serde(default)]
    pub comments: Comments,
}

impl EnumDescriptor {
    /// Numeric values in declaration order.
    pub fn numbers(&self) -> Vec<i32> {
        self.values.iter().map(|v| v.number).collect()
    }
}

/// A message type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    pub name: String,
    pub full_name: String,
    /// Path of the defining file
    pub file: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub nested: Vec<MessageDescriptor>,
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
    #[serde(default)]
    pub oneofs: Vec<OneofDescriptor>,
    /// Synthetic entry type generated for a map field
    #[serde(default)]
    pub map_entry: bool,
    #[serde(default)]
    pub comments: Comments,
    /// Raw message-level option overlay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
    /// Fields dropped from `fields` because their kind is not supported
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unsupported: Vec<UnsupportedField>,
}

impl MessageDescriptor {
    /// Fails on the first field whose kind could not be mapped.
    pub fn check_field_kinds(&self) -> SynthResult<()> {
        match self.unsupported.first() {
            Some(field) => {
                Err(UnsupportedKind(field.kind.clone()).at(&self.full_name, &field.name))
            }
            None => Ok(()),
        }
    }

    /// Look up a field by number.
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// The non-synthetic oneof a field belongs to, if any.
    pub fn real_oneof(&self, field: &FieldDescriptor) -> Option<&OneofDescriptor> {
        let name = field.oneof.as_deref()?;
        self.oneofs
            .iter()
            .find(|o| o.name == name)
            .filter(|o| !o.synthetic)
    }

    /// Name path below the package, e.g. `User.Address` for
    /// `users.v1.User.Address` in package `users.v1`.
    pub fn relative_name<'a>(&'a self, package: &str) -> &'a str {
        if package.is_empty() {
            return &self.full_name;
        }
        self.full_name
            .strip_prefix(package)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(&self.full_name)
    }
}

/// A compilation unit: one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub messages: Vec<MessageDescriptor>,
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
    /// Raw file-level option overlay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl FileDescriptor {
    /// File name without directories or the `.proto` extension.
    pub fn stem(&self) -> &str {
        let base = self.path.rsplit('/').next().unwrap_or(&self.path);
        base.strip_suffix(".proto").unwrap_or(base)
    }
}

/// Read access to every type a compilation may reference.
pub trait DescriptorPool {
    /// Look up a message type by fully-qualified name (no leading dot).
    fn message(&self, full_name: &str) -> Option<&MessageDescriptor>;

    /// Look up an enum type by fully-qualified name (no leading dot).
    fn enumeration(&self, full_name: &str) -> Option<&EnumDescriptor>;

    /// Package of the file defining `full_name`, if known.
    fn package_of(&self, full_name: &str) -> Option<&str>;
}

/// Position of a message inside [`DescriptorSet::files`].
#[derive(Debug, Clone)]
struct MessagePath {
    file: usize,
    path: Vec<usize>,
}

/// Position of an enum inside [`DescriptorSet::files`].
#[derive(Debug, Clone)]
struct EnumPath {
    file: usize,
    parent: Vec<usize>,
    index: usize,
}

/// A set of files with a name index.
#[derive(Debug, Clone)]
pub struct DescriptorSet {
    files: Vec<FileDescriptor>,
    targets: Vec<String>,
    messages: HashMap<String, MessagePath>,
    enums: HashMap<String, EnumPath>,
}

impl DescriptorSet {
    /// Index `files`. `targets` lists the file paths to generate for; an
    /// empty list means every file is a target.
    pub fn new(files: Vec<FileDescriptor>, targets: Vec<String>) -> Self {
        let mut set = Self {
            files,
            targets,
            messages: HashMap::new(),
            enums: HashMap::new(),
        };
        set.build_index();
        set
    }

    fn build_index(&mut self) {
        let mut messages = HashMap::new();
        let mut enums = HashMap::new();
        for (file_idx, file) in self.files.iter().enumerate() {
            for (idx, e) in file.enums.iter().enumerate() {
                enums.insert(
                    e.full_name.clone(),
                    EnumPath {
                        file: file_idx,
                        parent: Vec::new(),
                        index: idx,
                    },
                );
            }
            let mut stack: Vec<(Vec<usize>, &MessageDescriptor)> = file
                .messages
                .iter()
                .enumerate()
                .map(|(i, m)| (vec![i], m))
                .collect();
            while let Some((path, msg)) = stack.pop() {
                for (idx, e) in msg.enums.iter().enumerate() {
                    enums.insert(
                        e.full_name.clone(),
                        EnumPath {
                            file: file_idx,
                            parent: path.clone(),
                            index: idx,
                        },
                    );
                }
                for (idx, nested) in msg.nested.iter().enumerate() {
                    let mut child = path.clone();
                    child.push(idx);
                    stack.push((child, nested));
                }
                messages.insert(
                    msg.full_name.clone(),
                    MessagePath {
                        file: file_idx,
                        path,
                    },
                );
            }
        }
        self.messages = messages;
        self.enums = enums;
    }

    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    /// Look up a file by path.
    pub fn file(&self, path: &str) -> Option<&FileDescriptor> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Files to generate for, in input order.
    pub fn target_files(&self) -> impl Iterator<Item = &FileDescriptor> {
        self.files
            .iter()
            .filter(|f| self.targets.is_empty() || self.targets.iter().any(|t| t == &f.path))
    }

    /// Every indexed message name.
    pub fn message_names(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    fn resolve_path(&self, file: usize, path: &[usize]) -> Option<&MessageDescriptor> {
        let (first, rest) = path.split_first()?;
        let mut msg = self.files.get(file)?.messages.get(*first)?;
        for idx in rest {
            msg = msg.nested.get(*idx)?;
        }
        Some(msg)
    }
}

impl DescriptorPool for DescriptorSet {
    fn message(&self, full_name: &str) -> Option<&MessageDescriptor> {
        let name = full_name.strip_prefix('.').unwrap_or(full_name);
        let loc = self.messages.get(name)?;
        self.resolve_path(loc.file, &loc.path)
    }

    fn enumeration(&self, full_name: &str) -> Option<&EnumDescriptor> {
        let name = full_name.strip_prefix('.').unwrap_or(full_name);
        let loc = self.enums.get(name)?;
        if loc.parent.is_empty() {
            return self.files.get(loc.file)?.enums.get(loc.index);
        }
        self.resolve_path(loc.file, &loc.parent)?
            .enums
            .get(loc.index)
    }

    fn package_of(&self, full_name: &str) -> Option<&str> {
        let name = full_name.strip_prefix('.').unwrap_or(full_name);
        let file = self
            .messages
            .get(name)
            .map(|m| m.file)
            .or_else(|| self.enums.get(name).map(|e| e.file))?;
        self.files.get(file).map(|f| f.package.as_str())
    }
}

/// Resolve the message a field references, with declaring-type context on failure.
pub(crate) fn referenced_message<'a>(
    pool: &'a dyn DescriptorPool,
    owner: &MessageDescriptor,
    field: &FieldDescriptor,
) -> SynthResult<&'a MessageDescriptor> {
    let target = field.type_name.as_deref().unwrap_or_default();
    pool.message(target)
        .ok_or_else(|| SynthesisError::UnresolvedReference {
            type_name: owner.full_name.clone(),
            field: Some(field.name.clone()),
            target: target.to_string(),
        })
}

/// Resolve the value field of a map field's synthetic entry type.
pub(crate) fn map_entry_fields<'a>(
    pool: &'a dyn DescriptorPool,
    owner: &MessageDescriptor,
    field: &FieldDescriptor,
) -> SynthResult<(&'a FieldDescriptor, &'a FieldDescriptor)> {
    let entry = referenced_message(pool, owner, field)?;
    let missing = || SynthesisError::UnresolvedReference {
        type_name: owner.full_name.clone(),
        field: Some(field.name.clone()),
        target: format!("{} (map entry key/value)", entry.full_name),
    };
    let key = entry.field_by_number(MAP_KEY_NUMBER).ok_or_else(missing)?;
    let value = entry.field_by_number(MAP_VALUE_NUMBER).ok_or_else(missing)?;
    Ok((key, value))
}
