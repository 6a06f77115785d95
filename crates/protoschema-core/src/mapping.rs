//! Type Mapper.
//!
//! Turns one field descriptor into a [`FieldSchemaConfig`], the intermediate
//! form the synthesizer renders. The mapper knows nothing about the message
//! around the field beyond what it needs to name errors.

use crate::descriptor::{map_entry_fields, referenced_message};
use crate::schema::{InstanceType, Schema, DEFS_PREFIX};
use crate::{
    DescriptorPool, FieldDescriptor, FieldKind, FieldSchemaOptions, MessageDescriptor, SynthResult,
    SynthesisError,
};

/// Content encoding applied to bytes fields unless overridden.
pub const BYTES_ENCODING: &str = "base64";

/// Key-name pattern for integer map keys.
pub const INTEGER_KEY_PATTERN: &str = "^-?[0-9]+$";

/// Key-name pattern for boolean map keys.
pub const BOOLEAN_KEY_PATTERN: &str = "^(true|false)$";

/// Map a field kind to its JSON Schema primitive type.
///
/// Enums map to `integer`: the numeric value is used, so plain JSON encoding
/// round-trips without a name table. Bytes map to `string`; callers also set
/// the content encoding.
pub fn map_kind(kind: FieldKind) -> InstanceType {
    match kind {
        FieldKind::Bool => InstanceType::Boolean,
        FieldKind::Int32
        | FieldKind::Sint32
        | FieldKind::Uint32
        | FieldKind::Fixed32
        | FieldKind::Sfixed32
        | FieldKind::Int64
        | FieldKind::Sint64
        | FieldKind::Uint64
        | FieldKind::Fixed64
        | FieldKind::Sfixed64 => InstanceType::Integer,
        FieldKind::Float | FieldKind::Double => InstanceType::Number,
        FieldKind::String | FieldKind::Bytes => InstanceType::String,
        FieldKind::Enum => InstanceType::Integer,
        FieldKind::Message | FieldKind::Group => InstanceType::Object,
    }
}

/// Pattern that JSON object keys must match for a map with this key kind.
///
/// Every object key is a string in JSON, so non-string keys are constrained
/// by their textual form. String keys need no pattern.
pub fn key_name_pattern(kind: FieldKind) -> Option<&'static str> {
    if kind.is_integer() {
        Some(INTEGER_KEY_PATTERN)
    } else if kind == FieldKind::Bool {
        Some(BOOLEAN_KEY_PATTERN)
    } else {
        None
    }
}

/// Names the builder that synthesizes (or already synthesized) a message's
/// schema. The mapper never inlines another message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub full_name: String,
}

/// Validation constraints attached to a config node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    pub content_encoding: Option<String>,
    pub content_media_type: Option<String>,
}

fn non_zero(n: u64) -> Option<u64> {
    (n != 0).then_some(n)
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Intermediate schema description of one field.
///
/// Exactly one render mode applies: `type_name` set (scalars and containers),
/// or `message_ref` set with no `nested` (a pure reference). `nested` is only
/// set for arrays (items) and maps (values).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSchemaConfig {
    pub field_name: String,
    pub title: String,
    pub description: String,
    pub type_name: Option<InstanceType>,
    pub format: Option<String>,
    pub pattern: Option<String>,
    /// Map key validation for non-string keys
    pub property_names_pattern: Option<String>,
    pub enum_values: Vec<i32>,
    pub is_bytes: bool,
    pub message_ref: Option<MessageRef>,
    pub nested: Option<Box<FieldSchemaConfig>>,
    pub constraints: Constraints,
}

impl FieldSchemaConfig {
    fn typed(type_name: InstanceType) -> Self {
        Self {
            type_name: Some(type_name),
            ..Self::default()
        }
    }

    /// Apply field-level option overrides.
    ///
    /// Title and description replace comment-derived text. Item and property
    /// counts land on the container; value constraints land on the element
    /// (array items, map values) or on the field itself for singular fields.
    pub fn apply_options(&mut self, opts: &FieldSchemaOptions) {
        if !opts.title.is_empty() {
            self.title = opts.title.clone();
        }
        if !opts.description.is_empty() {
            self.description = opts.description.clone();
        }

        let c = &mut self.constraints;
        c.min_items = non_zero(opts.min_items).or(c.min_items);
        c.max_items = non_zero(opts.max_items).or(c.max_items);
        c.unique_items |= opts.unique_items;
        c.min_properties = non_zero(opts.min_properties).or(c.min_properties);
        c.max_properties = non_zero(opts.max_properties).or(c.max_properties);

        let value = match self.nested {
            Some(ref mut nested) => &mut **nested,
            None => self,
        };
        if let Some(format) = non_empty(&opts.format) {
            value.format = Some(format);
        }
        if let Some(pattern) = non_empty(&opts.pattern) {
            value.pattern = Some(pattern);
        }
        let c = &mut value.constraints;
        if opts.minimum != 0.0 || opts.exclusive_minimum {
            c.minimum = Some(opts.minimum);
        }
        if opts.maximum != 0.0 || opts.exclusive_maximum {
            c.maximum = Some(opts.maximum);
        }
        c.exclusive_minimum |= opts.exclusive_minimum;
        c.exclusive_maximum |= opts.exclusive_maximum;
        c.min_length = non_zero(opts.min_length).or(c.min_length);
        c.max_length = non_zero(opts.max_length).or(c.max_length);
        c.content_encoding = non_empty(&opts.content_encoding).or(c.content_encoding.take());
        c.content_media_type = non_empty(&opts.content_media_type).or(c.content_media_type.take());
    }

    /// Render to a schema node. Message references become `$ref` nodes; the
    /// referenced definitions are the caller's business.
    pub fn to_schema(&self) -> Schema {
        let mut node = Schema {
            instance_type: self.type_name,
            title: non_empty(&self.title),
            description: non_empty(&self.description),
            min_items: self.constraints.min_items,
            max_items: self.constraints.max_items,
            unique_items: self.constraints.unique_items.then_some(true),
            min_properties: self.constraints.min_properties,
            max_properties: self.constraints.max_properties,
            ..Schema::default()
        };

        match &self.nested {
            Some(nested) => {
                let element = Box::new(nested.value_schema());
                if self.type_name == Some(InstanceType::Array) {
                    node.items = Some(element);
                } else {
                    node.additional_properties = Some(element);
                }
            }
            None => self.write_value(&mut node),
        }

        if let Some(pattern) = &self.property_names_pattern {
            node.property_names = Some(Box::new(Schema {
                pattern: Some(pattern.clone()),
                ..Schema::default()
            }));
        }
        node
    }

    fn value_schema(&self) -> Schema {
        let mut node = Schema {
            instance_type: self.type_name,
            ..Schema::default()
        };
        self.write_value(&mut node);
        node
    }

    fn write_value(&self, node: &mut Schema) {
        let c = &self.constraints;
        node.reference = self
            .message_ref
            .as_ref()
            .map(|r| format!("{DEFS_PREFIX}{}", r.full_name));
        node.format = self.format.clone();
        node.pattern = self.pattern.clone();
        node.content_encoding = c
            .content_encoding
            .clone()
            .or_else(|| self.is_bytes.then(|| BYTES_ENCODING.to_string()));
        node.content_media_type = c.content_media_type.clone();
        if c.exclusive_minimum {
            node.exclusive_minimum = c.minimum;
        } else {
            node.minimum = c.minimum;
        }
        if c.exclusive_maximum {
            node.exclusive_maximum = c.maximum;
        } else {
            node.maximum = c.maximum;
        }
        node.min_length = c.min_length;
        node.max_length = c.max_length;
        node.enum_values = self.enum_values.iter().map(|v| i64::from(*v)).collect();
    }
}

/// Builds field configs against a descriptor pool.
pub struct TypeMapper<'a> {
    pool: &'a dyn DescriptorPool,
}

impl<'a> TypeMapper<'a> {
    pub fn new(pool: &'a dyn DescriptorPool) -> Self {
        Self { pool }
    }

    /// Route a field to the array, map or scalar builder by cardinality.
    pub fn field_config(
        &self,
        owner: &MessageDescriptor,
        field: &FieldDescriptor,
        title: &str,
        description: &str,
    ) -> SynthResult<FieldSchemaConfig> {
        if field.is_list() {
            self.array_config(owner, field, title, description)
        } else if field.is_map() {
            self.map_config(owner, field, title, description)
        } else {
            self.scalar_config(owner, field, title, description)
        }
    }

    /// Singular fields, including singular message fields.
    pub fn scalar_config(
        &self,
        owner: &MessageDescriptor,
        field: &FieldDescriptor,
        title: &str,
        description: &str,
    ) -> SynthResult<FieldSchemaConfig> {
        let base = match field.kind {
            FieldKind::Message | FieldKind::Group => {
                self.message_reference(referenced_message(self.pool, owner, field)?)
            }
            kind => FieldSchemaConfig::typed(map_kind(kind)),
        };
        let mut cfg = FieldSchemaConfig {
            field_name: field.name.clone(),
            title: title.to_string(),
            description: description.to_string(),
            ..base
        };

        match field.kind {
            FieldKind::Enum => cfg.enum_values = self.enum_values(owner, field)?,
            FieldKind::Bytes => cfg.is_bytes = true,
            _ => {}
        }

        Ok(cfg)
    }

    /// Repeated (non-map) fields: an `array` whose items follow the scalar rules.
    pub fn array_config(
        &self,
        owner: &MessageDescriptor,
        field: &FieldDescriptor,
        title: &str,
        description: &str,
    ) -> SynthResult<FieldSchemaConfig> {
        Ok(FieldSchemaConfig {
            field_name: field.name.clone(),
            title: title.to_string(),
            description: description.to_string(),
            nested: Some(Box::new(self.element_config(owner, field)?)),
            ..FieldSchemaConfig::typed(InstanceType::Array)
        })
    }

    /// Map fields: an `object` whose additional properties are the values.
    pub fn map_config(
        &self,
        owner: &MessageDescriptor,
        field: &FieldDescriptor,
        title: &str,
        description: &str,
    ) -> SynthResult<FieldSchemaConfig> {
        let (key, value) = map_entry_fields(self.pool, owner, field)?;
        let entry = referenced_message(self.pool, owner, field)?;
        Ok(FieldSchemaConfig {
            field_name: field.name.clone(),
            title: title.to_string(),
            description: description.to_string(),
            property_names_pattern: key_name_pattern(key.kind).map(str::to_string),
            nested: Some(Box::new(self.element_config(entry, value)?)),
            ..FieldSchemaConfig::typed(InstanceType::Object)
        })
    }

    /// A reference to the builder for `target`. Carries nothing else: the
    /// target's own title and description stay on its `$defs` entry.
    pub fn message_reference(&self, target: &MessageDescriptor) -> FieldSchemaConfig {
        FieldSchemaConfig {
            message_ref: Some(MessageRef {
                full_name: target.full_name.clone(),
            }),
            ..FieldSchemaConfig::default()
        }
    }

    /// Config for one array element or map value of `field`'s kind.
    fn element_config(
        &self,
        owner: &MessageDescriptor,
        field: &FieldDescriptor,
    ) -> SynthResult<FieldSchemaConfig> {
        let cfg = match field.kind {
            FieldKind::Message | FieldKind::Group => {
                self.message_reference(referenced_message(self.pool, owner, field)?)
            }
            FieldKind::Enum => FieldSchemaConfig {
                enum_values: self.enum_values(owner, field)?,
                ..FieldSchemaConfig::typed(InstanceType::Integer)
            },
            FieldKind::Bytes => FieldSchemaConfig {
                is_bytes: true,
                ..FieldSchemaConfig::typed(InstanceType::String)
            },
            kind => FieldSchemaConfig::typed(map_kind(kind)),
        };
        Ok(cfg)
    }

    fn enum_values(&self, owner: &MessageDescriptor, field: &FieldDescriptor) -> SynthResult<Vec<i32>> {
        let target = field.type_name.as_deref().unwrap_or_default();
        self.pool
            .enumeration(target)
            .map(|e| e.numbers())
            .ok_or_else(|| SynthesisError::UnresolvedReference {
                type_name: owner.full_name.clone(),
                field: Some(field.name.clone()),
                target: target.to_string(),
            })
    }
}
