//! Schema nodes and the Definition Registry.
//!
//! [`Schema`] serializes to JSON Schema Draft 2020-12. Unset keywords are
//! omitted, so a reference node serializes as just `{"$ref": ...}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of every cross-reference.
pub const DEFS_PREFIX: &str = "#/$defs/";

/// Definition Registry: full type name to its schema.
pub type Definitions = BTreeMap<String, Schema>;

/// The seven JSON Schema primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl InstanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceType::Array => "array",
            InstanceType::Boolean => "boolean",
            InstanceType::Integer => "integer",
            InstanceType::Null => "null",
            InstanceType::Number => "number",
            InstanceType::Object => "object",
            InstanceType::String => "string",
        }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON Schema node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<InstanceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // String validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    // Numeric validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<i64>,

    // Array validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    // Object validation
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,

    // Composition
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,

    #[serde(rename = "$defs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defs: Definitions,
}

impl Schema {
    /// A node of the given primitive type.
    pub fn typed(instance_type: InstanceType) -> Self {
        Self {
            instance_type: Some(instance_type),
            ..Self::default()
        }
    }

    /// An empty `object` node.
    pub fn object() -> Self {
        Self::typed(InstanceType::Object)
    }

    /// A pure reference to `#/$defs/<full_name>`.
    pub fn reference(full_name: &str) -> Self {
        Self {
            reference: Some(format!("{DEFS_PREFIX}{full_name}")),
            ..Self::default()
        }
    }

    /// Ref-as-root: a fresh reference node that carries the whole registry.
    ///
    /// The registry entry for `full_name` stays one level below the returned
    /// node, inside `$defs`, so the node never contains itself.
    pub fn root_reference(full_name: &str, defs: Definitions) -> Self {
        Self {
            defs,
            ..Self::reference(full_name)
        }
    }

    /// A node that only requires `name` to be present.
    pub fn requiring(name: &str) -> Self {
        Self {
            required: vec![name.to_string()],
            ..Self::default()
        }
    }

    /// Definition name this node references, if it is a `$defs` reference.
    pub fn referenced_name(&self) -> Option<&str> {
        self.reference.as_deref()?.strip_prefix(DEFS_PREFIX)
    }

    /// True when only `$ref` is set.
    pub fn is_pure_reference(&self) -> bool {
        self.reference.is_some()
            && Schema {
                reference: None,
                ..self.clone()
            } == Schema::default()
    }

    /// Every `$ref` anywhere in this tree that does not name an entry of
    /// this node's own `$defs`. Sorted and deduplicated.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs.sort();
        refs.dedup();
        refs.retain(|r| {
            r.strip_prefix(DEFS_PREFIX)
                .map(|name| !self.defs.contains_key(name))
                .unwrap_or(true)
        });
        refs
    }

    /// Every `$ref` value in this tree, in traversal order.
    pub fn collect_references(&self, out: &mut Vec<String>) {
        if let Some(r) = &self.reference {
            out.push(r.clone());
        }
        for child in self.children() {
            child.collect_references(out);
        }
    }

    fn children(&self) -> impl Iterator<Item = &Schema> {
        self.items
            .iter()
            .chain(self.additional_properties.iter())
            .chain(self.property_names.iter())
            .map(|b| b.as_ref())
            .chain(self.properties.values())
            .chain(self.one_of.iter())
            .chain(self.all_of.iter())
            .chain(self.defs.values())
    }
}
