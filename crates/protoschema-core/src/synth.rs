//! Schema Synthesizer.
//!
//! Builds one object schema per message and threads a shared [`Definitions`]
//! registry through the recursion. A type moves through three states:
//!
//! - unvisited: absent from the registry
//! - registered: a placeholder entry exists while its fields are processed
//! - complete: the finished node replaces the placeholder
//!
//! Any request for a registered or complete type returns a bare `$ref`, which
//! is what makes self-referential and mutually-referential graphs terminate.

use crate::comments::title_and_description;
use crate::mapping::TypeMapper;
use crate::options::field_options;
use crate::schema::{Definitions, Schema, DEFS_PREFIX};
use crate::{DescriptorPool, FieldDescriptor, MessageDescriptor, SynthResult, SynthesisError};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

/// Synthesizes schemas for a selected set of message types.
pub struct Synthesizer<'a> {
    pool: &'a dyn DescriptorPool,
    selected: HashSet<String>,
}

impl<'a> Synthesizer<'a> {
    /// `selected` is the output of [`crate::select`]: every message a field
    /// may reference. A reference outside it is an error, not a silent `$ref`
    /// to nothing.
    pub fn new(pool: &'a dyn DescriptorPool, selected: &[&MessageDescriptor]) -> Self {
        Self {
            pool,
            selected: selected.iter().map(|m| m.full_name.clone()).collect(),
        }
    }

    /// Whether `full_name` may be referenced.
    pub fn is_selected(&self, full_name: &str) -> bool {
        self.selected.contains(full_name)
    }

    /// Ref-as-root entry point.
    ///
    /// Synthesizes `full_name` into a fresh registry and returns a new
    /// reference node carrying that registry as `$defs`. The registry entry
    /// for `full_name` is only reachable through `$defs`.
    pub fn root_schema(&self, full_name: &str) -> SynthResult<Schema> {
        let mut defs = Definitions::new();
        self.schema_with_defs(full_name, &mut defs)?;
        Ok(Schema::root_reference(full_name, defs))
    }

    /// Registry-threading builder.
    ///
    /// Populates `defs` with `full_name` and everything it references, and
    /// returns a reference to its entry. A type already present in `defs`
    /// is left untouched.
    pub fn schema_with_defs(&self, full_name: &str, defs: &mut Definitions) -> SynthResult<Schema> {
        if defs.contains_key(full_name) {
            trace!(message = %full_name, "already registered");
            return Ok(Schema::reference(full_name));
        }
        let message = self
            .pool
            .message(full_name)
            .ok_or_else(|| SynthesisError::UnknownType(full_name.to_string()))?;

        // Register before touching fields so self-references find the entry.
        defs.insert(full_name.to_string(), Schema::default());

        let shape = self.message_shape(message)?;
        let mut targets = Vec::new();
        shape.collect_references(&mut targets);
        for target in &targets {
            if let Some(name) = target.strip_prefix(DEFS_PREFIX) {
                self.schema_with_defs(name, defs)?;
            }
        }

        debug!(message = %full_name, properties = shape.properties.len(), "synthesized");
        defs.insert(full_name.to_string(), shape);
        Ok(Schema::reference(full_name))
    }

    /// The object node for `message` alone. Message-typed fields appear as
    /// `$ref`s; nothing is inlined and no registry is touched.
    pub fn message_shape(&self, message: &MessageDescriptor) -> SynthResult<Schema> {
        message.check_field_kinds()?;
        let (title, description) = title_and_description(&message.comments);
        let mut node = Schema {
            title: (!title.is_empty()).then_some(title),
            description: (!description.is_empty()).then_some(description),
            ..Schema::object()
        };

        let mapper = TypeMapper::new(self.pool);
        let mut oneofs: BTreeMap<&str, Vec<String>> = BTreeMap::new();

        for field in &message.fields {
            let opts = field_options(message, field)?;
            if opts.as_ref().is_some_and(|o| o.ignore) {
                trace!(message = %message.full_name, field = %field.name, "ignored");
                continue;
            }

            if is_required(field) {
                node.required.push(field.name.clone());
            }
            if let Some(group) = message.real_oneof(field) {
                oneofs
                    .entry(group.name.as_str())
                    .or_default()
                    .push(field.name.clone());
            }

            let (title, description) = title_and_description(&field.comments);
            let mut cfg = mapper.field_config(message, field, &title, &description)?;

            // Comment text on a plain message field is dropped; only explicit
            // options decorate a `$ref`.
            let property = match (&opts, cfg.message_ref.clone()) {
                (None, Some(target)) if cfg.type_name.is_none() && cfg.nested.is_none() => {
                    Schema::reference(&target.full_name)
                }
                (opts, _) => {
                    if let Some(o) = opts {
                        cfg.apply_options(o);
                    }
                    cfg.to_schema()
                }
            };
            self.check_references(message, field, &property)?;
            node.properties.insert(cfg.field_name, property);
        }

        match oneofs.len() {
            0 => {}
            1 => {
                if let Some(members) = oneofs.into_values().next() {
                    node.one_of = exclusive(members);
                }
            }
            _ => {
                node.all_of = oneofs
                    .into_values()
                    .map(|members| Schema {
                        one_of: exclusive(members),
                        ..Schema::default()
                    })
                    .collect();
            }
        }

        Ok(node)
    }

    fn check_references(
        &self,
        owner: &MessageDescriptor,
        field: &FieldDescriptor,
        property: &Schema,
    ) -> SynthResult<()> {
        let mut refs = Vec::new();
        property.collect_references(&mut refs);
        for r in refs {
            let target = r.strip_prefix(DEFS_PREFIX).unwrap_or(&r);
            if !self.is_selected(target) {
                return Err(SynthesisError::UnresolvedReference {
                    type_name: owner.full_name.clone(),
                    field: Some(field.name.clone()),
                    target: target.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A field is required unless it belongs to a oneof (synthetic or not), is
/// declared `optional`, or is a container. An absent container is an absent
/// key, never a required empty value.
pub fn is_required(field: &FieldDescriptor) -> bool {
    field.oneof.is_none() && !field.optional && !field.is_list() && !field.is_map()
}

fn exclusive(members: Vec<String>) -> Vec<Schema> {
    members.iter().map(|m| Schema::requiring(m)).collect()
}
