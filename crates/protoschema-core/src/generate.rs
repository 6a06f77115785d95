//! Per-file compilation.
//!
//! A compilation unit is one target file. Each unit gets its own visited set
//! and its own registries; nothing is shared between units, so one unit's
//! failure leaves the others untouched.

use crate::codegen;
use crate::options::file_options;
use crate::schema::Schema;
use crate::select::select;
use crate::synth::Synthesizer;
use crate::{DescriptorPool, DescriptorSet, FileDescriptor, MessageDescriptor, SynthResult, SynthesisError};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Settings for a generation run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Recorded in generated file headers
    pub version: String,
    /// Full-name prefixes of shared types. A shared type imported by a unit
    /// is generated inside that unit under a file-qualified name.
    pub shared_prefixes: Vec<String>,
    /// Stamp generated sources with the current UTC time
    pub include_timestamp: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            shared_prefixes: vec!["google.".to_string()],
            include_timestamp: true,
        }
    }
}

impl GeneratorConfig {
    pub fn is_shared(&self, full_name: &str) -> bool {
        self.shared_prefixes
            .iter()
            .any(|p| full_name.starts_with(p.as_str()))
    }
}

/// Where a generated type is defined relative to the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Declared in the unit's own file
    Local,
    /// Imported shared type generated here under a file-qualified name
    Shared,
}

/// One type's synthesized output within a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedType {
    pub full_name: String,
    /// Identifier stem of the generated functions, e.g. `User_Address`
    pub ident: String,
    pub origin: Origin,
    /// The type's own object node, with references left as `$ref`s
    pub shape: Schema,
    /// Ref-as-root document for the type
    pub root: Schema,
}

/// Output of one compilation unit.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    /// Source file path
    pub source: String,
    pub stem: String,
    /// Local types first, then shared types, each in selection order
    pub types: Vec<GeneratedType>,
    /// Builder function path for every type a shape may reference
    pub callees: BTreeMap<String, String>,
}

impl CompiledUnit {
    /// File name of the generated Rust module.
    pub fn rust_file_name(&self) -> String {
        format!("{}_jsonschema.rs", self.stem)
    }

    /// Render the Rust module that rebuilds these schemas at runtime.
    pub fn rust_source(&self, config: &GeneratorConfig) -> String {
        let stamp = config.include_timestamp.then(chrono::Utc::now);
        codegen::render(self, &config.version, stamp)
    }

    /// One pretty-printed JSON document per type, as `(file name, text)`.
    pub fn documents(&self) -> SynthResult<Vec<(String, String)>> {
        self.types
            .iter()
            .map(|t| {
                let text = serde_json::to_string_pretty(&t.root).map_err(|source| {
                    SynthesisError::Serialize {
                        type_name: t.full_name.clone(),
                        source,
                    }
                })?;
                Ok((format!("{}.schema.json", t.full_name), text))
            })
            .collect()
    }

    pub fn get(&self, full_name: &str) -> Option<&GeneratedType> {
        self.types.iter().find(|t| t.full_name == full_name)
    }
}

/// Identifier stem for a type declared in its own file: the nested name path
/// below the package joined with `_`.
pub fn local_ident(message: &MessageDescriptor, package: &str) -> String {
    message.relative_name(package).replace('.', "_")
}

/// Identifier stem for a shared type generated inside the file `stem`.
pub fn shared_ident(stem: &str, full_name: &str) -> String {
    format!("{stem}_{}", full_name.replace('.', "_"))
}

fn builder_name(ident: &str) -> String {
    format!("{ident}_json_schema_with_defs")
}

fn file_stem(path: &str) -> &str {
    let base = path.rsplit('/').next().unwrap_or(path);
    base.strip_suffix(".proto").unwrap_or(base)
}

/// Compile one file. Returns `Ok(None)` when nothing in it generates.
pub fn compile_unit(
    pool: &dyn DescriptorPool,
    file: &FileDescriptor,
    config: &GeneratorConfig,
) -> SynthResult<Option<CompiledUnit>> {
    let generate_all = file_options(file)?.map(|o| o.generate).unwrap_or(false);
    let roots: Vec<&MessageDescriptor> = file.messages.iter().collect();
    let selected = select(pool, &roots, generate_all, &mut HashSet::new())?;

    let (local, shared): (Vec<&MessageDescriptor>, Vec<&MessageDescriptor>) = selected
        .iter()
        .copied()
        .filter(|m| m.file == file.path || config.is_shared(&m.full_name))
        .partition(|m| m.file == file.path);

    if local.is_empty() && shared.is_empty() {
        debug!(file = %file.path, "nothing to generate");
        return Ok(None);
    }

    let stem = file.stem().to_string();
    let mut callees = BTreeMap::new();
    for m in &selected {
        let path = if m.file == file.path {
            builder_name(&local_ident(m, &file.package))
        } else if config.is_shared(&m.full_name) {
            builder_name(&shared_ident(&stem, &m.full_name))
        } else {
            let package = pool.package_of(&m.full_name).unwrap_or_default();
            format!(
                "super::{}_jsonschema::{}",
                file_stem(&m.file),
                builder_name(&local_ident(m, package))
            )
        };
        callees.insert(m.full_name.clone(), path);
    }

    let synth = Synthesizer::new(pool, &selected);
    let mut types = Vec::with_capacity(local.len() + shared.len());
    for (origin, messages) in [(Origin::Local, &local), (Origin::Shared, &shared)] {
        for m in messages.iter() {
            let root = synth.root_schema(&m.full_name)?;
            if let Some(target) = root.dangling_references().into_iter().next() {
                return Err(SynthesisError::UnresolvedReference {
                    type_name: m.full_name.clone(),
                    field: None,
                    target,
                });
            }
            let ident = match origin {
                Origin::Local => local_ident(m, &file.package),
                Origin::Shared => shared_ident(&stem, &m.full_name),
            };
            types.push(GeneratedType {
                full_name: m.full_name.clone(),
                ident,
                origin,
                shape: synth.message_shape(m)?,
                root,
            });
        }
    }

    info!(file = %file.path, local = local.len(), shared = shared.len(), "compiled");
    Ok(Some(CompiledUnit {
        source: file.path.clone(),
        stem,
        types,
        callees,
    }))
}

/// Compile every target file of `set`, each independently.
pub fn compile_all(
    set: &DescriptorSet,
    config: &GeneratorConfig,
) -> Vec<(String, SynthResult<Option<CompiledUnit>>)> {
    set.target_files()
        .map(|file| (file.path.clone(), compile_unit(set, file, config)))
        .collect()
}
