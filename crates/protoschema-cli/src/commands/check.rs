//! Check command - Resolve options and references without writing output.

use anyhow::{bail, Result};
use protoschema_core::{
    compile_all, field_options, file_options, message_options, DescriptorPool, DescriptorSet,
    FieldKind, GeneratorConfig, SynthesisError, UnsupportedKind,
};
use std::collections::HashSet;
use std::mem::{discriminant, Discriminant};
use std::path::Path;

use super::load_input;

/// Every option overlay and type reference in `set` that does not resolve.
///
/// Covers all files and messages, not only the ones that generate.
fn problems(set: &DescriptorSet) -> Vec<SynthesisError> {
    let mut out = Vec::new();
    for file in set.files() {
        if let Err(e) = file_options(file) {
            out.push(e);
        }
    }

    let mut names: Vec<&str> = set.message_names().collect();
    names.sort_unstable();
    for name in names {
        let Some(message) = set.message(name) else {
            continue;
        };
        if let Err(e) = message_options(message) {
            out.push(e);
        }
        for field in &message.unsupported {
            out.push(UnsupportedKind(field.kind.clone()).at(&message.full_name, &field.name));
        }
        for field in &message.fields {
            if let Err(e) = field_options(message, field) {
                out.push(e);
            }
            let target = field.type_name.as_deref().unwrap_or_default();
            let resolved = match field.kind {
                FieldKind::Message | FieldKind::Group => set.message(target).is_some(),
                FieldKind::Enum => set.enumeration(target).is_some(),
                _ => true,
            };
            if !resolved {
                out.push(SynthesisError::UnresolvedReference {
                    type_name: message.full_name.clone(),
                    field: Some(field.name.clone()),
                    target: target.to_string(),
                });
            }
        }
    }
    out
}

/// What an error is about: its kind plus the file, message or field it names.
///
/// A unit that fails on an already reported fault yields the same key.
fn subject(error: &SynthesisError) -> Option<(Discriminant<SynthesisError>, String)> {
    let name = match error {
        SynthesisError::UnsupportedFieldKind {
            type_name, field, ..
        } => format!("field {type_name}.{field}"),
        SynthesisError::UnresolvedReference {
            type_name,
            field: Some(field),
            ..
        } => format!("field {type_name}.{field}"),
        SynthesisError::UnresolvedReference { type_name, .. } => format!("message {type_name}"),
        SynthesisError::MalformedOption { scope, .. } => scope.clone(),
        _ => return None,
    };
    Some((discriminant(error), name))
}

pub fn run(input: &Path) -> Result<()> {
    println!("🔍 Checking: {}\n", input.display());
    let set = load_input(input)?;

    let found = problems(&set);
    let known: HashSet<_> = found.iter().filter_map(subject).collect();
    let mut errors: Vec<String> = found.iter().map(ToString::to_string).collect();
    let units = compile_all(&set, &GeneratorConfig::default());
    for (source, result) in &units {
        if let Err(e) = result {
            if subject(e).is_some_and(|key| known.contains(&key)) {
                continue;
            }
            errors.push(format!("{source}: {e}"));
        }
    }

    if errors.is_empty() {
        println!("✅ All options and references resolve");
        println!("   Files:    {}", set.files().len());
        println!("   Messages: {}", set.message_names().count());
        println!("   Units:    {}", units.len());
        return Ok(());
    }

    println!("❌ Errors ({}):", errors.len());
    for error in &errors {
        println!("   • {error}");
    }
    println!();
    bail!("Check failed with {} error(s)", errors.len());
}
