//! Show command - Print the ref-as-root schema for one message type.

use anyhow::{bail, Context, Result};
use protoschema_core::{select, DescriptorPool, Synthesizer};
use std::collections::HashSet;
use std::path::Path;

use super::load_input;

pub fn run(input: &Path, type_name: &str, compact: bool) -> Result<()> {
    let set = load_input(input)?;
    let name = type_name.strip_prefix('.').unwrap_or(type_name);

    let Some(message) = set.message(name) else {
        bail!("Unknown message type: {name}");
    };
    if message.map_entry {
        bail!("{name} is a map entry; show the message that declares the map instead");
    }

    // Everything reachable from the requested type is generated.
    let selected = select(&set, &[message], true, &mut HashSet::new())?;
    if !selected.iter().any(|m| m.full_name == name) {
        bail!("{name} opts out of generation (generate: false)");
    }

    let schema = Synthesizer::new(&set, &selected)
        .root_schema(name)
        .with_context(|| format!("Failed to synthesize {name}"))?;
    let text = if compact {
        serde_json::to_string(&schema)?
    } else {
        serde_json::to_string_pretty(&schema)?
    };
    println!("{text}");
    Ok(())
}
