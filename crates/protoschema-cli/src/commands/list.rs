//! List command - Show which types each target file generates.

use anyhow::{bail, Result};
use protoschema_core::{compile_all, GeneratorConfig, Origin};
use serde::Serialize;
use std::path::Path;

use super::load_input;

#[derive(Serialize)]
struct TypeEntry {
    name: String,
    ident: String,
    origin: &'static str,
}

#[derive(Serialize)]
struct UnitEntry {
    source: String,
    types: Vec<TypeEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn origin_str(origin: Origin) -> &'static str {
    match origin {
        Origin::Local => "local",
        Origin::Shared => "shared",
    }
}

pub fn run(input: &Path, json: bool) -> Result<()> {
    let set = load_input(input)?;
    let config = GeneratorConfig::default();

    let units: Vec<UnitEntry> = compile_all(&set, &config)
        .into_iter()
        .map(|(source, result)| match result {
            Ok(unit) => UnitEntry {
                source,
                types: unit
                    .map(|u| {
                        u.types
                            .iter()
                            .map(|t| TypeEntry {
                                name: t.full_name.clone(),
                                ident: t.ident.clone(),
                                origin: origin_str(t.origin),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                error: None,
            },
            Err(e) => UnitEntry {
                source,
                types: Vec::new(),
                error: Some(e.to_string()),
            },
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&units)?);
    } else if units.is_empty() {
        println!("No target files.");
    } else {
        for unit in &units {
            println!("{}", unit.source);
            if let Some(error) = &unit.error {
                println!("  ❌ {error}");
            } else if unit.types.is_empty() {
                println!("  (nothing to generate)");
            }
            for t in &unit.types {
                println!("  {:<7} {:<40} {}", t.origin, t.name, t.ident);
            }
        }
    }

    let failed = units.iter().filter(|u| u.error.is_some()).count();
    if failed > 0 {
        bail!("{failed} unit(s) failed to compile");
    }
    Ok(())
}
