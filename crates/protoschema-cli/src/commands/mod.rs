//! CLI command implementations.

pub mod check;
pub mod generate;
pub mod list;
pub mod show;

use anyhow::{bail, Context, Result};
use protoschema_core::DescriptorSet;
use std::path::{Path, PathBuf};

/// Expand input arguments. Arguments without glob metacharacters are taken
/// as literal paths; a pattern that matches nothing is an error.
pub(crate) fn expand_inputs(args: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for arg in args {
        if !arg.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(arg));
            continue;
        }
        let matches = glob::glob(arg)
            .with_context(|| format!("Invalid glob pattern: {arg}"))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to expand {arg}"))?;
        if matches.is_empty() {
            bail!("No files match {arg}");
        }
        paths.extend(matches);
    }
    Ok(paths)
}

/// Load one input, with the path in the error.
pub(crate) fn load_input(path: &Path) -> Result<DescriptorSet> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    protoschema_adapters::load(path)
}
