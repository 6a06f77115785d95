//! # protoschema-adapters
//!
//! Descriptor front ends for protoschema.
//!
//! This crate turns on-disk type descriptions into a
//! [`protoschema_core::DescriptorSet`]:
//! - YAML/JSON manifests, a compact hand-written format
//! - protojson-encoded `FileDescriptorSet` documents
//!
//! ## Example
//!
//! ```rust,no_run
//! use protoschema_adapters::load;
//! use protoschema_core::{compile_all, GeneratorConfig};
//!
//! let set = load(std::path::Path::new("schema/users.yaml"))?;
//! for (path, result) in compile_all(&set, &GeneratorConfig::default()) {
//!     println!("{path}: {}", if result.is_ok() { "ok" } else { "failed" });
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod descriptor_set;
pub mod manifest;

use anyhow::{bail, Context, Result};
use protoschema_core::DescriptorSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Manifest,
    DescriptorSet,
    Unknown,
}

impl InputFormat {
    /// Get the string identifier for this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Manifest => "manifest",
            InputFormat::DescriptorSet => "descriptor-set",
            InputFormat::Unknown => "unknown",
        }
    }
}

/// Trait for descriptor front ends.
pub trait Adapter {
    /// The format this adapter reads.
    fn format(&self) -> InputFormat;

    /// Parse an in-memory document.
    fn load_str(&self, text: &str) -> Result<DescriptorSet>;

    /// Read and parse a file.
    fn load(&self, path: &Path) -> Result<DescriptorSet> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        self.load_str(&text)
            .with_context(|| format!("Failed to load {} as {}", path.display(), self.format().as_str()))
    }
}

/// Detect the format of a file from its extension and, for JSON, its shape.
///
/// `.yaml`/`.yml` files are manifests. A `.json` document with a top-level
/// `file` (FileDescriptorSet) or `protoFile` (CodeGeneratorRequest) array is
/// a descriptor set; any other JSON object is a manifest.
pub fn detect_format(path: &Path) -> InputFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => InputFormat::Manifest,
        Some("json") => match fs::read_to_string(path) {
            Ok(text) => detect_json_format(&text),
            Err(_) => InputFormat::Unknown,
        },
        _ => InputFormat::Unknown,
    }
}

/// Classify a JSON document.
pub fn detect_json_format(text: &str) -> InputFormat {
    let Ok(serde_json::Value::Object(obj)) = serde_json::from_str::<serde_json::Value>(text)
    else {
        return InputFormat::Unknown;
    };
    let has_array = |key: &str| obj.get(key).is_some_and(|v| v.is_array());
    if has_array("file") || has_array("protoFile") {
        InputFormat::DescriptorSet
    } else {
        InputFormat::Manifest
    }
}

/// The adapter for a format, if there is one.
pub fn adapter_for(format: InputFormat) -> Option<Box<dyn Adapter>> {
    match format {
        InputFormat::Manifest => Some(Box::new(manifest::ManifestAdapter)),
        InputFormat::DescriptorSet => Some(Box::new(descriptor_set::DescriptorSetAdapter)),
        InputFormat::Unknown => None,
    }
}

/// Detect the format of `path` and load it.
pub fn load(path: &Path) -> Result<DescriptorSet> {
    let format = detect_format(path);
    debug!(path = %path.display(), format = format.as_str(), "loading descriptors");
    let Some(adapter) = adapter_for(format) else {
        bail!(
            "Cannot determine input format of {} (expected .yaml, .yml or .json)",
            path.display()
        );
    };
    adapter.load(path)
}
