//! Generate command - Write schema documents and Rust builders per unit.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use protoschema_core::{compile_all, CompiledUnit, GeneratorConfig};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::{expand_inputs, load_input};

/// Which artifacts to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    /// `<full name>.schema.json` documents
    Json,
    /// `<stem>_jsonschema.rs` modules
    Rust,
    All,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Generated,
    Skipped,
    Failed,
}

#[derive(Debug, Serialize)]
struct UnitReport {
    input: String,
    source: String,
    status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateReport {
    output: String,
    generated: usize,
    skipped: usize,
    failed: usize,
    units: Vec<UnitReport>,
}

pub fn run(
    inputs: &[String],
    output: &Path,
    emit: Emit,
    shared_prefixes: &[String],
    no_timestamp: bool,
    json: bool,
) -> Result<()> {
    let mut config = GeneratorConfig {
        include_timestamp: !no_timestamp,
        ..GeneratorConfig::default()
    };
    if !shared_prefixes.is_empty() {
        config.shared_prefixes = shared_prefixes.to_vec();
    }

    let mut units = Vec::new();
    for path in expand_inputs(inputs)? {
        let input = path.display().to_string();
        let set = match load_input(&path) {
            Ok(set) => set,
            Err(e) => {
                error!(input = %input, "{e:#}");
                units.push(UnitReport {
                    source: input.clone(),
                    input,
                    status: Status::Failed,
                    files: Vec::new(),
                    error: Some(format!("{e:#}")),
                });
                continue;
            }
        };

        for (source, result) in compile_all(&set, &config) {
            let report = match result.map_err(anyhow::Error::from).and_then(|unit| match unit {
                Some(unit) => write_unit(&unit, output, emit, &config).map(Some),
                None => Ok(None),
            }) {
                Ok(Some(files)) => UnitReport {
                    input: input.clone(),
                    source,
                    status: Status::Generated,
                    files,
                    error: None,
                },
                Ok(None) => UnitReport {
                    input: input.clone(),
                    source,
                    status: Status::Skipped,
                    files: Vec::new(),
                    error: None,
                },
                Err(e) => {
                    error!(source = %source, "{e:#}");
                    UnitReport {
                        input: input.clone(),
                        source,
                        status: Status::Failed,
                        files: Vec::new(),
                        error: Some(format!("{e:#}")),
                    }
                }
            };
            units.push(report);
        }
    }

    let count = |wanted: fn(&Status) -> bool| units.iter().filter(|u| wanted(&u.status)).count();
    let report = GenerateReport {
        output: output.display().to_string(),
        generated: count(|s| matches!(s, Status::Generated)),
        skipped: count(|s| matches!(s, Status::Skipped)),
        failed: count(|s| matches!(s, Status::Failed)),
        units,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.failed > 0 {
        bail!(
            "{} of {} unit(s) failed",
            report.failed,
            report.units.len()
        );
    }
    Ok(())
}

/// Write a unit's artifacts under `output`, mirroring the source directory.
///
/// Every artifact is staged as `<name>.tmp` before any is renamed into
/// place, so a failed write leaves no part of the unit behind.
fn write_unit(
    unit: &CompiledUnit,
    output: &Path,
    emit: Emit,
    config: &GeneratorConfig,
) -> Result<Vec<String>> {
    let mut artifacts = Vec::new();
    if matches!(emit, Emit::Json | Emit::All) {
        artifacts.extend(unit.documents()?);
    }
    if matches!(emit, Emit::Rust | Emit::All) {
        artifacts.push((unit.rust_file_name(), unit.rust_source(config)));
    }

    let dir = unit_dir(output, &unit.source);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let staged = stage(&dir, artifacts)?;
    let mut written = Vec::with_capacity(staged.len());
    for (i, (temp, path)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(temp, path) {
            discard(&staged[i..]);
            return Err(e).with_context(|| format!("Failed to move {} into place", path.display()));
        }
        written.push(path.display().to_string());
    }
    info!(source = %unit.source, files = written.len(), "wrote unit");
    Ok(written)
}

/// Write each artifact next to its final path. Returns `(temp, final)` pairs.
fn stage(dir: &Path, artifacts: Vec<(String, String)>) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(artifacts.len());
    for (name, contents) in artifacts {
        let temp = dir.join(format!("{name}.tmp"));
        if let Err(e) = fs::write(&temp, contents) {
            discard(&staged);
            return Err(e).with_context(|| format!("Failed to write {}", temp.display()));
        }
        staged.push((temp, dir.join(name)));
    }
    Ok(staged)
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        if let Err(e) = fs::remove_file(temp) {
            warn!(path = %temp.display(), error = %e, "failed to remove staged file");
        }
    }
}

/// `users/v1/user.proto` -> `<output>/users/v1`.
fn unit_dir(output: &Path, source: &str) -> PathBuf {
    match Path::new(source).parent() {
        Some(parent) => output.join(parent),
        None => output.to_path_buf(),
    }
}

fn print_report(report: &GenerateReport) {
    println!("📦 Generating into {}\n", report.output);
    for unit in &report.units {
        match unit.status {
            Status::Generated => {
                println!("✅ {} ({} file(s))", unit.source, unit.files.len());
                for file in &unit.files {
                    println!("   • {file}");
                }
            }
            Status::Skipped => println!("⏭️  {} (nothing to generate)", unit.source),
            Status::Failed => {
                println!("❌ {}", unit.source);
                if let Some(error) = &unit.error {
                    println!("   {error}");
                }
            }
        }
    }
    println!();
    println!(
        "Generated: {}  Skipped: {}  Failed: {}",
        report.generated, report.skipped, report.failed
    );
}
