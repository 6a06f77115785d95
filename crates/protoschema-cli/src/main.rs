//! protoschema CLI - Compile protobuf descriptors into JSON Schema.
//!
//! Inputs are YAML/JSON manifests or protojson descriptor sets. Each target
//! file is one compilation unit: `generate` writes its JSON Schema documents
//! and a Rust module that rebuilds them, `list`, `show` and `check` inspect
//! without writing anything.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::generate::Emit;

#[derive(Parser)]
#[command(name = "protoschema")]
#[command(author, version, about = "Compile protobuf descriptors into JSON Schema (Draft 2020-12)", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate schema documents and Rust builders for every target file
    Generate {
        /// Manifests or descriptor sets (paths or glob patterns)
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output directory
        #[arg(short, long, default_value = "gen")]
        output: PathBuf,

        /// What to write
        #[arg(long, value_enum, default_value_t = Emit::All)]
        emit: Emit,

        /// Full-name prefix of shared types (repeatable, default: google.)
        #[arg(long = "shared-prefix", value_name = "PREFIX")]
        shared_prefixes: Vec<String>,

        /// Omit the generation timestamp from Rust headers
        #[arg(long)]
        no_timestamp: bool,

        /// Output as JSON (for machine consumption)
        #[arg(long)]
        json: bool,
    },

    /// List the types each target file generates
    List {
        /// Manifest or descriptor set
        input: PathBuf,

        /// Output as JSON (for machine consumption)
        #[arg(long)]
        json: bool,
    },

    /// Print the schema for one message type
    Show {
        /// Manifest or descriptor set
        input: PathBuf,

        /// Fully-qualified message name (e.g., users.v1.User)
        type_name: String,

        /// Print on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Resolve every option and type reference without writing output
    Check {
        /// Manifest or descriptor set
        input: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Logs go to stderr so stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "protoschema starting");

    match cli.command {
        Commands::Generate {
            inputs,
            output,
            emit,
            shared_prefixes,
            no_timestamp,
            json,
        } => commands::generate::run(
            &inputs,
            &output,
            emit,
            &shared_prefixes,
            no_timestamp,
            json,
        ),
        Commands::List { input, json } => commands::list::run(&input, json),
        Commands::Show {
            input,
            type_name,
            compact,
        } => commands::show::run(&input, &type_name, compact),
        Commands::Check { input } => commands::check::run(&input),
    }
}
