//! # rpcbridge CLI Entry Point
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs the
//!    `tracing` subscriber.
//! 2. **Loading**: Reads a binary `FileDescriptorSet` into a [`Registry`].
//! 3. **Execution**: Serves, inspects or resolves against the loaded schema.
//! 4. **Presentation**: Formats results and errors with colors for the terminal.
mod cli;
mod formatter;
mod serve;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, SchemaArgs};
use formatter::{FormattedString, RegistrySummary, ResolvedPath};
use rpcbridge_core::{Registry, prost::Message, prost_types::FileDescriptorSet};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Serve(serve_args) => serve::run(serve_args).await,
        Commands::Inspect { schema } => inspect(&schema),
        Commands::Resolve {
            schema,
            message,
            path,
            path_param,
        } => resolve(&schema, &message, &path, path_param),
    };

    if let Err(err) = result {
        eprintln!("{}", FormattedString::from(err));
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Reads and decodes the descriptor set named by `schema`.
pub fn read_descriptor_set(schema: &SchemaArgs) -> anyhow::Result<FileDescriptorSet> {
    let bytes = std::fs::read(&schema.descriptor_set)
        .with_context(|| format!("Failed to read '{}'", schema.descriptor_set.display()))?;
    FileDescriptorSet::decode(bytes.as_slice()).context("Failed to parse file descriptor set")
}

/// Loads `set` into a registry. With no explicit `--generate`, every file is a target.
pub fn load_registry(set: &FileDescriptorSet, generate: &[String]) -> anyhow::Result<Registry> {
    let targets: Vec<String> = if generate.is_empty() {
        set.file.iter().map(|f| f.name().to_string()).collect()
    } else {
        generate.to_vec()
    };

    let mut registry = Registry::new();
    registry
        .load(set.file.iter().cloned(), &targets)
        .context("Failed to load schema")?;
    Ok(registry)
}

fn inspect(schema: &SchemaArgs) -> anyhow::Result<()> {
    let set = read_descriptor_set(schema)?;
    let registry = load_registry(&set, &schema.generate)?;
    println!("{}", FormattedString::from(RegistrySummary(&registry)));
    Ok(())
}

fn resolve(schema: &SchemaArgs, message: &str, path: &str, path_param: bool) -> anyhow::Result<()> {
    let set = read_descriptor_set(schema)?;
    let registry = load_registry(&set, &[])?;

    let root = registry.lookup_message("", message)?;
    let resolved = registry.resolve_field_path(root, path, path_param)?;
    println!(
        "{}",
        FormattedString::from(ResolvedPath(&root.fqmn(), &resolved))
    );
    Ok(())
}
