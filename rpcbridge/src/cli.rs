//! # CLI
//!
//! This module defines the command-line interface of `rpcbridge` using `clap`.
//!
//! Every option can also be given through an `RPCBRIDGE_*` environment variable.
use clap::{Args, Parser, Subcommand};
use rpcbridge_core::jsonrpc::DEFAULT_MAX_BODY_BYTES;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rpcbridge", version, about = "Serve gRPC services as JSON-RPC 2.0 over HTTP")]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Proxy JSON-RPC requests to an upstream gRPC server
    ///
    /// Every unary method of the loaded services is served as `Service.Method`.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// rpcbridge serve --descriptor-set api.bin --upstream http://localhost:50051
    /// ```
    Serve(ServeArgs),

    /// Print the files, services and methods loaded from a descriptor set
    Inspect {
        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Resolve a dotted field path against a message
    Resolve {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Fully qualified message name (e.g. .my.package.Request)
        #[arg(long)]
        message: String,

        /// Dotted field path (e.g. user.address.city)
        path: String,

        /// Apply the path parameter rules (no proto3 optional fields)
        #[arg(long)]
        path_param: bool,
    },
}

#[derive(Args)]
pub struct SchemaArgs {
    /// Path to the descriptor set (.bin), as written by `protoc --descriptor_set_out`
    #[arg(long, env = "RPCBRIDGE_DESCRIPTOR_SET")]
    pub descriptor_set: PathBuf,

    /// Files whose services are loaded (defaults to every file in the set)
    #[arg(long = "generate", env = "RPCBRIDGE_GENERATE", value_delimiter = ',')]
    pub generate: Vec<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,

    /// The upstream gRPC server URL (e.g. http://localhost:50051)
    #[arg(long, env = "RPCBRIDGE_UPSTREAM")]
    pub upstream: String,

    /// Address to listen on
    #[arg(long, env = "RPCBRIDGE_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Maximum request body size in bytes
    #[arg(long, env = "RPCBRIDGE_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Per-call timeout in seconds
    #[arg(long, env = "RPCBRIDGE_TIMEOUT")]
    pub timeout: Option<u64>,
}
