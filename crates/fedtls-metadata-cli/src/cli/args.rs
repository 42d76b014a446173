use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use fedtls_metadata::DEFAULT_METADATA_URL;

#[derive(Parser, Debug)]
#[command(
    name = "fedtls-metadata",
    version,
    about = "Fetch, verify and query federated TLS authentication metadata"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Overrides RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download and verify signed metadata, reusing a fresh cached copy when possible
    Fetch(FetchArgs),
    /// Look up a server of an entity in verified metadata
    Lookup(LookupArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Trusted signing keys (JWK Set, JSON)
    #[arg(long)]
    pub keys: PathBuf,

    /// Where to store the verified metadata
    #[arg(long)]
    pub output: PathBuf,

    /// Signed metadata URL
    #[arg(long, env = "FEDTLS_METADATA_URL", default_value = DEFAULT_METADATA_URL)]
    pub url: String,

    /// Previously stored metadata to reuse while its cache_ttl has not elapsed
    #[arg(long)]
    pub cached: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Max retries for transient download failures
    #[arg(long)]
    pub max_retries: Option<u32>,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Verified metadata file (as written by `fetch`)
    #[arg(long)]
    pub metadata: PathBuf,

    /// Entity id of the peer
    #[arg(long)]
    pub entity: String,

    /// Comma separated tags the server must carry
    #[arg(long, default_value = "")]
    pub server_tags: String,

    /// Write the entity's issuer certificates as a PEM CA bundle
    #[arg(long)]
    pub ca_out: Option<PathBuf>,

    /// Print the connection details as JSON
    #[arg(long)]
    pub json: bool,
}
