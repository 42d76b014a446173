//! `fedtls-metadata lookup` - Connection details for a peer server.

use anyhow::{Context, Result};
use serde_json::json;
use std::fs;

use fedtls_metadata::{parse_tags, Metadata, ServerConnection};

use super::report;
use crate::cli::args::LookupArgs;
use crate::exit_codes;

pub fn cmd_lookup(args: LookupArgs) -> i32 {
    match run_lookup(&args) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => report(&e),
    }
}

fn run_lookup(args: &LookupArgs) -> Result<()> {
    let bytes = fs::read(&args.metadata)
        .with_context(|| format!("failed to read metadata: {}", args.metadata.display()))?;
    let metadata = Metadata::from_slice(&bytes)?;

    let tags = parse_tags(&args.server_tags);
    let server = metadata.server_by_tags(&args.entity, &tags)?;

    if let Some(ca_out) = &args.ca_out {
        fs::write(ca_out, server.ca_bundle())
            .with_context(|| format!("failed to write CA bundle: {}", ca_out.display()))?;
    }

    println!("{}", render(&server, args.json)?);
    Ok(())
}

fn render(server: &ServerConnection, as_json: bool) -> Result<String> {
    if as_json {
        let out = json!({
            "entity_id": server.entity_id,
            "base_uri": server.base_uri,
            "pinned_public_keys": server.pinned_public_keys(),
            "pins": server.pins,
        });
        return Ok(serde_json::to_string_pretty(&out)?);
    }
    Ok(format!(
        "base_uri: {}\npinned_public_keys: {}",
        server.base_uri,
        server.pinned_public_keys()
    ))
}
