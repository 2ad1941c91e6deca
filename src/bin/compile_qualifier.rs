//! Compile stored query definitions
//!
//! Reads a JSON document mapping query names to their property-list form,
//! compiles every qualifier and prints the resulting expression together
//! with its inferred parameter bindings.
//!
//! Usage: `compile-qualifier <queries.json> [data-map.json]`

use anyhow::{bail, Context, Result};
use cim_object_graph::{DataMap, QueryDefinition};
use std::fs;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(queries_path) = args.next() else {
        bail!("usage: compile-qualifier <queries.json> [data-map.json]");
    };

    let data_map = match args.next() {
        Some(path) => DataMap::from_path(&path)
            .with_context(|| format!("Failed to load data map from {path}"))?,
        None => DataMap::new("empty"),
    };

    let raw = fs::read_to_string(&queries_path)
        .with_context(|| format!("Failed to read {queries_path}"))?;
    let document: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("{queries_path} is not valid JSON"))?;
    let Some(queries) = document.as_object() else {
        bail!("{queries_path} must contain a map of query definitions");
    };

    info!(count = queries.len(), path = %queries_path, "Compiling query definitions");

    let mut failures = 0;
    for (name, plist) in queries {
        match QueryDefinition::from_plist(name.as_str(), plist) {
            Ok(query) => {
                println!("{name} ({})", query.root_entity);
                match &query.qualifier {
                    Some(qualifier) => println!("  qualifier: {qualifier}"),
                    None => println!("  qualifier: none"),
                }
                for binding in query.parameter_bindings(&data_map) {
                    println!("  ${}: {}", binding.name, binding.binding_type);
                }
            }
            Err(e) => {
                error!(query = %name, error = %e, "Query definition rejected");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} query definitions failed to compile", queries.len());
    }
    Ok(())
}
