//! `schemes` command implementation.

use anyhow::{Context, Result};
use dispatcher::Registry;

use crate::cli::SchemesArgs;

/// Execute the `schemes` command
pub fn run_schemes(args: &SchemesArgs) -> Result<()> {
    let registry = Registry::with_defaults().context("Failed to register built-in broadcasters")?;
    let schemes = registry.schemes();

    if args.json {
        let json = serde_json::to_string_pretty(&schemes).context("Failed to serialize schemes")?;
        println!("{}", json);
    } else {
        for scheme in &schemes {
            println!("{}", scheme);
        }
    }

    Ok(())
}
